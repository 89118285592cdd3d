use crate::adapters::TreeFileGraph;
use crate::core::layout::CONTAINER_CONFIG_FILES;
use crate::core::resolver::{SystemLibraryPolicy, ALTERNATE_CORE, PRIMARY_CORE};
use crate::core::startup::STARTUP_PATTERN;
use crate::core::supervisor::{RunOptions, DEFAULT_MAIN_CLASS, DEFAULT_PROGRAM};
use crate::domain::model::{DeploymentTarget, ModuleDescriptor, ModuleSpec};
use crate::domain::ports::DependencyGraph;
use crate::utils::error::{DeployError, Result};
use crate::utils::validation::{
    validate_library_pattern, validate_non_empty_string, validate_path, validate_required_field,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";
pub const DEFAULT_RUN_DIR: &str = "local-run";

const EXAMPLE_MODULES: &str = r#"[[services]]
name = "demo"
class_name = "com.example.DemoService"
config = '{"key": "value"}'

[[filters]]
class_name = "com.example.DemoFilter""#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub container: ContainerConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    /// Built project jar; overrides the root file of the dependency tree.
    pub artifact_file: Option<PathBuf>,
    pub dependency_tree: Option<PathBuf>,
    pub local_repository: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// `host#port`, either side optional.
    pub address: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub dir: Option<PathBuf>,
    /// 0 keeps the container's own default.
    pub port: Option<u16>,
    pub program: Option<String>,
    pub main_class: Option<String>,
    pub config_files: Option<Vec<PathBuf>>,
    pub startup_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub core_artifacts: Option<Vec<String>>,
    #[serde(default)]
    pub system_libraries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(flatten)]
    pub spec: ModuleSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Filters are keyed by class name; a name here is a mistake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub spec: ModuleSpec,
}

impl DeployConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| DeployError::Config {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DeployError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| DeployError::Config {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let tree = validate_required_field("project.dependency_tree", &self.project.dependency_tree)?;
        validate_path("project.dependency_tree", &tree.to_string_lossy())?;

        for service in &self.services {
            validate_non_empty_string("services.name", &service.name)?;
            validate_non_empty_string("services.class_name", &service.spec.class_name)?;
        }
        for filter in &self.filters {
            validate_non_empty_string("filters.class_name", &filter.spec.class_name)?;
            if let Some(name) = &filter.name {
                return Err(DeployError::InvalidConfigValue {
                    field: "filters.name".to_string(),
                    value: name.clone(),
                    reason: format!("invalid <name> of filters \"{}\"", filter.spec.class_name),
                });
            }
        }
        for pattern in &self.runtime.system_libraries {
            validate_library_pattern("runtime.system_libraries", pattern)?;
        }

        if let Some(address) = &self.container.address {
            if DeploymentTarget::parse(address).is_none() {
                return Err(DeployError::InvalidConfigValue {
                    field: "container.address".to_string(),
                    value: address.clone(),
                    reason: "Expected `host#port`".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Modules selected for this invocation, services before filters.
    ///
    /// With `class_filter` only modules of that class are kept and their
    /// exclusion flag is ignored; otherwise excluded modules are dropped.
    pub fn descriptors(&self, class_filter: Option<&str>) -> Result<Vec<ModuleDescriptor>> {
        let all = self
            .services
            .iter()
            .map(|s| ModuleDescriptor::service(s.name.clone(), s.spec.clone()))
            .chain(self.filters.iter().map(|f| ModuleDescriptor::filter(f.spec.clone())));

        let selected: Vec<_> = match class_filter {
            Some(class_name) => all.filter(|d| d.class_name() == class_name).collect(),
            None => all.filter(|d| !d.spec().exclusion).collect(),
        };

        if selected.is_empty() {
            let message = match class_filter {
                Some(class_name) => format!(
                    "no service or filter with class_name \"{}\", declare it like:\n{}",
                    class_name, EXAMPLE_MODULES
                ),
                None => format!(
                    "no service or filter to deploy, declare them like:\n{}",
                    EXAMPLE_MODULES
                ),
            };
            return Err(DeployError::Config { message });
        }
        Ok(selected)
    }

    /// Deploy target; `address` overrides the file.
    pub fn target(&self, address: Option<&str>) -> Result<DeploymentTarget> {
        match address.or(self.container.address.as_deref()) {
            None => Ok(DeploymentTarget::default()),
            Some(address) => {
                DeploymentTarget::parse(address).ok_or_else(|| DeployError::InvalidConfigValue {
                    field: "container.address".to_string(),
                    value: address.to_string(),
                    reason: "Expected `host#port`".to_string(),
                })
            }
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.container.timeout_seconds.map(Duration::from_secs)
    }

    pub fn system_policy(&self) -> SystemLibraryPolicy {
        let cores = self
            .runtime
            .core_artifacts
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| vec![PRIMARY_CORE.to_string(), ALTERNATE_CORE.to_string()]);
        SystemLibraryPolicy::new(cores, &self.runtime.system_libraries)
    }

    pub fn local_repository(&self) -> Option<PathBuf> {
        self.project.local_repository.as_deref().map(expand_home)
    }

    /// Loads the dependency tree and checks it against the declared project identity.
    pub fn load_graph(&self) -> Result<TreeFileGraph> {
        let tree = validate_required_field("project.dependency_tree", &self.project.dependency_tree)?;
        let graph = TreeFileGraph::from_file(tree)?
            .with_project_file(self.project.artifact_file.clone());

        let root = graph.root();
        let expected = [
            ("project.group_id", &self.project.group_id, &root.group_id),
            ("project.artifact_id", &self.project.artifact_id, &root.artifact_id),
            ("project.version", &self.project.version, &root.version),
        ];
        for (field, declared, actual) in expected {
            if let Some(declared) = declared.as_ref().filter(|d| *d != actual) {
                return Err(DeployError::InvalidConfigValue {
                    field: field.to_string(),
                    value: declared.clone(),
                    reason: format!("dependency tree root is \"{}\"", actual),
                });
            }
        }
        Ok(graph)
    }

    /// Bootstrap settings; `port` and `dir` override the file.
    pub fn run_options(&self, port: Option<u16>, dir: Option<PathBuf>) -> RunOptions {
        let run = &self.run;
        RunOptions {
            dir: dir
                .or_else(|| run.dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RUN_DIR)),
            port: port.or(run.port).filter(|p| *p != 0),
            program: run.program.clone().unwrap_or_else(|| DEFAULT_PROGRAM.to_string()),
            main_class: run
                .main_class
                .clone()
                .unwrap_or_else(|| DEFAULT_MAIN_CLASS.to_string()),
            config_files: run
                .config_files
                .clone()
                .unwrap_or_else(|| CONTAINER_CONFIG_FILES.iter().map(PathBuf::from).collect()),
            startup_pattern: run
                .startup_pattern
                .clone()
                .unwrap_or_else(|| STARTUP_PATTERN.to_string()),
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

impl Validate for DeployConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
