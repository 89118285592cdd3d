use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 7112;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ArtifactCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    pub fn same_library(&self, other: &ArtifactCoordinate) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }

    pub fn to_args(&self) -> serde_json::Value {
        serde_json::json!([self.group_id, self.artifact_id, self.version])
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: ArtifactCoordinate,
    pub file: Option<PathBuf>,
}

impl ResolvedArtifact {
    pub fn new(coordinate: ArtifactCoordinate, file: Option<PathBuf>) -> Self {
        Self { coordinate, file }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn coordinate(&self) -> ArtifactCoordinate {
        ArtifactCoordinate::new(&self.group_id, &self.artifact_id, &self.version)
    }

    pub fn artifact(&self) -> ResolvedArtifact {
        ResolvedArtifact::new(self.coordinate(), self.file.clone())
    }

    pub fn find(&self, artifact_id: &str) -> Option<&DependencyNode> {
        if self.artifact_id == artifact_id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(artifact_id))
    }

    /// Every descendant, deduplicated by coordinate, excluding `self`.
    pub fn descendants(&self) -> Vec<ResolvedArtifact> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        self.collect_descendants(&mut seen, &mut out);
        out
    }

    fn collect_descendants(
        &self,
        seen: &mut std::collections::HashSet<ArtifactCoordinate>,
        out: &mut Vec<ResolvedArtifact>,
    ) {
        for child in &self.children {
            if seen.insert(child.coordinate()) {
                out.push(child.artifact());
            }
            child.collect_descendants(seen, out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRecord {
    #[serde(flatten)]
    pub coordinate: ArtifactCoordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<ArtifactCoordinate>,
}

impl LibraryRecord {
    pub fn new(coordinate: ArtifactCoordinate, jar_file: Option<String>) -> Self {
        Self {
            coordinate,
            jar_file,
            depends: Vec::new(),
        }
    }

    pub fn with_depends(mut self, depends: Vec<ArtifactCoordinate>) -> Self {
        self.depends = depends;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub class_name: String,
    /// Selects a node of the dependency tree instead of the project's own artifact.
    #[serde(default)]
    pub artifact: Option<String>,
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub resource_path: Option<PathBuf>,
    #[serde(default)]
    pub exclusion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleDescriptor {
    Service { name: String, spec: ModuleSpec },
    Filter { spec: ModuleSpec },
}

impl ModuleDescriptor {
    pub fn service(name: impl Into<String>, spec: ModuleSpec) -> Self {
        Self::Service {
            name: name.into(),
            spec,
        }
    }

    pub fn filter(spec: ModuleSpec) -> Self {
        Self::Filter { spec }
    }

    pub fn spec(&self) -> &ModuleSpec {
        match self {
            Self::Service { spec, .. } | Self::Filter { spec } => spec,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Service { name, .. } => Some(name),
            Self::Filter { .. } => None,
        }
    }

    /// Registry key: the service name, or the class name of a filter.
    pub fn key(&self) -> &str {
        match self {
            Self::Service { name, .. } => name,
            Self::Filter { spec } => &spec.class_name,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.spec().class_name
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Service { .. } => "service",
            Self::Filter { .. } => "filter",
        }
    }

    pub fn config(&self) -> Option<&str> {
        crate::utils::validation::non_empty(self.spec().config.as_deref())
    }

    pub fn resource_path(&self) -> Option<&Path> {
        self.spec()
            .resource_path
            .as_deref()
            .filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub host: String,
    pub port: u16,
}

impl DeploymentTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn local(port: u16) -> Self {
        Self::new(DEFAULT_HOST, port)
    }

    /// Parses `host#port`; either side may be omitted.
    pub fn parse(address: &str) -> Option<Self> {
        let address = address.trim();
        let mut target = Self::default();
        match address.find('#') {
            Some(index) => {
                let port = &address[index + 1..];
                if !port.is_empty() {
                    target.port = port.parse().ok()?;
                }
                if index > 0 {
                    target.host = address[..index].to_string();
                }
            }
            None if !address.is_empty() => target.host = address.to_string(),
            None => {}
        }
        Some(target)
    }
}

impl Default for DeploymentTarget {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Absent,
    TransferredNotRegistered,
    Registered,
}

impl ArtifactState {
    pub fn from_code(code: i64) -> Self {
        match code {
            c if c > 0 => Self::Registered,
            0 => Self::TransferredNotRegistered,
            _ => Self::Absent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRuntime {
    pub class_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    #[serde(default)]
    pub services: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub filters: Option<Vec<FilterRuntime>>,
}

impl RuntimeSnapshot {
    pub fn has_service(&self, name: &str) -> bool {
        self.services
            .as_ref()
            .is_some_and(|services| services.contains_key(name))
    }

    pub fn has_filter(&self, class_name: &str) -> bool {
        self.filters
            .as_ref()
            .is_some_and(|filters| filters.iter().any(|f| f.class_name == class_name))
    }

    pub fn collides_with(&self, descriptor: &ModuleDescriptor) -> bool {
        match descriptor {
            ModuleDescriptor::Service { name, .. } => self.has_service(name),
            ModuleDescriptor::Filter { spec } => self.has_filter(&spec.class_name),
        }
    }
}
