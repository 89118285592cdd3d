use crate::core::resolver::{CoreLibrarySet, DependencyResolver};
use crate::core::resources::copy_dir;
use crate::domain::model::{ArtifactCoordinate, LibraryRecord, ModuleDescriptor, ResolvedArtifact};
use crate::domain::ports::{DependencyGraph, SystemLibraries};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const LIB_FILE: &str = "rewin.ubsi.lib.json";
pub const LIB_PATH: &str = "rewin.ubsi.libs";
pub const SYS_PATH: &str = "core-libs";
pub const MODULE_FILE: &str = "rewin.ubsi.module.json";
pub const MODULE_PATH: &str = "rewin.ubsi.modules";

/// Container configuration files picked up from the working directory.
pub const CONTAINER_CONFIG_FILES: [&str; 5] = [
    "rewin.ubsi.consumer.json",
    "rewin.ubsi.router.json",
    "rewin.ubsi.log.json",
    "rewin.ubsi.container.json",
    "rewin.ubsi.acl.json",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub class_name: String,
    pub jar_lib: ArtifactCoordinate,
    /// False when configuration must be pushed before the module starts.
    pub startup: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<BTreeMap<String, ModuleEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<ModuleEntry>>,
}

#[derive(Debug)]
pub struct RunLayout {
    pub root: PathBuf,
    pub libraries: Vec<LibraryRecord>,
    pub system_libraries: Vec<ResolvedArtifact>,
    pub modules: ModuleManifest,
    /// Module key → configuration pushed after startup.
    pub pending: BTreeMap<String, String>,
}

impl RunLayout {
    /// Populates `root`, replacing libraries and module resources from a previous run.
    pub fn build<G, S>(
        resolver: &DependencyResolver<'_, G, S>,
        descriptors: &[ModuleDescriptor],
        root: &Path,
        config_files: &[PathBuf],
    ) -> Result<Self>
    where
        G: DependencyGraph + ?Sized,
        S: SystemLibraries + ?Sized,
    {
        std::fs::create_dir_all(root)?;
        let system = resolver.system();

        let mut core = CoreLibrarySet::new();
        for artifact in resolver.graph().project_artifacts() {
            if system.is_system_lib(&artifact.coordinate) {
                core.merge(artifact, system);
            }
        }

        let mut libraries: BTreeMap<ArtifactCoordinate, (LibraryRecord, PathBuf)> = BTreeMap::new();
        for descriptor in descriptors {
            let mut depends = Vec::new();
            for artifact in resolver.closure(descriptor)? {
                if system.is_system_lib(&artifact.coordinate) {
                    core.merge(artifact, system);
                    continue;
                }
                if !libraries.contains_key(&artifact.coordinate) {
                    let file = resolver.locate(&artifact)?;
                    let record = LibraryRecord::new(artifact.coordinate.clone(), file_name(&file));
                    libraries.insert(artifact.coordinate.clone(), (record, file));
                }
                depends.push(artifact.coordinate);
            }

            let module = resolver.module_artifact(descriptor)?;
            let file = resolver.locate(&module)?;
            let record = LibraryRecord::new(module.coordinate.clone(), file_name(&file)).with_depends(depends);
            libraries.insert(module.coordinate, (record, file));
        }

        let records: Vec<LibraryRecord> = libraries.values().map(|(r, _)| r.clone()).collect();
        write_json(&root.join(LIB_FILE), &records)?;

        let lib_dir = root.join(LIB_PATH);
        reset_dir(&lib_dir)?;
        for (record, file) in libraries.values() {
            copy_into(file, &lib_dir, record.jar_file.as_deref())?;
        }

        let sys_dir = root.join(SYS_PATH);
        reset_dir(&sys_dir)?;
        for artifact in core.libraries() {
            let file = resolver.locate(artifact)?;
            copy_into(&file, &sys_dir, None)?;
        }
        tracing::info!(
            "📦 {} libraries, {} runtime libraries copied",
            records.len(),
            core.len()
        );

        let module_dir = root.join(MODULE_PATH);
        remove_dir(&module_dir)?;
        let mut modules = ModuleManifest::default();
        let mut pending = BTreeMap::new();
        for descriptor in descriptors {
            let key = descriptor.key().to_string();
            let config = descriptor.config();
            if let Some(config) = config {
                pending.insert(key.clone(), config.to_string());
            }
            if let Some(path) = descriptor.resource_path() {
                copy_dir(path, &module_dir.join(&key))?;
            }

            let entry = ModuleEntry {
                class_name: descriptor.class_name().to_string(),
                jar_lib: resolver.module_artifact(descriptor)?.coordinate,
                startup: config.is_none(),
            };
            match descriptor {
                ModuleDescriptor::Service { name, .. } => {
                    modules
                        .services
                        .get_or_insert_with(BTreeMap::new)
                        .insert(name.clone(), entry);
                }
                ModuleDescriptor::Filter { .. } => {
                    modules.filters.get_or_insert_with(Vec::new).push(entry);
                }
            }
        }
        write_json(&root.join(MODULE_FILE), &modules)?;

        for file in config_files.iter().filter(|f| f.is_file()) {
            copy_into(file, root, None)?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            libraries: records,
            system_libraries: core.libraries().to_vec(),
            modules,
            pending,
        })
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn remove_dir(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

fn reset_dir(path: &Path) -> Result<()> {
    remove_dir(path)?;
    std::fs::create_dir_all(path)?;
    Ok(())
}

fn copy_into(file: &Path, dir: &Path, name: Option<&str>) -> Result<()> {
    let name = name.map(String::from).or_else(|| file_name(file)).unwrap_or_default();
    std::fs::copy(file, dir.join(name))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TreeFileGraph;
    use crate::core::resolver::{SystemLibraryPolicy, ALTERNATE_CORE, PRIMARY_CORE};
    use crate::domain::model::{DependencyNode, ModuleSpec};
    use tempfile::TempDir;

    fn node(dir: &Path, group: &str, artifact: &str, version: &str, children: Vec<DependencyNode>) -> DependencyNode {
        let file = dir.join(format!("{}-{}.jar", artifact, version));
        std::fs::write(&file, format!("{}:{}", artifact, version)).unwrap();
        DependencyNode {
            group_id: group.to_string(),
            artifact_id: artifact.to_string(),
            version: version.to_string(),
            file: Some(file),
            children,
        }
    }

    #[test]
    fn test_build_layout() {
        let repo = TempDir::new().unwrap();
        let run = TempDir::new().unwrap();
        let r = repo.path();

        let graph = TreeFileGraph::new(node(
            r,
            "com.x",
            "demo",
            "1.0",
            vec![
                node(r, "com.x", "plugin", "1.0", vec![
                    node(r, "com.x", "util", "1.0", vec![]),
                    node(r, "rewin", ALTERNATE_CORE, "2.2", vec![]),
                ]),
                node(r, "rewin", PRIMARY_CORE, "2.1", vec![]),
            ],
        ));
        let system = SystemLibraryPolicy::default();
        let resolver = DependencyResolver::new(&graph, &system);

        let resources = TempDir::new().unwrap();
        std::fs::create_dir_all(resources.path().join("sub")).unwrap();
        std::fs::write(resources.path().join("sub/b.txt"), "b").unwrap();

        let service = ModuleDescriptor::service(
            "svcA",
            ModuleSpec {
                class_name: "com.x.Svc".to_string(),
                config: Some("{\"k\":1}".to_string()),
                resource_path: Some(resources.path().to_path_buf()),
                ..Default::default()
            },
        );
        let filter = ModuleDescriptor::filter(ModuleSpec {
            class_name: "com.x.Filter".to_string(),
            artifact: Some("plugin".to_string()),
            ..Default::default()
        });

        // stale content from an earlier run
        std::fs::create_dir_all(run.path().join(LIB_PATH)).unwrap();
        std::fs::write(run.path().join(LIB_PATH).join("stale.jar"), "x").unwrap();

        let layout = RunLayout::build(&resolver, &[service, filter], run.path(), &[]).unwrap();

        let ids: Vec<_> = layout
            .libraries
            .iter()
            .map(|l| l.coordinate.artifact_id.as_str())
            .collect();
        assert_eq!(ids, vec!["demo", "plugin", "util"]);
        let demo = &layout.libraries[0];
        assert_eq!(demo.depends.len(), 2);
        assert_eq!(layout.libraries[1].depends, vec![ArtifactCoordinate::new("com.x", "util", "1.0")]);

        assert_eq!(layout.system_libraries.len(), 1);
        assert_eq!(layout.system_libraries[0].coordinate.artifact_id, ALTERNATE_CORE);
        assert!(run.path().join(SYS_PATH).join(format!("{}-2.2.jar", ALTERNATE_CORE)).is_file());

        assert!(!run.path().join(LIB_PATH).join("stale.jar").exists());
        assert!(run.path().join(LIB_PATH).join("util-1.0.jar").is_file());
        assert!(run.path().join(MODULE_PATH).join("svcA/sub/b.txt").is_file());

        let manifest: ModuleManifest =
            serde_json::from_str(&std::fs::read_to_string(run.path().join(MODULE_FILE)).unwrap()).unwrap();
        assert_eq!(manifest, layout.modules);
        let services = manifest.services.unwrap();
        assert!(!services["svcA"].startup);
        let filters = manifest.filters.unwrap();
        assert!(filters[0].startup);
        assert_eq!(filters[0].jar_lib.artifact_id, "plugin");
        assert_eq!(layout.pending.get("svcA").map(String::as_str), Some("{\"k\":1}"));

        let libs: Vec<LibraryRecord> =
            serde_json::from_str(&std::fs::read_to_string(run.path().join(LIB_FILE)).unwrap()).unwrap();
        assert_eq!(libs, layout.libraries);
    }

    #[test]
    fn test_missing_resource_dir_fails() {
        let repo = TempDir::new().unwrap();
        let run = TempDir::new().unwrap();
        let graph = TreeFileGraph::new(node(repo.path(), "com.x", "demo", "1.0", vec![]));
        let system = SystemLibraryPolicy::default();
        let resolver = DependencyResolver::new(&graph, &system);
        let service = ModuleDescriptor::service(
            "svcA",
            ModuleSpec {
                class_name: "com.x.Svc".to_string(),
                resource_path: Some(repo.path().join("missing")),
                ..Default::default()
            },
        );

        let err = RunLayout::build(&resolver, &[service], run.path(), &[]).unwrap_err();
        assert!(matches!(err, crate::utils::error::DeployError::InvalidPath { .. }));
    }

    #[test]
    fn test_copies_container_config_files() {
        let repo = TempDir::new().unwrap();
        let run = TempDir::new().unwrap();
        let graph = TreeFileGraph::new(node(repo.path(), "com.x", "demo", "1.0", vec![]));
        let system = SystemLibraryPolicy::default();
        let resolver = DependencyResolver::new(&graph, &system);
        let present = repo.path().join(CONTAINER_CONFIG_FILES[2]);
        std::fs::write(&present, "{}").unwrap();
        let missing = repo.path().join(CONTAINER_CONFIG_FILES[0]);
        let service = ModuleDescriptor::service(
            "svcA",
            ModuleSpec {
                class_name: "com.x.Svc".to_string(),
                ..Default::default()
            },
        );

        RunLayout::build(&resolver, &[service], run.path(), &[present, missing]).unwrap();

        assert!(run.path().join(CONTAINER_CONFIG_FILES[2]).is_file());
        assert!(!run.path().join(CONTAINER_CONFIG_FILES[0]).exists());
    }

    #[test]
    fn test_empty_resource_path_is_absent() {
        let repo = TempDir::new().unwrap();
        let run = TempDir::new().unwrap();
        let graph = TreeFileGraph::new(node(repo.path(), "com.x", "demo", "1.0", vec![]));
        let system = SystemLibraryPolicy::default();
        let resolver = DependencyResolver::new(&graph, &system);
        let service = ModuleDescriptor::service(
            "svcA",
            ModuleSpec {
                class_name: "com.x.Svc".to_string(),
                resource_path: Some(PathBuf::from("")),
                ..Default::default()
            },
        );

        RunLayout::build(&resolver, &[service], run.path(), &[]).unwrap();

        assert!(!run.path().join(MODULE_PATH).join("svcA").exists());
    }
}
