use crate::domain::model::{ArtifactCoordinate, ModuleDescriptor, ResolvedArtifact};
use crate::domain::ports::{DependencyGraph, SystemLibraries};
use crate::utils::error::{DeployError, Result};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

pub const PRIMARY_CORE: &str = "rewin.ubsi.core";
pub const ALTERNATE_CORE: &str = "ubsi-core-ce";

/// Runtime-supplied libraries: the container core plus `group:artifact` patterns.
#[derive(Debug, Clone)]
pub struct SystemLibraryPolicy {
    core_artifacts: Vec<String>,
    patterns: Vec<(String, String)>,
}

impl SystemLibraryPolicy {
    /// `core_artifacts[0]` is the primary core. Patterns are `group:artifact` or `group:*`.
    pub fn new(core_artifacts: Vec<String>, patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| p.split_once(':'))
            .map(|(g, a)| (g.trim().to_string(), a.trim().to_string()))
            .collect();
        Self {
            core_artifacts,
            patterns,
        }
    }
}

impl Default for SystemLibraryPolicy {
    fn default() -> Self {
        Self::new(vec![PRIMARY_CORE.to_string(), ALTERNATE_CORE.to_string()], &[])
    }
}

impl SystemLibraries for SystemLibraryPolicy {
    fn is_system_lib(&self, coordinate: &ArtifactCoordinate) -> bool {
        self.is_core(&coordinate.artifact_id)
            || self.patterns.iter().any(|(group, artifact)| {
                *group == coordinate.group_id && (artifact == "*" || *artifact == coordinate.artifact_id)
            })
    }

    fn is_core(&self, artifact_id: &str) -> bool {
        self.core_artifacts.iter().any(|c| c == artifact_id)
    }

    fn primary_core(&self) -> &str {
        self.core_artifacts.first().map_or(PRIMARY_CORE, String::as_str)
    }
}

pub struct DependencyResolver<'a, G: DependencyGraph + ?Sized, S: SystemLibraries + ?Sized> {
    graph: &'a G,
    system: &'a S,
    local_repository: Option<PathBuf>,
}

impl<'a, G: DependencyGraph + ?Sized, S: SystemLibraries + ?Sized> DependencyResolver<'a, G, S> {
    pub fn new(graph: &'a G, system: &'a S) -> Self {
        Self {
            graph,
            system,
            local_repository: None,
        }
    }

    pub fn with_local_repository(mut self, repository: Option<PathBuf>) -> Self {
        self.local_repository = repository;
        self
    }

    pub fn graph(&self) -> &G {
        self.graph
    }

    pub fn system(&self) -> &S {
        self.system
    }

    pub fn closure(&self, descriptor: &ModuleDescriptor) -> Result<Vec<ResolvedArtifact>> {
        match &descriptor.spec().artifact {
            None => Ok(self.graph.project_artifacts()),
            Some(artifact) => Ok(self.find_node(descriptor, artifact)?.descendants()),
        }
    }

    /// Closure minus runtime-supplied libraries: what must be shipped.
    pub fn transfer_set(&self, descriptor: &ModuleDescriptor) -> Result<Vec<ResolvedArtifact>> {
        Ok(self
            .closure(descriptor)?
            .into_iter()
            .filter(|a| !self.system.is_system_lib(&a.coordinate))
            .collect())
    }

    pub fn module_artifact(&self, descriptor: &ModuleDescriptor) -> Result<ResolvedArtifact> {
        match &descriptor.spec().artifact {
            None => Ok(self.graph.project_artifact()),
            Some(artifact) => Ok(self.find_node(descriptor, artifact)?.artifact()),
        }
    }

    fn find_node(
        &self,
        descriptor: &ModuleDescriptor,
        artifact: &str,
    ) -> Result<&crate::domain::model::DependencyNode> {
        self.graph
            .root()
            .find(artifact)
            .ok_or_else(|| DeployError::ArtifactNotFound {
                artifact: artifact.to_string(),
                class_name: descriptor.class_name().to_string(),
            })
    }

    /// File on disk for `artifact`, falling back to the local repository.
    pub fn locate(&self, artifact: &ResolvedArtifact) -> Result<PathBuf> {
        if let Some(file) = artifact.file.as_deref().filter(|f| f.is_file()) {
            return Ok(file.to_path_buf());
        }
        if let Some(repository) = &self.local_repository {
            let candidate = repository_path(repository, &artifact.coordinate);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(DeployError::FileMissing {
            coordinate: artifact.coordinate.clone(),
        })
    }
}

/// `<repo>/<group as dirs>/<artifact>/<version>/<artifact>-<version>.jar`
pub fn repository_path(repository: &Path, coordinate: &ArtifactCoordinate) -> PathBuf {
    let mut path = repository.to_path_buf();
    for part in coordinate.group_id.split('.') {
        path.push(part);
    }
    path.push(&coordinate.artifact_id);
    path.push(&coordinate.version);
    path.push(format!("{}-{}.jar", coordinate.artifact_id, coordinate.version));
    path
}

/// One copy per runtime-supplied library, highest version wins.
#[derive(Debug, Clone, Default)]
pub struct CoreLibrarySet {
    libs: Vec<ResolvedArtifact>,
}

impl CoreLibrarySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge<S: SystemLibraries + ?Sized>(&mut self, artifact: ResolvedArtifact, system: &S) {
        let is_core = system.is_core(&artifact.coordinate.artifact_id);
        let existing = self.libs.iter().position(|lib| {
            (is_core && system.is_core(&lib.coordinate.artifact_id))
                || lib.coordinate.same_library(&artifact.coordinate)
        });
        let Some(index) = existing else {
            self.libs.push(artifact);
            return;
        };

        let current = &self.libs[index].coordinate;
        let incoming = &artifact.coordinate;
        let replace = match incoming.version.cmp(&current.version) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => {
                is_core
                    && incoming.artifact_id != current.artifact_id
                    && current.artifact_id != system.primary_core()
            }
        };
        if replace {
            self.libs[index] = artifact;
        }
    }

    pub fn libraries(&self) -> &[ResolvedArtifact] {
        &self.libs
    }

    pub fn len(&self) -> usize {
        self.libs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TreeFileGraph;
    use crate::domain::model::{DependencyNode, ModuleSpec};
    use tempfile::TempDir;

    fn node(group: &str, artifact: &str, version: &str, children: Vec<DependencyNode>) -> DependencyNode {
        DependencyNode {
            group_id: group.to_string(),
            artifact_id: artifact.to_string(),
            version: version.to_string(),
            file: None,
            children,
        }
    }

    fn graph() -> TreeFileGraph {
        TreeFileGraph::new(node(
            "com.example",
            "demo",
            "1.0",
            vec![
                node(
                    "com.example",
                    "plugin",
                    "1.0",
                    vec![node("com.example", "plugin-util", "1.0", vec![node("rewin", PRIMARY_CORE, "2.0", vec![])])],
                ),
                node("rewin", PRIMARY_CORE, "2.1", vec![]),
                node("com.google.code.gson", "gson", "2.10", vec![]),
            ],
        ))
    }

    fn descriptor(artifact: Option<&str>) -> ModuleDescriptor {
        ModuleDescriptor::service(
            "svc",
            ModuleSpec {
                class_name: "com.example.Svc".to_string(),
                artifact: artifact.map(String::from),
                ..Default::default()
            },
        )
    }

    fn ids(artifacts: &[ResolvedArtifact]) -> Vec<&str> {
        artifacts.iter().map(|a| a.coordinate.artifact_id.as_str()).collect()
    }

    #[test]
    fn test_closure_without_override_is_project_set() {
        let graph = graph();
        let system = SystemLibraryPolicy::default();
        let resolver = DependencyResolver::new(&graph, &system);

        let closure = resolver.closure(&descriptor(None)).unwrap();
        assert_eq!(closure.len(), 5);
        assert_eq!(resolver.module_artifact(&descriptor(None)).unwrap().coordinate.artifact_id, "demo");
    }

    #[test]
    fn test_closure_with_override_excludes_node_itself() {
        let graph = graph();
        let system = SystemLibraryPolicy::default();
        let resolver = DependencyResolver::new(&graph, &system);
        let d = descriptor(Some("plugin"));

        assert_eq!(ids(&resolver.closure(&d).unwrap()), vec!["plugin-util", PRIMARY_CORE]);
        assert_eq!(ids(&resolver.transfer_set(&d).unwrap()), vec!["plugin-util"]);
        assert_eq!(resolver.module_artifact(&d).unwrap().coordinate.artifact_id, "plugin");
    }

    #[test]
    fn test_unknown_override_is_not_found() {
        let graph = graph();
        let system = SystemLibraryPolicy::default();
        let resolver = DependencyResolver::new(&graph, &system);

        let err = resolver.closure(&descriptor(Some("missing"))).unwrap_err();
        assert!(matches!(err, DeployError::ArtifactNotFound { .. }));
        assert!(resolver.module_artifact(&descriptor(Some("missing"))).is_err());
    }

    #[test]
    fn test_system_library_patterns() {
        let system = SystemLibraryPolicy::new(
            vec![PRIMARY_CORE.to_string()],
            &["org.slf4j:*".to_string(), "io.netty:netty-all".to_string()],
        );
        assert!(system.is_system_lib(&ArtifactCoordinate::new("org.slf4j", "slf4j-api", "2")));
        assert!(system.is_system_lib(&ArtifactCoordinate::new("io.netty", "netty-all", "4")));
        assert!(!system.is_system_lib(&ArtifactCoordinate::new("io.netty", "netty-buffer", "4")));
        assert!(system.is_system_lib(&ArtifactCoordinate::new("any", PRIMARY_CORE, "1")));
        assert_eq!(system.primary_core(), PRIMARY_CORE);
    }

    fn core(group: &str, artifact: &str, version: &str) -> ResolvedArtifact {
        ResolvedArtifact::new(ArtifactCoordinate::new(group, artifact, version), None)
    }

    #[test]
    fn test_core_merge_keeps_highest_version() {
        let system = SystemLibraryPolicy::new(
            vec![PRIMARY_CORE.to_string(), ALTERNATE_CORE.to_string()],
            &["org.slf4j:*".to_string()],
        );
        let mut set = CoreLibrarySet::new();
        set.merge(core("org.slf4j", "slf4j-api", "2.0.7"), &system);
        set.merge(core("org.slf4j", "slf4j-api", "2.0.9"), &system);
        set.merge(core("org.slf4j", "slf4j-api", "2.0.1"), &system);
        set.merge(core("rewin", PRIMARY_CORE, "2.1"), &system);
        set.merge(core("rewin", ALTERNATE_CORE, "2.0"), &system);

        let versions: Vec<_> = set
            .libraries()
            .iter()
            .map(|l| l.coordinate.to_string())
            .collect();
        assert_eq!(versions, vec!["org.slf4j:slf4j-api:2.0.9", "rewin:rewin.ubsi.core:2.1"]);
    }

    #[test]
    fn test_core_merge_prefers_primary_at_equal_version() {
        let system = SystemLibraryPolicy::default();

        let mut set = CoreLibrarySet::new();
        set.merge(core("rewin", ALTERNATE_CORE, "2.1"), &system);
        set.merge(core("rewin", PRIMARY_CORE, "2.1"), &system);
        assert_eq!(set.libraries()[0].coordinate.artifact_id, PRIMARY_CORE);

        let mut set = CoreLibrarySet::new();
        set.merge(core("rewin", PRIMARY_CORE, "2.1"), &system);
        set.merge(core("rewin", ALTERNATE_CORE, "2.1"), &system);
        set.merge(core("rewin", PRIMARY_CORE, "2.1"), &system);
        assert_eq!(set.len(), 1);
        assert_eq!(set.libraries()[0].coordinate.artifact_id, PRIMARY_CORE);

        set.merge(core("rewin", ALTERNATE_CORE, "2.2"), &system);
        assert_eq!(set.libraries()[0].coordinate.artifact_id, ALTERNATE_CORE);
    }

    #[test]
    fn test_locate_falls_back_to_local_repository() {
        let repo = TempDir::new().unwrap();
        let coordinate = ArtifactCoordinate::new("com.google.code.gson", "gson", "2.10");
        let jar = repository_path(repo.path(), &coordinate);
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        std::fs::write(&jar, b"jar").unwrap();

        let graph = graph();
        let system = SystemLibraryPolicy::default();
        let artifact = ResolvedArtifact::new(coordinate, None);

        let resolver = DependencyResolver::new(&graph, &system);
        assert!(matches!(resolver.locate(&artifact), Err(DeployError::FileMissing { .. })));

        let resolver = resolver.with_local_repository(Some(repo.path().to_path_buf()));
        assert_eq!(resolver.locate(&artifact).unwrap(), jar);
        assert!(jar.ends_with("com/google/code/gson/gson/2.10/gson-2.10.jar"));
    }
}
