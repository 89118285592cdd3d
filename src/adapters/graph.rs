use crate::domain::model::DependencyNode;
use crate::domain::ports::DependencyGraph;
use crate::utils::error::{DeployError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct TreeFile {
    root: DependencyNode,
}

/// Dependency tree exported by the build to a TOML file:
///
/// ```toml
/// [root]
/// group_id = "com.example"
/// artifact_id = "demo"
/// version = "1.0.0"
///
/// [[root.children]]
/// group_id = "com.google.code.gson"
/// artifact_id = "gson"
/// version = "2.10.1"
/// file = "/home/me/.m2/repository/com/google/code/gson/gson/2.10.1/gson-2.10.1.jar"
/// ```
///
/// Relative `file` entries are resolved against the tree file's directory.
#[derive(Debug, Clone)]
pub struct TreeFileGraph {
    root: DependencyNode,
}

impl TreeFileGraph {
    pub fn new(root: DependencyNode) -> Self {
        Self { root }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut graph = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            absolutize(&mut graph.root, base);
        }
        Ok(graph)
    }

    /// Replaces the root's file, used for the freshly built project artifact.
    pub fn with_project_file(mut self, file: Option<PathBuf>) -> Self {
        if file.is_some() {
            self.root.file = file;
        }
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let tree: TreeFile = toml::from_str(content).map_err(|e| DeployError::Config {
            message: format!("dependency tree parsing error: {}", e),
        })?;
        Ok(Self::new(tree.root))
    }
}

fn absolutize(node: &mut DependencyNode, base: &Path) {
    if let Some(file) = node.file.as_mut() {
        if file.is_relative() {
            *file = base.join(&*file);
        }
    }
    for child in &mut node.children {
        absolutize(child, base);
    }
}

impl DependencyGraph for TreeFileGraph {
    fn root(&self) -> &DependencyNode {
        &self.root
    }
}
