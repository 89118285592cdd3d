use crate::domain::model::{ArtifactCoordinate, DependencyNode, ResolvedArtifact};
use crate::utils::error::RemoteError;
use async_trait::async_trait;
use serde_json::Value;

/// The generic `call(method, args...)` primitive of the container control surface.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RemoteError>;
}

#[async_trait]
impl<C: ControlChannel + ?Sized> ControlChannel for std::sync::Arc<C> {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RemoteError> {
        (**self).call(method, args).await
    }
}

pub trait DependencyGraph: Send + Sync {
    /// Root of the tree: the project artifact itself.
    fn root(&self) -> &DependencyNode;

    fn project_artifacts(&self) -> Vec<ResolvedArtifact> {
        self.root().descendants()
    }

    fn project_artifact(&self) -> ResolvedArtifact {
        self.root().artifact()
    }
}

/// Decides which libraries the container runtime already ships.
pub trait SystemLibraries: Send + Sync {
    fn is_system_lib(&self, coordinate: &ArtifactCoordinate) -> bool;

    /// Whether `artifact_id` names one of the container core artifacts.
    fn is_core(&self, artifact_id: &str) -> bool;

    /// Preferred core artifact id when versions tie.
    fn primary_core(&self) -> &str;
}
