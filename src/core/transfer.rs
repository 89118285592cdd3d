use crate::core::chunk::{FileChunks, CHUNK_SIZE};
use crate::core::client::ContainerClient;
use crate::domain::model::{ArtifactCoordinate, ArtifactState};
use crate::domain::ports::ControlChannel;
use crate::utils::error::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    AlreadyRegistered,
    Uploaded { chunks: usize, registered: bool },
}

/// Idempotent jar installation: `hasJar`, then a chunked upload and registration.
pub struct ArtifactInstaller<'a, C: ControlChannel> {
    client: &'a ContainerClient<C>,
    chunk_size: usize,
}

impl<'a, C: ControlChannel> ArtifactInstaller<'a, C> {
    pub fn new(client: &'a ContainerClient<C>) -> Self {
        Self {
            client,
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// `depends` of `None` registers the jar without a dependency list.
    pub async fn install_artifact(
        &self,
        coordinate: &ArtifactCoordinate,
        file: &Path,
        depends: Option<&[ArtifactCoordinate]>,
    ) -> Result<InstallOutcome> {
        let state = self.client.has_artifact(coordinate).await?;
        if state == ArtifactState::Registered {
            tracing::debug!("{} already registered", coordinate);
            return Ok(InstallOutcome::AlreadyRegistered);
        }

        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}-{}.jar", coordinate.artifact_id, coordinate.version));
        tracing::info!("install {} ...", file_name);

        // Always restarts at offset 0, even after a partial transfer.
        let mut chunks = 0;
        for chunk in FileChunks::open(file, self.chunk_size)? {
            let (offset, bytes) = chunk?;
            self.client.upload(&file_name, offset, bytes).await?;
            chunks += 1;
        }

        let registered = state == ArtifactState::Absent;
        if registered {
            self.client.register(coordinate, &file_name, depends).await?;
        }

        Ok(InstallOutcome::Uploaded { chunks, registered })
    }
}
