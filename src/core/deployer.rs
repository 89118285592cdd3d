use crate::core::chunk::CHUNK_SIZE;
use crate::core::client::{ContainerClient, STATUS_RUNNING};
use crate::core::resolver::DependencyResolver;
use crate::core::resources::sync_resources;
use crate::core::transfer::ArtifactInstaller;
use crate::domain::model::ModuleDescriptor;
use crate::domain::ports::{ControlChannel, DependencyGraph, SystemLibraries};
use crate::utils::error::{DeployError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOutcome {
    Running,
    /// Installed, but the container refused to start it.
    InstalledStopped,
}

#[derive(Debug, Default)]
pub struct DeploySummary {
    pub deployed: Vec<(String, ModuleOutcome)>,
    pub failed: Vec<(String, DeployError)>,
}

impl DeploySummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Deployer<'a, C, G, S>
where
    C: ControlChannel,
    G: DependencyGraph + ?Sized,
    S: SystemLibraries + ?Sized,
{
    client: ContainerClient<C>,
    resolver: DependencyResolver<'a, G, S>,
    chunk_size: usize,
}

impl<'a, C, G, S> Deployer<'a, C, G, S>
where
    C: ControlChannel,
    G: DependencyGraph + ?Sized,
    S: SystemLibraries + ?Sized,
{
    pub fn new(client: ContainerClient<C>, resolver: DependencyResolver<'a, G, S>) -> Self {
        Self {
            client,
            resolver,
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn client(&self) -> &ContainerClient<C> {
        &self.client
    }

    /// Deploys every module in order. A failing module is recorded and skipped.
    pub async fn deploy_all(&self, descriptors: &[ModuleDescriptor]) -> DeploySummary {
        let mut summary = DeploySummary::default();
        for descriptor in descriptors {
            tracing::info!(">>> deploy {} \"{}\" >>>", descriptor.kind(), descriptor.key());
            match self.deploy(descriptor).await {
                Ok(outcome) => summary.deployed.push((descriptor.key().to_string(), outcome)),
                Err(e) => {
                    tracing::error!("❌ deploy \"{}\" failed: {}", descriptor.key(), e);
                    summary.failed.push((descriptor.key().to_string(), e));
                }
            }
        }
        summary
    }

    pub async fn deploy(&self, descriptor: &ModuleDescriptor) -> Result<ModuleOutcome> {
        let key = descriptor.key();
        let module = self.resolver.module_artifact(descriptor)?;
        let owner = module.coordinate.clone();

        let runtime = self.client.get_runtime().await?;
        if runtime.collides_with(descriptor) {
            tracing::info!("\"{}\" found, uninstall ...", key);
            if self.client.uninstall(key).await? != 0 {
                return Err(DeployError::InUse { coordinate: owner });
            }
        }

        let installer = ArtifactInstaller::new(&self.client).with_chunk_size(self.chunk_size);
        let mut depends = Vec::new();
        for artifact in self.resolver.transfer_set(descriptor)? {
            let file = self.resolver.locate(&artifact)?;
            installer.install_artifact(&artifact.coordinate, &file, None).await?;
            depends.push(artifact.coordinate);
        }

        let file = self.resolver.locate(&module)?;
        installer
            .install_artifact(&owner, &file, Some(&depends))
            .await?;

        if let Some(path) = descriptor.resource_path() {
            sync_resources(&self.client, key, path, self.chunk_size).await?;
        }

        tracing::info!("register \"{}\" ...", key);
        if let Err(e) = self
            .client
            .install(descriptor.name(), descriptor.class_name(), &owner)
            .await
        {
            if let Err(rollback) = self.client.unregister(&owner).await {
                tracing::warn!("unregister {} after failed install also failed: {}", owner, rollback);
            }
            return Err(DeployError::install(key, e));
        }

        if let Some(config) = descriptor.config() {
            tracing::info!("set configuration ...");
            self.client.set_config(key, config).await?;
        }

        tracing::info!("start \"{}\" ...", key);
        if self.client.set_status(key, STATUS_RUNNING).await? {
            tracing::info!("✅ start \"{}\" ok, deploy over.", key);
            Ok(ModuleOutcome::Running)
        } else {
            tracing::warn!("start \"{}\" failure!", key);
            Ok(ModuleOutcome::InstalledStopped)
        }
    }
}
