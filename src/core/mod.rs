pub mod chunk;
pub mod client;
pub mod deployer;
pub mod layout;
pub mod resolver;
pub mod resources;
pub mod startup;
pub mod supervisor;
pub mod transfer;

pub use crate::domain::model::{ArtifactCoordinate, ModuleDescriptor};
pub use crate::domain::ports::{ControlChannel, DependencyGraph, SystemLibraries};
pub use crate::utils::error::Result;
pub use client::ContainerClient;
pub use deployer::{DeploySummary, Deployer, ModuleOutcome};
pub use resolver::{DependencyResolver, SystemLibraryPolicy};
pub use supervisor::{run_locally, RunOptions};
