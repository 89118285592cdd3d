pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};
pub use config::DeployConfig;

pub use crate::core::{ContainerClient, Deployer, DependencyResolver};
pub use utils::error::{DeployError, Result};
