use crate::core::client::{ContainerClient, STATUS_RUNNING};
use crate::domain::model::DeploymentTarget;
use crate::domain::ports::ControlChannel;
use crate::utils::error::{DeployError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Line the container logs once it accepts control calls.
pub const STARTUP_PATTERN: &str =
    r"^\[INFO\].*rewin\.ubsi\.container\.Bootstrap#start\(\)#[0-9]*.*startup.*$";

/// Port announced in a startup line: the decimal run right after the first `#`.
///
/// This is the first `#` of the whole line, which is not necessarily the
/// `#` group that follows the startup function name.
pub fn parse_port(line: &str) -> Result<u16> {
    let digits: String = line
        .split_once('#')
        .map(|(_, rest)| rest.chars().take_while(char::is_ascii_digit).collect())
        .unwrap_or_default();
    digits.parse().map_err(|_| DeployError::PortParse {
        line: line.to_string(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct StartupContext {
    started: Arc<AtomicBool>,
    pending: Arc<BTreeMap<String, String>>,
}

impl StartupContext {
    /// `pending` maps module key to the configuration to push once started.
    pub fn new(pending: BTreeMap<String, String>) -> Self {
        Self {
            started: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(pending),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Sets the flag; true only for the first caller.
    fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    pub fn pending(&self) -> &BTreeMap<String, String> {
        &self.pending
    }
}

/// Watches container output for the startup line and then configures and
/// starts the modules whose startup was deferred.
pub struct OutputMonitor<F> {
    pattern: Regex,
    context: StartupContext,
    connect: F,
    echo: bool,
}

impl<C, F> OutputMonitor<F>
where
    C: ControlChannel,
    F: Fn(DeploymentTarget) -> Result<ContainerClient<C>> + Send + Sync,
{
    pub fn new(pattern: &str, context: StartupContext, connect: F) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| DeployError::Config {
            message: format!("invalid startup pattern: {}", e),
        })?;
        Ok(Self {
            pattern,
            context,
            connect,
            echo: true,
        })
    }

    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn is_startup_line(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    pub async fn run(self, mut lines: mpsc::UnboundedReceiver<String>) {
        while let Some(line) = lines.recv().await {
            if self.echo {
                println!("{}", line);
            }
            if self.context.is_started() || !self.is_startup_line(&line) {
                continue;
            }
            if !self.context.mark_started() {
                continue;
            }
            if let Err(e) = self.on_startup(&line).await {
                tracing::error!("❌ {}", e);
            }
        }
    }

    /// Pushes deferred configuration; returns the port used, if any.
    pub async fn on_startup(&self, line: &str) -> Result<Option<u16>> {
        let pending = self.context.pending();
        if pending.is_empty() {
            return Ok(None);
        }

        let port = parse_port(line)?;
        let keys: Vec<_> = pending.keys().map(String::as_str).collect();
        tracing::info!("container started, waiting for {:?} to config", keys);

        let client = (self.connect)(DeploymentTarget::local(port))?;
        for (key, config) in pending.iter() {
            client.set_config(key, config).await?;
            if !client.set_status(key, STATUS_RUNNING).await? {
                tracing::warn!("start \"{}\" failure!", key);
            }
        }

        tracing::info!("✅ {:?} config and start over", keys);
        Ok(Some(port))
    }
}
