use crate::core::client::ContainerClient;
use crate::core::layout::{RunLayout, SYS_PATH};
use crate::core::resolver::DependencyResolver;
use crate::core::startup::{OutputMonitor, StartupContext};
use crate::domain::model::{DeploymentTarget, ModuleDescriptor};
use crate::domain::ports::{ControlChannel, DependencyGraph, SystemLibraries};
use crate::utils::error::{DeployError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

pub const DEFAULT_PROGRAM: &str = "java";
pub const DEFAULT_MAIN_CLASS: &str = "rewin.ubsi.container.Bootstrap";

/// Time allowed for the output reader to drain after the process exits.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ContainerCommand {
    /// `java -cp <classpath> [-Dubsi.port=N] <main_class>`
    pub fn java(program: &str, classpath: &str, main_class: &str, port: Option<u16>) -> Self {
        let mut args = vec!["-cp".to_string(), classpath.to_string()];
        if let Some(port) = port {
            args.push(format!("-Dubsi.port={}", port));
        }
        args.push(main_class.to_string());
        Self {
            program: program.to_string(),
            args,
        }
    }

    pub fn to_command(&self, dir: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl std::fmt::Display for ContainerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

/// Forwards every line of `reader` until EOF or until the receiver is gone.
/// Bytes that are not UTF-8 are replaced, not rejected.
pub async fn pump_lines<R: AsyncRead + Unpin>(
    reader: R,
    lines: mpsc::UnboundedSender<String>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        if lines.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
            return Ok(());
        }
    }
}

async fn forward_output<R: AsyncRead + Unpin>(
    stream: &'static str,
    reader: R,
    lines: mpsc::UnboundedSender<String>,
) {
    if let Err(e) = pump_lines(reader, lines).await {
        tracing::warn!("container {} closed: {}", stream, e);
    }
}

/// Resolves on Ctrl-C, and on SIGTERM or SIGHUP where those exist.
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate())?;
        let mut hangup = signal(SignalKind::hangup())?;
        tokio::select! {
            interrupted = tokio::signal::ctrl_c() => interrupted,
            _ = terminate.recv() => Ok(()),
            _ = hangup.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Runs the container to completion, feeding its merged output to `monitor`.
/// Always ends in an error: the container is not expected to exit.
pub async fn supervise<C, F>(
    command: &ContainerCommand,
    dir: &Path,
    monitor: OutputMonitor<F>,
    context: &StartupContext,
) -> DeployError
where
    C: ControlChannel + 'static,
    F: Fn(DeploymentTarget) -> Result<ContainerClient<C>> + Send + Sync + 'static,
{
    supervise_until(command, dir, monitor, context, shutdown_signal()).await
}

/// [`supervise`] with an explicit trigger that kills the container.
pub async fn supervise_until<C, F, T>(
    command: &ContainerCommand,
    dir: &Path,
    monitor: OutputMonitor<F>,
    context: &StartupContext,
    shutdown: T,
) -> DeployError
where
    C: ControlChannel + 'static,
    F: Fn(DeploymentTarget) -> Result<ContainerClient<C>> + Send + Sync + 'static,
    T: Future<Output = std::io::Result<()>>,
{
    tracing::info!("🚀 {}", command);
    let mut child = match command.to_command(dir).spawn() {
        Ok(child) => child,
        Err(e) => {
            return DeployError::Process {
                message: format!("{}: {}", command.program, e),
            }
        }
    };
    let started_at = chrono::Local::now();

    let (tx, rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_output("stdout", stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_output("stderr", stderr, tx.clone()));
    }
    drop(tx);
    let reader = tokio::spawn(monitor.run(rx));

    let exit: Option<std::io::Result<ExitStatus>> = tokio::select! {
        status = child.wait() => Some(status),
        Ok(()) = shutdown => None,
    };
    let status = match exit {
        Some(status) => status,
        None => {
            tracing::info!("interrupted, stopping container ...");
            if let Err(e) = child.start_kill() {
                tracing::warn!("kill container failed: {}", e);
            }
            child.wait().await
        }
    };

    if tokio::time::timeout(DRAIN_TIMEOUT, reader).await.is_err() {
        tracing::warn!("container output still open after exit");
    }

    let uptime = chrono::Local::now() - started_at;
    if context.is_started() {
        tracing::info!("container stopped after {}s", uptime.num_seconds());
    } else {
        tracing::error!("container not started ({}s)", uptime.num_seconds());
    }

    match status {
        Ok(status) => DeployError::ContainerExited {
            status: status.to_string(),
        },
        Err(e) => DeployError::Process {
            message: e.to_string(),
        },
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dir: PathBuf,
    pub port: Option<u16>,
    pub program: String,
    pub main_class: String,
    pub config_files: Vec<PathBuf>,
    pub startup_pattern: String,
}

impl RunOptions {
    pub fn classpath(&self) -> String {
        format!("{}/*", SYS_PATH)
    }

    pub fn command(&self) -> ContainerCommand {
        ContainerCommand::java(&self.program, &self.classpath(), &self.main_class, self.port)
    }
}

pub async fn run_locally<C, F, G, S>(
    resolver: &DependencyResolver<'_, G, S>,
    descriptors: &[ModuleDescriptor],
    options: &RunOptions,
    connect: F,
) -> Result<()>
where
    C: ControlChannel + 'static,
    F: Fn(DeploymentTarget) -> Result<ContainerClient<C>> + Send + Sync + 'static,
    G: DependencyGraph + ?Sized,
    S: SystemLibraries + ?Sized,
{
    let layout = RunLayout::build(resolver, descriptors, &options.dir, &options.config_files)?;
    let context = StartupContext::new(layout.pending);
    let monitor = OutputMonitor::new(&options.startup_pattern, context.clone(), connect)?;

    Err(supervise(&options.command(), &layout.root, monitor, &context).await)
}
