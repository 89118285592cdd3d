use crate::domain::model::ArtifactCoordinate;
use thiserror::Error;

/// Failure reported by a control channel for a single remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("remote call `{method}` failed: {message}")]
pub struct RemoteError {
    pub method: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("artifact `{artifact}` not found in dependency tree for \"{class_name}\"")]
    ArtifactNotFound { artifact: String, class_name: String },

    #[error("{coordinate} jar-file not found")]
    FileMissing { coordinate: ArtifactCoordinate },

    #[error("{coordinate} jar-file still in use by other service/filter")]
    InUse { coordinate: ArtifactCoordinate },

    #[error("install of {subject} failed: {source}")]
    Install {
        subject: String,
        #[source]
        source: RemoteError,
    },

    #[error("invalid resource path \"{path}\"")]
    InvalidPath { path: String },

    #[error("invalid container port in startup line: {line}")]
    PortParse { line: String },

    #[error("start container error: {message}")]
    Process { message: String },

    #[error("container exited ({status})")]
    ContainerExited { status: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for `{field}` ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfig { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeployError {
    pub(crate) fn install(subject: impl Into<String>, source: RemoteError) -> Self {
        Self::Install {
            subject: subject.into(),
            source,
        }
    }

    /// Short operator-facing hint printed next to the error.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ArtifactNotFound { .. } => {
                "check the `artifact` setting against the exported dependency tree"
            }
            Self::FileMissing { .. } => "build the project or set `project.local_repository`",
            Self::InUse { .. } => "uninstall the modules that still reference this jar first",
            Self::Install { .. } | Self::Remote(_) => {
                "check that the container is reachable; re-running the deploy is safe"
            }
            Self::InvalidPath { .. } => "point `resource_path` at an existing directory",
            Self::PortParse { .. } => "configure and start the module manually",
            Self::Process { .. } => "check `run.program` and that it is on PATH",
            Self::ContainerExited { .. } => "inspect the container output above",
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                "fix the configuration file"
            }
            Self::Io(_) | Self::Serialization(_) => "check file permissions and disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
