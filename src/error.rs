use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("SSH connection failed: {0}")]
    SshFailed(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("invalid {field}: {reason}")]
    InvalidParam { field: &'static str, reason: String },

    #[error("token verification failed: {0}")]
    TokenRejected(String),

    #[error("invalid branch name: {0}")]
    InvalidBranch(String),

    #[error("no Dockerfile or docker-compose.yml found in {0}")]
    ManifestMissing(String),

    #[error("unsupported distribution: {0}")]
    UnsupportedDistro(String),

    #[error("environment variable missing: {0}")]
    EnvMissing(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("'{0}' did not answer on its health endpoint after {1} attempts")]
    HealthcheckTimeout(String, u32),

    #[error("cancelled by user")]
    Cancelled,

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Prompt(#[from] dialoguer::Error),
}

impl DeployError {
    /// Process exit code for this error.
    ///
    /// Validation failures with a dedicated meaning get their own
    /// code; everything else is a generic failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 0,
            Self::TokenRejected(_) => 2,
            Self::InvalidBranch(_) => 3,
            Self::ManifestMissing(_) => 5,
            Self::SshFailed(_) => 6,
            _ => 1,
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            field,
            reason: reason.into(),
        }
    }
}
