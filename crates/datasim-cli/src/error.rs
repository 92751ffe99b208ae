use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] datasim_core::ValidationError),

    #[error(transparent)]
    Config(#[from] datasim_core::ConfigError),

    #[error("command error: {0}")]
    Command(String),

    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("job {job_id} was terminated by the backend")]
    JobTerminated { job_id: String },

    #[error("interrupted; stopped polling job {job_id}")]
    Interrupted { job_id: String },

    #[error(transparent)]
    Submission(#[from] datasim_core::SubmissionError),

    #[error(transparent)]
    Catalog(#[from] datasim_core::CatalogError),

    #[error("{0}")]
    Stream(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 2,
            Self::Command(_) => 2,
            Self::JobFailed { .. } => 3,
            Self::JobTerminated { .. } => 3,
            Self::Serialization(_) => 4,
            Self::Submission(_) => 5,
            Self::Stream(_) => 6,
            Self::Catalog(_) => 7,
            Self::Io(_) => 10,
            Self::Interrupted { .. } => 130,
        }
    }
}
