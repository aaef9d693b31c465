use thiserror::Error;

/// Every failure that stops a build. None of them are retried.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{file} not found. please execute in directory containing spec, or pass the working directory in as the only argument")]
    SpecNotFound { file: String },

    #[error("Failed to hash {path}: {message}")]
    FileHash { path: String, message: String },

    #[error("Cache store error: {0}")]
    CacheIo(String),

    #[error("Failed to start shell '{shell}': {message}")]
    StepStart { shell: String, message: String },

    #[error("Step {step} failed{}", exit_status_suffix(.exit_code))]
    StepExecution { step: usize, exit_code: Option<i32> },

    #[error("Configuration error: {0}")]
    Config(String),
}

fn exit_status_suffix(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" (exit status: {})", code),
        None => String::new(),
    }
}

impl BuildError {
    pub(crate) fn cache_io(err: anyhow::Error) -> Self {
        BuildError::CacheIo(format!("{:#}", err))
    }

    /// Process exit code for this failure.
    ///
    /// A failed step propagates its child's exit code; everything else, and a
    /// child killed by a signal, maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::StepExecution {
                exit_code: Some(code),
                ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}
