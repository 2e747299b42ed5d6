use std::path::PathBuf;

use thiserror::Error;

/// Fatal pipeline failures. None of these are retried.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("scanner exited with status {} on chunk {ordinal}: {command}", display_code(.code))]
    Process {
        ordinal: usize,
        command: String,
        code: Option<i32>,
    },

    #[error("result file for chunk {ordinal} is missing: {}", .path.display())]
    MissingResult { ordinal: usize, path: PathBuf },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
