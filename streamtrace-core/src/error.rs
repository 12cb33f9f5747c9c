use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Target not found: no media request in the capture")]
    TargetNotFound,

    #[error("Capture contains no exchanges")]
    EmptyCapture,

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Capture error: {0}")]
    CaptureError(#[from] streamtrace_capture::CaptureError),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
