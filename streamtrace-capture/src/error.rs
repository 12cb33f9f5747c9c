use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HAR parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Unsupported compression method {0} in archive")]
    UnsupportedCompression(u16),

    #[error("Archive has no '{0}' document")]
    MissingDocument(String),

    #[error("Invalid base64 body: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
