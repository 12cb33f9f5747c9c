pub mod archive;
pub mod error;
pub mod har;

pub use archive::{Archive, BodySource};
pub use error::CaptureError;
pub use har::{BodyRef, CapturedExchange, Header, load_har, parse_har};
