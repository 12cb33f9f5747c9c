// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    CaptureSource, LoadedCapture, expand_path, list_targets, load_capture, render_capture,
    resolve_options,
};

// Re-export resolution types from streamtrace-core
pub use streamtrace_core::{DiagramFormat, ResolveOptions, ResolveError};
