pub mod builder;
pub mod diagram;
pub mod error;
pub mod extract;
pub mod graph;
pub mod matching;
pub mod model;
pub mod prune;
pub mod registry;
pub mod tokenize;

pub use builder::{Resolution, ResolveOptions, Unexplained, resolve, resolve_capture};
pub use diagram::{
    DiagramFormat, generate_dot_diagram, generate_drawio_diagram, generate_json_report,
    generate_text_report, render_diagram, save_diagram,
};
pub use error::ResolveError;
pub use extract::{PathEdge, PathVertex, ProvenancePath};
pub use graph::ProvenanceGraph;
pub use model::{Edge, Exchange, ROOT};
pub use registry::{Registry, RegistryOptions, build_registry, find_target, media_exchanges};
pub use tokenize::tokenize_url;
