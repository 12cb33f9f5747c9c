use serde::Serialize;
use std::collections::BTreeSet;

/// Position of the initial page navigation in every registry
pub const ROOT: usize = 0;

/// One resolvable request/response pair. Immutable once registered.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub index: usize,
    pub url: String,
    pub body: Vec<u8>,
    pub tokens: BTreeSet<String>,
    pub request_signals: BTreeSet<String>,
    pub response_signals: BTreeSet<String>,
}

impl Exchange {
    /// Everything a source must supply to explain this exchange
    pub fn needed(&self) -> BTreeSet<String> {
        self.tokens
            .union(&self.request_signals)
            .cloned()
            .collect()
    }
}

/// Evidence carried by a dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub provides: BTreeSet<String>,
    /// The source body contains the dependent URL verbatim
    pub direct: bool,
}

impl Edge {
    pub fn new(provides: BTreeSet<String>) -> Self {
        Self {
            provides,
            direct: false,
        }
    }

    pub fn direct(provides: BTreeSet<String>) -> Self {
        Self {
            provides,
            direct: true,
        }
    }

    /// Human-readable summary, empty for direct references
    pub fn label(&self) -> String {
        if self.direct {
            String::new()
        } else {
            self.provides
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}
