//! Query parameter extractors.

use serde::Deserialize;

/// Query parameters for `POST /sessions/{id}/messages`.
#[derive(Debug, Deserialize, Default)]
pub struct MessageQuery {
    /// `false` returns the whole reply in one envelope instead of SSE.
    pub stream: Option<bool>,
}

impl MessageQuery {
    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }
}
