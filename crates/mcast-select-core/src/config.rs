//! Session options for a selection controller.

use serde::{Deserialize, Serialize};

/// Default number of membership lookups polled at once.
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 10;

/// Default page size when listing devices of a source.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// How a "select all" selection is handed to the group mutation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStrategy {
    /// Send the source and the carve-outs; the server resolves "all except".
    #[default]
    ForwardComplement,
    /// Resolve the device list locally. Needs every page of the source loaded.
    Materialize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    pub lookup_concurrency: usize,
    pub page_size: usize,
    pub strategy: SubmitStrategy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
            strategy: SubmitStrategy::default(),
        }
    }
}
