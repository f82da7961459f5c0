//! Purpose: Define the public Rust API boundary for fetchtree.
//! Exports: Transfer, sink, tree, extraction, and error types.
//! Role: Stable surface used by the CLI and integration tests; hides internal modules.
//! Invariants: This module is the only public path to core primitives.
//! Invariants: Callers never see parser-specific error types directly.

use crate::json::parse;

pub use crate::core::accumulator::{
    ChunkPrinter, ResponseAccumulator, StreamSink, WriteSink,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind, TransferCode};
pub use crate::core::extract::{VehicleRecord, extract_vehicles};
pub use crate::core::transfer::{
    DEFAULT_READ_CHUNK_SIZE, DEFAULT_USER_AGENT, HttpTransfer, TransferOptions, TransferReport,
};
pub use crate::core::tree::{Children, Node};
pub use crate::json::parse::ParseFailureCategory;

pub type ApiResult<T> = Result<T, Error>;

/// Parse a fully assembled response body into a labelled tree.
pub fn parse_tree(input: &[u8]) -> ApiResult<Node> {
    parse::parse_tree(input)
}

/// Fetch `url` into memory, parse it, and extract vehicle records.
///
/// `limit` caps the number of body bytes held; exceeding it fails the
/// transfer with `TransferCode::WriteError`.
pub fn fetch_vehicles(
    transfer: &HttpTransfer,
    url: &str,
    limit: Option<usize>,
) -> ApiResult<Vec<VehicleRecord>> {
    let mut acc = ResponseAccumulator::new(url);
    if let Some(limit) = limit {
        acc = acc.with_limit(limit);
    }
    transfer.perform(url, &mut acc)?;
    let tree = parse_tree(acc.as_bytes()).map_err(|err| err.with_url(acc.token()))?;
    extract_vehicles(&tree).map_err(|err| err.with_url(acc.token()))
}
