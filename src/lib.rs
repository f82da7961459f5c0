//! Purpose: Library crate behind the `fetchtree` CLI and its tests.
//! Exports: `api` (transfer, accumulation, tree, extraction, errors).
//! Role: Fetch a document over HTTP, collect it chunk by chunk, and read fields out of it.
//! Invariants: Everything is synchronous and single-threaded; no global state.
//! Invariants: `api` is the only public path; `core` and `json` stay private.
pub mod api;
mod core;
mod json;
