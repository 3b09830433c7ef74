//! Domain-focused API endpoint modules.
//!
//! Each sub-module owns one area of the dashboard. Shared error handling
//! lives in `common`.

pub(crate) mod common;
pub mod doc;
mod evaluate;
mod health;
mod preferences;
mod rules;
mod taxonomy;

// ── Re-exports ───────────────────────────────────────────────────
// Flat `api::foo` paths for route registration and the OpenAPI aggregator.

pub use common::ErrorResponse;
pub use evaluate::*;
pub use health::*;
pub use preferences::*;
pub use rules::*;
pub use taxonomy::*;
