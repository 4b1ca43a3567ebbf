//! HTTP service for matching names against a loaded backbone.
//!
//! The service keeps the candidate index behind an [`crate::catalog::handle::IndexHandle`].
//! A backbone change is signalled by `POST /api/reload`: the snapshot is read again, a new index
//! is built next to the old one and swapped in. Requests already running finish on the index
//! they started with.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8080
//! nub-matcher serve --backbone backbone.json
//!
//! # Bind to all interfaces with custom thresholds
//! nub-matcher serve --backbone backbone.tsv.gz --config matching.json --address 0.0.0.0
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness and whether an index is loaded
//! - `GET /api/match?name=...` - Match a name; optional `authorship`, `rank`, `kingdom` to `subgenus`
//! - `GET /api/usage/{key}` - A single backbone usage
//! - `GET /api/index` - Index statistics and active configuration
//! - `GET /api/similarity?a=...&b=...&metric=...` - Score two strings
//! - `POST /api/reload` - Rebuild the index from the backbone snapshot

pub mod server;
