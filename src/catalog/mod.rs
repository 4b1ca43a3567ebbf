//! Backbone candidate index, snapshots and hot swapping.
//!
//! The [`store::CandidateIndex`] maps normalized canonical names to backbone usages. It is built
//! once from a snapshot and never mutated; a changed backbone is loaded into a new index that
//! replaces the old one behind an [`handle::IndexHandle`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use nub_matcher::catalog::handle::IndexHandle;
//! use nub_matcher::catalog::snapshot::SnapshotFile;
//!
//! let snapshot = SnapshotFile::new("backbone.tsv.gz").unwrap();
//! let handle = IndexHandle::from_index(snapshot.load_index().unwrap());
//!
//! let index = handle.current().unwrap();
//! for usage in index.lookup("abies alba") {
//!     println!("{} {}", usage.key, usage.canonical_name);
//! }
//! ```

pub mod handle;
pub mod index;
pub mod snapshot;
pub mod store;
