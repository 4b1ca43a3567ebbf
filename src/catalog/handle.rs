use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::catalog::snapshot::BackboneSource;
use crate::catalog::store::{CandidateIndex, CatalogError};
use crate::matching::engine::MatchError;

/// Shared reference to the current candidate index.
///
/// Readers clone the inner `Arc` and keep matching against that snapshot; publishing a new
/// index only swaps the pointer. The lock is never held while building or matching.
#[derive(Debug, Clone, Default)]
pub struct IndexHandle {
    current: Arc<RwLock<Option<Arc<CandidateIndex>>>>,
}

impl IndexHandle {
    /// A handle without an index; `current` fails until the first `publish`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_index(index: CandidateIndex) -> Self {
        let handle = Self::new();
        handle.publish(index);
        handle
    }

    /// The index snapshot to match against.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::IndexUnavailable` before an index was published.
    pub fn current(&self) -> Result<Arc<CandidateIndex>, MatchError> {
        self.current
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(MatchError::IndexUnavailable)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Replace the current index, returning the previous one
    pub fn publish(&self, index: CandidateIndex) -> Option<Arc<CandidateIndex>> {
        self.current.write().replace(Arc::new(index))
    }
}

/// Receives backbone change notifications
pub trait BackboneListener: Send + Sync {
    /// Rebuild the index and swap it in. Returns the number of usages now served.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the new backbone cannot be loaded; the old index stays current.
    fn backbone_changed(&self) -> Result<usize, CatalogError>;
}

/// Rebuilds the index of a handle from a backbone source
pub struct IndexReloader<S> {
    handle: IndexHandle,
    source: S,
}

impl<S: BackboneSource> IndexReloader<S> {
    pub fn new(handle: IndexHandle, source: S) -> Self {
        Self { handle, source }
    }

    pub fn handle(&self) -> &IndexHandle {
        &self.handle
    }
}

impl<S: BackboneSource> BackboneListener for IndexReloader<S> {
    fn backbone_changed(&self) -> Result<usize, CatalogError> {
        info!("Backbone changed, reloading from {}", self.source.describe());
        let index = CandidateIndex::build(self.source.load()?)?;
        let usages = index.len();
        let previous = self.handle.publish(index);
        info!(
            "Swapped candidate index: {} usages (previously {})",
            usages,
            previous.map_or(0, |p| p.len())
        );
        Ok(usages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Rank, TaxonomicStatus, UsageKey};
    use crate::core::usage::CandidateUsage;

    struct FixedSource(Vec<CandidateUsage>);

    impl BackboneSource for FixedSource {
        fn load(&self) -> Result<Vec<CandidateUsage>, CatalogError> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn usage(key: u64, name: &str) -> CandidateUsage {
        CandidateUsage::new(UsageKey(key), name, Rank::Species, TaxonomicStatus::Accepted)
    }

    #[test]
    fn test_unavailable_before_publish() {
        let handle = IndexHandle::new();
        assert!(!handle.is_loaded());
        assert!(matches!(handle.current(), Err(MatchError::IndexUnavailable)));
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let handle =
            IndexHandle::from_index(CandidateIndex::build(vec![usage(1, "Abies alba")]).unwrap());
        let pinned = handle.current().unwrap();

        let reloader = IndexReloader::new(
            handle.clone(),
            FixedSource(vec![usage(2, "Abies alba"), usage(3, "Pinus nigra")]),
        );
        assert_eq!(reloader.backbone_changed().unwrap(), 2);

        assert_eq!(pinned.len(), 1);
        assert_eq!(handle.current().unwrap().len(), 2);
        assert_eq!(reloader.handle().current().unwrap().len(), 2);
    }
}
