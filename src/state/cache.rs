//! Client-side project cache
//!
//! A value-type mirror of the remote collection. It is only ever replaced
//! wholesale with a snapshot delivered by the gateway subscription.

use std::sync::Arc;
use tracing::debug;

use super::data::{Project, ProjectId};

/// The backend's view of a collection at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Strictly increasing across the gateway's lifetime
    pub revision: u64,
    pub projects: Arc<[Project]>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            revision: 0,
            projects: Vec::new().into(),
        }
    }
}

/// Fired whenever the cache takes a newer snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEvent {
    pub revision: u64,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectCache {
    current: Snapshot,
    loaded: bool,
}

impl ProjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached records.
    /// Snapshots older than the one already held are ignored.
    pub fn replace(&mut self, snapshot: Snapshot) -> Option<CacheEvent> {
        if self.loaded && snapshot.revision <= self.current.revision {
            debug!(
                "Ignoring stale snapshot r{} (holding r{})",
                snapshot.revision, self.current.revision
            );
            return None;
        }

        self.current = snapshot;
        self.loaded = true;

        Some(CacheEvent {
            revision: self.current.revision,
            count: self.current.projects.len(),
        })
    }

    pub fn projects(&self) -> &[Project] {
        &self.current.projects
    }

    pub fn get(&self, id: &ProjectId) -> Option<&Project> {
        self.current.projects.iter().find(|project| &project.id == id)
    }

    /// True once the first snapshot has arrived
    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[cfg(test)]
    pub fn revision(&self) -> u64 {
        self.current.revision
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.current.projects.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.current.projects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::{ProjectDocument, ProjectId};

    fn snapshot(revision: u64, names: &[&str]) -> Snapshot {
        let projects: Vec<Project> = names
            .iter()
            .map(|name| {
                let doc = ProjectDocument {
                    name: name.to_string(),
                    category: "wishlist".to_string(),
                    ..Default::default()
                };
                Project::from_document(ProjectId::from(name.to_string()), doc)
            })
            .collect();

        Snapshot {
            revision,
            projects: projects.into(),
        }
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut cache = ProjectCache::new();
        assert!(!cache.is_loaded());

        let event = cache.replace(snapshot(1, &["a", "b"])).unwrap();
        assert_eq!(event, CacheEvent { revision: 1, count: 2 });

        cache.replace(snapshot(2, &["b"])).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&ProjectId::from("a".to_string())).is_none());
        assert!(cache.get(&ProjectId::from("b".to_string())).is_some());
    }

    #[test]
    fn test_stale_snapshots_are_ignored() {
        let mut cache = ProjectCache::new();
        cache.replace(snapshot(5, &["a"])).unwrap();

        assert_eq!(cache.replace(snapshot(4, &[])), None);
        assert_eq!(cache.replace(snapshot(5, &[])), None);
        assert_eq!(cache.revision(), 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_first_snapshot_accepted_at_revision_zero() {
        let mut cache = ProjectCache::new();
        assert!(cache.replace(snapshot(0, &[])).is_some());
        assert!(cache.is_loaded());
        assert!(cache.is_empty());
    }
}
