//! Child profiles.

use std::sync::Arc;

use crate::domain::{Child, ChildId, ChildProfile};
use crate::error::TrackerError;
use crate::store::Storage;

/// Create, read, update and delete children.
#[derive(Debug, Clone)]
pub struct ChildService {
    store: Arc<dyn Storage>,
}

impl ChildService {
    /// Creates a new `ChildService`.
    #[must_use]
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Validates and stores a new child.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] for an invalid profile or a
    /// storage error.
    pub async fn create(&self, profile: ChildProfile) -> Result<Child, TrackerError> {
        let child = Child::new(profile.validated()?);
        self.store.insert_child(&child).await?;
        tracing::info!(child_id = %child.id, name = %child.profile.name, "child created");
        Ok(child)
    }

    /// Lists children ordered by name, optionally keeping only names that
    /// contain `name` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list(&self, name: Option<&str>) -> Result<Vec<Child>, TrackerError> {
        let children = self.store.list_children().await?;
        Ok(match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(needle) => children
                .into_iter()
                .filter(|c| c.name_matches(needle))
                .collect(),
            None => children,
        })
    }

    /// Fetches one child.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] if the child does not exist.
    pub async fn get(&self, id: ChildId) -> Result<Child, TrackerError> {
        super::require_child(self.store.as_ref(), id).await
    }

    /// Replaces a child's profile.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] for an invalid profile or
    /// [`TrackerError::ChildNotFound`] if the child does not exist.
    pub async fn update(&self, id: ChildId, profile: ChildProfile) -> Result<Child, TrackerError> {
        let profile = profile.validated()?;
        let mut child = self.get(id).await?;
        child.profile = profile;
        if !self.store.update_child(&child).await? {
            return Err(TrackerError::ChildNotFound(id.into()));
        }
        tracing::info!(child_id = %id, "child updated");
        Ok(child)
    }

    /// Deletes a child with all of its records and events.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ChildNotFound`] if the child does not exist.
    pub async fn delete(&self, id: ChildId) -> Result<(), TrackerError> {
        if !self.store.delete_child(id).await? {
            return Err(TrackerError::ChildNotFound(id.into()));
        }
        tracing::info!(child_id = %id, "child deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn profile(name: &str) -> ChildProfile {
        ChildProfile {
            name: name.to_string(),
            birth_date: "2024-01-15".to_string(),
            sex: "girl".to_string(),
            photo: None,
        }
    }

    fn service() -> ChildService {
        ChildService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_then_get() {
        let svc = service();
        let Ok(created) = svc.create(profile("  Ema ")).await else {
            panic!("create failed");
        };
        assert_eq!(created.profile.name, "Ema");
        let Ok(fetched) = svc.get(created.id).await else {
            panic!("get failed");
        };
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_rejects_bad_birth_date() {
        let mut p = profile("Ema");
        p.birth_date = "2024-13-01".to_string();
        let Err(err) = service().create(p).await else {
            panic!("expected validation error");
        };
        assert_eq!(err.error_code(), 1001);
    }

    #[tokio::test]
    async fn list_filters_by_name_substring() {
        let svc = service();
        for name in ["Ema", "Emil", "Tomáš"] {
            let Ok(_) = svc.create(profile(name)).await else {
                panic!("create failed");
            };
        }
        let Ok(found) = svc.list(Some("em")).await else {
            panic!("list failed");
        };
        let names: Vec<&str> = found.iter().map(|c| c.profile.name.as_str()).collect();
        assert_eq!(names, vec!["Ema", "Emil"]);

        let Ok(all) = svc.list(Some("  ")).await else {
            panic!("list failed");
        };
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn update_and_delete_unknown_child_are_not_found() {
        let svc = service();
        let id = ChildId::new();
        assert!(matches!(
            svc.update(id, profile("Ema")).await,
            Err(TrackerError::ChildNotFound(_))
        ));
        assert!(matches!(
            svc.delete(id).await,
            Err(TrackerError::ChildNotFound(_))
        ));
    }
}
