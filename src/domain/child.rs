//! The tracked child and its editable profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ChildId;
use super::clock;
use crate::error::TrackerError;

/// Editable child profile, used for both create and full update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChildProfile {
    /// Display name.
    pub name: String,
    /// Birth date, `YYYY-MM-DD`.
    #[serde(alias = "birthDate")]
    pub birth_date: String,
    /// Free-form sex label as chosen by the parent.
    pub sex: String,
    /// Optional photo URI or encoded image.
    #[serde(default)]
    pub photo: Option<String>,
}

impl ChildProfile {
    /// Validates the profile and returns it with a canonical birth date.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] for an empty name or a
    /// malformed birth date.
    pub fn validated(mut self) -> Result<Self, TrackerError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(TrackerError::invalid("name must not be empty"));
        }
        if self.name.chars().count() > 100 {
            return Err(TrackerError::invalid("name must be at most 100 characters"));
        }
        self.birth_date = clock::validate_date(&self.birth_date)?;
        self.sex = self.sex.trim().to_string();
        Ok(self)
    }
}

/// A stored child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Child {
    /// Child identifier.
    pub id: ChildId,
    /// Profile fields.
    #[serde(flatten)]
    pub profile: ChildProfile,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Child {
    /// Creates a child with a fresh identifier from a validated profile.
    #[must_use]
    pub fn new(profile: ChildProfile) -> Self {
        Self {
            id: ChildId::new(),
            profile,
            created_at: Utc::now(),
        }
    }

    /// Returns `true` when the name contains `needle`, ignoring case.
    #[must_use]
    pub fn name_matches(&self, needle: &str) -> bool {
        self.profile
            .name
            .to_lowercase()
            .contains(&needle.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, birth_date: &str) -> ChildProfile {
        ChildProfile {
            name: name.to_string(),
            birth_date: birth_date.to_string(),
            sex: "girl".to_string(),
            photo: None,
        }
    }

    #[test]
    fn validated_trims_name() {
        let p = profile("  Ema ", "2024-03-01").validated();
        assert_eq!(p.ok().map(|p| p.name), Some("Ema".to_string()));
    }

    #[test]
    fn validated_rejects_bad_input() {
        assert!(profile("   ", "2024-03-01").validated().is_err());
        assert!(profile("Ema", "1.3.2024").validated().is_err());
    }

    #[test]
    fn accepts_camel_case_birth_date() {
        let json = r#"{"name":"Ema","birthDate":"2024-03-01","sex":"girl"}"#;
        let parsed: Result<ChildProfile, _> = serde_json::from_str(json);
        assert_eq!(
            parsed.ok().map(|p| p.birth_date),
            Some("2024-03-01".to_string())
        );
    }

    #[test]
    fn name_search_is_case_insensitive() {
        let child = Child::new(profile("Ema Nováková", "2024-03-01"));
        assert!(child.name_matches("ema"));
        assert!(child.name_matches("NOVÁ"));
        assert!(!child.name_matches("jan"));
    }
}
