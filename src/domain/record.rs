//! Observation records kept per child: growth, milestones, words, teeth
//! and food introduction.
//!
//! Every kind implements [`Record`], which is all the generic repository
//! in [`crate::service::RecordService`] needs to store, filter, patch and
//! upsert it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::clock;
use super::{ChildId, EntryId};
use crate::error::TrackerError;

/// Discriminator for the stored record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Weight, height and size measurements.
    Growth,
    /// Developmental milestone reached.
    Milestone,
    /// Word the child started saying.
    Word,
    /// Tooth eruption date.
    Tooth,
    /// First introduction of a food.
    Food,
}

impl RecordKind {
    /// Stable storage name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Growth => "growth",
            Self::Milestone => "milestone",
            Self::Word => "word",
            Self::Tooth => "tooth",
            Self::Food => "food",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional filters accepted by record list endpoints.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    /// Only records on this exact date (`YYYY-MM-DD`).
    #[serde(default)]
    pub date: Option<String>,
    /// Only food records in this category.
    #[serde(default)]
    pub category: Option<String>,
}

/// Behaviour shared by every observation record kind.
pub trait Record:
    Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + fmt::Debug + 'static
{
    /// Storage discriminator.
    const KIND: RecordKind;

    /// Partial update payload.
    type Patch: DeserializeOwned + Send + fmt::Debug;

    /// Calendar date the observation refers to.
    fn date(&self) -> &str;

    /// Checks field constraints and returns the record in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidRequest`] on any violated constraint.
    fn validated(self) -> Result<Self, TrackerError>;

    /// Overwrites the fields present in `patch`.
    fn apply(&mut self, patch: Self::Patch);

    /// Natural key for kinds that keep one record per key and child.
    ///
    /// When `Some`, creating a record whose key already exists replaces the
    /// existing record instead of adding a duplicate.
    fn upsert_key(&self) -> Option<&str> {
        None
    }

    /// Returns `true` when the record passes the list filters.
    fn matches(&self, query: &RecordQuery) -> bool {
        query.date.as_deref().is_none_or(|d| d == self.date())
    }
}

/// A record together with its storage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<R> {
    /// Entry identifier.
    pub id: EntryId,
    /// Owning child.
    pub child_id: ChildId,
    /// Record fields.
    #[serde(flatten)]
    pub record: R,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl<R: Record> Stored<R> {
    /// Wraps a validated record under a fresh identifier.
    #[must_use]
    pub fn new(child_id: ChildId, record: R) -> Self {
        Self {
            id: EntryId::new(),
            child_id,
            record,
            created_at: Utc::now(),
        }
    }
}

fn trimmed_non_empty(value: String, field: &str) -> Result<String, TrackerError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(TrackerError::invalid(format!("{field} must not be empty")));
    }
    Ok(value)
}

fn positive(value: Option<f64>, field: &str) -> Result<(), TrackerError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => Err(TrackerError::invalid(format!(
            "{field} must be a positive number"
        ))),
        _ => Ok(()),
    }
}

// ── Growth ──────────────────────────────────────────────────────────────

/// Weight/height measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Growth {
    /// Measurement date.
    pub date: String,
    /// Weight in kilograms.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Height in centimetres.
    #[serde(default)]
    pub height: Option<f64>,
    /// Head circumference in centimetres.
    #[serde(default)]
    pub head: Option<f64>,
    /// Shoe size label.
    #[serde(default)]
    pub foot: Option<String>,
    /// Clothes size label.
    #[serde(default)]
    pub clothes: Option<String>,
}

/// Partial update for [`Growth`].
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GrowthPatch {
    /// New date.
    pub date: Option<String>,
    /// New weight.
    pub weight: Option<f64>,
    /// New height.
    pub height: Option<f64>,
    /// New head circumference.
    pub head: Option<f64>,
    /// New shoe size.
    pub foot: Option<String>,
    /// New clothes size.
    pub clothes: Option<String>,
}

impl Record for Growth {
    const KIND: RecordKind = RecordKind::Growth;
    type Patch = GrowthPatch;

    fn date(&self) -> &str {
        &self.date
    }

    fn validated(mut self) -> Result<Self, TrackerError> {
        self.date = clock::validate_date(&self.date)?;
        positive(self.weight, "weight")?;
        positive(self.height, "height")?;
        positive(self.head, "head")?;
        let empty = self.weight.is_none()
            && self.height.is_none()
            && self.head.is_none()
            && self.foot.as_deref().is_none_or(|s| s.trim().is_empty())
            && self.clothes.as_deref().is_none_or(|s| s.trim().is_empty());
        if empty {
            return Err(TrackerError::invalid(
                "growth record needs at least one measurement",
            ));
        }
        Ok(self)
    }

    fn apply(&mut self, patch: GrowthPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if patch.weight.is_some() {
            self.weight = patch.weight;
        }
        if patch.height.is_some() {
            self.height = patch.height;
        }
        if patch.head.is_some() {
            self.head = patch.head;
        }
        if patch.foot.is_some() {
            self.foot = patch.foot;
        }
        if patch.clothes.is_some() {
            self.clothes = patch.clothes;
        }
    }
}

// ── Milestone ───────────────────────────────────────────────────────────

/// Developmental milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Milestone {
    /// Catalogue identifier of the milestone on the client.
    #[serde(alias = "milId")]
    pub milestone_id: String,
    /// Milestone name.
    pub name: String,
    /// Date reached.
    pub date: String,
    /// Optional parent note.
    #[serde(default)]
    pub note: Option<String>,
}

/// Partial update for [`Milestone`].
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MilestonePatch {
    /// New name.
    pub name: Option<String>,
    /// New date.
    pub date: Option<String>,
    /// New note.
    pub note: Option<String>,
}

impl Record for Milestone {
    const KIND: RecordKind = RecordKind::Milestone;
    type Patch = MilestonePatch;

    fn date(&self) -> &str {
        &self.date
    }

    fn validated(mut self) -> Result<Self, TrackerError> {
        self.milestone_id = trimmed_non_empty(self.milestone_id, "milestone_id")?;
        self.name = trimmed_non_empty(self.name, "name")?;
        self.date = clock::validate_date(&self.date)?;
        Ok(self)
    }

    fn apply(&mut self, patch: MilestonePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if patch.note.is_some() {
            self.note = patch.note;
        }
    }
}

// ── Word ────────────────────────────────────────────────────────────────

/// A word from the child's vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Word {
    /// The word itself.
    pub name: String,
    /// Date first said.
    pub date: String,
    /// Optional note (pronunciation, context).
    #[serde(default)]
    pub note: Option<String>,
}

/// Partial update for [`Word`].
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WordPatch {
    /// New date.
    pub date: Option<String>,
    /// New note.
    pub note: Option<String>,
}

impl Record for Word {
    const KIND: RecordKind = RecordKind::Word;
    type Patch = WordPatch;

    fn date(&self) -> &str {
        &self.date
    }

    fn validated(mut self) -> Result<Self, TrackerError> {
        self.name = trimmed_non_empty(self.name, "name")?;
        self.date = clock::validate_date(&self.date)?;
        Ok(self)
    }

    fn apply(&mut self, patch: WordPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if patch.note.is_some() {
            self.note = patch.note;
        }
    }
}

// ── Tooth ───────────────────────────────────────────────────────────────

/// Eruption of one tooth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Tooth {
    /// Tooth position label (e.g. `"U1"`).
    pub tooth_id: String,
    /// Eruption date.
    pub date: String,
}

/// Partial update for [`Tooth`].
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ToothPatch {
    /// New eruption date.
    pub date: Option<String>,
}

impl Record for Tooth {
    const KIND: RecordKind = RecordKind::Tooth;
    type Patch = ToothPatch;

    fn date(&self) -> &str {
        &self.date
    }

    fn validated(mut self) -> Result<Self, TrackerError> {
        self.tooth_id = trimmed_non_empty(self.tooth_id, "tooth_id")?;
        self.date = clock::validate_date(&self.date)?;
        Ok(self)
    }

    fn apply(&mut self, patch: ToothPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
    }

    fn upsert_key(&self) -> Option<&str> {
        Some(&self.tooth_id)
    }
}

// ── Food ────────────────────────────────────────────────────────────────

/// Food group used to organise introductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    /// Cereals and grains.
    Cereal,
    /// Fruit.
    Fruit,
    /// Vegetables.
    Vegetable,
    /// Meat and fish.
    Meat,
    /// Legumes.
    Legume,
    /// Herbs and spices.
    Herbs,
    /// Anything else.
    Other,
}

impl FoodCategory {
    /// Wire name of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cereal => "cereal",
            Self::Fruit => "fruit",
            Self::Vegetable => "vegetable",
            Self::Meat => "meat",
            Self::Legume => "legume",
            Self::Herbs => "herbs",
            Self::Other => "other",
        }
    }
}

/// First introduction of a food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Food {
    /// Food group.
    pub category: FoodCategory,
    /// Food name, unique per child.
    #[serde(alias = "label")]
    pub food_name: String,
    /// Introduction date.
    pub date: String,
}

/// Partial update for [`Food`].
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FoodPatch {
    /// New name.
    pub food_name: Option<String>,
    /// New date.
    pub date: Option<String>,
    /// New category.
    pub category: Option<FoodCategory>,
}

impl Record for Food {
    const KIND: RecordKind = RecordKind::Food;
    type Patch = FoodPatch;

    fn date(&self) -> &str {
        &self.date
    }

    fn validated(mut self) -> Result<Self, TrackerError> {
        self.food_name = trimmed_non_empty(self.food_name, "food_name")?;
        self.date = clock::validate_date(&self.date)?;
        Ok(self)
    }

    fn apply(&mut self, patch: FoodPatch) {
        if let Some(food_name) = patch.food_name {
            self.food_name = food_name;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
    }

    fn upsert_key(&self) -> Option<&str> {
        Some(&self.food_name)
    }

    fn matches(&self, query: &RecordQuery) -> bool {
        query.date.as_deref().is_none_or(|d| d == self.date)
            && query
                .category
                .as_deref()
                .is_none_or(|c| c == self.category.as_str())
    }
}
