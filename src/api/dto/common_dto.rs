//! Shared query parameters.

use serde::Deserialize;
use utoipa::IntoParams;

/// `?name=` filter on the child list.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChildSearch {
    /// Case-insensitive substring of the child's name.
    #[serde(default)]
    pub name: Option<String>,
}

/// `?date=` filter on event lists.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateFilter {
    /// Only events on this date (`YYYY-MM-DD`).
    #[serde(default)]
    pub date: Option<String>,
}
