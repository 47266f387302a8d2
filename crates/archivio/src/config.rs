//! Persisted block configuration.
//!
//! One `BlockConfiguration` is stored per block instance as camelCase
//! attribute JSON by the editor. Every field has a default so older
//! persisted instances keep deserializing after new attributes are added;
//! unknown keys are ignored (third-party extensions store their own keys in
//! the same bag).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// Sort direction. Unrecognized request input normalizes to `Desc`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Editors have persisted both casings over time.
    #[serde(alias = "ASC")]
    Asc,
    #[default]
    #[serde(alias = "DESC")]
    Desc,
}

impl SortDirection {
    /// Parse request input case-insensitively ("ASC", "desc", ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Field a listing is ordered by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    #[default]
    Date,
    Title,
    Modified,
    Author,
    #[serde(rename = "ID")]
    Id,
    #[serde(rename = "menu_order")]
    MenuOrder,
}

impl OrderBy {
    /// Parse request input, restricted to the known field set.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "date" => Some(Self::Date),
            "title" => Some(Self::Title),
            "modified" => Some(Self::Modified),
            "author" => Some(Self::Author),
            "id" => Some(Self::Id),
            "menu_order" => Some(Self::MenuOrder),
            _ => None,
        }
    }
}

/// How sticky posts participate in the listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StickyPolicy {
    /// Default platform behavior: stickies float to the front.
    #[default]
    Include,
    /// Stickies are removed from the listing entirely.
    Exclude,
    /// The listing contains only the sticky posts.
    Only,
}

/// Filter control rendered for a taxonomy's terms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Checkbox,
    Radio,
    Dropdown,
}

/// Persisted configuration of one archive block instance.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockConfiguration {
    /// Stable identifier, unique per rendered occurrence on a page. All
    /// request parameters are namespaced by it; an empty id still works but
    /// collides when a page renders more than one instance.
    pub instance_id: String,

    /// Post type to list. Validated at render time against the registry and
    /// replaced with "post" when unknown.
    pub post_type: String,

    /// Items per page; the site default applies when unset.
    pub per_page: Option<u32>,

    pub order: SortDirection,

    pub order_by: OrderBy,

    pub sticky: StickyPolicy,

    /// Whether pagination UI is rendered at all.
    pub show_pagination: bool,

    /// Load-more pagination instead of numbered pages.
    pub infinite_scroll: bool,

    /// Whether the block exposes its own free-text search field.
    pub show_search: bool,

    /// Taxonomies to expose as filters, in display order.
    pub taxonomies: Vec<String>,

    /// Filter control per taxonomy, for top-level terms.
    pub filter_types: HashMap<String, FilterKind>,

    /// Filter control per taxonomy for child terms; falls back to the
    /// top-level control when unset.
    pub child_filter_types: HashMap<String, FilterKind>,

    /// Whether child terms are displayed beneath their parent.
    pub hierarchical_filter: HashMap<String, bool>,

    /// Allow-list restricting which terms are ever eligible per taxonomy.
    /// Empty means unrestricted.
    pub forced_terms: HashMap<String, Vec<u64>>,

    /// Show content from all languages instead of the current one.
    pub all_languages: bool,

    /// Inherit post type, taxonomy scoping, author, search and date
    /// constraints from the surrounding template's own query.
    pub inherit: bool,
}

impl BlockConfiguration {
    /// Deserialize from persisted attribute JSON.
    pub fn from_attributes(value: serde_json::Value) -> Result<Self, ArchiveError> {
        serde_json::from_value(value).map_err(ArchiveError::InvalidConfiguration)
    }

    /// Filter control for a taxonomy's top-level terms.
    pub fn filter_kind(&self, taxonomy: &str) -> FilterKind {
        self.filter_types.get(taxonomy).copied().unwrap_or_default()
    }

    /// Filter control for a taxonomy's child terms.
    pub fn child_filter_kind(&self, taxonomy: &str) -> FilterKind {
        self.child_filter_types
            .get(taxonomy)
            .copied()
            .unwrap_or_else(|| self.filter_kind(taxonomy))
    }

    /// Whether hierarchical display is enabled for a taxonomy.
    pub fn hierarchical(&self, taxonomy: &str) -> bool {
        self.hierarchical_filter
            .get(taxonomy)
            .copied()
            .unwrap_or(false)
    }

    /// Forced-term allow-list for a taxonomy; empty means unrestricted.
    pub fn forced(&self, taxonomy: &str) -> &[u64] {
        self.forced_terms
            .get(taxonomy)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
