//! Collaborator traits for the platform surfaces the engine builds against.
//!
//! The engine owns no data: taxonomies, terms, site options and the content
//! store itself live behind these traits. All of them are synchronous and
//! read-only; a render performs at most one `PostQuery::run` call.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::query::QueryArguments;

/// A registered taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    /// Machine name (e.g. "category").
    pub name: String,

    /// Human-readable label.
    pub label: String,

    /// Whether terms form a parent/child tree.
    pub hierarchical: bool,
}

/// A single term within a taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,

    pub slug: String,

    pub name: String,

    /// Parent term id; 0 for root terms.
    #[serde(default)]
    pub parent: u64,

    /// Number of published items carrying this term.
    #[serde(default)]
    pub count: u64,
}

impl Term {
    /// Whether this term sits below another term.
    pub fn is_child(&self) -> bool {
        self.parent != 0
    }
}

/// Read access to the taxonomy registry and term lists.
pub trait TermProvider: Send + Sync {
    /// Look up a registered taxonomy, or `None` when the name is unknown.
    fn taxonomy(&self, name: &str) -> Option<Taxonomy>;

    /// Full term list for a taxonomy.
    ///
    /// With `include_empty`, terms carrying no published items are returned
    /// as well. Term counts are per-language and become unreliable when a
    /// listing spans languages, so cross-language display always asks for
    /// the full list.
    fn terms(&self, taxonomy: &str, include_empty: bool) -> Result<Vec<Term>>;

    /// Parent id of a term, 0 when the term is a root or unknown.
    fn term_parent(&self, taxonomy: &str, term_id: u64) -> u64 {
        self.terms(taxonomy, true)
            .ok()
            .and_then(|terms| terms.into_iter().find(|t| t.id == term_id))
            .map(|t| t.parent)
            .unwrap_or(0)
    }
}

/// Site-level knowledge the engine reads but does not own.
pub trait SiteContext: Send + Sync {
    /// Whether a post type is registered.
    fn is_post_type(&self, name: &str) -> bool;

    /// Ids of sticky posts, in pinned order.
    fn sticky_posts(&self) -> Vec<u64>;

    /// Site-wide default listing size.
    fn default_per_page(&self) -> u32 {
        10
    }

    /// Id of the post currently being rendered, if any. A listing never
    /// includes the post it is embedded in.
    fn current_post(&self) -> Option<u64> {
        None
    }
}

/// Result of executing a content query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    /// Matched items, already shaped for the template layer.
    pub items: Vec<serde_json::Value>,

    /// Total matches before pagination.
    pub found: u64,
}

/// Executes assembled arguments against the content store.
pub trait PostQuery: Send + Sync {
    fn run(&self, args: &QueryArguments) -> Result<QueryResult>;
}
