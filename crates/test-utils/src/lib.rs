//! Archivio test utilities.
//!
//! In-memory collaborator implementations for integration testing: a site
//! context, a term provider and a recording content query, all with builder
//! helpers for fixtures.

use std::collections::HashMap;

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::Value;

use archivio::{
    PostQuery, QueryArguments, QueryResult, SiteContext, Taxonomy, Term, TermProvider,
};

/// Create a test term with default values.
pub fn term(id: u64, slug: &str, parent: u64, count: u64) -> Term {
    Term {
        id,
        slug: slug.to_string(),
        name: slug.to_string(),
        parent,
        count,
    }
}

/// Create a test post item.
pub fn post(id: u64, title: &str) -> Value {
    serde_json::json!({ "id": id, "title": title })
}

/// In-memory site context.
#[derive(Debug, Clone)]
pub struct MemorySite {
    post_types: Vec<String>,
    sticky: Vec<u64>,
    per_page: u32,
    current: Option<u64>,
}

impl Default for MemorySite {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySite {
    pub fn new() -> Self {
        Self {
            post_types: vec!["post".to_string(), "page".to_string()],
            sticky: Vec::new(),
            per_page: 10,
            current: None,
        }
    }

    /// Register an additional post type.
    pub fn with_post_type(mut self, name: &str) -> Self {
        self.post_types.push(name.to_string());
        self
    }

    /// Set the sticky post ids.
    pub fn with_sticky(mut self, ids: Vec<u64>) -> Self {
        self.sticky = ids;
        self
    }

    /// Set the site-wide default per-page count.
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Set the id of the post being rendered.
    pub fn with_current_post(mut self, id: u64) -> Self {
        self.current = Some(id);
        self
    }
}

impl SiteContext for MemorySite {
    fn is_post_type(&self, name: &str) -> bool {
        self.post_types.iter().any(|t| t == name)
    }

    fn sticky_posts(&self) -> Vec<u64> {
        self.sticky.clone()
    }

    fn default_per_page(&self) -> u32 {
        self.per_page
    }

    fn current_post(&self) -> Option<u64> {
        self.current
    }
}

/// In-memory taxonomy registry and term store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTerms {
    taxonomies: HashMap<String, Taxonomy>,
    terms: HashMap<String, Vec<Term>>,
}

impl MemoryTerms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a taxonomy.
    pub fn with_taxonomy(mut self, name: &str, label: &str, hierarchical: bool) -> Self {
        self.taxonomies.insert(
            name.to_string(),
            Taxonomy {
                name: name.to_string(),
                label: label.to_string(),
                hierarchical,
            },
        );
        self
    }

    /// Add a term to a taxonomy.
    pub fn with_term(mut self, taxonomy: &str, term: Term) -> Self {
        self.terms.entry(taxonomy.to_string()).or_default().push(term);
        self
    }
}

impl TermProvider for MemoryTerms {
    fn taxonomy(&self, name: &str) -> Option<Taxonomy> {
        self.taxonomies.get(name).cloned()
    }

    fn terms(&self, taxonomy: &str, include_empty: bool) -> Result<Vec<Term>> {
        let terms = self.terms.get(taxonomy).cloned().unwrap_or_default();
        Ok(terms
            .into_iter()
            .filter(|t| include_empty || t.count > 0)
            .collect())
    }
}

/// In-memory content query that records the arguments it ran with.
///
/// Pagination is applied to the fixed item list the way the real
/// collaborator would: `paged`/`posts_per_page` slice the items, `found`
/// reports the pre-pagination total.
#[derive(Default)]
pub struct MemoryPosts {
    items: Vec<Value>,
    recorded: Mutex<Option<QueryArguments>>,
}

impl MemoryPosts {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items,
            recorded: Mutex::new(None),
        }
    }

    /// A store with `count` numbered posts.
    pub fn with_count(count: u64) -> Self {
        Self::new((1..=count).map(|i| post(i, &format!("Post {i}"))).collect())
    }

    /// Arguments of the most recent query.
    pub fn last_args(&self) -> Option<QueryArguments> {
        self.recorded.lock().clone()
    }
}

impl PostQuery for MemoryPosts {
    fn run(&self, args: &QueryArguments) -> Result<QueryResult> {
        *self.recorded.lock() = Some(args.clone());

        let per_page = usize::try_from(args.posts_per_page.max(0)).unwrap_or(usize::MAX);
        let offset = args
            .paged
            .map(|p| (p.saturating_sub(1) as usize).saturating_mul(per_page))
            .unwrap_or(0);

        let items: Vec<Value> = self
            .items
            .iter()
            .skip(offset)
            .take(per_page)
            .cloned()
            .collect();

        Ok(QueryResult {
            items,
            found: self.items.len() as u64,
        })
    }
}
