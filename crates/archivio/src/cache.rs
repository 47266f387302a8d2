//! Caching term provider.
//!
//! Term lists are read once per taxonomy per render at minimum, and a page
//! with several archive blocks reads the same lists repeatedly. This
//! decorator memoizes taxonomy and term lookups in-process; the platform's
//! own object cache (if any) sits behind the wrapped provider.

use anyhow::Result;
use dashmap::DashMap;

use crate::source::{Taxonomy, Term, TermProvider};

/// `TermProvider` decorator that caches lookups.
///
/// Failed term fetches are not cached, so a transient collaborator error
/// does not pin an empty list.
pub struct CachedTermProvider<P> {
    inner: P,
    taxonomies: DashMap<String, Taxonomy>,
    terms: DashMap<(String, bool), Vec<Term>>,
}

impl<P: TermProvider> CachedTermProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            taxonomies: DashMap::new(),
            terms: DashMap::new(),
        }
    }

    /// Drop all cached entries.
    pub fn invalidate(&self) {
        self.taxonomies.clear();
        self.terms.clear();
    }
}

impl<P: TermProvider> TermProvider for CachedTermProvider<P> {
    fn taxonomy(&self, name: &str) -> Option<Taxonomy> {
        if let Some(taxonomy) = self.taxonomies.get(name) {
            return Some(taxonomy.clone());
        }

        let taxonomy = self.inner.taxonomy(name)?;
        self.taxonomies
            .insert(name.to_string(), taxonomy.clone());
        Some(taxonomy)
    }

    fn terms(&self, taxonomy: &str, include_empty: bool) -> Result<Vec<Term>> {
        let key = (taxonomy.to_string(), include_empty);
        if let Some(terms) = self.terms.get(&key) {
            return Ok(terms.clone());
        }

        let terms = self.inner.terms(taxonomy, include_empty)?;
        self.terms.insert(key, terms.clone());
        Ok(terms)
    }
}
