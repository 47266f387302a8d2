//! Taxonomy filter resolution.
//!
//! Two views of the same configuration:
//! - `build_taxonomies_filter`: descriptor set for rendering filter UI
//! - `handle_taxonomies_filter`: tax-query fragment for the content query
//!
//! Both run from a normalized per-taxonomy configuration list. When a block
//! inherits its template context, that list is replaced wholesale by the
//! extension override (see `extension`); it is never merged with the
//! persisted configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{BlockConfiguration, FilterKind};
use crate::params::FilterState;
use crate::query::{TaxClause, TaxQuery, TaxQueryRelation};
use crate::source::TermProvider;

/// Effective filter configuration for one taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxonomyConfig {
    pub taxonomy: String,

    /// Control for top-level terms.
    #[serde(default)]
    pub filter_kind: FilterKind,

    /// Control for child terms; falls back to `filter_kind` when unset.
    #[serde(default)]
    pub child_filter_kind: Option<FilterKind>,

    /// Whether child terms are displayed beneath their parent.
    #[serde(default)]
    pub hierarchical: bool,

    /// Allow-list restricting which terms are eligible; empty means all.
    #[serde(default)]
    pub forced: Vec<u64>,
}

impl TaxonomyConfig {
    fn child_kind(&self) -> FilterKind {
        self.child_filter_kind.unwrap_or(self.filter_kind)
    }
}

/// Normalize a block's per-taxonomy maps into an ordered configuration list.
pub fn effective_taxonomy_configs(config: &BlockConfiguration) -> Vec<TaxonomyConfig> {
    config
        .taxonomies
        .iter()
        .map(|name| TaxonomyConfig {
            taxonomy: name.clone(),
            filter_kind: config.filter_kind(name),
            child_filter_kind: Some(config.child_filter_kind(name)),
            hierarchical: config.hierarchical(name),
            forced: config.forced(name).to_vec(),
        })
        .collect()
}

/// One term as presented to the filter UI.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TermDescriptor {
    pub id: u64,
    pub slug: String,
    pub name: String,
    pub parent: u64,
    pub is_child: bool,
    /// Whether the term is in the live selection. Computed per request,
    /// never stored.
    pub active: bool,
    /// Whether the term's parent is in the live selection.
    pub parent_active: bool,
    pub filter_kind: FilterKind,
}

/// Resolved filter description for one taxonomy.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaxonomyFilterDescriptor {
    pub taxonomy: String,
    pub label: String,
    pub filter_kind: FilterKind,
    pub child_filter_kind: FilterKind,
    pub hierarchical: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forced: Vec<u64>,
    pub terms: Vec<TermDescriptor>,
}

/// Resolve the descriptor set for rendering filter UI.
///
/// Descriptors come back in configuration order. Taxonomies the registry
/// does not know are skipped. A non-empty forced allow-list restricts which
/// terms appear at all; it is a restricted view, not an extra constraint.
pub fn build_taxonomies_filter(
    configs: &[TaxonomyConfig],
    filters: &FilterState,
    provider: &dyn TermProvider,
    include_empty: bool,
) -> Result<Vec<TaxonomyFilterDescriptor>> {
    let mut descriptors = Vec::with_capacity(configs.len());

    for config in configs {
        let Some(taxonomy) = provider.taxonomy(&config.taxonomy) else {
            tracing::debug!(taxonomy = %config.taxonomy, "skipping unregistered taxonomy");
            continue;
        };

        let terms = provider
            .terms(&config.taxonomy, include_empty)
            .with_context(|| format!("fetching terms for '{}'", config.taxonomy))?;

        let active = filters.active(&config.taxonomy);
        let is_active = |id: u64| active.is_some_and(|set| set.contains(&id));

        let terms = terms
            .into_iter()
            .filter(|term| config.forced.is_empty() || config.forced.contains(&term.id))
            .map(|term| {
                let is_child = term.is_child();
                TermDescriptor {
                    id: term.id,
                    active: is_active(term.id),
                    parent_active: is_child && is_active(term.parent),
                    filter_kind: if config.hierarchical && is_child {
                        config.child_kind()
                    } else {
                        config.filter_kind
                    },
                    is_child,
                    parent: term.parent,
                    slug: term.slug,
                    name: term.name,
                }
            })
            .collect();

        descriptors.push(TaxonomyFilterDescriptor {
            taxonomy: config.taxonomy.clone(),
            label: taxonomy.label,
            filter_kind: config.filter_kind,
            child_filter_kind: config.child_kind(),
            hierarchical: config.hierarchical,
            forced: config.forced.clone(),
            terms,
        });
    }

    Ok(descriptors)
}

/// Derive the tax-query fragment for the content query.
///
/// Live selections produce one clause per taxonomy, OR within a taxonomy
/// (`IN`) and relation `AND` across taxonomies. A clause includes descendant
/// terms only while every selected term is a root: selecting a child term
/// narrows to exactly that child. With no live selection anywhere, the
/// forced allow-lists become fallback clauses with relation `OR`, letting a
/// block statically scope its content pool.
pub fn handle_taxonomies_filter(
    configs: &[TaxonomyConfig],
    filters: &FilterState,
    provider: &dyn TermProvider,
) -> Option<TaxQuery> {
    let mut clauses = Vec::new();

    for config in configs {
        let Some(active) = filters.active(&config.taxonomy) else {
            continue;
        };
        let terms: Vec<u64> = active.iter().copied().collect();
        let include_children = !terms
            .iter()
            .any(|&id| provider.term_parent(&config.taxonomy, id) != 0);
        clauses.push(TaxClause::terms(
            &config.taxonomy,
            terms,
            include_children,
        ));
    }

    if !clauses.is_empty() {
        return Some(TaxQuery::new(TaxQueryRelation::And, clauses));
    }

    let fallback: Vec<TaxClause> = configs
        .iter()
        .filter(|config| !config.forced.is_empty())
        .map(|config| TaxClause::terms(&config.taxonomy, config.forced.clone(), true))
        .collect();

    if fallback.is_empty() {
        None
    } else {
        Some(TaxQuery::new(TaxQueryRelation::Or, fallback))
    }
}
