//! Content-query argument assembly.
//!
//! `ArchiveQueryBuilder` composes post type, pagination, ordering, sticky
//! policy, language scope and the taxonomy fragment into one argument set
//! for the content-query collaborator, serialized under the conventional
//! keys (`post_type`, `post__not_in`, `tax_query`, ...).

use serde::{Deserialize, Serialize};

use crate::config::{BlockConfiguration, OrderBy, SortDirection, StickyPolicy};
use crate::inherit::{AmbientQuery, apply_ambient_query};
use crate::params::FilterState;
use crate::source::{SiteContext, TermProvider};
use crate::taxonomy::{TaxonomyConfig, effective_taxonomy_configs, handle_taxonomies_filter};

/// Upper bound on the per-page count a single query may request.
pub const MAX_PER_PAGE: u32 = 100;

/// How clauses of a tax query combine.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum TaxQueryRelation {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// Operator applied to a clause's term list. Multiple terms within one
/// taxonomy match any of them (`IN`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaxQueryOperator {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "AND")]
    And,
}

/// One taxonomy constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxClause {
    pub taxonomy: String,
    /// Term identifier field the clause matches against.
    pub field: String,
    pub terms: Vec<u64>,
    pub include_children: bool,
    pub operator: TaxQueryOperator,
}

impl TaxClause {
    /// Clause matching any of `terms` by id.
    pub fn terms(taxonomy: &str, terms: Vec<u64>, include_children: bool) -> Self {
        Self {
            taxonomy: taxonomy.to_string(),
            field: "term_id".to_string(),
            terms,
            include_children,
            operator: TaxQueryOperator::In,
        }
    }
}

/// Taxonomy clauses plus the relation combining them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaxQuery {
    pub relation: TaxQueryRelation,
    pub queries: Vec<TaxClause>,
}

impl TaxQuery {
    pub fn new(relation: TaxQueryRelation, queries: Vec<TaxClause>) -> Self {
        Self { relation, queries }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Assembled content-query arguments.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct QueryArguments {
    pub post_type: String,

    #[serde(rename = "post__in", skip_serializing_if = "Vec::is_empty")]
    pub post_in: Vec<u64>,

    #[serde(rename = "post__not_in", skip_serializing_if = "Vec::is_empty")]
    pub post_not_in: Vec<u64>,

    pub posts_per_page: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paged: Option<u32>,

    pub order: SortDirection,

    #[serde(rename = "orderby")]
    pub order_by: OrderBy,

    #[serde(rename = "ignore_sticky_posts", skip_serializing_if = "is_false")]
    pub ignore_sticky: bool,

    /// Language scope. `None` inherits the collaborator's current-locale
    /// default; an empty string explicitly disables language scoping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    #[serde(rename = "s", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(rename = "monthnum", skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,

    #[serde(rename = "tax_query", skip_serializing_if = "Option::is_none")]
    pub tax_query: Option<TaxQuery>,
}

/// Builder translating one block render into query arguments.
pub struct ArchiveQueryBuilder<'a> {
    config: &'a BlockConfiguration,
    filters: &'a FilterState,
    site: &'a dyn SiteContext,
    terms: &'a dyn TermProvider,
    tax_configs: Option<&'a [TaxonomyConfig]>,
    ambient: Option<&'a AmbientQuery>,
}

impl<'a> ArchiveQueryBuilder<'a> {
    pub fn new(
        config: &'a BlockConfiguration,
        filters: &'a FilterState,
        site: &'a dyn SiteContext,
        terms: &'a dyn TermProvider,
    ) -> Self {
        Self {
            config,
            filters,
            site,
            terms,
            tax_configs: None,
            ambient: None,
        }
    }

    /// Use an already-resolved taxonomy configuration list instead of
    /// deriving one from the block configuration.
    pub fn with_taxonomy_configs(mut self, configs: &'a [TaxonomyConfig]) -> Self {
        self.tax_configs = Some(configs);
        self
    }

    /// Supply the surrounding template's own query for inheritance.
    pub fn with_ambient(mut self, ambient: &'a AmbientQuery) -> Self {
        self.ambient = Some(ambient);
        self
    }

    /// Build the argument set.
    pub fn build(&self) -> QueryArguments {
        let config = self.config;

        let post_type = if self.site.is_post_type(&config.post_type) {
            config.post_type.clone()
        } else {
            tracing::debug!(post_type = %config.post_type, "unknown post type, listing posts");
            "post".to_string()
        };

        let mut args = QueryArguments {
            post_type,
            post_not_in: self.site.current_post().into_iter().collect(),
            posts_per_page: i64::from(self.per_page()),
            order: self.filters.order.unwrap_or(config.order),
            order_by: self.filters.order_by.unwrap_or(config.order_by),
            ..QueryArguments::default()
        };

        match config.sticky {
            StickyPolicy::Include => {}
            StickyPolicy::Exclude => {
                args.post_not_in.extend(self.site.sticky_posts());
            }
            StickyPolicy::Only => {
                args.post_in = self.site.sticky_posts();
                // Reordering stickies to the front is pointless when the
                // listing is nothing but stickies; skipping it saves the
                // collaborator a second query.
                args.ignore_sticky = true;
            }
        }

        if config.show_pagination {
            if config.infinite_scroll {
                // Load-more re-fetches from the start through the requested
                // page; the page offset stays unset.
                args.posts_per_page *= i64::from(self.filters.page);
            } else {
                args.paged = Some(self.filters.page);
            }
        }

        if config.all_languages {
            args.lang = Some(String::new());
        }

        if config.show_search {
            args.search = self.filters.search.clone();
        }

        let fallback;
        let tax_configs: &[TaxonomyConfig] = match self.tax_configs {
            Some(configs) => configs,
            None => {
                fallback = effective_taxonomy_configs(config);
                &fallback
            }
        };
        args.tax_query = handle_taxonomies_filter(tax_configs, self.filters, self.terms);

        if config.inherit
            && let Some(ambient) = self.ambient
        {
            apply_ambient_query(&mut args, ambient, config.show_search);
        }

        args
    }

    /// Effective per-page count: the block's or the site default, capped.
    ///
    /// Page-count math must use this same value; dividing the found-count by
    /// an uncapped size would leave trailing pages unreachable.
    pub fn per_page(&self) -> u32 {
        let per_page = self
            .config
            .per_page
            .unwrap_or_else(|| self.site.default_per_page())
            .max(1);
        if per_page > MAX_PER_PAGE {
            tracing::warn!(
                requested = per_page,
                capped = MAX_PER_PAGE,
                "per-page count exceeds maximum, capping"
            );
            return MAX_PER_PAGE;
        }
        per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RequestParams;
    use crate::source::{Taxonomy, Term};
    use anyhow::Result;

    struct FakeSite {
        sticky: Vec<u64>,
        current: Option<u64>,
    }

    impl SiteContext for FakeSite {
        fn is_post_type(&self, name: &str) -> bool {
            matches!(name, "post" | "article")
        }

        fn sticky_posts(&self) -> Vec<u64> {
            self.sticky.clone()
        }

        fn current_post(&self) -> Option<u64> {
            self.current
        }
    }

    struct NoTerms;

    impl TermProvider for NoTerms {
        fn taxonomy(&self, _name: &str) -> Option<Taxonomy> {
            None
        }

        fn terms(&self, _taxonomy: &str, _include_empty: bool) -> Result<Vec<Term>> {
            Ok(Vec::new())
        }
    }

    fn site() -> FakeSite {
        FakeSite {
            sticky: vec![91, 92],
            current: None,
        }
    }

    fn filters(query: &str) -> FilterState {
        FilterState::from_request(&RequestParams::from_query(query), "1")
    }

    fn config() -> BlockConfiguration {
        BlockConfiguration {
            instance_id: "1".to_string(),
            post_type: "article".to_string(),
            per_page: Some(10),
            ..BlockConfiguration::default()
        }
    }

    #[test]
    fn base_arguments() {
        let config = config();
        let state = filters("");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        assert_eq!(args.post_type, "article");
        assert_eq!(args.posts_per_page, 10);
        assert_eq!(args.paged, None);
        assert_eq!(args.order, SortDirection::Desc);
        assert!(args.tax_query.is_none());
    }

    #[test]
    fn unknown_post_type_falls_back_to_post() {
        let config = BlockConfiguration {
            post_type: "bogus".to_string(),
            ..config()
        };
        let state = filters("");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        assert_eq!(args.post_type, "post");
    }

    #[test]
    fn current_post_is_excluded() {
        let config = config();
        let state = filters("");
        let site = FakeSite {
            sticky: Vec::new(),
            current: Some(44),
        };
        let args = ArchiveQueryBuilder::new(&config, &state, &site, &NoTerms).build();

        assert_eq!(args.post_not_in, vec![44]);
    }

    #[test]
    fn sticky_exclude_extends_the_exclusion_list() {
        let config = BlockConfiguration {
            sticky: StickyPolicy::Exclude,
            ..config()
        };
        let state = filters("");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        assert!(args.post_not_in.contains(&91));
        assert!(args.post_not_in.contains(&92));
        assert!(args.post_in.is_empty());
        assert!(!args.ignore_sticky);
    }

    #[test]
    fn sticky_only_isolates_the_sticky_set() {
        let config = BlockConfiguration {
            sticky: StickyPolicy::Only,
            ..config()
        };
        let state = filters("");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        assert_eq!(args.post_in, vec![91, 92]);
        assert!(args.ignore_sticky);
        assert!(!args.post_not_in.contains(&91));
    }

    #[test]
    fn numbered_pagination_sets_the_page_offset() {
        let config = BlockConfiguration {
            show_pagination: true,
            ..config()
        };
        let state = filters("archivio-1-paged=3");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        assert_eq!(args.paged, Some(3));
        assert_eq!(args.posts_per_page, 10);
    }

    #[test]
    fn infinite_scroll_multiplies_per_page() {
        let config = BlockConfiguration {
            show_pagination: true,
            infinite_scroll: true,
            ..config()
        };
        let state = filters("archivio-1-paged=3");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        assert_eq!(args.posts_per_page, 30);
        assert_eq!(args.paged, None);
    }

    #[test]
    fn request_order_overrides_configuration() {
        let config = config();
        let state = filters("archivio-1-order=asc&archivio-1-orderby=title");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        assert_eq!(args.order, SortDirection::Asc);
        assert_eq!(args.order_by, OrderBy::Title);
    }

    #[test]
    fn unrecognized_order_normalizes_to_desc() {
        // Even an ascending block sorts descending on a garbage request
        // value; the configured direction only applies when the parameter
        // is absent.
        let config = BlockConfiguration {
            order: SortDirection::Asc,
            ..config()
        };
        let state = filters("archivio-1-order=sideways");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();
        assert_eq!(args.order, SortDirection::Desc);

        let absent = filters("");
        let args = ArchiveQueryBuilder::new(&config, &absent, &site(), &NoTerms).build();
        assert_eq!(args.order, SortDirection::Asc);
    }

    #[test]
    fn all_languages_clears_the_language_scope() {
        let config = BlockConfiguration {
            all_languages: true,
            ..config()
        };
        let state = filters("");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        assert_eq!(args.lang.as_deref(), Some(""));
    }

    #[test]
    fn search_requires_the_block_feature() {
        let state = filters("archivio-1-search=hello");

        let without = ArchiveQueryBuilder::new(&config(), &state, &site(), &NoTerms).build();
        assert_eq!(without.search, None);

        let with_search = BlockConfiguration {
            show_search: true,
            ..config()
        };
        let args = ArchiveQueryBuilder::new(&with_search, &state, &site(), &NoTerms).build();
        assert_eq!(args.search.as_deref(), Some("hello"));
    }

    #[test]
    fn per_page_is_capped() {
        let config = BlockConfiguration {
            per_page: Some(5000),
            ..config()
        };
        let state = filters("");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        assert_eq!(args.posts_per_page, i64::from(MAX_PER_PAGE));
    }

    #[test]
    fn serializes_under_conventional_keys() {
        let config = BlockConfiguration {
            sticky: StickyPolicy::Only,
            show_pagination: true,
            ..config()
        };
        let state = filters("archivio-1-paged=2");
        let args = ArchiveQueryBuilder::new(&config, &state, &site(), &NoTerms).build();

        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["post_type"], "article");
        assert_eq!(json["post__in"], serde_json::json!([91, 92]));
        assert_eq!(json["posts_per_page"], 10);
        assert_eq!(json["paged"], 2);
        assert_eq!(json["order"], "desc");
        assert_eq!(json["orderby"], "date");
        assert_eq!(json["ignore_sticky_posts"], true);
        assert!(json.get("lang").is_none());
        assert!(json.get("tax_query").is_none());
    }
}
