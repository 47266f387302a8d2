//! Archivio — server-rendered content-archive engine.
//!
//! Translates a block's persisted configuration plus live URL query-string
//! state into a sanitized content-query argument set, and the query result
//! back into pagination and filter view-state:
//! - `params`: per-instance request parameter store and sanitizer
//! - `taxonomy`: filter descriptors and the tax-query fragment
//! - `query`: content-query argument assembly
//! - `pagination`: truncated page windows and link building
//! - `inherit`: ambient main-query overrides
//! - `context`: full render-context assembly
//!
//! The datastore, taxonomy registry and site options live behind the traits
//! in `source`; the engine itself performs no I/O.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod extension;
pub mod inherit;
pub mod pagination;
pub mod params;
pub mod query;
pub mod source;
pub mod taxonomy;

pub use cache::CachedTermProvider;
pub use config::{BlockConfiguration, FilterKind, OrderBy, SortDirection, StickyPolicy};
pub use context::{ArchiveContext, Platform, render_context};
pub use error::{ArchiveError, ArchiveResult};
pub use extension::{ArchiveExtension, ExtensionRegistry};
pub use inherit::{AmbientQuery, apply_ambient_query};
pub use pagination::{PageItem, PageUrlBuilder, PaginationLinks, build_links, build_window};
pub use params::{FilterState, ParamValue, RequestParams, build_param_name};
pub use query::{
    ArchiveQueryBuilder, QueryArguments, TaxClause, TaxQuery, TaxQueryOperator, TaxQueryRelation,
};
pub use source::{PostQuery, QueryResult, SiteContext, Taxonomy, Term, TermProvider};
pub use taxonomy::{
    TaxonomyConfig, TaxonomyFilterDescriptor, TermDescriptor, build_taxonomies_filter,
    effective_taxonomy_configs, handle_taxonomies_filter,
};
