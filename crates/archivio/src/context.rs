//! Render-context assembly.
//!
//! `render_context` is the per-request entry point: it reads the instance's
//! filter state out of the query string, resolves filter descriptors, builds
//! and runs the content query, and folds the result into the context bag the
//! template layer consumes. One call per block instance per request.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::BlockConfiguration;
use crate::error::{ArchiveError, ArchiveResult};
use crate::extension::ExtensionRegistry;
use crate::inherit::AmbientQuery;
use crate::pagination::{PageItem, PageUrlBuilder, build_links, build_window};
use crate::params::{FilterState, RequestParams, build_param_name};
use crate::query::ArchiveQueryBuilder;
use crate::source::{PostQuery, SiteContext, TermProvider};
use crate::taxonomy::{
    TaxonomyFilterDescriptor, build_taxonomies_filter, effective_taxonomy_configs,
};

/// The collaborators one render runs against.
#[derive(Clone, Copy)]
pub struct Platform<'a> {
    pub site: &'a dyn SiteContext,
    pub terms: &'a dyn TermProvider,
    pub posts: &'a dyn PostQuery,
    pub extensions: &'a ExtensionRegistry,
    /// The surrounding template's own query, for blocks that inherit.
    pub ambient: Option<&'a AmbientQuery>,
}

/// Context bag handed to the template layer.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveContext {
    pub posts: Vec<Value>,

    pub current_page: u32,

    pub total_pages: u32,

    /// Page window; only present with numbered pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Vec<PageItem>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_page_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page_link: Option<String>,

    /// Present with numbered pagination and in infinite mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_link: Option<String>,

    /// Whether another page exists; only present in infinite mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,

    pub taxonomies_filter: Vec<TaxonomyFilterDescriptor>,

    /// Opaque state blob the client-side layer hydrates from.
    pub interactivity: Value,
}

/// Assemble the render context for one block instance.
pub fn render_context(
    config: &BlockConfiguration,
    path: &str,
    query: &str,
    platform: &Platform<'_>,
) -> ArchiveResult<ArchiveContext> {
    let params = RequestParams::from_query(query);
    let filters = FilterState::from_request(&params, &config.instance_id);

    // Effective taxonomy configuration: the persisted one, unless the block
    // inherits and an extension supplies a replacement set.
    let mut tax_configs = effective_taxonomy_configs(config);
    if config.inherit
        && let Some(replacement) = platform.extensions.inherited_taxonomies(config)
    {
        tax_configs = replacement;
    }

    let descriptors =
        build_taxonomies_filter(&tax_configs, &filters, platform.terms, config.all_languages)
            .map_err(ArchiveError::Terms)?;
    let descriptors = platform.extensions.filter_descriptors(descriptors, config);

    let mut builder = ArchiveQueryBuilder::new(config, &filters, platform.site, platform.terms)
        .with_taxonomy_configs(&tax_configs);
    if let Some(ambient) = platform.ambient {
        builder = builder.with_ambient(ambient);
    }
    let args = platform.extensions.filter_args(builder.build(), config);

    let result = platform.posts.run(&args).map_err(ArchiveError::Query)?;

    // The builder's effective (capped) per-page, not the raw configured one:
    // the query fetches pages of this size.
    let per_page = u64::from(builder.per_page());
    let current_page = filters.page;
    let total_pages = u32::try_from(result.found.div_ceil(per_page)).unwrap_or(u32::MAX);

    let urls = PageUrlBuilder::new(path, &params, &config.instance_id);
    let numbered = config.show_pagination && !config.infinite_scroll;
    let infinite = config.show_pagination && config.infinite_scroll;

    let (pagination, links) = if numbered {
        (
            Some(build_window(total_pages, current_page, &urls)),
            Some(build_links(total_pages, current_page, &urls)),
        )
    } else {
        (None, None)
    };

    let interactivity = interactivity_state(config, &filters, &descriptors, current_page);
    let interactivity = platform
        .extensions
        .filter_interactivity(interactivity?, config);

    Ok(ArchiveContext {
        posts: result.items,
        current_page,
        total_pages,
        pagination,
        first_page_link: links.as_ref().map(|l| l.first.clone()),
        last_page_link: links.as_ref().map(|l| l.last.clone()),
        previous_page_link: links.as_ref().map(|l| l.previous.clone()),
        next_page_link: if infinite {
            Some(urls.page_url(current_page.saturating_add(1).min(total_pages.max(1))))
        } else {
            links.map(|l| l.next)
        },
        has_more: infinite.then_some(current_page < total_pages),
        taxonomies_filter: descriptors,
        interactivity,
    })
}

/// State blob mirroring current filters/page/search for client hydration.
fn interactivity_state(
    config: &BlockConfiguration,
    filters: &FilterState,
    descriptors: &[TaxonomyFilterDescriptor],
    current_page: u32,
) -> ArchiveResult<Value> {
    let taxonomy_key = build_param_name("taxonomy", &config.instance_id);
    let active: BTreeMap<&String, Vec<u64>> = filters
        .taxonomies
        .iter()
        .map(|(taxonomy, ids)| (taxonomy, ids.iter().copied().collect()))
        .collect();

    let mut filter_map = serde_json::Map::new();
    filter_map.insert(
        taxonomy_key,
        serde_json::to_value(&active).map_err(ArchiveError::Serialize)?,
    );

    let mut state = serde_json::Map::new();
    state.insert("currentPage".to_string(), Value::from(current_page));
    state.insert(
        "isInfiniteScroll".to_string(),
        Value::from(config.infinite_scroll),
    );
    state.insert("filters".to_string(), Value::Object(filter_map));
    if config.show_search
        && let Some(search) = &filters.search
    {
        state.insert("search".to_string(), Value::from(search.clone()));
    }
    state.insert(
        "terms".to_string(),
        serde_json::to_value(descriptors).map_err(ArchiveError::Serialize)?,
    );
    state.insert(
        "blockId".to_string(),
        Value::from(config.instance_id.clone()),
    );

    Ok(Value::Object(state))
}
