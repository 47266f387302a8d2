//! Extension hooks.
//!
//! Third parties adjust engine output through `ArchiveExtension`, a trait
//! whose methods all default to identity. Extensions run in registration
//! order, each receiving the previous one's output.

use std::sync::Arc;

use crate::config::BlockConfiguration;
use crate::query::QueryArguments;
use crate::taxonomy::{TaxonomyConfig, TaxonomyFilterDescriptor};

/// Hook surface for adjusting engine outputs.
///
/// Implement the methods you care about; the rest pass values through
/// unchanged.
pub trait ArchiveExtension: Send + Sync {
    /// Adjust the final query arguments before execution.
    fn filter_args(
        &self,
        args: QueryArguments,
        config: &BlockConfiguration,
    ) -> QueryArguments {
        let _ = config;
        args
    }

    /// Replace the taxonomy filter configuration when a block inherits its
    /// template context. Returning `None` keeps the configuration already in
    /// effect. This is a wholesale replacement, not a merge; the extension
    /// owns the final decision.
    fn inherited_taxonomies(&self, config: &BlockConfiguration) -> Option<Vec<TaxonomyConfig>> {
        let _ = config;
        None
    }

    /// Adjust the resolved filter descriptors before render.
    fn filter_descriptors(
        &self,
        descriptors: Vec<TaxonomyFilterDescriptor>,
        config: &BlockConfiguration,
    ) -> Vec<TaxonomyFilterDescriptor> {
        let _ = config;
        descriptors
    }

    /// Adjust the interactivity state blob embedded in the rendered markup.
    fn filter_interactivity(
        &self,
        state: serde_json::Value,
        config: &BlockConfiguration,
    ) -> serde_json::Value {
        let _ = config;
        state
    }
}

/// Ordered collection of registered extensions.
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn ArchiveExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extension: Arc<dyn ArchiveExtension>) {
        self.extensions.push(extension);
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn filter_args(
        &self,
        args: QueryArguments,
        config: &BlockConfiguration,
    ) -> QueryArguments {
        self.extensions
            .iter()
            .fold(args, |args, ext| ext.filter_args(args, config))
    }

    /// The last extension returning a replacement wins.
    pub fn inherited_taxonomies(
        &self,
        config: &BlockConfiguration,
    ) -> Option<Vec<TaxonomyConfig>> {
        self.extensions
            .iter()
            .fold(None, |current, ext| ext.inherited_taxonomies(config).or(current))
    }

    pub fn filter_descriptors(
        &self,
        descriptors: Vec<TaxonomyFilterDescriptor>,
        config: &BlockConfiguration,
    ) -> Vec<TaxonomyFilterDescriptor> {
        self.extensions
            .iter()
            .fold(descriptors, |descriptors, ext| {
                ext.filter_descriptors(descriptors, config)
            })
    }

    pub fn filter_interactivity(
        &self,
        state: serde_json::Value,
        config: &BlockConfiguration,
    ) -> serde_json::Value {
        self.extensions
            .iter()
            .fold(state, |state, ext| ext.filter_interactivity(state, config))
    }
}
