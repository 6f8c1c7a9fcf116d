//! Render context
//!
//! Holds the registries and mode flags shared by every schema and graph.
//! Registration needs `&mut RenderContext`; rendering only borrows it, so a
//! context is populated once and then read by any number of render tasks.

use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::config::RenderConfig;
use crate::definition::DefinitionRegistry;
use crate::error::Result;
use crate::generator::GeneratorRegistry;
use crate::transport::{HttpTransport, Transport};
use crate::types::TypeRegistry;

/// Default upper length for synthesized arrays without `maxItems`
pub const FAUX_ARRAY_LIMIT: usize = 5;

/// Registries and flags for one rendering setup
#[derive(Clone)]
pub struct RenderContext {
    pub types: TypeRegistry,
    pub definitions: DefinitionRegistry,
    pub generators: GeneratorRegistry,
    pub transport: Arc<dyn Transport>,
    /// Fetch data from endpoints instead of synthesizing it
    pub live: bool,
    /// Render sibling graphs concurrently
    pub concurrent: bool,
    pub faux_array_limit: usize,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("definitions", &self.definitions.len())
            .field("generators", &self.generators.len())
            .field("live", &self.live)
            .field("concurrent", &self.concurrent)
            .field("faux_array_limit", &self.faux_array_limit)
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    /// Standard registries, HTTP transport, live and concurrent
    pub fn new() -> Self {
        Self {
            types: TypeRegistry::standard(),
            definitions: DefinitionRegistry::new(),
            generators: GeneratorRegistry::standard(),
            transport: Arc::new(HttpTransport::new()),
            live: true,
            concurrent: true,
            faux_array_limit: FAUX_ARRAY_LIMIT,
        }
    }

    /// Build a context from configuration, loading the definition directory if set
    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        let transport = HttpTransport::with_options(
            config.http.timeout_secs,
            config.http.user_agent.as_deref(),
        )?;

        let mut ctx = Self::new()
            .with_live(config.render.live)
            .with_concurrency(config.render.concurrent)
            .with_faux_array_limit(config.render.faux_array_limit)
            .with_transport(Arc::new(transport));

        if let Some(directory) = config.definitions_directory() {
            let loaded = ctx
                .definitions
                .load_with(&config.definition_files(), &directory)?;
            info!("Loaded {} definitions from {}", loaded.len(), directory.display());
        }

        Ok(ctx)
    }

    pub fn with_live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_faux_array_limit(mut self, limit: usize) -> Self {
        self.faux_array_limit = limit;
        self
    }

    pub fn with_definitions(mut self, definitions: DefinitionRegistry) -> Self {
        self.definitions = definitions;
        self
    }
}
