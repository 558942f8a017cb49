//! Application context.
//!
//! [`AppContext`] is the struct shared across all route handlers via Axum
//! state. Everything in it is either immutable or internally synchronized,
//! so cloning it per request is cheap and lock-free.

use std::sync::Arc;
use std::time::Duration;

use vl_cache::{CacheStore, HandleCache};
use vl_core::config::Config;
use vl_core::{Result, SourceMatcher};
use vl_extract::{Extractor, MediaFetcher, Resolver, RetryPolicy, ToolRegistry};

use crate::gate::DeliveryGate;
use crate::relay::StreamRelay;

#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Syntactic guard applied before resolution.
    pub sources: Arc<SourceMatcher>,
    pub resolver: Arc<Resolver>,
    pub cache: HandleCache,
    pub gate: Arc<DeliveryGate>,
    pub relay: Arc<StreamRelay>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    /// Wire the components together from `config` and the two strategies.
    ///
    /// The same fetcher serves direct-fetch resolution and the relay.
    pub fn build(
        config: Config,
        extractor: Arc<dyn Extractor>,
        fetcher: Arc<dyn MediaFetcher>,
        store: Arc<dyn CacheStore>,
        tools: ToolRegistry,
    ) -> Result<Self> {
        let sources = SourceMatcher::new(&config.routes.source_pattern)?;
        let resolver = Resolver::new(
            extractor,
            fetcher.clone(),
            RetryPolicy::from_config(&config.extractor),
        );
        let cache = HandleCache::new(store, Duration::from_secs(config.cache.ttl_secs));
        let gate = DeliveryGate::new(&config.delivery);
        let relay = StreamRelay::new(fetcher, config.upstream.media_type.clone());

        Ok(Self {
            config: Arc::new(config),
            sources: Arc::new(sources),
            resolver: Arc::new(resolver),
            cache,
            gate: Arc::new(gate),
            relay: Arc::new(relay),
            tools: Arc::new(tools),
        })
    }
}
