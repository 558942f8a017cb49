//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a full [`AppContext`] from a test
//! config, a scripted [`FakeExtractor`], the real [`HttpFetcher`] and an
//! in-memory cache store. Upstream traffic goes to a wiremock server, and
//! [`TestHarness::with_server`] starts Axum on a random port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use vl_cache::{CacheStore, MemoryStore};
use vl_core::config::Config;
use vl_core::{Error, Result};
use vl_extract::{ExtractedMedia, Extractor, HttpFetcher, MediaFetcher, ToolRegistry};
use vl_server::context::AppContext;
use vl_server::router::build_router;
use wiremock::MockServer;

/// Cookie header the test jar produces.
pub const COOKIE_HEADER: &str = "sessionid=abc123; tt_csrf_token=xyz";

/// Path of the media file the fake extractor points at.
pub const MEDIA_PATH: &str = "/media/clip.mp4";

/// Extractor with a scripted outcome that counts its invocations.
pub struct FakeExtractor {
    locator: Option<String>,
    title: Option<String>,
    calls: AtomicU32,
}

impl FakeExtractor {
    pub fn succeeding(locator: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            locator: Some(locator.into()),
            title: title.map(str::to_string),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            locator: None,
            title: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn name(&self) -> &str {
        "fake"
    }

    async fn extract(&self, _source_url: &str) -> Result<ExtractedMedia> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.locator {
            Some(locator) => Ok(ExtractedMedia {
                locator: locator.clone(),
                title: self.title.clone(),
                thumbnail: Some("https://img.example/thumb.jpg".into()),
                id: Some("7301234567890".into()),
            }),
            None => Err(Error::Extraction("scripted failure".into())),
        }
    }
}

/// Test config pointed at `upstream`, with a cookie jar under `jar_dir`.
///
/// Source URLs only need the `/@user/video/<digits>` shape so the direct
/// fetch can be served by the mock server too.
pub fn test_config(jar_dir: &TempDir) -> Config {
    let jar = jar_dir.path().join("cookies.txt");
    std::fs::write(
        &jar,
        "# Netscape HTTP Cookie File\n\
         .tiktok.com\tTRUE\t/\tTRUE\t0\tsessionid\tabc123\n\
         #HttpOnly_.tiktok.com\tTRUE\t/\tTRUE\t0\ttt_csrf_token\txyz\n",
    )
    .expect("failed to write cookie jar");

    let mut config = Config::default();
    config.routes.source_pattern = r"/@[\w.]+/video/\d+".into();
    config.extractor.retry_attempts = 2;
    config.extractor.retry_delay_ms = 10;
    config.upstream.cookies_path = jar;
    config.upstream.timeout_ms = 2_000;
    config
}

pub struct TestHarness {
    pub ctx: AppContext,
    pub extractor: Arc<FakeExtractor>,
    pub store: Arc<dyn CacheStore>,
    pub upstream: MockServer,
    _jar_dir: TempDir,
}

impl TestHarness {
    /// Harness whose extractor resolves to `<upstream>/media/clip.mp4`.
    pub async fn new() -> Self {
        Self::build(|_| {}, |upstream| {
            FakeExtractor::succeeding(format!("{}{MEDIA_PATH}", upstream.uri()), Some("A clip"))
        })
        .await
    }

    /// Harness with a config tweak and a custom extractor.
    pub async fn build(
        tweak: impl FnOnce(&mut Config),
        extractor: impl FnOnce(&MockServer) -> FakeExtractor,
    ) -> Self {
        Self::build_with_fetcher(tweak, extractor, None).await
    }

    /// Like [`Self::build`], replacing the real `HttpFetcher` when `fetcher`
    /// is given.
    pub async fn build_with_fetcher(
        tweak: impl FnOnce(&mut Config),
        extractor: impl FnOnce(&MockServer) -> FakeExtractor,
        fetcher: Option<Arc<dyn MediaFetcher>>,
    ) -> Self {
        let upstream = MockServer::start().await;
        let jar_dir = tempfile::tempdir().expect("failed to create temp dir");

        let mut config = test_config(&jar_dir);
        tweak(&mut config);

        let extractor = Arc::new(extractor(&upstream));
        let fetcher: Arc<dyn MediaFetcher> = match fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(&config.upstream).expect("failed to build fetcher")),
        };
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
        let tools = ToolRegistry::discover(&config.extractor);

        let ctx = AppContext::build(config, extractor.clone(), fetcher, store.clone(), tools)
            .expect("failed to build context");

        Self {
            ctx,
            extractor,
            store,
            upstream,
            _jar_dir: jar_dir,
        }
    }

    /// A source URL the test config accepts, served by the mock upstream.
    pub fn source_url(&self) -> String {
        format!("{}/@creator/video/7301234567890", self.upstream.uri())
    }

    /// Start Axum on a random port and return the bound address.
    pub async fn serve(&self) -> SocketAddr {
        let app = build_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        addr
    }

    /// Resolve [`Self::source_url`] through the API and return the body.
    pub async fn resolve(&self, addr: SocketAddr) -> serde_json::Value {
        let resp = reqwest::Client::new()
            .get(format!("http://{addr}/video"))
            .query(&[("url", self.source_url())])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "resolve failed");
        resp.json().await.unwrap()
    }
}

/// Path segment of a virtual link.
pub fn encoded_segment(link: &str) -> String {
    link.rsplit('/').next().unwrap_or_default().to_string()
}
