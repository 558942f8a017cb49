mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use vl_core::config::Config;
use vl_extract::{HttpFetcher, Resolver, RetryPolicy, ToolRegistry, YtDlpExtractor};

/// Load the config file (or defaults) and apply `VIDLINK_*` overrides.
fn load_config(path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(path);
    for warning in config.apply_env(|key| std::env::var(key).ok()) {
        tracing::warn!("{warning}");
    }
    config
}

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting vidlink {}", env!("CARGO_PKG_VERSION"));
    vl_server::start(config).await?;
    Ok(())
}

async fn resolve_once(url: &str, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);

    let matcher = vl_core::SourceMatcher::new(&config.routes.source_pattern)?;
    let url = matcher.check(url)?;

    let tools = ToolRegistry::discover(&config.extractor);
    let tool = tools.require_extractor()?.clone();
    let extractor = Arc::new(YtDlpExtractor::new(tool, &config.extractor, &config.upstream));
    let fetcher = Arc::new(HttpFetcher::new(&config.upstream)?);
    let resolver = Resolver::new(extractor, fetcher, RetryPolicy::from_config(&config.extractor));

    let result = resolver.resolve(url).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = load_config(config_path);
    let tools = ToolRegistry::discover(&config.extractor);
    let mut all_ok = true;

    for tool in tools.check_all().await {
        let status = if tool.available && tool.version.is_some() {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    match vl_extract::load_credentials(&config.upstream.cookies_path).await {
        Ok(cookies) => println!(
            "✓ cookie jar {} ({} cookies)",
            config.upstream.cookies_path.display(),
            cookies.split("; ").count()
        ),
        Err(e) => {
            all_ok = false;
            println!("✗ {e}");
        }
    }

    println!();
    if all_ok {
        println!("Everything needed to start the server is available.");
        Ok(())
    } else {
        anyhow::bail!("the server would refuse to start with this setup")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("cannot read {}", p.display()))?;
            Config::from_json(&raw)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    config.check_routes()?;
    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Routes: resolve {} / stream {}",
        config.routes.resolve_path, config.routes.stream_path
    );
    println!("  Extractor: {}", config.extractor.program);
    println!(
        "  Cache: {} (ttl {}s)",
        config.cache.backend, config.cache.ttl_secs
    );
    println!(
        "  Delivery: {} concurrent, {} per {}s per client",
        config.delivery.max_concurrent,
        config.delivery.rate_limit_max,
        config.delivery.rate_limit_window_secs
    );

    for warning in config.validate() {
        println!("  ! {warning}");
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidlink=trace,vl_server=debug,vl_extract=debug,vl_cache=debug,tower_http=debug".to_string()
        } else {
            "vidlink=info,vl_server=info,vl_extract=info,vl_cache=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, config_path))
        }
        Commands::Resolve { url } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(resolve_once(&url, config_path))
        }
        Commands::CheckTools => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_tools(config_path))
        }
        Commands::Validate { config } => {
            let path = config.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidlink {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
