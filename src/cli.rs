use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidlink")]
#[command(author, version, about = "Short-video resolver with expiring virtual stream links")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve a single source URL and print the result as JSON
    Resolve {
        /// Source page URL
        #[arg(required = true)]
        url: String,
    },

    /// Check that the extractor is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_overrides() {
        let cli = Cli::parse_from(["vidlink", "-c", "vidlink.json", "start", "--port", "8081"]);
        assert_eq!(cli.config, Some(PathBuf::from("vidlink.json")));
        match cli.command {
            Commands::Start { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8081));
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn resolve_requires_url() {
        assert!(Cli::try_parse_from(["vidlink", "resolve"]).is_err());
    }
}
