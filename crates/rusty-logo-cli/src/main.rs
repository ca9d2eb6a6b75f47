use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rusty_logo_core::config::{CanvasConfig, Config, LoggingConfig, ServerConfig};

#[derive(Parser)]
#[command(
    name = "rusty-logo",
    about = "Turtle drawing over TCP: a tiny LOGO-style line protocol server",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default)
    Serve {
        /// Port to listen on (default: 8124)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Check the configuration for problems
    Validate,
    /// Write a config file with every default spelled out
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;

    init_logging(&config.logging(), cli.verbose);

    let command = cli.command.unwrap_or(Commands::Serve {
        port: None,
        bind: None,
    });

    match command {
        Commands::Serve { port, bind } => {
            apply_overrides(&mut config, port, bind);

            let (warnings, errors) = config.validate();
            for w in &warnings {
                tracing::warn!("{w}");
            }
            if !errors.is_empty() {
                anyhow::bail!("Invalid configuration: {}", errors.join("; "));
            }

            tracing::info!(config = %config_path.display(), "Starting Rusty Logo");
            rusty_logo_server::start_server(config).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Get { key } => match config.get_path(&key) {
                Some(value) => println!("{value}"),
                None => anyhow::bail!("No config value at '{key}'"),
            },
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate();
                for w in &warnings {
                    println!("warning: {w}");
                }
                for e in &errors {
                    println!("error: {e}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} error(s) in {}", errors.len(), config_path.display());
                }
                println!("Config OK: {}", config_path.display());
            }
            ConfigAction::Init { force } => {
                write_default_config(&config_path, force)?;
                println!("Wrote {}", config_path.display());
            }
        },
    }

    Ok(())
}

/// Command-line flags win over the config file.
fn apply_overrides(config: &mut Config, port: Option<u16>, bind: Option<String>) {
    if port.is_none() && bind.is_none() {
        return;
    }
    let server = config.server.get_or_insert_with(ServerConfig::default);
    if let Some(port) = port {
        server.port = port;
    }
    if let Some(bind) = bind {
        server.bind = bind;
    }
}

/// Write a fully populated default config to `path`. Refuses to replace an
/// existing file unless `force` is set.
fn write_default_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let config = Config {
        server: Some(ServerConfig::default()),
        canvas: Some(CanvasConfig::default()),
        logging: Some(LoggingConfig::default()),
    };
    config.save(path)
}

/// `RUST_LOG` takes priority; otherwise `--verbose`, then the configured level.
fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        logging.level.as_deref().unwrap_or("info")
    };
    let directives = std::iter::once(level.to_string())
        .chain(logging.filters.iter().cloned())
        .collect::<Vec<_>>()
        .join(",");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (logging.format.as_str(), logging.output.as_str()) {
        ("json", "stdout") => builder.json().with_writer(std::io::stdout).init(),
        ("json", _) => builder.json().with_writer(std::io::stderr).init(),
        (_, "stdout") => builder.with_writer(std::io::stdout).init(),
        _ => builder.with_writer(std::io::stderr).init(),
    }
}
