use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use readsgood::config::{find_config_file, get_config, load_config, redacted, Config, LogFormat};
use readsgood::models::{CallerIdentity, ConnectionStatus, NormalizedBookDetail, SearchResultPage};
use readsgood::oauth::SIMPLIFIED_VERIFIER;
use readsgood::server::{self, AppState};
use readsgood::CatalogGateway;
use std::io::{BufRead, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// readsgood - Search a book catalog behind per-user OAuth 1.0a authorization
#[derive(Parser, Debug)]
#[command(name = "readsgood")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search a book catalog and fetch book details", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Caller identity to act as
    #[arg(long, short, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

impl OutputFormat {
    fn resolve(self) -> OutputFormat {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the catalog
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Result page (1-based, 20 results per page)
        #[arg(long, short, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,
    },

    /// Show one book by id
    #[command(alias = "b")]
    Book {
        /// Catalog book id
        id: String,
    },

    /// Authorize with the catalog provider
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Run the HTTP API
    Serve {
        /// Address to bind, overrides `server.bind`
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Inspect or create configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum AuthCommands {
    /// Run the OAuth handshake interactively
    Login,
    /// Show whether the caller is connected
    Status,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Write a starter configuration file
    Init {
        /// Where to write it, defaults to `<config dir>/readsgood/config.toml`
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => get_config(),
    };

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match cli.command {
        Commands::Config { command } => run_config(command, &config),
        Commands::Serve { bind } => {
            let addr = match bind {
                Some(addr) => addr,
                None => config
                    .server
                    .bind
                    .parse()
                    .with_context(|| format!("invalid server.bind '{}'", config.server.bind))?,
            };
            let gateway = CatalogGateway::from_config(&config).await?;
            let state = AppState::new(
                gateway,
                config.anonymous_policy(),
                config.server.frontend_url.clone(),
            );
            server::serve(state, addr).await?;
            Ok(())
        }
        Commands::Search { query, page } => {
            let (gateway, caller) = connect(&config, cli.user.as_deref()).await?;
            let result = gateway.search(&caller, &query, page).await?;
            output_page(&result, cli.output, cli.quiet);
            Ok(())
        }
        Commands::Book { id } => {
            let (gateway, caller) = connect(&config, cli.user.as_deref()).await?;
            let book = gateway.get_book_by_id(&caller, &id).await?;
            output_book(&book, cli.output)
        }
        Commands::Auth { command } => {
            let (gateway, caller) = connect(&config, cli.user.as_deref()).await?;
            match command {
                AuthCommands::Login => login(&gateway, &caller).await,
                AuthCommands::Status => {
                    let status = gateway.connection_status(&caller).await;
                    output_status(&caller, &status, cli.output)
                }
            }
        }
    }
}

fn init_tracing(cli: &Cli, config: &Config) {
    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("readsgood={}", env_filter)),
    );
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn connect(config: &Config, user: Option<&str>) -> Result<(CatalogGateway, CallerIdentity)> {
    let caller = CallerIdentity::resolve(user, &config.anonymous_policy())
        .context("no caller identity: pass --user or set identity.anonymous = \"placeholder\"")?;
    let gateway = CatalogGateway::from_config(config).await?;
    Ok((gateway, caller))
}

/// Interactive handshake: the pending request token only lives in this
/// process, so the callback is completed here rather than over HTTP
async fn login(gateway: &CatalogGateway, caller: &CallerIdentity) -> Result<()> {
    let authorize_url = gateway.init_oauth(caller).await?;
    let request_token = gateway
        .tokens()
        .pending(caller)
        .map(|pending| pending.request_token)
        .unwrap_or_default();

    println!("Open this URL and authorize readsgood:\n\n  {}\n", authorize_url);
    print!("Paste the verifier, or press Enter once authorized: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let verifier = match line.trim() {
        "" => SIMPLIFIED_VERIFIER,
        value => value,
    };

    gateway
        .handle_callback(caller, &request_token, verifier)
        .await?;
    println!("Connected as {}", caller);
    Ok(())
}

fn run_config(command: ConfigCommands, config: &Config) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("{}", redacted(config).to_toml()?);
        }
        ConfigCommands::Init { path } => {
            let path = match path {
                Some(path) => path,
                None => dirs::config_dir()
                    .context("no config directory on this platform, pass --path")?
                    .join("readsgood")
                    .join("config.toml"),
            };
            Config::write_template(&path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn output_page(page: &SearchResultPage, format: OutputFormat, quiet: bool) {
    match format.resolve() {
        OutputFormat::Json => match serde_json::to_string_pretty(page) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: {}", e),
        },
        _ => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Book ID", "Title", "Author", "Year", "Rating"]);

            for work in &page.items {
                table.add_row(vec![
                    Cell::new(work.best_book.as_ref().map(|b| b.id.as_str()).unwrap_or("")),
                    Cell::new(truncate(work.title(), 50)).add_attribute(Attribute::Bold),
                    Cell::new(truncate(work.primary_author(), 30)),
                    Cell::new(work.original_publication_year.as_deref().unwrap_or("")),
                    Cell::new(work.average_rating.as_deref().unwrap_or("")),
                ]);
            }
            println!("{table}");
            if !quiet {
                println!(
                    "Page {} of {} ({} results)",
                    page.current_page, page.total_pages, page.total_results
                );
            }
        }
    }
}

fn output_book(book: &NormalizedBookDetail, format: OutputFormat) -> Result<()> {
    match format.resolve() {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(book)?),
        _ => {
            use comfy_table::Table;
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);

            let authors = book
                .authors
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let rows = [
                ("ID", Some(book.id.as_str())),
                ("Title", Some(book.title.as_str())),
                ("Authors", Some(authors.as_str())),
                ("ISBN", book.isbn.as_deref()),
                ("ISBN13", book.isbn13.as_deref()),
                ("Publisher", book.publisher.as_deref()),
                ("Year", book.publication_year.as_deref()),
                ("Pages", book.num_pages.as_deref()),
                ("Rating", book.average_rating.as_deref()),
                ("Link", book.link.as_deref()),
            ];
            for (label, value) in rows {
                if let Some(value) = value.filter(|v| !v.is_empty()) {
                    table.add_row(vec![label, value]);
                }
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_status(caller: &CallerIdentity, status: &ConnectionStatus, format: OutputFormat) -> Result<()> {
    match format.resolve() {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(status)?),
        _ => {
            if status.connected {
                println!("{}: connected", caller);
            } else {
                println!("{}: not connected (run `readsgood auth login`)", caller);
            }
        }
    }
    Ok(())
}
