use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use url::Url;
use web2onenote_core::fetch::{DEFAULT_DIRECT_TIMEOUT, DEFAULT_PROXY_TIMEOUT, default_proxies};
use web2onenote_core::graph::GRAPH_BASE_URL;
use web2onenote_core::identity::{DEFAULT_AUTHORITY, default_cache_path};
use web2onenote_core::{
    Clipper, ExtractConfig, FetchConfig, GraphClient, GraphConfig, IdentityConfig, MicrosoftIdentity,
    NotebookPublisher, OutputFormat, ProxyEndpoint, ProxyFetcher, SessionManager, StaticTokenIdentity, load_article,
};

use crate::provider::Provider;

mod echo;
mod provider;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const NOT_SIGNED_IN: &str = "Not signed in, run `web2onenote login` first";

/// Output format for extracted content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Html,
    Text,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" | "htm" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: html, text, json", s)),
        }
    }
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Html => OutputFormat::Html,
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

/// Clip web articles into OneNote
#[derive(Parser, Debug)]
#[command(name = "web2onenote")]
#[command(version)]
#[command(about = "Clip web articles into OneNote", long_about = None)]
struct Cli {
    /// Application (client) id registered with the Microsoft identity platform
    #[arg(long, env = "WEB2ONENOTE_CLIENT_ID", global = true, value_name = "ID")]
    client_id: Option<String>,

    /// Access token to use instead of signing in
    #[arg(long, env = "WEB2ONENOTE_ACCESS_TOKEN", global = true, hide_env_values = true, value_name = "TOKEN")]
    access_token: Option<String>,

    /// Identity platform authority
    #[arg(long, global = true, default_value = DEFAULT_AUTHORITY, value_name = "URL")]
    authority: String,

    /// Session cache file (default: user cache directory)
    #[arg(long, global = true, value_name = "FILE")]
    token_cache: Option<PathBuf>,

    /// Keep the session in memory only
    #[arg(long, global = true, conflicts_with = "token_cache")]
    no_token_cache: bool,

    /// Microsoft Graph base URL
    #[arg(long, global = true, default_value = GRAPH_BASE_URL, value_name = "URL")]
    graph_url: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the article from a page and print it
    Extract(ExtractArgs),
    /// Sign in with a device code
    Login,
    /// Sign out and forget the cached session
    Logout,
    /// Show who is signed in
    Status,
    /// List notebooks and the sections of the selected notebook
    Notebooks {
        /// Notebook to show sections for (id or name)
        #[arg(long, value_name = "NOTEBOOK")]
        notebook: Option<String>,
    },
    /// Extract a page and save it to OneNote
    Save(SaveArgs),
    /// Generate a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Where a page comes from and how to fetch it
#[derive(Args, Debug)]
struct SourceArgs {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Proxy URL template with a {url} placeholder, repeatable, replaces the defaults
    #[arg(long = "proxy", value_name = "TEMPLATE")]
    proxies: Vec<String>,

    /// Skip the proxies and fetch directly
    #[arg(long, conflicts_with = "proxies")]
    no_proxy: bool,

    /// Timeout per proxy attempt in seconds
    #[arg(long, default_value_t = DEFAULT_PROXY_TIMEOUT.as_secs(), value_name = "SECS")]
    proxy_timeout: u64,

    /// Timeout for the direct attempt in seconds
    #[arg(long, default_value_t = DEFAULT_DIRECT_TIMEOUT.as_secs(), value_name = "SECS")]
    direct_timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

impl SourceArgs {
    fn fetch_config(&self) -> FetchConfig {
        let proxies = if self.no_proxy {
            Vec::new()
        } else if self.proxies.is_empty() {
            default_proxies()
        } else {
            self.proxies
                .iter()
                .enumerate()
                .map(|(index, template)| ProxyEndpoint::new(proxy_name(index, template), template.clone()))
                .collect()
        };

        let mut builder = FetchConfig::builder()
            .proxies(proxies)
            .proxy_timeout(Duration::from_secs(self.proxy_timeout))
            .direct_timeout(Duration::from_secs(self.direct_timeout));
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        builder.build()
    }
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output format (html, text, json)
    #[arg(short, long, default_value = "html", value_name = "FORMAT")]
    format: Format,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SaveArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Page title (default: the extracted title)
    #[arg(long)]
    title: Option<String>,

    /// File whose HTML replaces the extracted content
    #[arg(long, value_name = "FILE")]
    content_file: Option<PathBuf>,

    /// Target notebook (id or name)
    #[arg(long, value_name = "NOTEBOOK")]
    notebook: Option<String>,

    /// Target section (id or name)
    #[arg(long, value_name = "SECTION")]
    section: Option<String>,
}

/// Names a user-supplied proxy after its host, or its position.
fn proxy_name(index: usize, template: &str) -> String {
    Url::parse(&template.replace("{url}", ""))
        .ok()
        .and_then(|url| {
            url.host_str().map(|host| match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            })
        })
        .unwrap_or_else(|| format!("proxy-{}", index + 1))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn provider(cli: &Cli) -> anyhow::Result<Provider> {
    if let Some(token) = cli.access_token.as_deref().filter(|token| !token.trim().is_empty()) {
        return Ok(Provider::Token(StaticTokenIdentity::new(token)));
    }

    let cache_path = if cli.no_token_cache { None } else { cli.token_cache.clone().or_else(default_cache_path) };
    let config = IdentityConfig::builder()
        .client_id(cli.client_id.clone().unwrap_or_default())
        .authority(&cli.authority)
        .cache_path(cache_path)
        .build();

    let identity = MicrosoftIdentity::new(config).context("Failed to set up sign-in")?;
    Ok(Provider::Microsoft(identity.with_prompt(echo::print_device_code)))
}

fn clipper(cli: &Cli, fetch: FetchConfig) -> anyhow::Result<Clipper<Provider>> {
    let provider = provider(cli)?;
    let fetcher = ProxyFetcher::new(fetch).context("Failed to set up the HTTP client")?;
    let graph = GraphClient::new(GraphConfig::builder().base_url(&cli.graph_url).build())
        .with_context(|| format!("Invalid Graph URL: {}", cli.graph_url))?;

    Ok(Clipper::new(fetcher, ExtractConfig::default(), SessionManager::new(provider), NotebookPublisher::new(graph)))
}

fn write_output(output: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => println!("{}", output),
    }
    Ok(())
}

async fn extract(cli: &Cli, args: &ExtractArgs) -> anyhow::Result<()> {
    let input = &args.source.input;
    if cli.verbose {
        echo::print_step(1, 2, &format!("Reading {}", input.bright_white().underline()));
    }

    let fetcher = ProxyFetcher::new(args.source.fetch_config()).context("Failed to set up the HTTP client")?;
    let started = Instant::now();
    let (article, route) = load_article(&fetcher, &ExtractConfig::default(), input)
        .await
        .with_context(|| format!("Failed to extract content from {}", input))?;

    if cli.verbose {
        echo::print_timing("Fetch and extract", started.elapsed());
        echo::print_extraction_details(&article, route.as_ref());
        echo::print_step(2, 2, &format!("Writing {:?} output", args.format));
    }

    let output = article.to_format(args.format.into()).context("Failed to format the article")?;
    write_output(&output, args.output.as_deref())
}

async fn save(cli: &Cli, args: &SaveArgs) -> anyhow::Result<()> {
    let mut clipper = clipper(cli, args.source.fetch_config())?;

    if cli.verbose {
        echo::print_step(1, 4, "Loading notebooks");
    }
    clipper.initialize().await.context("Failed to load notebooks")?;
    if !clipper.session().is_signed_in() {
        bail!(NOT_SIGNED_IN);
    }

    if cli.verbose {
        echo::print_step(2, 4, &format!("Extracting {}", args.source.input.bright_white().underline()));
    }
    let started = Instant::now();
    clipper
        .extract(&args.source.input)
        .await
        .with_context(|| format!("Failed to extract content from {}", args.source.input))?;
    if cli.verbose {
        echo::print_timing("Fetch and extract", started.elapsed());
        if let Some(article) = clipper.article() {
            echo::print_extraction_details(article, clipper.last_route());
        }
    }

    if let Some(title) = &args.title {
        clipper.set_title(title)?;
    }
    if let Some(path) = &args.content_file {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
        clipper.set_content(&content)?;
    }

    if cli.verbose {
        echo::print_step(3, 4, "Choosing a section");
    }
    if let Some(key) = &args.notebook {
        let notebook_id = clipper
            .publisher()
            .find_notebook(key)
            .map(|n| n.id.clone())
            .with_context(|| format!("No notebook matches {}", key))?;
        clipper.select_notebook(&notebook_id).await.context("Failed to load sections")?;
    }
    if let Some(key) = &args.section {
        let section_id = clipper
            .publisher()
            .find_section(key)
            .map(|s| s.id.clone())
            .with_context(|| format!("No section matches {}", key))?;
        clipper.select_section(&section_id);
    }

    if cli.verbose {
        echo::print_step(4, 4, "Saving to OneNote");
    }
    let page = clipper.save().await.context("Failed to save to OneNote")?;

    echo::print_success("Saved to OneNote");
    if let Some(link) = page.web_url.or(page.id) {
        println!("{}", link);
    }
    Ok(())
}

async fn notebooks(cli: &Cli, notebook: Option<&str>) -> anyhow::Result<()> {
    let mut clipper = clipper(cli, FetchConfig::default())?;
    clipper.initialize().await.context("Failed to load notebooks")?;
    if !clipper.session().is_signed_in() {
        bail!(NOT_SIGNED_IN);
    }

    if let Some(key) = notebook {
        let notebook_id = clipper
            .publisher()
            .find_notebook(key)
            .map(|n| n.id.clone())
            .with_context(|| format!("No notebook matches {}", key))?;
        clipper.select_notebook(&notebook_id).await.context("Failed to load sections")?;
    }

    let publisher = clipper.publisher();
    if publisher.notebooks().is_empty() {
        echo::print_warning("No notebooks found");
        return Ok(());
    }
    echo::print_catalog(
        publisher.notebooks(),
        publisher.selected_notebook(),
        publisher.sections(),
        publisher.selected_section(),
    );
    Ok(())
}

async fn login(cli: &Cli) -> anyhow::Result<()> {
    let mut clipper = clipper(cli, FetchConfig::default())?;
    let account = clipper.login().await.context("Sign-in failed")?;

    echo::print_success(&format!("Signed in as {}", account.display_name()));
    if let Some(error) = clipper.error() {
        echo::print_warning(error);
    }
    Ok(())
}

async fn logout(cli: &Cli) -> anyhow::Result<()> {
    let mut clipper = clipper(cli, FetchConfig::default())?;
    clipper.logout().await.context("Sign-out failed")?;

    echo::print_success("Signed out");
    Ok(())
}

fn status(cli: &Cli) -> anyhow::Result<()> {
    let mut session = SessionManager::new(provider(cli)?);
    session.check_status();

    match session.account() {
        Some(account) => println!("Signed in as {}", account.display_name()),
        None => println!("Signed out"),
    }
    Ok(())
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Extract(args) => extract(cli, args).await,
        Commands::Login => login(cli).await,
        Commands::Logout => logout(cli).await,
        Commands::Status => status(cli),
        Commands::Notebooks { notebook } => notebooks(cli, notebook.as_deref()).await,
        Commands::Save(args) => save(cli, args).await,
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "web2onenote", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    run(&cli).await
}
