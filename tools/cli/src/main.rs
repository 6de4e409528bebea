//! debridgate CLI - run the gateway, issue proxy links and query stores.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use debridgate_common::TunnelType;
use debridgate_gateway::GatewayConfig;
use debridgate_proxy::{create_proxy_link, ProxyLinkRequest};
use debridgate_store::{
    AddMagnetInput, DriveBrowser, ListFilesQuery, ListMagnetsParams, MagnetSummary, MemoryCache,
    Store, StoreContext, StoreRegistry,
};

#[derive(Parser)]
#[command(name = "debridgate")]
#[command(about = "debridgate - Debrid and cloud storage gateway")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Gateway configuration file (JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy link endpoint.
    Serve {
        /// Override the configured listen address.
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Issue a proxy link for a URL.
    Link {
        /// Target URL.
        url: String,

        /// Proxy user the link is issued for.
        #[arg(short, long)]
        user: String,

        /// User secret (default: looked up in the configuration).
        #[arg(short, long)]
        password: Option<String>,

        /// Request header replayed upstream, as `Name: value`.
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Tunnel for the upstream fetch: "direct" or "proxy".
        #[arg(short, long)]
        tunnel: Option<TunnelType>,

        /// Link lifetime in seconds (0 for none).
        #[arg(short, long, default_value_t = 0)]
        expires_in: u64,

        /// Encrypt the target URL inside the token.
        #[arg(long)]
        encrypt: bool,

        /// Filename appended to the link.
        #[arg(short, long)]
        filename: Option<String>,
    },

    /// Query a configured store.
    Store {
        /// Store name or code (e.g. "pikpak", "pp").
        store: String,

        /// Credential to use instead of the configured one.
        #[arg(short = 'k', long)]
        api_key: Option<String>,

        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Show the account behind the credential.
    User,

    /// List content items.
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Show one content item with its files.
    Get {
        id: String,
    },

    /// Add a magnet URI or info hash.
    Add {
        magnet: String,
    },

    /// Remove a content item.
    Remove {
        id: String,
    },

    /// Check cached availability of magnets.
    Check {
        magnets: Vec<String>,
    },

    /// Resolve a locked file link to a playable URL.
    Resolve {
        link: String,
    },

    /// Browse the drive behind the store.
    Files {
        /// Folder id, the drive root when omitted.
        #[arg(default_value = "")]
        parent: String,

        /// Walk every subfolder.
        #[arg(long, conflicts_with_all = ["flat", "videos"])]
        recursive: bool,

        /// Walk every subfolder, files only.
        #[arg(long, conflicts_with = "videos")]
        flat: bool,

        /// Only video files directly in the folder.
        #[arg(long)]
        videos: bool,

        #[arg(long, default_value_t = 100)]
        page_size: u32,

        #[arg(long)]
        page_token: Option<String>,
    },

    /// Search the drive root by name.
    Search {
        query: String,

        #[arg(long)]
        page_token: Option<String>,
    },

    /// Find a folder by name.
    Folder {
        name: String,

        /// Folder to look in, the drive root when omitted.
        #[arg(long, default_value = "")]
        parent: String,
    },

    /// Show metadata of one drive file or folder.
    File {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { listen } => cmd_serve(config, listen).await,

        Commands::Link {
            url,
            user,
            password,
            headers,
            tunnel,
            expires_in,
            encrypt,
            filename,
        } => {
            let password = match password {
                Some(password) => password,
                None => config
                    .proxy_auth
                    .password(&user)
                    .map(str::to_string)
                    .with_context(|| format!("No secret configured for user '{}'", user))?,
            };

            let mut request = ProxyLinkRequest::new(url, user, password)
                .with_expires_in(Duration::from_secs(expires_in))
                .with_encryption(encrypt);
            for header in &headers {
                let (name, value) = parse_header(header)?;
                request = request.with_header(name, value);
            }
            if let Some(tunnel) = tunnel {
                request = request.with_tunnel(tunnel);
            }
            if let Some(filename) = filename {
                request = request.with_filename(filename);
            }

            cmd_link(&config, &request)
        }

        Commands::Store {
            store,
            api_key,
            action,
        } => cmd_store(&config, &store, api_key, action).await,
    }
}

/// Load the configuration file, or defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    match path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            GatewayConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => Ok(GatewayConfig::default()),
    }
}

/// Split a `Name: value` header argument.
fn parse_header(header: &str) -> Result<(&str, &str)> {
    let (name, value) = header
        .split_once(':')
        .with_context(|| format!("Invalid header '{}', expected 'Name: value'", header))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Invalid header '{}', name is empty", header);
    }
    Ok((name, value.trim()))
}

/// Run the gateway.
async fn cmd_serve(mut config: GatewayConfig, listen: Option<String>) -> Result<()> {
    if let Some(listen) = listen {
        config.listen = listen;
    }

    if config.proxy_auth.is_empty() {
        info!("No proxy users configured, every proxy link will be rejected");
    }

    debridgate_gateway::serve(&config)
        .await
        .context("Gateway failed")
}

/// Print a proxy link.
fn cmd_link(config: &GatewayConfig, request: &ProxyLinkRequest) -> Result<()> {
    let link =
        create_proxy_link(&config.base_url, request).context("Failed to create proxy link")?;
    println!("{}", link);
    Ok(())
}

/// Run one store operation and print the result as JSON.
async fn cmd_store(
    config: &GatewayConfig,
    store: &str,
    api_key: Option<String>,
    action: StoreAction,
) -> Result<()> {
    let registry = StoreRegistry::from_config(
        &config.stores,
        &config.transport,
        Arc::new(MemoryCache::<Vec<MagnetSummary>>::new()),
    )
    .context("Failed to build store registry")?;

    let store = registry
        .resolve(store)
        .with_context(|| format!("Store '{}' is not configured", store))?;

    let mut ctx = StoreContext::new();
    if let Some(api_key) = api_key {
        ctx = ctx.with_api_key(api_key);
    }

    run_store_action(store.as_ref(), &ctx, action).await
}

async fn run_store_action(
    store: &dyn Store,
    ctx: &StoreContext,
    action: StoreAction,
) -> Result<()> {
    let name = store.name();

    match action {
        StoreAction::User => {
            let user = store
                .get_user(ctx)
                .await
                .with_context(|| format!("Failed to fetch {} user", name))?;
            print_json(&user)
        }

        StoreAction::List { offset, limit } => {
            let page = store
                .list_magnets(ctx, ListMagnetsParams::new(offset, limit))
                .await
                .with_context(|| format!("Failed to list {} magnets", name))?;
            print_json(&page)
        }

        StoreAction::Get { id } => {
            let item = store
                .get_magnet(ctx, &id)
                .await
                .with_context(|| format!("Failed to fetch {} magnet {}", name, id))?;
            print_json(&item)
        }

        StoreAction::Add { magnet } => {
            let item = store
                .add_magnet(ctx, AddMagnetInput::Magnet(magnet))
                .await
                .with_context(|| format!("Failed to add magnet to {}", name))?;
            print_json(&item)
        }

        StoreAction::Remove { id } => {
            let removed = store
                .remove_magnet(ctx, &id)
                .await
                .with_context(|| format!("Failed to remove {} magnet {}", name, id))?;
            println!("Removed {}", removed);
            Ok(())
        }

        StoreAction::Check { magnets } => {
            let items = store
                .check_magnet(ctx, &magnets)
                .await
                .with_context(|| format!("Failed to check magnets on {}", name))?;
            print_json(&items)
        }

        StoreAction::Resolve { link } => {
            let url = store
                .generate_link(ctx, &link)
                .await
                .with_context(|| format!("Failed to resolve link on {}", name))?;
            println!("{}", url);
            Ok(())
        }

        StoreAction::Files {
            parent,
            recursive,
            flat,
            videos,
            page_size,
            page_token,
        } => {
            let browser = drive(store)?;
            let context = || format!("Failed to list {} folder '{}'", name, parent);
            if recursive {
                let items = browser
                    .list_files_recursive(ctx, &parent)
                    .await
                    .with_context(context)?;
                print_json(&items)
            } else if flat {
                let items = browser
                    .list_files_flat(ctx, &parent)
                    .await
                    .with_context(context)?;
                print_json(&items)
            } else if videos {
                let items = browser
                    .list_video_files(ctx, &parent)
                    .await
                    .with_context(context)?;
                print_json(&items)
            } else {
                let query = ListFilesQuery::new(parent.clone())
                    .with_page_size(page_size)
                    .with_page_token(page_token);
                let page = browser
                    .list_files(ctx, &query)
                    .await
                    .with_context(context)?;
                print_json(&page)
            }
        }

        StoreAction::Search { query, page_token } => {
            let page = drive(store)?
                .search_files(ctx, &query, page_token)
                .await
                .with_context(|| format!("Failed to search {} for '{}'", name, query))?;
            print_json(&page)
        }

        StoreAction::Folder { name: folder, parent } => {
            let item = drive(store)?
                .get_folder_by_name(ctx, &parent, &folder)
                .await
                .with_context(|| format!("Failed to find {} folder '{}'", name, folder))?;
            print_json(&item)
        }

        StoreAction::File { id } => {
            let item = drive(store)?
                .get_file_details(ctx, &id)
                .await
                .with_context(|| format!("Failed to fetch {} file {}", name, id))?;
            print_json(&item)
        }
    }
}

fn drive(store: &dyn Store) -> Result<&dyn DriveBrowser> {
    store
        .browser()
        .with_context(|| format!("Store '{}' has no browsable drive", store.name()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
