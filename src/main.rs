use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use vcd_filter::config::{load_filter_file, Config};
use vcd_filter::filter::{
    get_catalog_by_filter, get_catalog_item_by_filter, get_edge_gateway_by_filter,
    get_media_by_filter, get_network_by_filter, NetworkKind,
};
use vcd_filter::vcd::auth::LoginInfo;
use vcd_filter::vcd::client::{format_vcd_error, VcdClient};
use vcd_filter::vcd::entities::{Org, Vdc};

/// Resolve VMware Cloud Director entities by filter
#[derive(Parser, Debug)]
#[command(name = "vcd-filter", version = vcd_filter::VERSION, about, long_about = None)]
struct Args {
    /// VCD endpoint, e.g. https://vcd.example.com/api
    #[arg(long)]
    endpoint: Option<String>,

    /// Organization to log in to (System for provider sessions)
    #[arg(short, long)]
    org: Option<String>,

    /// User name
    #[arg(short, long)]
    user: Option<String>,

    /// VDC for network and edge gateway lookups
    #[arg(long)]
    vdc: Option<String>,

    /// Tenant org to search when logged in as System (defaults to --org)
    #[arg(long)]
    target_org: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Store the connection flags as defaults
    #[arg(long)]
    save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find a catalog
    Catalog {
        #[arg(short, long)]
        filter: PathBuf,
    },
    /// Find a vApp template in a catalog
    CatalogItem {
        #[arg(short, long)]
        catalog: String,
        #[arg(short, long)]
        filter: PathBuf,
    },
    /// Find a media image in a catalog
    Media {
        #[arg(short, long)]
        catalog: String,
        #[arg(short, long)]
        filter: PathBuf,
    },
    /// Find an org VDC network
    Network {
        /// routed, isolated or direct
        #[arg(short, long, default_value = "routed")]
        kind: NetworkKind,
        #[arg(short, long)]
        filter: PathBuf,
    },
    /// Find an edge gateway
    EdgeGateway {
        #[arg(short, long)]
        filter: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("vcd-filter started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("vcd-filter").join("vcd-filter.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".vcd-filter").join("vcd-filter.log");
    }
    PathBuf::from("vcd-filter.log")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

struct Session {
    client: VcdClient,
    config: Config,
    target_org: String,
}

impl Session {
    async fn org(&self) -> Result<Org> {
        self.client.get_org_by_name(&self.target_org).await
    }

    async fn vdc(&self) -> Result<Vdc> {
        let name = Config::require(&self.config.vdc, "vdc")?;
        self.org().await?.get_vdc_by_name(name).await
    }
}

async fn connect(args: &Args) -> Result<Session> {
    let mut config = Config::load();
    config.merge_cli(
        args.endpoint.clone(),
        args.org.clone(),
        args.user.clone(),
        args.vdc.clone(),
    );

    if args.save {
        config.save()?;
    }

    let login = LoginInfo {
        user: Config::require(&config.user, "user")?.to_string(),
        password: Config::password()?,
        org: Config::require(&config.org, "org")?.to_string(),
    };
    let target_org = args.target_org.clone().unwrap_or_else(|| login.org.clone());

    let client = VcdClient::new(
        Config::require(&config.endpoint, "endpoint")?,
        login,
        &config.effective_api_version(),
        config.allow_unverified_ssl,
    )
    .await?;

    Ok(Session {
        client,
        config,
        target_org,
    })
}

async fn run(args: Args) -> Result<()> {
    let session = connect(&args).await?;
    let is_sys_admin = session.client.is_sys_admin();

    match &args.command {
        Command::Catalog { filter } => {
            let org = session.org().await?;
            let filter = load_filter_file(filter)?;
            let catalog = get_catalog_by_filter(&org, &filter, is_sys_admin).await?;
            print_json(&catalog.catalog)
        }
        Command::CatalogItem { catalog, filter } => {
            let catalog = session.org().await?.get_catalog_by_name(catalog).await?;
            let filter = load_filter_file(filter)?;
            let item = get_catalog_item_by_filter(&catalog, &filter, is_sys_admin).await?;
            print_json(&item.catalog_item)
        }
        Command::Media { catalog, filter } => {
            let catalog = session.org().await?.get_catalog_by_name(catalog).await?;
            let filter = load_filter_file(filter)?;
            let media = get_media_by_filter(&catalog, &filter, is_sys_admin).await?;
            print_json(&media.media)
        }
        Command::Network { kind, filter } => {
            let vdc = session.vdc().await?;
            let network = get_network_by_filter(&vdc, &load_filter_file(filter)?, *kind).await?;
            print_json(&network.network)
        }
        Command::EdgeGateway { filter } => {
            let vdc = session.vdc().await?;
            let gateway = get_edge_gateway_by_filter(&vdc, &load_filter_file(filter)?).await?;
            print_json(&gateway.edge_gateway)
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    if let Err(e) = run(args).await {
        tracing::error!("lookup failed: {:#}", e);
        eprintln!("Error: {}", format_vcd_error(&e));
        drop(log_guard);
        std::process::exit(1);
    }
}
