use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    parrot_config::ParrotConfig,
    parrot_notify::{GatedNotifier, Notifier, PushService, TracingNotifier},
    parrot_store::Store,
    parrot_sync::SyncLoop,
    parrot_translate::TranslationChain,
    parrot_web::AppState,
};

#[derive(Parser)]
#[command(name = "parrot", about = "Parrot, a translated-message watcher")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file path (overrides discovery).
    #[arg(long, global = true, env = "PARROT_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for logs and state (overrides config value).
    #[arg(long, global = true, env = "PARROT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address to bind the web UI to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port for the web UI (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the watcher (default when no subcommand is provided).
    Run,
    /// Exchange a registration code for an access token and store it.
    Register {
        /// Chat server base URL, e.g. https://chat.example.com.
        #[arg(long)]
        server: String,
        /// Registration code issued by the server.
        #[arg(long)]
        code: String,
    },
    /// Show unread count and log size.
    Status,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active config file path.
    Path,
    /// Print the resolved configuration.
    Show,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ParrotConfig> {
    match &cli.config {
        Some(path) => parrot_config::load_config(path),
        None => Ok(parrot_config::discover_and_load()),
    }
}

fn resolve_data_dir(cli: &Cli, config: &ParrotConfig) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &cli.data_dir {
        return Ok(dir.clone());
    }
    if let Some(dir) = &config.store.data_dir {
        return Ok(dir.clone());
    }
    parrot_config::data_dir().ok_or_else(|| anyhow::anyhow!("could not determine a data directory"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "parrot starting");

    match cli.command {
        None | Some(Commands::Run) => run(&cli).await,
        Some(Commands::Register { ref server, ref code }) => register(&cli, server, code).await,
        Some(Commands::Status) => status(&cli).await,
        Some(Commands::Config { ref action }) => config_command(&cli, action),
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let data_dir = resolve_data_dir(cli, &config)?;

    let store = Arc::new(Store::open(data_dir.clone(), config.store.max_entries).await?);

    // Push delivery when it initializes, tracing-only otherwise.
    let push = match PushService::new(&data_dir).await {
        Ok(push) => Some(push),
        Err(e) => {
            warn!(error = %e, "push service unavailable, notifications go to the log only");
            None
        },
    };
    let delivery: Arc<dyn Notifier> = match &push {
        Some(push) => push.clone(),
        None => Arc::new(TracingNotifier),
    };
    let notifier = Arc::new(GatedNotifier::new(delivery, &config.notify));

    let chain = Arc::new(TranslationChain::from_config(&config.translate));
    let cancel = CancellationToken::new();

    // Message sync loop.
    let mut sync_task = None;
    if let Some(endpoint) = config.sync.endpoint.clone() {
        let sync = SyncLoop::new(
            endpoint,
            Duration::from_secs(config.sync.interval_secs),
            store.clone(),
            notifier.clone(),
        );
        sync_task = Some(tokio::spawn(sync.run(cancel.clone())));
    } else {
        info!("sync endpoint not configured, polling disabled");
    }

    // Realtime listener, once registered.
    let socket = if config.server.url.is_some() && config.server.token.is_some() {
        match parrot_socket::start(
            &config.server,
            config.watch.clone(),
            store.clone(),
            chain,
            notifier.clone(),
        ) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "failed to start socket listener");
                None
            },
        }
    } else {
        info!("server credentials not configured, run `parrot register` to connect");
        None
    };

    // Web UI.
    let bind = cli.bind.clone().unwrap_or(config.web.bind);
    let port = cli.port.unwrap_or(config.web.port);
    let state = AppState {
        store,
        notifier: Some(notifier),
        push,
    };
    let web_task = tokio::spawn(async move {
        if let Err(e) = parrot_web::serve(&bind, port, state).await {
            warn!(error = %e, "web server exited");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    cancel.cancel();
    if let Some(task) = sync_task {
        let _ = task.await;
    }
    if let Some(client) = socket {
        client.shutdown().await;
    }
    web_task.abort();
    Ok(())
}

async fn register(cli: &Cli, server: &str, code: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let token = parrot_socket::register(&client, server, code).await?;

    let path = cli
        .config
        .clone()
        .unwrap_or_else(parrot_config::find_or_default_config_path);
    parrot_config::persist_credentials(&path, server, &token)?;

    println!("Registered with {server}");
    println!("Credentials stored in {}", path.display());

    // Confirm the credentials actually reach the server's socket endpoint.
    let ws_path = parrot_config::load_config(&path)?.server.ws_path;
    match parrot_socket::probe(&parrot_socket::ws_url(server, &ws_path), &token).await {
        Ok(()) => println!("Socket connection OK. Start the watcher with `parrot run`."),
        Err(e) => warn!(error = %e, "socket connection attempt failed"),
    }
    Ok(())
}

async fn status(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let data_dir = resolve_data_dir(cli, &config)?;
    let store = Store::open(data_dir, config.store.max_entries).await?;

    println!("unread:   {}", store.unread().await);
    println!("entries:  {}", store.entry_count().await?);
    println!(
        "last id:  {}",
        store.last_message_id().await.as_deref().unwrap_or("-")
    );
    Ok(())
}

fn config_command(cli: &Cli, action: &ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Path => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(parrot_config::find_or_default_config_path);
            println!("{}", path.display());
        },
        ConfigAction::Show => {
            let config = load_config(cli)?;
            println!("{}", toml::to_string_pretty(&config)?);
        },
    }
    Ok(())
}
