use clap::Parser;
use rewritarr_proxy::{Proxy, ProxyConfig};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOGO: &str = r"
                         _ _
 _ __ _____      ___ __ (_) |_ __ _ _ __ _ __
| '__/ _ \ \ /\ / / '__|| | __/ _` | '__| '__|
| | |  __/\ V  V /| |   | | || (_| | |  | |
|_|  \___| \_/\_/ |_|   |_|\__\__,_|_|  |_|
";

#[derive(Debug, Parser)]
#[command(name = "rewritarr", about = "Newznab attribute title rewrite proxy")]
struct Cli {
    /// Listen port, overrides PROXY_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Log verbosity, overrides LOG_LEVEL
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();

    let log_level = cli
        .log_level
        .or_else(|| std::env::var("LOG_LEVEL").ok())
        .unwrap_or_else(|| "info".to_string());
    init_tracing(&log_level);

    let mut config = ProxyConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(port) = cli.port {
        config.listen.port = port;
    }

    println!("{LOGO}");
    info!("rewritarr v{}", env!("CARGO_PKG_VERSION"));
    info!("proxy port:         {}", config.listen.port);
    info!(
        "upstream proxy:     {}",
        config
            .upstream
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "none (direct)".to_string())
    );
    info!("rewrite music:      {}", config.rewrite.music);
    info!("rewrite books:      {}", config.rewrite.books);
    info!("rewrite audiobooks: {}", config.rewrite.audiobooks);
    info!("best effort:        {}", config.rewrite.best_effort);
    info!("debug attrs:        {}", config.rewrite.debug_attrs);
    info!("log level:          {}", log_level);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutting down...");
        let _ = shutdown_tx.send(true);
    });

    let proxy = Proxy::new(config).map_err(|err| err.to_string())?;
    info!("configure the indexer proxy in Prowlarr with http:// indexer URLs");
    proxy.run(shutdown_rx).await.map_err(|err| err.to_string())?;

    info!("server stopped");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_ascii_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
