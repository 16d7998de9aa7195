//! NextGCore ETAF daemon
//!
//! Loads the configuration, builds the shared context registry and drives
//! the per-UE procedure timers until a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use nextgcore_etafd::config::EtafConfig;
use nextgcore_etafd::context::EtafContext;
use nextgcore_etafd::error::ConfigError;
use nextgcore_etafd::timer::{EtafTimerId, TimerExpiry};

/// Version advertised for every SBI service
const SBI_SERVICE_VERSION: &str = "1.0.0";

/// NextGCore ETAF - Edge Tracking and Access Function
#[derive(Parser, Debug)]
#[command(name = "nextgcore-etafd")]
#[command(author = "NextGCore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "5G Core Edge Tracking and Access Function")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/nextgcore/etaf.yaml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Disable color output
    #[arg(long)]
    no_color: bool,

    /// SBI address override (e.g., "127.0.0.18:8000")
    #[arg(long)]
    sbi_addr: Option<String>,

    /// Timer poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
}

/// ETAF application state
pub struct EtafApp {
    running: Arc<AtomicBool>,
    context: Arc<EtafContext>,
}

impl EtafApp {
    /// Load the configuration and build the registry
    pub fn init(config_path: &str, sbi_addr: Option<&str>) -> Result<Self> {
        log::info!("Initializing ETAF...");

        let mut config = Self::load_config(config_path)?;
        if let Some(sbi_addr) = sbi_addr {
            let addr: SocketAddr = sbi_addr
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid SBI address '{}': {}", sbi_addr, e))?;
            config.register_ipv4 = addr.ip().to_string();
            config.binding_ipv4 = addr.ip().to_string();
            config.sbi_port = addr.port();
        }

        if config.served_guami_list.is_empty() {
            log::warn!("No served GUAMI configured; GUTI allocation will fail");
        }

        let context = Arc::new(EtafContext::new(config));
        let service_names = context.config().service_name_list.clone();
        context.init_nf_service(&service_names, SBI_SERVICE_VERSION);

        log::info!(
            "ETAF [{}] initialized, SBI {} ({} services)",
            context.nf_id(),
            context.ipv4_uri(),
            service_names.len()
        );

        Ok(Self {
            running: Arc::new(AtomicBool::new(true)),
            context,
        })
    }

    fn load_config(config_path: &str) -> Result<EtafConfig> {
        log::info!("Loading configuration from: {}", config_path);

        match EtafConfig::load(config_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io(e)) => {
                log::warn!(
                    "Could not read config file '{}': {}. Using defaults.",
                    config_path,
                    e
                );
                Ok(EtafConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("Failed to load config '{}': {}", config_path, e)),
        }
    }

    /// Poll UE procedure timers until stopped
    pub async fn run(&self, tick: Duration) -> Result<()> {
        log::info!("ETAF running...");

        let mut interval = tokio::time::interval(tick);
        while self.running.load(Ordering::SeqCst) {
            interval.tick().await;
            self.poll_timers(Instant::now());
        }

        log::info!("ETAF main loop exited");
        Ok(())
    }

    /// Re-arm or stop every UE timer whose deadline has passed
    fn poll_timers(&self, now: Instant) {
        let timers = self.context.config().timers.clone();

        for ue in self.context.etaf_ue_list() {
            let mut ue = ue.write();
            for timer_id in ue.timers.expired(now) {
                let config = timers.get(timer_id);
                if !config.enabled {
                    ue.timers.get_mut(timer_id).stop();
                    continue;
                }
                match ue.timers.get_mut(timer_id).expire(now, config) {
                    TimerExpiry::Retransmit { retry_count } => log::debug!(
                        "[{}] {} expired, retransmission #{}",
                        ue.log_id(),
                        timer_id.name(),
                        retry_count
                    ),
                    TimerExpiry::Exhausted => log::warn!(
                        "[{}] {} retries exhausted{}",
                        ue.log_id(),
                        timer_id.name(),
                        if timer_id == EtafTimerId::T3513 {
                            ", paging failed"
                        } else {
                            ""
                        }
                    ),
                }
            }
        }
    }

    pub fn shutdown(&self) {
        log::info!("Shutting down ETAF...");
        self.context.reset_all();
        log::info!("ETAF shutdown complete");
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .write_style(if args.no_color {
            env_logger::WriteStyle::Never
        } else {
            env_logger::WriteStyle::Auto
        })
        .init();

    log::info!("NextGCore ETAF v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Configuration: {}", args.config);

    let app = EtafApp::init(&args.config, args.sbi_addr.as_deref())?;

    let running = app.running_flag();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    app.run(Duration::from_millis(args.tick_ms.max(1))).await?;
    app.shutdown();

    log::info!("NextGCore ETAF terminated");
    Ok(())
}
