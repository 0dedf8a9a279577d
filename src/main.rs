// strandview - Status dashboard for networked LED strand controllers
// Polls the controller's /state endpoint and shows MQTT health, modes and per-LED colors
use anyhow::Result;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

mod backend;
mod config;
mod connectivity;
mod dashboard;
mod dispatch;
mod dom;
mod httpd;
mod logging;
mod modes;
mod palette;
mod poller;
mod renderer;
mod snapshot;
mod tui;

use backend::HttpBackend;
use config::{Args, DashboardConfig};
use dashboard::Dashboard;

// Commands waiting for the controller loop, mostly clicks from the HTML mirror
const COMMAND_QUEUE: usize = 16;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Get config file path (custom or default)
    let cfg_arg = args.cfg.as_deref();
    let config_path = DashboardConfig::config_path(cfg_arg)?;
    let config_file_exists = config_path.exists();

    let mut config = if config_file_exists {
        match DashboardConfig::load_with_path(cfg_arg) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("\nFailed to load config file: {:#}", e);
                eprintln!("Config file: {}", config_path.display());
                eprintln!("\nPlease fix the config file or delete it to regenerate with defaults.");
                return Err(e);
            }
        }
    } else {
        let mut default_config = DashboardConfig::default();
        default_config.config_path = Some(config_path.clone());
        default_config
    };

    let args_provided = config.merge_with_args(&args);

    // Save on first run, or to persist command-line choices
    if !config_file_exists || args_provided {
        config.save()?;
    }
    config.apply_run_flags(&args);

    logging::init(&config)?;
    info!(
        config = %config_path.display(),
        backend = %config.backend_url,
        "starting strandview"
    );

    let backend = HttpBackend::new(&config.backend_url, config.request_timeout())?;
    let mut dashboard = Dashboard::new(backend, config.intervals(), &config.palette)?;

    let (page_tx, page_rx) = watch::channel(dashboard.document().to_html());
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);

    if config.httpd_enabled {
        let ip = config.httpd_ip.clone();
        let port = config.httpd_port;
        tokio::spawn(async move {
            if let Err(e) = httpd::run_http_server(ip, port, page_rx, command_tx).await {
                error!("HTML mirror failed: {:#}", e);
            }
        });
    } else {
        // Nothing else sends commands; the loop sees a closed queue
        drop(page_rx);
        drop(command_tx);
    }

    if config.headless {
        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        dashboard::run_headless(&mut dashboard, command_rx, page_tx, shutdown).await;
    } else {
        let backend_url = dashboard.backend().base_url().to_string();
        tui::run_tui(&mut dashboard, command_rx, page_tx, &backend_url).await?;
    }

    info!("strandview stopped");
    Ok(())
}
