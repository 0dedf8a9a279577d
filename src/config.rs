// Config Module - Configuration management and command-line argument parsing
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::palette::{self, Swatch};
use crate::poller::PollIntervals;

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Terminal status dashboard for networked LED strand controllers",
    long_about = "Polls an LED controller's /state endpoint and shows MQTT health, animation modes\n\
                  and the color of every LED on every strand. Commands (color, mode, rainbow,\n\
                  all off, reboot) are sent as plain GET requests. Optionally mirrors the\n\
                  dashboard as an HTML page."
)]
pub struct Args {
    /// Controller base URL (e.g. http://ledpi.local:5000)
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Poll interval in milliseconds
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Delay before the first poll in milliseconds
    #[arg(long)]
    pub bootstrap: Option<u64>,

    /// Run without the terminal UI (poll loop and logging only)
    #[arg(long)]
    pub headless: bool,

    /// Serve an HTML mirror of the dashboard
    #[arg(long)]
    pub httpd: bool,

    /// Port for the HTML mirror
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Config file path or name (e.g., --cfg /full/path or --cfg porch for ~/.config/strandview/porch.conf)
    #[arg(long)]
    pub cfg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    #[serde(skip)]
    pub config_path: Option<PathBuf>,  // Where this config was loaded from (not serialized)

    pub backend_url: String,
    pub bootstrap_interval_ms: u64,  // First poll after start-up
    pub steady_interval_ms: u64,     // Every poll after that
    pub request_timeout_ms: u64,
    pub headless: bool,
    pub httpd_enabled: bool,
    pub httpd_ip: String,
    pub httpd_port: u16,
    pub log_file: String,  // Empty = strandview.log next to the config file
    pub log_level: String,
    pub palette: Vec<Swatch>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            config_path: None,
            backend_url: "http://localhost:5000".to_string(),
            bootstrap_interval_ms: 1000,
            steady_interval_ms: 5000,
            request_timeout_ms: 4000,
            headless: false,
            httpd_enabled: false,
            httpd_ip: "127.0.0.1".to_string(),
            httpd_port: 8081,
            log_file: "".to_string(),
            log_level: "info".to_string(),
            palette: palette::default_palette(),
        }
    }
}

impl DashboardConfig {
    pub fn merge_with_args(&mut self, args: &Args) -> bool {
        // Track if any args were actually provided
        let mut args_provided = false;

        if let Some(ref backend) = args.backend {
            self.backend_url = backend.clone();
            args_provided = true;
        }

        if let Some(interval) = args.interval {
            self.steady_interval_ms = interval;
            args_provided = true;
        }

        if let Some(bootstrap) = args.bootstrap {
            self.bootstrap_interval_ms = bootstrap;
            args_provided = true;
        }

        if let Some(port) = args.port {
            self.httpd_port = port;
            args_provided = true;
        }

        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
            args_provided = true;
        }

        self.sanitize();
        args_provided
    }

    /// Switches that apply to this run only and are never written back.
    pub fn apply_run_flags(&mut self, args: &Args) {
        if args.headless {
            self.headless = true;
        }
        if args.httpd {
            self.httpd_enabled = true;
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(PathBuf::from(home).join(".config").join("strandview"))
    }

    pub fn config_path(cfg_arg: Option<&str>) -> Result<PathBuf> {
        if let Some(cfg) = cfg_arg {
            let path = PathBuf::from(cfg);
            if path.is_absolute() {
                return Ok(path);
            }

            // Relative path
            if cfg.contains('/') || cfg.contains('\\') {
                return Ok(path);
            }

            // Otherwise treat as config name in config directory
            let filename = if cfg.ends_with(".conf") {
                cfg.to_string()
            } else {
                format!("{}.conf", cfg)
            };
            Ok(Self::config_dir()?.join(filename))
        } else {
            Ok(Self::config_dir()?.join("config.conf"))
        }
    }

    pub fn load_with_path(cfg_arg: Option<&str>) -> Result<Self> {
        let path = Self::config_path(cfg_arg)?;
        Self::load_from(path)
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut parsed: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        parsed.config_path = Some(path);
        parsed.sanitize();
        Ok(parsed)
    }

    /// Sanitize config values to handle common formatting issues
    pub fn sanitize(&mut self) {
        self.backend_url = self.backend_url.trim().trim_end_matches('/').to_string();
        if !self.backend_url.contains("://") {
            self.backend_url = format!("http://{}", self.backend_url);
        }
        self.httpd_ip = self.httpd_ip.trim().to_string();
        self.log_file = self.log_file.trim().to_string();
        self.log_level = self.log_level.trim().to_lowercase();
        if !matches!(self.log_level.as_str(), "error" | "warn" | "info" | "debug" | "trace") {
            self.log_level = "info".to_string();
        }

        // Clamp numeric values to reasonable ranges
        self.bootstrap_interval_ms = self.bootstrap_interval_ms.clamp(0, 60_000);
        self.steady_interval_ms = self.steady_interval_ms.clamp(250, 3_600_000);
        self.request_timeout_ms = self.request_timeout_ms.clamp(100, 60_000);
        self.httpd_port = self.httpd_port.max(1);

        for swatch in self.palette.iter_mut() {
            swatch.name = swatch.name.trim().to_string();
            swatch.hex = swatch.hex.trim().to_lowercase();
        }
        self.palette.retain(|s| !s.name.is_empty());
    }

    pub fn intervals(&self) -> PollIntervals {
        PollIntervals {
            bootstrap: Duration::from_millis(self.bootstrap_interval_ms),
            steady: Duration::from_millis(self.steady_interval_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if !self.log_file.is_empty() {
            return Ok(PathBuf::from(&self.log_file));
        }
        let dir = match self.config_path.as_ref().and_then(|p| p.parent()) {
            Some(dir) => dir.to_path_buf(),
            None => Self::config_dir()?,
        };
        Ok(dir.join("strandview.log"))
    }

    pub fn save(&self) -> Result<()> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => Self::config_path(None)?,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        // Sanitize values before saving
        let mut sanitized = self.clone();
        sanitized.sanitize();

        let body = toml::to_string_pretty(&sanitized).context("Failed to serialize config")?;
        let contents = format!(
            "# strandview configuration\n\
             # backend_url: LED controller base URL (GET /state, /color/<name>, /mode/<mode>, ...)\n\
             # bootstrap_interval_ms / steady_interval_ms: first poll delay and poll period\n\
             # palette: color picker entries, [[palette]] name = \"Red\" hex = \"#f00\"\n\n{}",
            body
        );
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
