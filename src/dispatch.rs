// Dispatch Module - Fire-and-forget controller commands
use tracing::{info, warn};

use crate::backend::{Backend, FetchError};

/// Commands the LED controller accepts, each a plain GET path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Color(String),
    Rgb(u8, u8, u8),
    Mode(String),
    Rainbow,
    AllOff,
    Reboot,
    Shutdown(String),
}

impl Command {
    pub fn path(&self) -> String {
        match self {
            Command::Color(name) => format!("/color/{}", name),
            Command::Rgb(r, g, b) => format!("/rgb/{},{},{}", r, g, b),
            Command::Mode(mode) => format!("/mode/{}", mode),
            Command::Rainbow => "/rainbow".to_string(),
            Command::AllOff => "/all off".to_string(),
            Command::Reboot => "/reboot".to_string(),
            Command::Shutdown(param) => format!("/shutdown {}", param),
        }
    }
}

/// Issue one request and report only whether it went through.
///
/// The dispatcher does not look at the path or the response body; a failure
/// is logged here and handed back so the caller can leave its state alone.
pub async fn send_command<B: Backend>(backend: &B, path: &str) -> Result<String, FetchError> {
    info!(command = %path, "sending command");
    match backend.get(path).await {
        Ok(body) => Ok(body),
        Err(e) => {
            warn!(command = %path, error = %e, "command failed");
            Err(e)
        }
    }
}

/// Text shown in the status element after a command succeeds.
pub fn status_text(path: &str, body: &str) -> String {
    format!("URL: '{}' Status: {}", path, body)
}
