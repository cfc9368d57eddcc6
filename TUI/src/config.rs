//! Application configuration and constants.
use std::path::PathBuf;

use clap::Parser;

use crate::api::DEFAULT_BASE_URL;

/// Command line options. Every option can also come from the environment.
#[derive(Parser, Debug)]
#[command(name = "ragdesk")]
#[command(about = "Terminal workspace for a retrieval-augmented backend")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Backend base URL
    #[arg(long, env = "RAGDESK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Run without contacting the backend
    #[arg(short, long)]
    pub offline: bool,

    /// Log file (the terminal is owned by the UI)
    #[arg(long, env = "RAGDESK_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// UI tick interval in milliseconds
    #[arg(long, default_value_t = 16)]
    pub tick_rate_ms: u64,
}

pub struct Config {
    /// Main loop tick rate in milliseconds (target 60 FPS = ~16ms)
    pub tick_rate_ms: u64,

    /// How long error and warning notices stay up
    pub error_notice_ms: u64,

    /// How long success and info notices stay up
    pub success_notice_ms: u64,

    /// Modulo for animation frame counter
    pub animation_frame_mod: usize,

    /// Lines to scroll per key press
    pub scroll_step: usize,

    /// Width of the left column in characters
    pub sidebar_width: u16,

    /// Width of the search column in characters
    pub search_width: u16,

    /// Width of the documents column in characters
    pub files_width: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_ms: 16,
            error_notice_ms: 3000,
            success_notice_ms: 2000,
            animation_frame_mod: 360,
            scroll_step: 3,
            sidebar_width: 30,
            search_width: 40,
            files_width: 30,
        }
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            tick_rate_ms: cli.tick_rate_ms.max(1),
            ..Self::default()
        }
    }

    /// Convert a duration to a number of UI ticks (at least one).
    pub fn ticks(&self, ms: u64) -> u64 {
        (ms / self.tick_rate_ms.max(1)).max(1)
    }

    pub fn default_log_file() -> PathBuf {
        std::env::temp_dir().join("ragdesk.log")
    }
}

/// Global commands list
pub const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show available commands"),
    ("/clear", "Clear chat history"),
    ("/upload", "Upload documents"),
    ("/retrieve", "Retrieve a document by CID"),
    ("/backup", "Back up the database"),
    ("/search", "Search the web"),
    ("/send", "Send search result to chat"),
    ("/attest", "Show backend attestation"),
    ("/config", "Show generation settings"),
    ("/template", "Apply a template"),
    ("/health", "Check backend health"),
    ("/quit", "Exit RagDesk"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_rounds_down_but_never_zero() {
        let config = Config::default();
        assert_eq!(config.ticks(3000), 187);
        assert_eq!(config.ticks(1), 1);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["ragdesk"]);
        assert!(!cli.offline);
        assert_eq!(cli.tick_rate_ms, 16);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["ragdesk", "-o", "--base-url", "http://10.0.0.2:8010", "--tick-rate-ms", "0"]);
        assert!(cli.offline);
        assert_eq!(cli.base_url, "http://10.0.0.2:8010");
        assert_eq!(Config::from_cli(&cli).tick_rate_ms, 1);
    }
}
