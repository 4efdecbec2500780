//! # Platform-specific utilities
//!
//! Questo modulo centralizza la gestione cross-platform dei comandi esterni
//! (ffmpeg, ffprobe, yt-dlp) e la verifica della loro disponibilità.

use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// External tools the tagger shells out to
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe", "yt-dlp"];

/// Platform-specific command manager
pub struct PlatformCommands {
    commands: HashMap<&'static str, String>,
    which_command: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let (suffix, which_command) = if cfg!(windows) {
            (".exe", "where")
        } else {
            ("", "which")
        };

        let commands = KNOWN_TOOLS
            .iter()
            .map(|tool| (*tool, format!("{}{}", tool, suffix)))
            .collect();

        Self {
            commands,
            which_command,
        }
    }

    /// Get the platform-specific command name
    pub fn get_command<'a>(&'a self, base_name: &'a str) -> &'a str {
        self.commands
            .get(base_name)
            .map(String::as_str)
            .unwrap_or(base_name)
    }

    /// Get the command used to check if a program exists
    pub fn which_command(&self) -> &str {
        self.which_command
    }

    /// Check if a command is available on the system PATH
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        let command_name = self.get_command(base_name);

        let result = tokio::process::Command::new(self.which_command)
            .arg(command_name)
            .output()
            .await;

        let available = matches!(result, Ok(output) if output.status.success());
        debug!("Tool {} available: {}", command_name, available);
        available
    }
}
