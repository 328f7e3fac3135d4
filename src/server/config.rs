use std::path::PathBuf;

use crate::fetcher::{AudioFormat, AudioQuality};

use super::RequestsLoggingLevel;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    /// Where queued downloads land; web clients cannot pick their own
    /// destination directory.
    pub downloads_dir: PathBuf,
    /// Encoding defaults for requests that do not specify their own.
    pub default_quality: AudioQuality,
    pub default_format: AudioFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3000,
            frontend_dir_path: None,
            downloads_dir: PathBuf::from("downloads"),
            default_quality: AudioQuality::default(),
            default_format: AudioFormat::default(),
        }
    }
}
