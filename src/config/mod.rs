mod file_config;

pub use file_config::FileConfig;

use crate::fetcher::{AudioFormat, AudioQuality};
use crate::server::RequestsLoggingLevel;
use anyhow::Result;
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub downloads_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub cookies_file: Option<PathBuf>,
    pub quality: Option<AudioQuality>,
    pub format: Option<AudioFormat>,
    pub job_retention_secs: i64,
    pub prune_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory downloads land in (artist/album subfolders underneath).
    pub downloads_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    /// Cookies file passed to the fetcher, when it exists.
    pub cookies_file: Option<PathBuf>,
    pub quality: AudioQuality,
    pub format: AudioFormat,
    /// How long finished jobs stay pollable.
    pub job_retention_secs: i64,
    /// How often the registry prune task runs.
    pub prune_interval_secs: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let downloads_dir = file
            .downloads_dir
            .map(PathBuf::from)
            .or_else(|| cli.downloads_dir.clone())
            .unwrap_or_else(|| PathBuf::from("downloads"));

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let cookies_file = file
            .cookies_file
            .map(PathBuf::from)
            .or_else(|| cli.cookies_file.clone());

        let quality = match file.quality {
            Some(s) => s.parse()?,
            None => cli.quality.unwrap_or_default(),
        };
        let format = match file.format {
            Some(s) => s.parse()?,
            None => cli.format.unwrap_or_default(),
        };

        let job_retention_secs = file.job_retention_secs.unwrap_or(cli.job_retention_secs);
        let prune_interval_secs = file.prune_interval_secs.unwrap_or(cli.prune_interval_secs);

        Ok(Self {
            downloads_dir,
            port,
            logging_level,
            frontend_dir_path,
            cookies_file,
            quality,
            format,
            job_retention_secs,
            prune_interval_secs,
        })
    }

    /// The cookies file, but only when it actually exists on disk.
    pub fn existing_cookies_file(&self) -> Option<PathBuf> {
        self.cookies_file.clone().filter(|p| p.exists())
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> CliConfig {
        CliConfig {
            downloads_dir: Some(PathBuf::from("/cli/music")),
            port: 3000,
            logging_level: RequestsLoggingLevel::Path,
            frontend_dir_path: None,
            cookies_file: None,
            quality: None,
            format: None,
            job_retention_secs: 7200,
            prune_interval_secs: 600,
        }
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("path"),
            Some(RequestsLoggingLevel::Path)
        ));
        // Case insensitive
        assert!(matches!(
            parse_logging_level("HEADERS"),
            Some(RequestsLoggingLevel::Headers)
        ));
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let config = AppConfig::resolve(&base_cli(), None).unwrap();

        assert_eq!(config.downloads_dir, PathBuf::from("/cli/music"));
        assert_eq!(config.port, 3000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Path);
        assert_eq!(config.quality, AudioQuality::Kbps(192));
        assert_eq!(config.format, AudioFormat::M4a);
        assert_eq!(config.job_retention_secs, 7200);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let file_config = FileConfig {
            downloads_dir: Some("/toml/music".to_string()),
            port: Some(4000),
            logging_level: Some("none".to_string()),
            quality: Some("best".to_string()),
            format: Some("mp3".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&base_cli(), Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.downloads_dir, PathBuf::from("/toml/music"));
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::None);
        assert_eq!(config.quality, AudioQuality::Best);
        assert_eq!(config.format, AudioFormat::Mp3);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.job_retention_secs, 7200);
    }

    #[test]
    fn test_resolve_invalid_quality_errors() {
        let file_config = FileConfig {
            quality: Some("turbo".to_string()),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&base_cli(), Some(file_config)).is_err());
    }

    #[test]
    fn test_existing_cookies_file_requires_presence() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let mut cli = base_cli();
        cli.cookies_file = Some(temp.path().to_path_buf());
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.existing_cookies_file(), Some(temp.path().to_path_buf()));

        let mut cli = base_cli();
        cli.cookies_file = Some(PathBuf::from("/no/such/cookies.txt"));
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(config.existing_cookies_file().is_none());
    }

    #[test]
    fn test_downloads_dir_defaults() {
        let mut cli = base_cli();
        cli.downloads_dir = None;
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.downloads_dir, PathBuf::from("downloads"));
    }
}
