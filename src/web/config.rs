//! Configuration types and constants for the linkshare-web server.

use std::path::PathBuf;

use clap::Parser;

use crate::links::MAX_IMAGE_BYTES;

pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub(crate) const DEFAULT_SESSION_TTL_HOURS: u64 = 7 * 24;
/// Ten years; session expiry and cookie max-age stay in `i64` range.
pub(crate) const MAX_SESSION_TTL_HOURS: u64 = 10 * 366 * 24;

/// Body limit on multipart routes: one maximum-size image plus form overhead.
pub(crate) const MAX_UPLOAD_BODY: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// Lifetime of the one-shot notice cookie.
pub(crate) const NOTICE_TTL_SECS: i64 = 60;

/// Self-hosted link-in-bio pages.
///
/// Serves the dashboard, the public profile pages and a JSON API, and
/// persists state in SQLite with uploaded images on disk.
///
/// Configuration can be set via CLI arguments or environment variables.
/// CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(name = "linkshare-web", version, about)]
pub struct Cli {
    /// HTTP server bind address [env: LINKSHARE_BIND] [default: 127.0.0.1:3000]
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Data directory for the database and uploaded images [env: LINKSHARE_HOME] [default: ~/.linkshare]
    #[arg(long, short = 'd')]
    pub data_dir: Option<PathBuf>,

    /// Public base URL used in image links [env: LINKSHARE_PUBLIC_URL] [default: http://<bind>]
    #[arg(long, short = 'u')]
    pub public_url: Option<String>,

    /// Session lifetime in hours, at most 87840 [env: LINKSHARE_SESSION_TTL_HOURS] [default: 168]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_SESSION_TTL_HOURS))]
    pub session_ttl_hours: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub public_url: String,
    pub session_ttl_secs: u64,
}

impl Config {
    pub fn from_cli_and_env(cli: Cli) -> Self {
        let data_dir = cli
            .data_dir
            .or_else(|| std::env::var("LINKSHARE_HOME").ok().map(PathBuf::from))
            .unwrap_or_else(|| {
                std::env::var("HOME")
                    .map(|h| PathBuf::from(h).join(".linkshare"))
                    .unwrap_or_else(|_| PathBuf::from(".linkshare"))
            });

        let bind_addr = cli
            .bind
            .or_else(|| std::env::var("LINKSHARE_BIND").ok())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let public_url = cli
            .public_url
            .or_else(|| std::env::var("LINKSHARE_PUBLIC_URL").ok())
            .unwrap_or_else(|| format!("http://{bind_addr}"));

        let ttl_hours = cli
            .session_ttl_hours
            .or_else(|| {
                std::env::var("LINKSHARE_SESSION_TTL_HOURS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS)
            .clamp(1, MAX_SESSION_TTL_HOURS);

        Self {
            bind_addr,
            data_dir,
            public_url: public_url.trim_end_matches('/').to_string(),
            session_ttl_secs: ttl_hours * 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_win() {
        let cli = Cli::parse_from([
            "linkshare-web",
            "--bind",
            "0.0.0.0:8080",
            "-d",
            "/tmp/ls",
            "--public-url",
            "https://links.example.com/",
            "--session-ttl-hours",
            "2",
        ]);
        let config = Config::from_cli_and_env(cli);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ls"));
        assert_eq!(config.public_url, "https://links.example.com");
        assert_eq!(config.session_ttl_secs, 7200);
    }

    #[test]
    fn session_ttl_is_bounded() {
        let huge = (u64::MAX / 2).to_string();
        assert!(Cli::try_parse_from(["linkshare-web", "--session-ttl-hours", &huge]).is_err());
        assert!(Cli::try_parse_from(["linkshare-web", "--session-ttl-hours", "0"]).is_err());

        let cli = Cli::parse_from(["linkshare-web", "--session-ttl-hours", "87840"]);
        let config = Config::from_cli_and_env(cli);
        assert_eq!(config.session_ttl_secs, MAX_SESSION_TTL_HOURS * 3600);
    }

    #[test]
    fn public_url_defaults_to_bind_address() {
        if std::env::var("LINKSHARE_PUBLIC_URL").is_ok() {
            return;
        }
        let cli = Cli::parse_from(["linkshare-web", "-b", "127.0.0.1:4000"]);
        let config = Config::from_cli_and_env(cli);
        assert_eq!(config.public_url, "http://127.0.0.1:4000");
    }
}
