use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secrets::expand_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// SQLite file; defaults to `~/.mediaq/data/mediaq.db`.
    #[serde(default)]
    pub database: Option<String>,
    pub download_directory: String,
    pub temp_directory: String,
    /// yt-dlp style naming template, e.g. `%(extractor)s_%(title)s.%(ext)s`.
    #[serde(default = "default_output_template")]
    pub output_template: String,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
    /// Link to a completed file, usable in callbacks as `<%download_url%>`.
    #[serde(default = "default_download_url")]
    pub download_url: String,
    #[serde(default = "default_mail_subject")]
    pub mail_subject: String,
    #[serde(default = "default_mail_body")]
    pub mail_body: String,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Extra static values available to callback templates.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

fn default_output_template() -> String {
    "%(extractor)s_%(title)s.%(ext)s".to_string()
}

fn default_expiry_days() -> i64 {
    2
}

fn default_download_url() -> String {
    r"http\://127.0.0.1\:5000/file/<%id%>".to_string()
}

fn default_mail_subject() -> String {
    "Download completed for '<%title%>'".to_string()
}

fn default_mail_body() -> String {
    "Download completed for '<%title%>'\nDownload link\\: '<%download_url%>'".to_string()
}

impl Config {
    /// Minimal configuration rooted at the given directories. Everything else
    /// takes its default.
    pub fn new<P: Into<PathBuf>>(download_directory: P, temp_directory: P) -> Self {
        Self {
            version: "1.0".to_string(),
            database: None,
            download_directory: download_directory.into().to_string_lossy().into_owned(),
            temp_directory: temp_directory.into().to_string_lossy().into_owned(),
            output_template: default_output_template(),
            fetcher: FetcherConfig::default(),
            expiry_days: default_expiry_days(),
            download_url: default_download_url(),
            mail_subject: default_mail_subject(),
            mail_body: default_mail_body(),
            mail: MailConfig::default(),
            http: HttpConfig::default(),
            server: ServerConfig::default(),
            variables: HashMap::new(),
        }
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        match &self.database {
            Some(path) if !path.is_empty() => Some(PathBuf::from(expand_home(path))),
            _ => crate::db::default_database_path(),
        }
    }

    pub fn download_path(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.download_directory))
    }

    pub fn temp_path(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.temp_directory))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    #[serde(default = "default_fetcher_binary")]
    pub binary: String,
    /// Directory holding ffmpeg, passed to the fetcher as its ffmpeg location.
    #[serde(default)]
    pub tools_path: Option<String>,
}

fn default_fetcher_binary() -> String {
    "yt-dlp".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            binary: default_fetcher_binary(),
            tools_path: None,
        }
    }
}

/// Sender identity and SMTP credentials for mail notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub sender: Option<String>,
    /// `host:port`, implicit TLS (e.g. `smtp.gmail.com:465`).
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_file: Option<String>,
    #[serde(default)]
    pub password_env_var: Option<String>,
}

impl MailConfig {
    /// Splits `server` into host and port.
    pub fn host_port(&self) -> Option<(&str, u16)> {
        let server = self.server.as_deref()?;
        let (host, port) = server.rsplit_once(':')?;
        let port = port.parse().ok()?;
        if host.is_empty() {
            return None;
        }
        Some((host, port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_host_port() {
        let mut mail = MailConfig {
            server: Some("smtp.example.com:465".to_string()),
            ..Default::default()
        };
        assert_eq!(mail.host_port(), Some(("smtp.example.com", 465)));

        mail.server = Some("smtp.example.com".to_string());
        assert_eq!(mail.host_port(), None);

        mail.server = Some(":25".to_string());
        assert_eq!(mail.host_port(), None);

        mail.server = None;
        assert_eq!(mail.host_port(), None);
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = Config::new("/downloads", "/tmp/mediaq");
        assert_eq!(config.download_path(), PathBuf::from("/downloads"));
        assert_eq!(config.temp_path(), PathBuf::from("/tmp/mediaq"));
        assert_eq!(config.expiry_days, 2);
        assert_eq!(config.fetcher.binary, "yt-dlp");
        assert!(config.download_url.contains("<%id%>"));
    }

    #[test]
    fn test_database_path_expands_home() {
        let mut config = Config::new("/d", "/t");
        config.database = Some("/var/lib/mediaq.db".to_string());
        assert_eq!(
            config.database_path(),
            Some(PathBuf::from("/var/lib/mediaq.db"))
        );

        config.database = None;
        assert!(config
            .database_path()
            .unwrap()
            .ends_with(".mediaq/data/mediaq.db"));
    }
}
