use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_BACKEND_PORT: u16 = 11112;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub backend: BackendConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {path}"))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

/// Where the upstream audio backend lives
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub host: String,
    #[serde(default = "default_backend_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UploadConfig {
    pub default_artist_address: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn default_backend_port() -> u16 {
    DEFAULT_BACKEND_PORT
}

fn default_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config_toml() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[backend]
host = "10.0.0.7"
port = 9000
timeout_secs = 5

[http]
bind_addr = "127.0.0.1"
port = 3000

[upload]
default_artist_address = "0xcfab"

[logging]
level = "debug"
"#;

        let cfg: Config = toml::from_str(toml_str)?;

        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.backend.base_url(), "http://10.0.0.7:9000");
        assert_eq!(cfg.backend.timeout_secs, 5);
        assert_eq!(cfg.http.port, 3000);
        assert_eq!(cfg.upload.default_artist_address.as_deref(), Some("0xcfab"));
        assert_eq!(cfg.logging.level, "debug");

        Ok(())
    }

    #[test]
    fn test_parse_minimal_config_uses_defaults() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[backend]
host = "localhost"

[http]
bind_addr = "0.0.0.0"
port = 8080
"#;

        let cfg: Config = toml::from_str(toml_str)?;

        assert_eq!(cfg.backend.port, DEFAULT_BACKEND_PORT);
        assert_eq!(cfg.backend.timeout_secs, 30);
        assert!(cfg.upload.default_artist_address.is_none());
        assert_eq!(cfg.logging.level, "info");

        Ok(())
    }

    #[test]
    fn test_load_from_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "version = 1\n[backend]\nhost = \"b\"\n[http]\nbind_addr = \"127.0.0.1\"\nport = 1"
        )?;

        let cfg = Config::load(file.path().to_str().unwrap())?;
        assert_eq!(cfg.backend.host, "b");

        Ok(())
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(Config::load("/definitely/not/here.toml").is_err());
    }
}
