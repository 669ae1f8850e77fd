use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub url: String,
    pub site_url: String,
    pub app_name: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub users_file: PathBuf,
    pub museums_file: PathBuf,
    pub scanner: ScannerConfig,
}

impl AppConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))?;
        Ok(addr)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT is not a port: {v}"))?,
            Err(_) => 8080,
        };
        let users_file = std::env::var("USERS_FILE")
            .unwrap_or_else(|_| "data/users.json".into())
            .into();
        let museums_file = std::env::var("MUSEUMS_FILE")
            .unwrap_or_else(|_| "data/museums.json".into())
            .into();
        let scanner = ScannerConfig {
            api_key: std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("OPENROUTER_MODEL")
                .unwrap_or_else(|_| "openai/gpt-4o-mini".into()),
            url: std::env::var("OPENROUTER_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1/chat/completions".into()),
            site_url: std::env::var("OPENROUTER_SITE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            app_name: std::env::var("OPENROUTER_APP_NAME")
                .unwrap_or_else(|_| "Museum Guide India".into()),
            max_tokens: std::env::var("OPENROUTER_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(500),
        };
        Ok(Self {
            host,
            port,
            users_file,
            museums_file,
            scanner,
        })
    }
}
