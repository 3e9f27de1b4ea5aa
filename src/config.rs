use crate::error::{InspectError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// サーバーURLを上書きする環境変数
pub const SERVER_URL_ENV: &str = "KAONG_SERVER_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub poll_interval_secs: u64,
    pub confidence_threshold: u8,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            poll_interval_secs: 5,
            confidence_threshold: 70,
            timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            log::debug!("config loaded from {}", path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| InspectError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("kaong-inspect").join("config.json"))
    }

    /// 接続先を決める（引数 > 環境変数 > 設定ファイル）
    pub fn resolve_server_url(&self, cli_override: Option<&str>) -> Result<String> {
        let env = std::env::var(SERVER_URL_ENV).ok();
        let url = cli_override
            .map(str::to_string)
            .or(env)
            .unwrap_or_else(|| self.server_url.clone());

        let url = url.trim().trim_end_matches('/').to_string();
        if url.is_empty() {
            return Err(InspectError::MissingServerUrl);
        }
        Ok(url)
    }

    pub fn set_server_url(&mut self, url: String) -> Result<()> {
        self.server_url = url;
        self.save()
    }
}
