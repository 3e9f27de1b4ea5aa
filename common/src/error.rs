//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No data available to export. Please refresh the data first.")]
    NoData,

    #[error("Please select an image file (got {0})")]
    InvalidMediaType(String),

    #[error("Capture error: {0}")]
    Capture(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
