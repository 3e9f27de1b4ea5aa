use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("サーバーURLが設定されていません。`kaong-inspect config --set-server URL` で設定してください")]
    MissingServerUrl,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("HTTP通信エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("サーバーエラー: HTTP {status} ({path})")]
    ServerStatus { status: u16, path: String },

    #[error("削除に失敗しました (#{id}): {message}")]
    DeleteFailed { id: i64, message: String },

    #[error("検出サービスエラー: {0}")]
    Detection(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] kaong_common::Error),

    #[error("入力エラー: {0}")]
    Prompt(String),
}

pub type Result<T> = std::result::Result<T, InspectError>;
