//! 通知モデル
//!
//! 画面右上に出て自動で消える通知と、ネガティブサンプル時の警告バナー

/// 通知の自動消去までの時間
pub const NOTIFICATION_DURATION_MS: u32 = 3000;
/// 警告バナーの自動消去までの時間
pub const WARNING_DURATION_MS: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
    Info,
}

impl NotifyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyKind::Success => "success",
            NotifyKind::Error => "error",
            NotifyKind::Info => "info",
        }
    }

    /// 背景色
    pub fn color(&self) -> &'static str {
        match self {
            NotifyKind::Success => "#4CAF50",
            NotifyKind::Error => "#f44336",
            NotifyKind::Info => "#2196F3",
        }
    }
}

/// 一時的な通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotifyKind,
    pub message: String,
    pub duration_ms: u32,
}

impl Notification {
    pub fn new(kind: NotifyKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            duration_ms: NOTIFICATION_DURATION_MS,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotifyKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotifyKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotifyKind::Info, message)
    }

    pub fn css_class(&self) -> String {
        format!("notification notification-{}", self.kind.as_str())
    }
}

/// 検出サービスからの警告（ネガティブサンプル）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningBanner {
    pub message: String,
    pub duration_ms: u32,
}

impl WarningBanner {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration_ms: WARNING_DURATION_MS,
        }
    }
}
