//! 撮影・アップロードの状態管理
//!
//! カメラ撮影とファイルアップロードの2経路を1つの状態機械で扱う。
//!
//! ```text
//! Idle → CameraActive → AwaitingResult(Camera) → CameraActive
//! Idle → UploadPreview → AwaitingResult(Upload) → UploadPreview
//! close → Idle（どこからでも）
//! ```
//!
//! カメラとチャネルは `CaptureSession` が所有し、`close` またはDropで解放する。

use crate::error::{Error, Result};
use crate::notify::{Notification, WarningBanner};
use crate::protocol::{extract_mime_type_from_data_url, validate_upload_media_type, ChannelEvent};
use crate::types::{CategoryCounts, Detection, DetectionResponse};

/// 撮影ボタンを無効にしておく時間
pub const CAPTURE_COOLDOWN_MS: u64 = 2000;
/// 撮影フレームのJPEG品質
pub const CAPTURE_JPEG_QUALITY: f64 = 0.8;
/// カメラに要求する解像度
pub const IDEAL_VIDEO_WIDTH: u32 = 1280;
pub const IDEAL_VIDEO_HEIGHT: u32 = 720;

pub const CAMERA_DENIED_MESSAGE: &str =
    "Error accessing camera. Please make sure you have granted camera permissions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Camera,
    Upload,
}

impl CaptureMode {
    /// 保存時の `source` 値
    pub fn source(&self) -> &'static str {
        match self {
            CaptureMode::Camera => "camera",
            CaptureMode::Upload => "upload",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaptureMode::Camera => "Camera Scan",
            CaptureMode::Upload => "Image Upload",
        }
    }

    fn resting_state(&self) -> CaptureState {
        match self {
            CaptureMode::Camera => CaptureState::CameraActive,
            CaptureMode::Upload => CaptureState::UploadPreview,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    Idle,
    CameraActive,
    UploadPreview,
    AwaitingResult(CaptureMode),
}

impl CaptureState {
    pub fn mode(&self) -> Option<CaptureMode> {
        match self {
            CaptureState::Idle => None,
            CaptureState::CameraActive => Some(CaptureMode::Camera),
            CaptureState::UploadPreview => Some(CaptureMode::Upload),
            CaptureState::AwaitingResult(mode) => Some(*mode),
        }
    }
}

// =============================================
// 詳細パネル
// =============================================

/// 直近の検出結果の詳細
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsPanel {
    pub counts: CategoryCounts,
    /// 平均信頼度（%）
    pub average_confidence: f64,
    pub source: CaptureMode,
    pub timestamp: String,
}

impl DetailsPanel {
    /// 検出結果から詳細を作る
    ///
    /// Ripe/Unripe/Rottenが1つもなければ `None`。
    /// 平均信頼度は3カテゴリのスコア合計を全検出数で割る。
    pub fn from_detections(
        detections: &[Detection],
        source: CaptureMode,
        timestamp: impl Into<String>,
    ) -> Option<Self> {
        let counts = CategoryCounts::from_detections(detections);
        if counts.is_empty() {
            return None;
        }

        let score_sum: f64 = detections
            .iter()
            .filter(|d| d.category().is_some())
            .map(|d| d.score)
            .sum();
        let average_confidence = score_sum / detections.len() as f64 * 100.0;

        Some(Self {
            counts,
            average_confidence,
            source,
            timestamp: timestamp.into(),
        })
    }

    pub fn confidence_text(&self) -> String {
        format!("{:.1}%", self.average_confidence)
    }

    /// "3 Ripe, 1 Rotten"
    pub fn summary_text(&self) -> String {
        self.counts.summary_text()
    }

    pub fn breakdown(&self) -> [f64; 3] {
        self.counts.percentages()
    }
}

/// 検出結果1件を受け取ったときの画面更新内容
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureUpdate {
    /// 描画し直す検出（前回の枠は消す）
    pub detections: Vec<Detection>,
    pub warning: Option<WarningBanner>,
    /// 今回の結果から作った詳細（検出ゼロなら `None` で、前回の詳細はそのまま）
    pub details: Option<DetailsPanel>,
    pub error: Option<Notification>,
}

// =============================================
// 状態機械
// =============================================

#[derive(Debug, Clone, Default)]
pub struct CaptureController {
    state: CaptureState,
    channel_connected: bool,
    cooldown_until: Option<u64>,
    last_details: Option<DetailsPanel>,
    details_open: bool,
}

impl CaptureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// カメラを開く（Idleからのみ）
    pub fn open_camera(&mut self) -> Result<()> {
        match self.state {
            CaptureState::Idle => {
                self.state = CaptureState::CameraActive;
                log::info!("camera opened");
                Ok(())
            }
            other => Err(Error::Capture(format!("cannot open camera while {:?}", other))),
        }
    }

    /// カメラの取得に失敗した（権限拒否など）。Idleに戻して表示文言を返す
    pub fn camera_failed(&mut self, reason: &str) -> &'static str {
        log::error!("camera error: {}", reason);
        self.close();
        CAMERA_DENIED_MESSAGE
    }

    pub fn set_channel_connected(&mut self, connected: bool) {
        log::debug!("detection channel connected: {}", connected);
        self.channel_connected = connected;
    }

    /// 撮影ボタンが押せるか
    pub fn capture_enabled(&self, now_ms: u64) -> bool {
        let camera = self.state.mode() == Some(CaptureMode::Camera);
        let cooled = self.cooldown_until.map(|until| now_ms >= until).unwrap_or(true);
        camera && self.channel_connected && cooled
    }

    /// 撮影する。成功したらクールダウンを開始する
    pub fn begin_capture(&mut self, now_ms: u64) -> Result<()> {
        if !self.capture_enabled(now_ms) {
            return Err(Error::Capture("Camera or channel not ready".to_string()));
        }
        self.cooldown_until = Some(now_ms + CAPTURE_COOLDOWN_MS);
        self.state = CaptureState::AwaitingResult(CaptureMode::Camera);
        Ok(())
    }

    /// クールダウン終了時刻
    pub fn cooldown_until(&self) -> Option<u64> {
        self.cooldown_until
    }

    /// アップロードする画像を選んだ（画像以外は通信前に拒否）
    pub fn select_upload(&mut self, media_type: &str) -> Result<()> {
        validate_upload_media_type(media_type)?;
        match self.state {
            CaptureState::Idle | CaptureState::UploadPreview => {
                self.state = CaptureState::UploadPreview;
                Ok(())
            }
            other => Err(Error::Capture(format!("cannot upload while {:?}", other))),
        }
    }

    /// 選んだ画像を検出に送る
    pub fn begin_upload(&mut self) -> Result<()> {
        match self.state {
            CaptureState::UploadPreview => {
                self.state = CaptureState::AwaitingResult(CaptureMode::Upload);
                Ok(())
            }
            other => Err(Error::Capture(format!("no image selected ({:?})", other))),
        }
    }

    /// 検出結果を反映する
    ///
    /// 閉じた後に届いた結果は捨てる。
    pub fn receive(&mut self, response: DetectionResponse, timestamp: impl Into<String>) -> CaptureUpdate {
        let Some(mode) = self.state.mode() else {
            log::debug!("dropping detection result after close");
            return CaptureUpdate::default();
        };

        if let Some(message) = response.error {
            return CaptureUpdate {
                error: Some(self.receive_error(&message)),
                ..Default::default()
            };
        }

        self.state = mode.resting_state();

        let warning = response.warning.map(WarningBanner::new);
        // 検出ゼロのフレームでは前回の詳細を残す
        let details = if response.detections.is_empty() {
            None
        } else {
            let details = DetailsPanel::from_detections(&response.detections, mode, timestamp);
            self.details_open = details.is_some();
            self.last_details = details.clone();
            details
        };

        log::info!("received {} detections ({})", response.detections.len(), mode.source());
        CaptureUpdate {
            detections: response.detections,
            warning,
            details,
            error: None,
        }
    }

    /// 検出失敗を反映する。アップロードの場合はプレビューを閉じる
    pub fn receive_error(&mut self, message: &str) -> Notification {
        log::error!("detection error: {}", message);
        match self.state.mode() {
            Some(CaptureMode::Upload) => self.close(),
            Some(CaptureMode::Camera) => self.state = CaptureState::CameraActive,
            None => {}
        }
        Notification::error(format!("Detection failed: {}", message))
    }

    // ---- 詳細パネル ----

    pub fn details_open(&self) -> bool {
        self.details_open
    }

    /// 詳細パネルを閉じる（内容は残す）
    pub fn dismiss_details(&mut self) {
        self.details_open = false;
    }

    /// 直近の詳細（閉じていても残る）
    pub fn last_details(&self) -> Option<&DetailsPanel> {
        self.last_details.as_ref()
    }

    /// 「詳細を表示」ボタンを出すか
    pub fn has_stored_details(&self) -> bool {
        self.last_details.is_some()
    }

    /// 保存済みの詳細を再表示する
    pub fn show_stored_details(&mut self) -> Option<&DetailsPanel> {
        self.details_open = self.last_details.is_some();
        self.last_details.as_ref()
    }

    /// Idleに戻す（何度呼んでもよい）
    pub fn close(&mut self) {
        if self.state != CaptureState::Idle {
            log::info!("capture closed from {:?}", self.state);
        }
        self.state = CaptureState::Idle;
        self.channel_connected = false;
        self.cooldown_until = None;
        self.last_details = None;
        self.details_open = false;
    }
}

// =============================================
// カメラ・チャネルの所有
// =============================================

/// 映像ストリーム
pub trait CameraHandle {
    /// 全トラックを停止する
    fn stop(&mut self);
}

/// 検出サービスとの双方向チャネル
pub trait DetectionChannel {
    fn send_text(&mut self, text: &str) -> Result<()>;
    fn is_connected(&self) -> bool;
    fn disconnect(&mut self);
}

/// カメラとチャネルをまとめて所有する
///
/// `close` は両方を解放する。2回目以降は何もしない。Drop時にも呼ばれる。
pub struct CaptureSession<C: CameraHandle, K: DetectionChannel> {
    camera: Option<C>,
    channel: Option<K>,
}

impl<C: CameraHandle, K: DetectionChannel> CaptureSession<C, K> {
    pub fn new(camera: C, channel: K) -> Self {
        Self {
            camera: Some(camera),
            channel: Some(channel),
        }
    }

    pub fn is_open(&self) -> bool {
        self.camera.is_some() || self.channel.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.as_ref().map(|c| c.is_connected()).unwrap_or(false)
    }

    /// 撮影フレームを送る（画像のData URLのみ）
    pub fn send_frame(&mut self, image_data_url: &str) -> Result<()> {
        validate_upload_media_type(extract_mime_type_from_data_url(image_data_url))?;
        let channel = self
            .channel
            .as_mut()
            .filter(|c| c.is_connected())
            .ok_or_else(|| Error::Capture("detection channel not connected".to_string()))?;

        let event = ChannelEvent::DetectVideoFrame {
            image_data_url: image_data_url.to_string(),
        };
        channel.send_text(&event.encode()?)?;
        log::debug!("frame sent for analysis ({} bytes)", image_data_url.len());
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.stop();
            log::debug!("camera stream stopped");
        }
        if let Some(mut channel) = self.channel.take() {
            if channel.is_connected() {
                channel.disconnect();
                log::info!("detection channel disconnected by client");
            }
        }
    }
}

impl<C: CameraHandle, K: DetectionChannel> Drop for CaptureSession<C, K> {
    fn drop(&mut self) {
        self.close();
    }
}
