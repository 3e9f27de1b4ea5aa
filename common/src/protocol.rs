//! 検出サービスとのインターフェース
//!
//! - 双方向チャネル（WebSocket）上のイベント
//! - Data URLの分解
//! - アップロード画像の種別チェック
//! - `/save_assessment` のフォーム項目

use crate::error::{Error, Result};
use crate::types::DetectionResponse;
use serde::{Deserialize, Serialize};

pub const ASSESSMENTS_PATH: &str = "/get_assessment_data";
pub const DETECT_FRAME_PATH: &str = "/detect_frame";
pub const SAVE_ASSESSMENT_PATH: &str = "/save_assessment";
pub const CHANNEL_PATH: &str = "/ws";

/// 削除APIのパス
pub fn delete_path(id: i64) -> String {
    format!("/api/delete-assessment/{}", id)
}

/// チャネル上のイベント
///
/// 1フレーム = `{"event": <名前>, "data": <ペイロード>}` のJSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// クライアント → サーバー: 撮影フレーム
    DetectVideoFrame { image_data_url: String },
    /// サーバー → クライアント: 検出結果
    DetectionResults(DetectionResponse),
    /// サーバー → クライアント: 検出失敗
    DetectionError { error: String },
}

impl ChannelEvent {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::Parse(format!("channel event: {}", e)))
    }
}

/// ページのURLからチャネルのURLを作る
///
/// `https:` なら `wss://`、それ以外は `ws://`
pub fn channel_url(page_protocol: &str, host: &str) -> String {
    let scheme = if page_protocol.trim_end_matches(':') == "https" { "wss" } else { "ws" };
    format!("{}://{}{}", scheme, host, CHANNEL_PATH)
}

/// Data URLからMIMEタイプを抽出（抽出失敗時は"image/jpeg"）
pub fn extract_mime_type_from_data_url(data_url: &str) -> &str {
    data_url
        .strip_prefix("data:")
        .and_then(|s| s.split([';', ',']).next())
        .filter(|s| !s.is_empty())
        .unwrap_or("image/jpeg")
}

/// アップロードされたファイルの種別を確認する（ネットワーク呼び出し前に行う）
pub fn validate_upload_media_type(media_type: &str) -> Result<()> {
    if media_type.trim().to_ascii_lowercase().starts_with("image/") {
        Ok(())
    } else {
        Err(Error::InvalidMediaType(media_type.to_string()))
    }
}

/// 拡張子から画像のMIMEタイプを推定する
pub fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// `/save_assessment` に送るフォーム項目（画像以外）
#[derive(Debug, Clone, PartialEq)]
pub struct SaveAssessmentForm {
    pub assessment: String,
    pub confidence: f64,
    pub source: String,
}

impl SaveAssessmentForm {
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("assessment", self.assessment.clone()),
            ("confidence", self.confidence.to_string()),
            ("source", self.source.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Detection;

    // =============================================
    // ChannelEvent テスト
    // =============================================

    #[test]
    fn test_encode_frame_event() {
        let event = ChannelEvent::DetectVideoFrame {
            image_data_url: "data:image/jpeg;base64,AAAA".to_string(),
        };
        let json = event.encode().expect("エンコード失敗");
        assert_eq!(
            json,
            r#"{"event":"detect_video_frame","data":{"image_data_url":"data:image/jpeg;base64,AAAA"}}"#
        );
    }

    #[test]
    fn test_decode_results_event() {
        let json = r#"{"event": "detection_results", "data": {"detections": [{"label": "Ripe", "box_relative": [0, 0, 0.5, 0.5], "score": 0.9}], "warning": "low light"}}"#;
        let event = ChannelEvent::decode(json).expect("デコード失敗");
        let ChannelEvent::DetectionResults(response) = event else {
            panic!("Expected DetectionResults");
        };
        assert_eq!(response.detections.len(), 1);
        assert_eq!(response.detections[0], Detection {
            label: "Ripe".into(),
            box_relative: Some([0.0, 0.0, 0.5, 0.5]),
            box_absolute: None,
            score: 0.9,
        });
        assert_eq!(response.warning.as_deref(), Some("low light"));
    }

    #[test]
    fn test_decode_error_event() {
        let event = ChannelEvent::decode(r#"{"event": "detection_error", "data": {"error": "model offline"}}"#)
            .expect("デコード失敗");
        assert_eq!(event, ChannelEvent::DetectionError { error: "model offline".into() });
    }

    #[test]
    fn test_decode_unknown_event() {
        let result = ChannelEvent::decode(r#"{"event": "connect", "data": {}}"#);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_channel_url() {
        assert_eq!(channel_url("https:", "example.com"), "wss://example.com/ws");
        assert_eq!(channel_url("http:", "127.0.0.1:5000"), "ws://127.0.0.1:5000/ws");
    }

    // =============================================
    // Data URL テスト
    // =============================================

    #[test]
    fn test_data_url_parts() {
        let url = "data:image/png;base64,iVBORw0KGgo=";
        assert_eq!(extract_mime_type_from_data_url(url), "image/png");
        assert_eq!(extract_mime_type_from_data_url("garbage"), "image/jpeg");
    }

    // =============================================
    // アップロード検証 テスト
    // =============================================

    #[test]
    fn test_validate_upload_media_type() {
        assert!(validate_upload_media_type("image/jpeg").is_ok());
        assert!(validate_upload_media_type("IMAGE/PNG").is_ok());
        assert!(matches!(
            validate_upload_media_type("application/pdf"),
            Err(Error::InvalidMediaType(_))
        ));
        assert!(validate_upload_media_type("").is_err());
    }

    #[test]
    fn test_media_type_for_extension() {
        assert_eq!(media_type_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(media_type_for_extension("txt"), None);
    }

    #[test]
    fn test_save_form_fields() {
        let form = SaveAssessmentForm {
            assessment: "3 Ripe".into(),
            confidence: 0.85,
            source: "camera".into(),
        };
        let fields = form.text_fields();
        assert_eq!(fields[0], ("assessment", "3 Ripe".to_string()));
        assert_eq!(fields[1], ("confidence", "0.85".to_string()));
        assert_eq!(delete_path(42), "/api/delete-assessment/42");
    }
}
