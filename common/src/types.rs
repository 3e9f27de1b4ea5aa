//! 検査データの型定義
//!
//! CLIとWeb(WASM)で共有される型:
//! - AssessmentRecord: サーバーに保存された過去の判定結果
//! - Detection: 検出サービスが1フレームごとに返すバウンディングボックス
//! - DetectionResponse: `/detect_frame` と `detection_results` イベントの本体

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 熟度カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Ripe,
    Unripe,
    Rotten,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Ripe, Category::Unripe, Category::Rotten];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ripe => "Ripe",
            Category::Unripe => "Unripe",
            Category::Rotten => "Rotten",
        }
    }

    /// 大文字小文字を区別せずにラベルを解釈する
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ripe" => Some(Category::Ripe),
            "unripe" => Some(Category::Unripe),
            "rotten" => Some(Category::Rotten),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// カテゴリ別の個数（判定テキストから毎回導出する）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub ripe: u32,
    pub unripe: u32,
    pub rotten: u32,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Ripe => self.ripe,
            Category::Unripe => self.unripe,
            Category::Rotten => self.rotten,
        }
    }

    pub fn set(&mut self, category: Category, value: u32) {
        match category {
            Category::Ripe => self.ripe = value,
            Category::Unripe => self.unripe = value,
            Category::Rotten => self.rotten = value,
        }
    }

    pub fn total(&self) -> u32 {
        self.ripe.saturating_add(self.unripe).saturating_add(self.rotten)
    }

    /// 個数が1以上のカテゴリ数
    pub fn present_categories(&self) -> usize {
        Category::ALL.iter().filter(|c| self.get(**c) > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// カテゴリごとの割合（%）。合計0なら全て0
    pub fn percentages(&self) -> [f64; 3] {
        let total = self.total();
        if total == 0 {
            return [0.0; 3];
        }
        let total = total as f64;
        [
            self.ripe as f64 / total * 100.0,
            self.unripe as f64 / total * 100.0,
            self.rotten as f64 / total * 100.0,
        ]
    }

    /// カード表示用 "Ripe: 3 | Unripe: 1 | Rotten: 0"
    pub fn breakdown_text(&self) -> String {
        format!(
            "Ripe: {} | Unripe: {} | Rotten: {}",
            self.ripe, self.unripe, self.rotten
        )
    }

    /// 判定テキスト形式 "3 Ripe, 1 Rotten"（0件のカテゴリは省略）
    pub fn summary_text(&self) -> String {
        Category::ALL
            .iter()
            .filter(|c| self.get(**c) > 0)
            .map(|c| format!("{} {}", self.get(*c), c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::ops::AddAssign for CategoryCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.ripe = self.ripe.saturating_add(rhs.ripe);
        self.unripe = self.unripe.saturating_add(rhs.unripe);
        self.rotten = self.rotten.saturating_add(rhs.rotten);
    }
}

/// 1フレームの検出結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,

    /// 正規化座標 [x1, y1, x2, y2]（各0〜1）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_relative: Option<[f64; 4]>,

    /// 旧形式のピクセル座標
    #[serde(default, rename = "box", skip_serializing_if = "Option::is_none")]
    pub box_absolute: Option<[f64; 4]>,

    #[serde(default)]
    pub score: f64,
}

impl Detection {
    pub fn category(&self) -> Option<Category> {
        Category::from_label(&self.label)
    }
}

/// `/detect_frame` のレスポンス、`detection_results` イベントのペイロード
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub detections: Vec<Detection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// レコードに保存された検出データ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionData {
    #[serde(default)]
    pub detections: Vec<Detection>,
}

/// サーバーに保存された判定レコード（クライアントでは読み取りと削除のみ）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: i64,

    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub assessment: String,

    #[serde(default)]
    pub confidence: f64,

    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub image_url: String,

    #[serde(default)]
    pub ripe_image_url: Option<String>,

    #[serde(default)]
    pub unripe_image_url: Option<String>,

    #[serde(default)]
    pub rotten_image_url: Option<String>,

    #[serde(default)]
    pub detection_data: Option<DetectionData>,
}

impl AssessmentRecord {
    /// タイムスタンプを解釈する。不正な値はNone
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    /// 信頼度（%）
    pub fn confidence_percent(&self) -> f64 {
        self.confidence * 100.0
    }

    /// カテゴリ別画像URL
    pub fn category_image_url(&self, category: Category) -> Option<&str> {
        let url = match category {
            Category::Ripe => self.ripe_image_url.as_deref(),
            Category::Unripe => self.unripe_image_url.as_deref(),
            Category::Rotten => self.rotten_image_url.as_deref(),
        };
        url.filter(|u| !u.is_empty())
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// サーバーが返すタイムスタンプ文字列を解釈する
///
/// 対応形式:
/// 1. RFC 3339 (`2025-01-02T03:04:05Z`, `+08:00`)
/// 2. タイムゾーンなしISO形式 (`2025-01-02T03:04:05.123456`)
/// 3. RFC 2822 / HTTP日付 (`Mon, 06 Oct 2025 10:00:00 GMT`)
///
/// タイムゾーン付きの値はUTCに正規化する。解釈できなければNone
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.naive_utc());
    }

    None
}

/// 表示用の日時文字列
pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserialize_full() {
        let json = r#"{
            "id": 7,
            "image_url": "/static/uploads/a.jpg",
            "assessment": "12 Ripe, 3 Rotten",
            "confidence": 0.875,
            "source": "upload",
            "detection_data": {"detections": [{"label": "Ripe", "box_relative": [0.1, 0.1, 0.2, 0.2], "score": 0.9}]},
            "ripe_image_url": "/static/uploads/a_ripe.jpg",
            "unripe_image_url": null,
            "rotten_image_url": "/static/uploads/a_rotten.jpg",
            "timestamp": "2025-03-01T10:20:30"
        }"#;

        let record: AssessmentRecord = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(record.id, 7);
        assert_eq!(record.assessment, "12 Ripe, 3 Rotten");
        assert_eq!(record.category_image_url(Category::Ripe), Some("/static/uploads/a_ripe.jpg"));
        assert_eq!(record.category_image_url(Category::Unripe), None);
        assert_eq!(record.detection_data.unwrap().detections.len(), 1);
    }

    #[test]
    fn test_record_deserialize_minimal() {
        let record: AssessmentRecord = serde_json::from_str(r#"{"id": 1}"#).expect("デシリアライズ失敗");
        assert_eq!(record.assessment, "");
        assert_eq!(record.confidence, 0.0);
        assert!(record.timestamp.is_none());
        assert!(record.parsed_timestamp().is_none());
    }

    #[test]
    fn test_detection_legacy_box() {
        let json = r#"{"label": "Rotten", "box": [10, 20, 30, 40], "score": 0.5}"#;
        let detection: Detection = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert!(detection.box_relative.is_none());
        assert_eq!(detection.box_absolute, Some([10.0, 20.0, 30.0, 40.0]));
        assert_eq!(detection.category(), Some(Category::Rotten));
    }

    #[test]
    fn test_detection_response_with_warning() {
        let json = r#"{"detections": [], "warning": "No kaong fruit detected"}"#;
        let response: DetectionResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert!(response.detections.is_empty());
        assert_eq!(response.warning.as_deref(), Some("No kaong fruit detected"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_category_from_label() {
        assert_eq!(Category::from_label("ripe"), Some(Category::Ripe));
        assert_eq!(Category::from_label(" UNRIPE "), Some(Category::Unripe));
        assert_eq!(Category::from_label("kaong"), None);
    }

    // =============================================
    // CategoryCounts テスト
    // =============================================

    #[test]
    fn test_counts_summary_text() {
        let counts = CategoryCounts { ripe: 3, unripe: 0, rotten: 1 };
        assert_eq!(counts.summary_text(), "3 Ripe, 1 Rotten");
        assert_eq!(counts.breakdown_text(), "Ripe: 3 | Unripe: 0 | Rotten: 1");
        assert_eq!(counts.present_categories(), 2);
    }

    #[test]
    fn test_counts_percentages() {
        let counts = CategoryCounts { ripe: 1, unripe: 1, rotten: 2 };
        assert_eq!(counts.percentages(), [25.0, 25.0, 50.0]);
        assert_eq!(CategoryCounts::default().percentages(), [0.0; 3]);
    }

    // =============================================
    // タイムスタンプ テスト
    // =============================================

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDateTime::parse_from_str("2025-10-06 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(parse_timestamp("2025-10-06T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-06 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-06T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-06T18:00:00+08:00"), Some(expected));
        assert_eq!(parse_timestamp("Mon, 06 Oct 2025 10:00:00 GMT"), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_fraction() {
        let parsed = parse_timestamp("2025-10-06T10:00:00.123456").expect("解析失敗");
        assert_eq!(format_timestamp(&parsed), "2025-10-06 10:00:00");
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2025-13-45T99:00:00").is_none());
    }
}
