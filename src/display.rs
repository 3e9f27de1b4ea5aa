//! 端末表示用の整形
//!
//! ビューモデル・集計結果を1行ずつの文字列にする。出力は呼び出し側で行う。

use kaong_common::aggregate::{CategorySummary, Summary};
use kaong_common::capture::DetailsPanel;
use kaong_common::coords::Overlay;
use kaong_common::notify::{Notification, NotifyKind};
use kaong_common::parser::StatusClass;
use kaong_common::{CardView, Detection};

const ASSESSMENT_WIDTH: usize = 28;

/// 一覧の見出し
pub fn card_header() -> String {
    format!(
        "{:>5}  {:<19}  {:<width$}  {:>7}  {:<10}  {}",
        "ID",
        "Timestamp",
        "Assessment",
        "Conf.",
        "Status",
        "Breakdown",
        width = ASSESSMENT_WIDTH
    )
}

/// 一覧の1行（しきい値未満は先頭に `~` を付ける）
pub fn card_line(card: &CardView) -> String {
    let marker = if card.dimmed { "~" } else { " " };
    format!(
        "{}{:>4}  {:<19}  {:<width$}  {:>7}  {:<10}  {}",
        marker,
        card.id,
        card.timestamp_text,
        truncate(&card.assessment, ASSESSMENT_WIDTH),
        card.confidence_text,
        card.status.as_str(),
        card.summary_text,
        width = ASSESSMENT_WIDTH
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let head: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

pub fn summary_lines(summary: &Summary) -> Vec<String> {
    let mut lines = vec![
        format!("  画像数: {}", summary.total_items),
        format!("  果実数: {}", summary.total_fruits),
        format!("  平均信頼度: {}", summary.average_confidence_text()),
        format!("  最終アップロード: {}", summary.last_upload_text()),
        format!("  内訳: {}", summary.fruit_totals.breakdown_text()),
    ];
    let statuses: Vec<String> = StatusClass::ALL
        .iter()
        .map(|s| format!("{}={}", s.as_str(), summary.status_counts.get(*s)))
        .collect();
    lines.push(format!("  ステータス: {}", statuses.join(", ")));
    lines
}

pub fn category_summary_lines(summary: &CategorySummary) -> Vec<String> {
    vec![
        format!("{} Summary", summary.filter.label()),
        format!("  画像数: {}", summary.images),
        format!("  果実数: {}", summary.total_fruits),
        format!("  平均信頼度: {:.1}%", summary.average_confidence),
        format!("  信頼度範囲: {}", summary.range_text()),
    ]
}

/// 検出1件分（描画座標付き）
pub fn overlay_line(detection: &Detection, overlay: Option<&Overlay>) -> String {
    match overlay {
        Some(o) => format!(
            "  {:<8} {:>6.1}%  [{:.1}, {:.1}, {:.1}, {:.1}] {}",
            detection.label,
            detection.score * 100.0,
            o.rect.x1,
            o.rect.y1,
            o.rect.x2,
            o.rect.y2,
            o.color
        ),
        None => format!(
            "  {:<8} {:>6.1}%  (ボックスなし)",
            detection.label,
            detection.score * 100.0
        ),
    }
}

pub fn details_lines(details: &DetailsPanel) -> Vec<String> {
    let summary = details.summary_text();
    vec![
        format!("  Timestamp: {}", details.timestamp),
        format!("  Confidence: {}", details.confidence_text()),
        format!("  Source: {}", details.source.label()),
        format!("  Breakdown: {}", details.counts.breakdown_text()),
        format!(
            "  Summary: {}",
            if summary.is_empty() { "No detections" } else { summary.as_str() }
        ),
    ]
}

pub fn notification_line(notification: &Notification) -> String {
    let icon = match notification.kind {
        NotifyKind::Success => "✔",
        NotifyKind::Error => "✖",
        NotifyKind::Info => "ℹ",
    };
    format!("{} {}", icon, notification.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaong_common::coords::Surface;
    use kaong_common::{render_card, AssessmentRecord, Filter};

    #[test]
    fn test_card_line_marks_dimmed() {
        let record = AssessmentRecord {
            id: 7,
            assessment: "2 Ripe".into(),
            confidence: 0.5,
            timestamp: Some("2025-03-01T10:00:00".into()),
            ..Default::default()
        };
        let line = card_line(&render_card(&record, Filter::Ready, 70));
        assert!(line.starts_with("~   7  2025-03-01 10:00:00"), "{}", line);
        assert!(line.contains("50.0%"));
        assert!(line.ends_with("Ripe: 2 | Unripe: 0 | Rotten: 0"));
    }

    #[test]
    fn test_truncate_long_assessment() {
        let long = "a".repeat(40);
        let cut = truncate(&long, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_overlay_line() {
        let detection = Detection {
            label: "Rotten".into(),
            box_relative: Some([0.0, 0.0, 0.5, 0.5]),
            score: 0.9,
            ..Default::default()
        };
        let overlay = Surface::live(200.0, 100.0).overlay(&detection);
        let line = overlay_line(&detection, overlay.as_ref());
        assert!(line.contains("[0.0, 0.0, 100.0, 50.0] red"), "{}", line);
    }

    #[test]
    fn test_notification_line() {
        assert_eq!(
            notification_line(&Notification::success("Assessment deleted successfully")),
            "✔ Assessment deleted successfully"
        );
    }
}
