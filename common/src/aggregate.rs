//! 集計モジュール
//!
//! 判定レコード列からサマリーパネルの統計値を求める。

use crate::filter::Filter;
use crate::parser::{parse_assessment, parse_counts, StatusClass};
use crate::types::{format_timestamp, AssessmentRecord, CategoryCounts};
use chrono::NaiveDateTime;

/// アップロードがない場合の最終アップロード表示
pub const NEVER: &str = "Never";

/// ステータス区分ごとの件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub ready: usize,
    pub not_ready: usize,
    pub rotten: usize,
    pub mixed: usize,
    pub unknown: usize,
}

impl StatusCounts {
    pub fn get(&self, status: StatusClass) -> usize {
        match status {
            StatusClass::Ready => self.ready,
            StatusClass::NotReady => self.not_ready,
            StatusClass::Rotten => self.rotten,
            StatusClass::Mixed => self.mixed,
            StatusClass::Unknown => self.unknown,
        }
    }

    fn increment(&mut self, status: StatusClass) {
        let slot = match status {
            StatusClass::Ready => &mut self.ready,
            StatusClass::NotReady => &mut self.not_ready,
            StatusClass::Rotten => &mut self.rotten,
            StatusClass::Mixed => &mut self.mixed,
            StatusClass::Unknown => &mut self.unknown,
        };
        *slot += 1;
    }
}

/// サマリーパネルの統計値
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// 画像（レコード）数
    pub total_items: usize,
    pub status_counts: StatusCounts,
    /// 全レコードのカテゴリ別個数の合計
    pub fruit_totals: CategoryCounts,
    pub total_fruits: u64,
    /// 平均信頼度（%）。空なら0
    pub average_confidence: f64,
    /// 有効なタイムスタンプの最大値
    pub last_upload: Option<NaiveDateTime>,
}

impl Summary {
    pub fn average_confidence_text(&self) -> String {
        format!("{:.1}%", self.average_confidence)
    }

    pub fn last_upload_text(&self) -> String {
        self.last_upload
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_else(|| NEVER.to_string())
    }
}

/// 全レコードを集計する
///
/// 空の入力でも全て0、平均信頼度0%、最終アップロードなしを返す。
/// 解釈できないタイムスタンプは最大値の計算から除外する。
pub fn summarize(records: &[AssessmentRecord]) -> Summary {
    let mut status_counts = StatusCounts::default();
    let mut fruit_totals = CategoryCounts::default();
    let mut total_fruits: u64 = 0;
    let mut confidence_sum = 0.0;
    let mut last_upload: Option<NaiveDateTime> = None;

    for record in records {
        let parsed = parse_assessment(&record.assessment);
        status_counts.increment(parsed.status);

        let counts = parsed.counts;
        total_fruits += u64::from(counts.ripe) + u64::from(counts.unripe) + u64::from(counts.rotten);
        fruit_totals += counts;

        confidence_sum += record.confidence;

        if let Some(ts) = record.parsed_timestamp() {
            if last_upload.map_or(true, |current| ts > current) {
                last_upload = Some(ts);
            }
        }
    }

    let average_confidence = if records.is_empty() {
        0.0
    } else {
        confidence_sum / records.len() as f64 * 100.0
    };

    log::debug!(
        "summarized {} records: {} fruits, avg confidence {:.1}%",
        records.len(),
        total_fruits,
        average_confidence
    );

    Summary {
        total_items: records.len(),
        status_counts,
        fruit_totals,
        total_fruits,
        average_confidence,
        last_upload,
    }
}

/// カテゴリ別サマリー（フィルタ選択時に表示）
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub filter: Filter,
    /// 対象レコード数
    pub images: usize,
    /// 選択カテゴリの個数合計（mixed/allは3カテゴリ合計）
    pub total_fruits: u64,
    pub average_confidence: f64,
    /// 対象レコード内の最小・最大信頼度（%）。対象なしならNone
    pub confidence_range: Option<(f64, f64)>,
}

impl CategorySummary {
    pub fn range_text(&self) -> String {
        match self.confidence_range {
            Some((min, max)) => format!("{:.1}-{:.1}%", min, max),
            None => "-".to_string(),
        }
    }
}

/// フィルタ対象のレコードだけを集計する
pub fn summarize_category(records: &[AssessmentRecord], filter: Filter) -> CategorySummary {
    let mut images = 0usize;
    let mut total_fruits: u64 = 0;
    let mut confidence_sum = 0.0;
    let mut range: Option<(f64, f64)> = None;

    for record in records {
        let counts = parse_counts(&record.assessment);
        if !filter.matches(&counts) {
            continue;
        }

        images += 1;
        total_fruits += u64::from(filter.fruit_count(&counts));

        let confidence = record.confidence_percent();
        confidence_sum += confidence;
        range = Some(match range {
            Some((min, max)) => (min.min(confidence), max.max(confidence)),
            None => (confidence, confidence),
        });
    }

    let average_confidence = if images == 0 {
        0.0
    } else {
        confidence_sum / images as f64
    };

    CategorySummary {
        filter,
        images,
        total_fruits,
        average_confidence,
        confidence_range: range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, assessment: &str, confidence: f64, timestamp: &str) -> AssessmentRecord {
        AssessmentRecord {
            id,
            assessment: assessment.to_string(),
            confidence,
            timestamp: Some(timestamp.to_string()),
            ..Default::default()
        }
    }

    fn sample() -> Vec<AssessmentRecord> {
        vec![
            record(1, "12 Ripe, 3 Rotten", 0.9, "2025-03-01T10:00:00"),
            record(2, "4 Unripe", 0.5, "2025-03-02T08:30:00"),
            record(3, "Ready for Harvesting", 0.7, "not a date"),
            record(4, "2 Rotten", 0.8, "2025-02-28T23:59:59"),
        ]
    }

    // =============================================
    // summarize テスト
    // =============================================

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.total_fruits, 0);
        assert_eq!(summary.fruit_totals, CategoryCounts::default());
        assert_eq!(summary.average_confidence, 0.0);
        assert_eq!(summary.average_confidence_text(), "0.0%");
        assert_eq!(summary.last_upload, None);
        assert_eq!(summary.last_upload_text(), NEVER);
    }

    #[test]
    fn test_summarize_totals() {
        let summary = summarize(&sample());
        assert_eq!(summary.total_items, 4);
        assert_eq!(summary.fruit_totals, CategoryCounts { ripe: 13, unripe: 4, rotten: 5 });
        assert_eq!(summary.total_fruits, 22);
        assert!((summary.average_confidence - 72.5).abs() < 1e-9);
        assert_eq!(summary.average_confidence_text(), "72.5%");
    }

    #[test]
    fn test_summarize_status_counts() {
        let summary = summarize(&sample());
        assert_eq!(summary.status_counts.mixed, 1);
        assert_eq!(summary.status_counts.not_ready, 1);
        assert_eq!(summary.status_counts.ready, 1);
        assert_eq!(summary.status_counts.rotten, 1);
        assert_eq!(summary.status_counts.get(StatusClass::Unknown), 0);
    }

    #[test]
    fn test_summarize_skips_malformed_timestamps() {
        let summary = summarize(&sample());
        assert_eq!(summary.last_upload_text(), "2025-03-02 08:30:00");

        let only_bad = vec![record(9, "1 Ripe", 0.5, "garbage")];
        assert_eq!(summarize(&only_bad).last_upload, None);
    }

    // =============================================
    // summarize_category テスト
    // =============================================

    #[test]
    fn test_summarize_category_ready() {
        let summary = summarize_category(&sample(), Filter::Ready);
        assert_eq!(summary.images, 2);
        assert_eq!(summary.total_fruits, 13);
        assert!((summary.average_confidence - 80.0).abs() < 1e-9);
        let (min, max) = summary.confidence_range.expect("範囲がない");
        assert!((min - 70.0).abs() < 1e-9);
        assert!((max - 90.0).abs() < 1e-9);
        assert_eq!(summary.range_text(), "70.0-90.0%");
    }

    #[test]
    fn test_summarize_category_mixed_counts_all_categories() {
        let summary = summarize_category(&sample(), Filter::Mixed);
        assert_eq!(summary.images, 1);
        assert_eq!(summary.total_fruits, 15);
    }

    #[test]
    fn test_summarize_category_no_match() {
        let records = vec![record(1, "3 Ripe", 0.9, "2025-03-01T10:00:00")];
        let summary = summarize_category(&records, Filter::Rotten);
        assert_eq!(summary.images, 0);
        assert_eq!(summary.total_fruits, 0);
        assert_eq!(summary.average_confidence, 0.0);
        assert!(summary.confidence_range.is_none());
        assert_eq!(summary.range_text(), "-");
    }
}
