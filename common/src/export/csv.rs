//! CSVレポート生成
//!
//! 読み込み済みの全レコード（フィルタ後ではない）を1行ずつ書き出す。

use crate::error::{Error, Result};
use crate::types::{format_timestamp, AssessmentRecord};
use chrono::NaiveDate;

pub const CSV_HEADER: &str = "Timestamp,Assessment,Confidence (%),Source,Image URL";

/// ダウンロード時のファイル名
pub fn report_file_name(date: NaiveDate) -> String {
    format!("kaong_assessment_report_{}.csv", date.format("%Y-%m-%d"))
}

/// ダブルクォートで囲み、内部のダブルクォートは2つ重ねる
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_row(record: &AssessmentRecord) -> String {
    let timestamp = match record.parsed_timestamp() {
        Some(ts) => format_timestamp(&ts),
        None => record.timestamp.clone().unwrap_or_default(),
    };

    format!(
        "{},{},{:.1},{},{}",
        quote_field(&timestamp),
        quote_field(&record.assessment),
        record.confidence_percent(),
        quote_field(&record.source),
        quote_field(&record.image_url),
    )
}

/// CSVレポートを生成する
///
/// # Returns
/// * `Ok(String)` - ヘッダー + 1レコード1行（改行区切り）
/// * `Err(Error::NoData)` - レコードが1件もない場合
pub fn build_csv(records: &[AssessmentRecord]) -> Result<String> {
    if records.is_empty() {
        return Err(Error::NoData);
    }

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADER.to_string());
    lines.extend(records.iter().map(csv_row));

    log::info!("exporting {} records to CSV", records.len());
    Ok(lines.join("\n"))
}
