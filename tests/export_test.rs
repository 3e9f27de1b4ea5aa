//! CSVレポート出力の統合テスト

use chrono::NaiveDate;
use kaong_common::{AssessmentRecord, DashboardState, Filter};
use kaong_inspect::error::InspectError;
use kaong_inspect::report::write_csv_report;
use tempfile::tempdir;

fn create_test_record(index: i64) -> AssessmentRecord {
    AssessmentRecord {
        id: index,
        timestamp: Some(format!("2025-03-0{}T09:15:00", index)),
        assessment: format!("{} Ripe, 1 Rotten", index),
        confidence: 0.8,
        source: "camera_ws".to_string(),
        image_url: format!("/static/uploads/{}.jpg", index),
        ..Default::default()
    }
}

fn loaded_state(count: i64) -> DashboardState {
    let mut state = DashboardState::default();
    let token = state.begin_reload();
    state.finish_reload(token, Ok((1..=count).map(create_test_record).collect()));
    state
}

fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 9).expect("日付")
}

#[test]
fn test_csv_report_to_directory() {
    let dir = tempdir().expect("Failed to create temp dir");
    let state = loaded_state(3);

    let path = write_csv_report(&state, Some(dir.path()), report_date()).expect("CSV出力失敗");
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("kaong_assessment_report_2025-03-09.csv")
    );

    let content = std::fs::read_to_string(&path).expect("読み込み失敗");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4, "ヘッダー+3行であるべき");
    assert_eq!(lines[0], "Timestamp,Assessment,Confidence (%),Source,Image URL");
    assert_eq!(
        lines[1],
        r#""2025-03-01 09:15:00","1 Ripe, 1 Rotten",80.0,"camera_ws","/static/uploads/1.jpg""#
    );
}

#[test]
fn test_csv_report_ignores_filter() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut state = loaded_state(2);
    state.set_filter(Filter::NotReady);
    assert!(state.visible_cards().is_empty());

    let output = dir.path().join("out").join("report.csv");
    let path = write_csv_report(&state, Some(&output), report_date()).expect("CSV出力失敗");
    assert_eq!(path, output);

    let content = std::fs::read_to_string(&path).expect("読み込み失敗");
    assert_eq!(content.lines().count(), 3);
}

#[test]
fn test_csv_report_without_data() {
    let dir = tempdir().expect("Failed to create temp dir");
    let state = DashboardState::default();

    let result = write_csv_report(&state, Some(dir.path()), report_date());
    let err = result.expect_err("データなしでエラーになるべき");
    assert!(matches!(err, InspectError::Common(kaong_common::Error::NoData)));
    assert_eq!(
        err.to_string(),
        "No data available to export. Please refresh the data first."
    );
    assert!(std::fs::read_dir(dir.path()).expect("読み込み失敗").next().is_none());
}
