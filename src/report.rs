use crate::error::Result;
use chrono::NaiveDate;
use kaong_common::export::report_file_name;
use kaong_common::DashboardState;
use std::path::{Path, PathBuf};

/// 読み込み済みの全レコードをCSVファイルに書き出す
///
/// # Arguments
/// * `state` - 読み込み済みのダッシュボード状態（フィルタは無視）
/// * `output` - 出力先。`None` ならカレントに日付入りのファイル名で作成
/// * `today` - ファイル名に使う日付
///
/// # Returns
/// 書き出したファイルのパス
pub fn write_csv_report(state: &DashboardState, output: Option<&Path>, today: NaiveDate) -> Result<PathBuf> {
    let csv = state.export_csv()?;

    let path = match output {
        Some(p) if p.is_dir() => p.join(report_file_name(today)),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(report_file_name(today)),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, csv)?;
    log::info!("CSV report written: {}", path.display());
    Ok(path)
}
