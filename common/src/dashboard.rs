//! ダッシュボードの状態管理
//!
//! 表示フィルタ・信頼度しきい値・並び替え・再読み込みの順序付けを
//! 1つの状態オブジェクトにまとめる。DOMには依存せず、
//! 各レコードは `render_card` でビューモデルに変換してから描画する。

use crate::aggregate::{summarize, summarize_category, CategorySummary, Summary};
use crate::error::Result;
use crate::export::build_csv;
use crate::filter::Filter;
use crate::notify::Notification;
use crate::parser::{parse_assessment, parse_counts, StatusClass};
use crate::types::{format_timestamp, AssessmentRecord, CategoryCounts};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// 自動再読み込みの間隔
pub const POLL_INTERVAL_MS: u32 = 5000;
/// 信頼度しきい値の初期値（%）
pub const DEFAULT_THRESHOLD: u8 = 70;

// =============================================
// 並び替え
// =============================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Date,
    Confidence,
    Count,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Confidence => "confidence",
            SortKey::Count => "count",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "timestamp" => Ok(SortKey::Date),
            "confidence" => Ok(SortKey::Confidence),
            "count" => Ok(SortKey::Count),
            other => Err(format!("unknown sort key: {} (date/confidence/count)", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn toggled(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            SortOrder::Asc => "↑",
            SortOrder::Desc => "↓",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {} (asc/desc)", other)),
        }
    }
}

/// 並び替え条件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    fn compare(&self, a: &AssessmentRecord, b: &AssessmentRecord) -> Ordering {
        let ascending = match self.key {
            // 不正な日時は最も古いものとして扱う
            SortKey::Date => a.parsed_timestamp().cmp(&b.parsed_timestamp()),
            SortKey::Confidence => a
                .confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(Ordering::Equal),
            SortKey::Count => parse_counts(&a.assessment)
                .total()
                .cmp(&parse_counts(&b.assessment).total()),
        };
        match self.order {
            SortOrder::Asc => ascending,
            SortOrder::Desc => ascending.reverse(),
        }
    }
}

// =============================================
// 再読み込みの順序付け
// =============================================

/// 再読み込み要求ごとに発行する番号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReloadToken(u64);

/// 単調増加の番号を発行し、最新でない応答を捨てる
#[derive(Debug, Clone, Default)]
pub struct ReloadSequencer {
    issued: u64,
}

impl ReloadSequencer {
    pub fn begin(&mut self) -> ReloadToken {
        self.issued += 1;
        ReloadToken(self.issued)
    }

    pub fn is_current(&self, token: ReloadToken) -> bool {
        token.0 == self.issued
    }
}

/// 再読み込み結果の反映
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// 反映した。`added` は前回より増えた件数
    Applied { total: usize, added: usize },
    /// 新しい要求が既に発行されているため捨てた
    Stale,
    /// 取得失敗（状態は変更しない）
    Failed(String),
}

impl ReloadOutcome {
    /// 利用者に表示する通知
    pub fn notification(&self) -> Option<Notification> {
        match self {
            ReloadOutcome::Applied { total, added } if *added > 0 => Some(Notification::success(
                format!("New assessment detected! Total: {}", total),
            )),
            ReloadOutcome::Failed(message) => Some(Notification::error(format!(
                "Error loading data: {}",
                message
            ))),
            _ => None,
        }
    }

    /// 読み込み中表示を解除してよいか（古い応答では新しい要求がまだ進行中）
    pub fn settles_loading(&self) -> bool {
        !matches!(self, ReloadOutcome::Stale)
    }
}

/// 削除結果の反映
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// 削除済み。集計を合わせるため全件再読み込みが必要
    Deleted { id: i64, removed_locally: bool },
    Failed(String),
}

impl DeleteOutcome {
    pub fn needs_reload(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted { .. })
    }

    pub fn notification(&self) -> Notification {
        match self {
            DeleteOutcome::Deleted { .. } => Notification::success("Assessment deleted successfully"),
            DeleteOutcome::Failed(_) => {
                Notification::error("Failed to delete assessment. Please try again.")
            }
        }
    }
}

// =============================================
// カードのビューモデル
// =============================================

/// 信頼度バッジの区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceClass {
    High,
    Medium,
    Low,
}

impl ConfidenceClass {
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 80.0 {
            ConfidenceClass::High
        } else if percent >= 60.0 {
            ConfidenceClass::Medium
        } else {
            ConfidenceClass::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceClass::High => "high",
            ConfidenceClass::Medium => "medium",
            ConfidenceClass::Low => "low",
        }
    }
}

/// ギャラリーの1枚分
#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub id: i64,
    /// 表示する画像（単一カテゴリのフィルタ中はカテゴリ別画像を優先）
    pub image_url: String,
    pub assessment: String,
    pub status: StatusClass,
    pub counts: CategoryCounts,
    /// "87.5%"
    pub confidence_text: String,
    pub confidence_class: ConfidenceClass,
    /// "Ripe: 3 | Unripe: 0 | Rotten: 1" または "No detections"
    pub summary_text: String,
    /// Ripe/Unripe/Rottenの割合（%）
    pub breakdown: [f64; 3],
    pub timestamp_text: String,
    pub source: String,
    /// カテゴリフィルタに一致するか
    pub visible: bool,
    /// しきい値未満で減光するか（非表示にはしない）
    pub dimmed: bool,
}

/// レコードをカードのビューモデルに変換する（純粋関数）
pub fn render_card(record: &AssessmentRecord, filter: Filter, threshold: u8) -> CardView {
    let parsed = parse_assessment(&record.assessment);
    let counts = parsed.counts;
    let confidence = record.confidence_percent();

    let image_url = filter
        .category()
        .and_then(|c| record.category_image_url(c))
        .unwrap_or(record.image_url.as_str())
        .to_string();

    let summary_text = if counts.is_empty() {
        "No detections".to_string()
    } else {
        counts.breakdown_text()
    };

    let timestamp_text = match record.parsed_timestamp() {
        Some(ts) => format_timestamp(&ts),
        None => "Invalid Date".to_string(),
    };

    CardView {
        id: record.id,
        image_url,
        assessment: record.assessment.clone(),
        status: parsed.status,
        counts,
        confidence_text: format!("{:.1}%", confidence),
        confidence_class: ConfidenceClass::from_percent(confidence),
        summary_text,
        breakdown: counts.percentages(),
        timestamp_text,
        source: record.source.clone(),
        visible: filter.matches(&counts),
        dimmed: filter.applies_threshold() && confidence < f64::from(threshold),
    }
}

// =============================================
// 状態オブジェクト
// =============================================

/// ダッシュボードの状態
#[derive(Debug, Clone)]
pub struct DashboardState {
    records: Vec<AssessmentRecord>,
    filter: Filter,
    threshold: u8,
    sort: Option<SortSpec>,
    last_count: usize,
    reloads: ReloadSequencer,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl DashboardState {
    pub fn new(threshold: u8) -> Self {
        Self {
            records: Vec::new(),
            filter: Filter::All,
            threshold: threshold.min(100),
            sort: None,
            last_count: 0,
            reloads: ReloadSequencer::default(),
        }
    }

    /// 読み込み済みの全レコード（サーバーの返した順）
    pub fn records(&self) -> &[AssessmentRecord] {
        &self.records
    }

    pub fn has_data(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        log::debug!("filter changed: {} -> {}", self.filter, filter);
        self.filter = filter;
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// しきい値を0〜100に丸めて設定する
    pub fn set_threshold(&mut self, threshold: i32) {
        self.threshold = threshold.clamp(0, 100) as u8;
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    /// 並び替えキーを選ぶ（順序は維持）
    pub fn set_sort_key(&mut self, key: SortKey) {
        let order = self.sort.map(|s| s.order).unwrap_or_default();
        self.sort = Some(SortSpec { key, order });
    }

    /// 昇順・降順を切り替える
    pub fn toggle_sort_order(&mut self) -> SortOrder {
        let spec = self.sort.unwrap_or_default();
        let toggled = SortSpec { key: spec.key, order: spec.order.toggled() };
        self.sort = Some(toggled);
        toggled.order
    }

    pub fn set_sort(&mut self, spec: SortSpec) {
        self.sort = Some(spec);
    }

    // ---- 再読み込み ----

    /// 再読み込みを開始して番号を受け取る
    pub fn begin_reload(&mut self) -> ReloadToken {
        self.reloads.begin()
    }

    /// 再読み込みの応答を反映する
    ///
    /// 後から発行された要求がある場合は応答を捨てる。
    /// 失敗時は読み込み済みのデータをそのまま残す。
    pub fn finish_reload(
        &mut self,
        token: ReloadToken,
        response: std::result::Result<Vec<AssessmentRecord>, String>,
    ) -> ReloadOutcome {
        if !self.reloads.is_current(token) {
            log::debug!("discarding stale reload response {:?}", token);
            return ReloadOutcome::Stale;
        }

        match response {
            Ok(records) => {
                let total = records.len();
                let added = total.saturating_sub(self.last_count);
                self.records = records;
                self.last_count = total;
                log::info!("loaded {} assessment records", total);
                ReloadOutcome::Applied { total, added }
            }
            Err(message) => {
                log::error!("failed to load assessment data: {}", message);
                ReloadOutcome::Failed(message)
            }
        }
    }

    // ---- 削除 ----

    /// 削除要求の結果を反映する（失敗時は状態を変更しない）
    pub fn finish_delete(&mut self, id: i64, response: std::result::Result<(), String>) -> DeleteOutcome {
        match response {
            Ok(()) => {
                let before = self.records.len();
                self.records.retain(|r| r.id != id);
                let removed_locally = self.records.len() != before;
                log::info!("assessment {} deleted", id);
                DeleteOutcome::Deleted { id, removed_locally }
            }
            Err(message) => {
                log::error!("error deleting assessment {}: {}", id, message);
                DeleteOutcome::Failed(message)
            }
        }
    }

    // ---- エクスポート ----

    /// 読み込み済みの全レコードをCSVにする（データなしはエラー）
    pub fn export_csv(&self) -> Result<String> {
        build_csv(&self.records)
    }

    // ---- 集計 ----

    pub fn summary(&self) -> Summary {
        summarize(&self.records)
    }

    /// カテゴリ別サマリー（allでは表示しない）
    pub fn category_summary(&self) -> Option<CategorySummary> {
        match self.filter {
            Filter::All => None,
            filter => Some(summarize_category(&self.records, filter)),
        }
    }

    // ---- 描画 ----

    /// 現在の並び順で全カードを作る（非表示・減光フラグ付き）
    pub fn cards(&self) -> Vec<CardView> {
        let mut ordered: Vec<&AssessmentRecord> = self.records.iter().collect();
        if let Some(spec) = self.sort {
            ordered.sort_by(|a, b| spec.compare(a, b));
        }
        ordered
            .into_iter()
            .map(|r| render_card(r, self.filter, self.threshold))
            .collect()
    }

    /// フィルタに一致するカードだけ
    pub fn visible_cards(&self) -> Vec<CardView> {
        self.cards().into_iter().filter(|c| c.visible).collect()
    }

    /// "Currently showing: Ripe Only"
    pub fn filter_status_text(&self) -> String {
        format!("Currently showing: {}", self.filter.label())
    }

    /// しきい値の適用状況
    pub fn confidence_info(&self) -> String {
        let cards = self.visible_cards();
        if !self.filter.applies_threshold() {
            return format!("Showing all {} assessments", cards.len());
        }

        let total = cards.len();
        let bright = cards.iter().filter(|c| !c.dimmed).count();
        let percent = if total == 0 {
            0.0
        } else {
            bright as f64 / total as f64 * 100.0
        };
        format!("Showing {} of {} assessments ({:.1}%)", bright, total, percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn record(id: i64, assessment: &str, confidence: f64, timestamp: &str) -> AssessmentRecord {
        AssessmentRecord {
            id,
            assessment: assessment.to_string(),
            confidence,
            timestamp: Some(timestamp.to_string()),
            image_url: format!("/static/uploads/{}.jpg", id),
            ..Default::default()
        }
    }

    fn loaded_state() -> DashboardState {
        let mut state = DashboardState::default();
        let token = state.begin_reload();
        state.finish_reload(
            token,
            Ok(vec![
                record(1, "12 Ripe, 3 Rotten", 0.9, "2025-03-01T10:00:00"),
                record(2, "4 Unripe", 0.5, "2025-03-03T08:30:00"),
                record(3, "2 Ripe", 0.65, "2025-03-02T12:00:00"),
                record(4, "no fruit", 0.2, "broken"),
            ]),
        );
        state
    }

    fn ids(cards: &[CardView]) -> Vec<i64> {
        cards.iter().map(|c| c.id).collect()
    }

    // =============================================
    // render_card テスト
    // =============================================

    #[test]
    fn test_render_card() {
        let mut r = record(5, "3 Ripe, 1 Rotten", 0.875, "2025-03-01T10:00:00");
        r.ripe_image_url = Some("/static/uploads/5_ripe.jpg".into());

        let card = render_card(&r, Filter::All, 70);
        assert_eq!(card.image_url, "/static/uploads/5.jpg");
        assert_eq!(card.status, StatusClass::Mixed);
        assert_eq!(card.confidence_text, "87.5%");
        assert_eq!(card.confidence_class, ConfidenceClass::High);
        assert_eq!(card.summary_text, "Ripe: 3 | Unripe: 0 | Rotten: 1");
        assert_eq!(card.breakdown, [75.0, 0.0, 25.0]);
        assert!(card.visible);
        assert!(!card.dimmed);

        let ripe_card = render_card(&r, Filter::Ready, 90);
        assert_eq!(ripe_card.image_url, "/static/uploads/5_ripe.jpg");
        assert!(ripe_card.dimmed);

        let rotten_card = render_card(&r, Filter::Rotten, 50);
        assert_eq!(rotten_card.image_url, "/static/uploads/5.jpg");
    }

    #[test]
    fn test_render_card_no_detections() {
        let card = render_card(&record(6, "???", 0.1, "bad"), Filter::All, 70);
        assert_eq!(card.summary_text, "No detections");
        assert_eq!(card.timestamp_text, "Invalid Date");
        assert_eq!(card.confidence_class, ConfidenceClass::Low);
        assert_eq!(card.status, StatusClass::Unknown);
    }

    // =============================================
    // フィルタ・しきい値 テスト
    // =============================================

    #[test]
    fn test_filter_visibility() {
        let mut state = loaded_state();
        state.set_filter(Filter::Ready);
        assert_eq!(ids(&state.visible_cards()), vec![1, 3]);
        assert_eq!(state.cards().len(), 4);

        state.set_filter(Filter::Mixed);
        assert_eq!(ids(&state.visible_cards()), vec![1]);
    }

    #[test]
    fn test_threshold_dims_only_when_filtered() {
        let mut state = loaded_state();
        state.set_threshold(70);
        assert!(state.cards().iter().all(|c| !c.dimmed));
        assert_eq!(state.confidence_info(), "Showing all 4 assessments");

        state.set_filter(Filter::Ready);
        let cards = state.visible_cards();
        assert!(!cards[0].dimmed);
        assert!(cards[1].dimmed);
        assert!(cards[1].visible);
        assert_eq!(state.confidence_info(), "Showing 1 of 2 assessments (50.0%)");
    }

    #[test]
    fn test_threshold_is_clamped() {
        let mut state = DashboardState::default();
        assert_eq!(state.threshold(), DEFAULT_THRESHOLD);
        state.set_threshold(150);
        assert_eq!(state.threshold(), 100);
        state.set_threshold(-3);
        assert_eq!(state.threshold(), 0);
    }

    #[test]
    fn test_filter_status_text() {
        let mut state = DashboardState::default();
        state.set_filter(Filter::NotReady);
        assert_eq!(state.filter_status_text(), "Currently showing: Unripe Only");
    }

    // =============================================
    // 並び替え テスト
    // =============================================

    #[test]
    fn test_sort_by_date() {
        let mut state = loaded_state();
        assert_eq!(ids(&state.cards()), vec![1, 2, 3, 4]);

        state.set_sort_key(SortKey::Date);
        assert_eq!(ids(&state.cards()), vec![2, 3, 1, 4]);

        assert_eq!(state.toggle_sort_order(), SortOrder::Asc);
        assert_eq!(ids(&state.cards()), vec![4, 1, 3, 2]);
    }

    #[test]
    fn test_sort_by_confidence_and_count() {
        let mut state = loaded_state();
        state.set_sort(SortSpec { key: SortKey::Confidence, order: SortOrder::Desc });
        assert_eq!(ids(&state.cards()), vec![1, 3, 2, 4]);

        state.set_sort(SortSpec { key: SortKey::Count, order: SortOrder::Asc });
        assert_eq!(ids(&state.cards()), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_sort_keeps_dimming() {
        let mut state = loaded_state();
        state.set_filter(Filter::Ready);
        state.set_sort(SortSpec { key: SortKey::Confidence, order: SortOrder::Asc });
        let cards = state.visible_cards();
        assert_eq!(ids(&cards), vec![3, 1]);
        assert!(cards[0].dimmed);
        assert!(!cards[1].dimmed);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert_eq!("timestamp".parse::<SortKey>(), Ok(SortKey::Date));
        assert!("size".parse::<SortKey>().is_err());
        assert_eq!(SortOrder::Desc.symbol(), "↓");
    }

    // =============================================
    // 再読み込み テスト
    // =============================================

    #[test]
    fn test_stale_reload_is_discarded() {
        let mut state = DashboardState::default();
        let first = state.begin_reload();
        let second = state.begin_reload();

        let applied = state.finish_reload(second, Ok(vec![record(1, "1 Ripe", 0.9, "2025-03-01T10:00:00")]));
        assert_eq!(applied, ReloadOutcome::Applied { total: 1, added: 1 });

        let stale = state.finish_reload(first, Ok(vec![]));
        assert_eq!(stale, ReloadOutcome::Stale);
        assert_eq!(state.records().len(), 1);
    }

    #[test]
    fn test_reload_new_data_notification() {
        let mut state = loaded_state();
        let token = state.begin_reload();
        let mut records = state.records().to_vec();
        let outcome = state.finish_reload(token, Ok(records.clone()));
        assert_eq!(outcome, ReloadOutcome::Applied { total: 4, added: 0 });
        assert!(outcome.notification().is_none());

        records.push(record(9, "1 Rotten", 0.9, "2025-03-04T00:00:00"));
        let token = state.begin_reload();
        let outcome = state.finish_reload(token, Ok(records));
        let notification = outcome.notification().expect("通知がない");
        assert_eq!(notification.message, "New assessment detected! Total: 5");
    }

    #[test]
    fn test_failed_reload_keeps_data() {
        let mut state = loaded_state();
        let token = state.begin_reload();
        let outcome = state.finish_reload(token, Err("connection refused".into()));
        assert_eq!(outcome, ReloadOutcome::Failed("connection refused".into()));
        assert_eq!(state.records().len(), 4);
        assert_eq!(
            outcome.notification().expect("通知がない").message,
            "Error loading data: connection refused"
        );
    }

    #[test]
    fn test_stale_reload_keeps_loading() {
        let mut state = DashboardState::default();
        let first = state.begin_reload();
        let second = state.begin_reload();

        let stale = state.finish_reload(first, Ok(vec![record(1, "1 Ripe", 0.9, "2025-03-01T10:00:00")]));
        assert!(!stale.settles_loading(), "新しい要求の完了を待つ");

        let current = state.finish_reload(second, Ok(vec![]));
        assert!(current.settles_loading());
        assert!(ReloadOutcome::Failed("timeout".into()).settles_loading());
    }

    // =============================================
    // 削除・エクスポート テスト
    // =============================================

    #[test]
    fn test_delete_success_removes_record() {
        let mut state = loaded_state();
        let outcome = state.finish_delete(2, Ok(()));
        assert_eq!(outcome, DeleteOutcome::Deleted { id: 2, removed_locally: true });
        assert!(outcome.needs_reload());
        assert_eq!(ids(&state.cards()), vec![1, 3, 4]);
    }

    #[test]
    fn test_delete_failure_keeps_state() {
        let mut state = loaded_state();
        let outcome = state.finish_delete(2, Err("HTTP 500".into()));
        assert!(!outcome.needs_reload());
        assert_eq!(state.records().len(), 4);
        assert_eq!(
            outcome.notification().message,
            "Failed to delete assessment. Please try again."
        );
    }

    #[test]
    fn test_export_uses_full_record_set() {
        let mut state = loaded_state();
        state.set_filter(Filter::Rotten);
        let csv = state.export_csv().expect("CSV生成失敗");
        assert_eq!(csv.lines().count(), 5);
    }

    #[test]
    fn test_export_without_data_is_refused() {
        let state = DashboardState::default();
        assert!(matches!(state.export_csv(), Err(Error::NoData)));
    }

    #[test]
    fn test_category_summary_hidden_for_all() {
        let mut state = loaded_state();
        assert!(state.category_summary().is_none());
        state.set_filter(Filter::NotReady);
        let summary = state.category_summary().expect("サマリーがない");
        assert_eq!(summary.images, 1);
        assert_eq!(summary.total_fruits, 4);
    }
}
