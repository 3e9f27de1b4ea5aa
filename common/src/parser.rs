//! 判定テキストパーサー
//!
//! "12 Ripe, 3 Rotten" のような人が読むための判定テキストから
//! カテゴリ別の個数とステータス区分を取り出す。
//! 全て純粋関数で、同じテキストからは常に同じ結果が得られる。

use crate::types::{Category, CategoryCounts, Detection};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    /// "<数値> <カテゴリ>" の出現
    static ref COUNT_PATTERN: Regex =
        Regex::new(r"(?i)(\d+)\s+(ripe|unripe|rotten)\b").expect("count pattern");

    /// 単語としてのカテゴリ名（"Unripe" が "Ripe" に一致しないように単語境界で区切る）
    static ref CATEGORY_WORD: Regex =
        Regex::new(r"(?i)\b(ripe|unripe|rotten)\b").expect("category pattern");

    static ref NOT_READY_PHRASE: Regex =
        Regex::new(r"(?i)\bnot\s+ready\s+for\s+harvesting\b").expect("not-ready pattern");

    static ref READY_PHRASE: Regex =
        Regex::new(r"(?i)\bready\s+for\s+harvesting\b").expect("ready pattern");
}

/// ステータス区分（フィルタ用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Ready,
    NotReady,
    Rotten,
    Mixed,
    Unknown,
}

impl StatusClass {
    pub const ALL: [StatusClass; 5] = [
        StatusClass::Ready,
        StatusClass::NotReady,
        StatusClass::Rotten,
        StatusClass::Mixed,
        StatusClass::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Ready => "ready",
            StatusClass::NotReady => "not-ready",
            StatusClass::Rotten => "rotten",
            StatusClass::Mixed => "mixed",
            StatusClass::Unknown => "unknown",
        }
    }

    fn from_category(category: Category) -> Self {
        match category {
            Category::Ripe => StatusClass::Ready,
            Category::Unripe => StatusClass::NotReady,
            Category::Rotten => StatusClass::Rotten,
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusClass::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status class: {}", s))
    }
}

/// 判定テキストの解析結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAssessment {
    pub counts: CategoryCounts,
    pub status: StatusClass,
}

/// 判定テキストを解析する
pub fn parse_assessment(text: &str) -> ParsedAssessment {
    ParsedAssessment {
        counts: parse_counts(text),
        status: status_class(text),
    }
}

/// 判定テキストからカテゴリ別の個数を取り出す
///
/// 抽出優先順位:
/// 1. "<数値> <Ripe|Unripe|Rotten>" の出現（同じカテゴリが複数回出たら後勝ちで上書き）
/// 2. 数値のない旧形式: カテゴリが1種類だけ言及されていれば1個
///    ("Ready for Harvesting" はRipe、"Not Ready for Harvesting" はUnripe)
/// 3. 該当なし: 全て0
///
/// # Examples
/// ```
/// use kaong_common::parse_counts;
///
/// let counts = parse_counts("12 Ripe, 3 Rotten");
/// assert_eq!((counts.ripe, counts.unripe, counts.rotten), (12, 0, 3));
/// ```
pub fn parse_counts(text: &str) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    let mut matched = false;

    for caps in COUNT_PATTERN.captures_iter(text) {
        let Some(category) = Category::from_label(&caps[2]) else {
            continue;
        };
        // 桁あふれは上限に丸める
        let number = caps[1].parse::<u32>().unwrap_or(u32::MAX);
        counts.set(category, number);
        matched = true;
    }

    if matched {
        return counts;
    }

    let mentioned = mentioned_categories(text);
    if let [only] = mentioned.as_slice() {
        counts.set(*only, 1);
    }
    counts
}

/// ステータス区分を判定する
///
/// 言及されたカテゴリが1種類ならそのカテゴリ、2種類以上ならmixed、
/// なければunknown
pub fn status_class(text: &str) -> StatusClass {
    match mentioned_categories(text).as_slice() {
        [] => StatusClass::Unknown,
        [only] => StatusClass::from_category(*only),
        _ => StatusClass::Mixed,
    }
}

/// テキスト中で言及されているカテゴリ（重複なし、Ripe/Unripe/Rotten順）
fn mentioned_categories(text: &str) -> Vec<Category> {
    let mut seen = [false; 3];

    for caps in CATEGORY_WORD.captures_iter(text) {
        if let Some(category) = Category::from_label(&caps[1]) {
            seen[category_index(category)] = true;
        }
    }

    if NOT_READY_PHRASE.is_match(text) {
        seen[category_index(Category::Unripe)] = true;
    }
    let without_not_ready = NOT_READY_PHRASE.replace_all(text, " ");
    if READY_PHRASE.is_match(&without_not_ready) {
        seen[category_index(Category::Ripe)] = true;
    }

    Category::ALL
        .iter()
        .copied()
        .filter(|c| seen[category_index(*c)])
        .collect()
}

fn category_index(category: Category) -> usize {
    match category {
        Category::Ripe => 0,
        Category::Unripe => 1,
        Category::Rotten => 2,
    }
}

impl CategoryCounts {
    /// 型付きの検出結果から個数を数える（3カテゴリ以外のラベルは無視）
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut counts = CategoryCounts::default();
        for category in detections.iter().filter_map(Detection::category) {
            let current = counts.get(category);
            counts.set(category, current.saturating_add(1));
        }
        counts
    }
}
