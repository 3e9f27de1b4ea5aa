//! カテゴリフィルタ

use crate::types::{Category, CategoryCounts};
use std::fmt;
use std::str::FromStr;

/// ダッシュボードの表示フィルタ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    All,
    Ready,
    NotReady,
    Rotten,
    Mixed,
}

impl Filter {
    pub const ALL: [Filter; 5] = [
        Filter::All,
        Filter::Ready,
        Filter::NotReady,
        Filter::Rotten,
        Filter::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Ready => "ready",
            Filter::NotReady => "not-ready",
            Filter::Rotten => "rotten",
            Filter::Mixed => "mixed",
        }
    }

    /// ボタン・ステータス表示用の名前
    pub fn label(&self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Ready => "Ripe Only",
            Filter::NotReady => "Unripe Only",
            Filter::Rotten => "Rotten Only",
            Filter::Mixed => "Mixed",
        }
    }

    /// 単一カテゴリを選ぶフィルタならそのカテゴリ
    pub fn category(&self) -> Option<Category> {
        match self {
            Filter::Ready => Some(Category::Ripe),
            Filter::NotReady => Some(Category::Unripe),
            Filter::Rotten => Some(Category::Rotten),
            Filter::All | Filter::Mixed => None,
        }
    }

    /// 表示判定（個数だけで決まる純粋な述語）
    pub fn matches(&self, counts: &CategoryCounts) -> bool {
        match self {
            Filter::All => true,
            Filter::Mixed => counts.present_categories() >= 2,
            single => single
                .category()
                .map(|c| counts.get(c) > 0)
                .unwrap_or(true),
        }
    }

    /// フィルタ対象カテゴリの個数（mixed/allは3カテゴリ合計）
    pub fn fruit_count(&self, counts: &CategoryCounts) -> u32 {
        match self.category() {
            Some(category) => counts.get(category),
            None => counts.total(),
        }
    }

    /// 信頼度しきい値による減光を行うか（allでは行わない）
    pub fn applies_threshold(&self) -> bool {
        !matches!(self, Filter::All)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown filter: {} (all/ready/not-ready/rotten/mixed)", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(ripe: u32, unripe: u32, rotten: u32) -> CategoryCounts {
        CategoryCounts { ripe, unripe, rotten }
    }

    #[test]
    fn test_mixed_filter() {
        assert!(Filter::Mixed.matches(&counts(2, 0, 1)));
        assert!(!Filter::Mixed.matches(&counts(2, 0, 0)));
        assert!(Filter::Mixed.matches(&counts(0, 1, 1)));
    }

    #[test]
    fn test_single_category_filters() {
        let c = counts(0, 3, 0);
        assert!(!Filter::Ready.matches(&c));
        assert!(Filter::NotReady.matches(&c));
        assert!(!Filter::Rotten.matches(&c));
        assert!(Filter::All.matches(&c));
        assert!(Filter::All.matches(&counts(0, 0, 0)));
    }

    #[test]
    fn test_fruit_count() {
        let c = counts(4, 2, 1);
        assert_eq!(Filter::Ready.fruit_count(&c), 4);
        assert_eq!(Filter::Rotten.fruit_count(&c), 1);
        assert_eq!(Filter::Mixed.fruit_count(&c), 7);
        assert_eq!(Filter::All.fruit_count(&c), 7);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!("not-ready".parse::<Filter>(), Ok(Filter::NotReady));
        assert_eq!(" All ".parse::<Filter>(), Ok(Filter::All));
        assert!("ripe".parse::<Filter>().is_err());
        assert_eq!(Filter::Ready.label(), "Ripe Only");
    }
}
