use clap::{Parser, Subcommand};
use kaong_common::dashboard::{SortKey, SortOrder};
use kaong_common::Filter;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kaong-inspect")]
#[command(about = "カオン果実の熟度判定ダッシュボード", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 判定サーバーのURL（環境変数・設定ファイルより優先）
    #[arg(long, global = true)]
    pub server: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 判定レコードを一覧表示
    List {
        /// 表示フィルタ (all/ready/not-ready/rotten/mixed)
        #[arg(short, long, default_value = "all")]
        filter: Filter,

        /// 信頼度しきい値（%、省略時は設定値）
        #[arg(short, long)]
        threshold: Option<u8>,

        /// 並び替えキー (date/confidence/count)
        #[arg(short, long)]
        sort: Option<SortKey>,

        /// 並び順 (asc/desc)
        #[arg(long, default_value = "desc")]
        order: SortOrder,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 集計を表示
    Summary {
        /// カテゴリ別サマリーのフィルタ
        #[arg(short, long, default_value = "all")]
        filter: Filter,
    },

    /// 全レコードをCSVに出力
    Export {
        /// 出力ファイル（省略時は kaong_assessment_report_<日付>.csv）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// レコードを削除
    Delete {
        /// レコードID
        #[arg(required = true)]
        id: i64,

        /// 確認せずに削除
        #[arg(short, long)]
        yes: bool,
    },

    /// 画像をアップロードして検出
    Detect {
        /// 画像ファイル
        #[arg(required = true)]
        image: PathBuf,

        /// プレビュー領域のサイズ（例: 640x480）
        #[arg(short, long, default_value = "640x480")]
        container: ContainerSize,

        /// 検出結果をサーバーに保存
        #[arg(long)]
        save: bool,

        /// 保存時のsource値
        #[arg(long, default_value = "upload")]
        source: String,
    },

    /// 新しい判定を監視
    Watch {
        /// ポーリング間隔（秒、省略時は設定値）
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// 設定を表示/編集
    Config {
        /// サーバーURLを設定
        #[arg(long)]
        set_server: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

lazy_static! {
    static ref SIZE_PATTERN: Regex = Regex::new(r"^\s*(\d+)\s*[xX×]\s*(\d+)\s*$").expect("size pattern");
}

/// アップロードプレビューの領域サイズ
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl std::str::FromStr for ContainerSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SIZE_PATTERN
            .captures(s)
            .ok_or_else(|| format!("Invalid size: {}. Use WIDTHxHEIGHT (e.g. 640x480)", s))?;
        let width: f64 = caps[1].parse().map_err(|_| format!("Invalid width: {}", &caps[1]))?;
        let height: f64 = caps[2].parse().map_err(|_| format!("Invalid height: {}", &caps[2]))?;
        if width <= 0.0 || height <= 0.0 {
            return Err(format!("Size must be positive: {}", s));
        }
        Ok(Self { width, height })
    }
}

impl std::fmt::Display for ContainerSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
