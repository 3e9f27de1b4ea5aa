//! kaong-inspect
//!
//! 判定サーバーのレコード一覧・集計・CSV出力・画像検出を行うCLI

pub mod cli;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod report;
pub mod watch;
