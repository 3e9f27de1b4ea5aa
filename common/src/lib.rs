//! Kaong Inspect Common Library
//!
//! CLIとWeb(WASM)で共有される型・判定テキスト解析・集計・状態管理

pub mod aggregate;
pub mod capture;
pub mod coords;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod filter;
pub mod notify;
pub mod parser;
pub mod protocol;
pub mod types;

pub use aggregate::{summarize, summarize_category, CategorySummary, StatusCounts, Summary};
pub use capture::{CaptureController, CaptureMode, CaptureSession, CaptureState, DetailsPanel};
pub use coords::{Letterbox, Overlay, PixelRect, Surface, TargetRect};
pub use dashboard::{render_card, CardView, DashboardState, ReloadOutcome, SortKey, SortOrder};
pub use error::{Error, Result};
pub use export::{build_csv, report_file_name};
pub use filter::Filter;
pub use notify::{Notification, NotifyKind, WarningBanner};
pub use parser::{parse_assessment, parse_counts, status_class, StatusClass};
pub use types::{AssessmentRecord, Category, CategoryCounts, Detection, DetectionResponse};
