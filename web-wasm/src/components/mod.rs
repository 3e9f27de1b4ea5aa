pub mod assessment_grid;
pub mod capture_panel;
pub mod dashboard;
pub mod details_panel;
pub mod filter_bar;
pub mod header;
pub mod notifications;
pub mod summary_panel;
