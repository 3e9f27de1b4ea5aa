//! Export core modules shared across CLI and WASM wrappers.

pub mod csv;

pub use self::csv::{build_csv, quote_field, report_file_name, CSV_HEADER};
