//! Output formatters for scan results.
//!
//! - text for people reading a terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::config::ScanOptions;
//! use mediadupe::duplicates::DuplicateFinder;
//! use mediadupe::error::ExitCode;
//! use mediadupe::output::JsonOutput;
//!
//! let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
//! finder.scan(&["."]).unwrap();
//! let (groups, summary) = finder.find_duplicates_with_summary().unwrap();
//!
//! let code = ExitCode::for_run(summary.interrupted, groups.len());
//! let output = JsonOutput::new(&groups, &summary, code);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;
