//! Output formatting for resolution reports.
//!
//! Turns a [`Report`](crate::resolve::Report) into files a person or a
//! download manager can use:
//!
//! - [`render_link_list`] / [`write_link_file`] - commented plain-text URL list
//! - [`write_json_report`] - the full report as JSON
//! - [`generate_output_filename`] - `<title>_<timestamp>.txt` defaults

mod error;
mod filename;
mod json;
mod links;

pub use error::OutputError;
pub use filename::{format_filesize, generate_output_filename, sanitize_filename};
pub use json::{ReportDocument, write_json_report};
pub use links::{LinkListOptions, name_fragment, render_link_list, write_link_file};
