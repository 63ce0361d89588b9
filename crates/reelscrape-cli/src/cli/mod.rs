//! Subcommand implementations.

pub mod doctor;
pub mod extract_cmd;
pub mod logging;
pub mod scrape_cmd;
