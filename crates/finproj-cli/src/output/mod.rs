pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use clap::ValueEnum;
use serde_json::Value;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Full envelope as JSON
    Json,
    /// Result fields, then schedules and rows, as tables
    Table,
    /// Rows as CSV when the result has them, else field,value pairs
    Csv,
    /// Headline number only
    Minimal,
}

/// Render a command's envelope in the requested format.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}
