pub mod loan;
pub mod projection;
pub mod returns;
pub mod scoring;
pub mod sensitivity;

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use finproj_core::types::with_metadata;

/// Wrap a command result in the standard output envelope.
fn envelope<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    start: Instant,
    result: T,
) -> Result<Value, Box<dyn std::error::Error>> {
    let elapsed = start.elapsed().as_micros() as u64;
    log::debug!("{methodology}: {elapsed}us, {} warning(s)", warnings.len());
    Ok(serde_json::to_value(with_metadata(
        methodology,
        assumptions,
        warnings,
        elapsed,
        result,
    ))?)
}
