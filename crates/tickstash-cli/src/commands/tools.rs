use serde_json::json;
use tickstash_core::tools::tool_descriptors;

use crate::error::CliError;

use super::Outcome;

pub fn run() -> Result<Outcome, CliError> {
    Ok(Outcome::Data(json!({ "tools": tool_descriptors() })))
}
