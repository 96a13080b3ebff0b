use tickstash_core::TickstashService;

use crate::cli::NewsArgs;
use crate::error::CliError;

use super::Outcome;

pub fn run(args: &NewsArgs, service: &TickstashService) -> Result<Outcome, CliError> {
    let response = service.tools().get_news(
        &args.window.from,
        &args.window.to,
        args.keyword.as_deref(),
    )?;
    Ok(Outcome::Tool(response))
}
