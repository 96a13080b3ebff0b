use tickstash_core::TickstashService;

use crate::cli::PricesArgs;
use crate::error::CliError;

use super::Outcome;

pub async fn run(args: &PricesArgs, service: &TickstashService) -> Result<Outcome, CliError> {
    let response = service
        .tools()
        .get_stock_prices(&args.symbol, args.date.as_deref())
        .await?;
    Ok(Outcome::Tool(response))
}
