use tickstash_core::TickstashService;
use tokio::io::{stdin, stdout, BufReader};
use tracing::info;

use crate::error::CliError;

use super::Outcome;

pub async fn run(service: &TickstashService) -> Result<Outcome, CliError> {
    info!("serving tools on stdio");
    service.rpc().serve(BufReader::new(stdin()), stdout()).await?;
    Ok(Outcome::Served)
}
