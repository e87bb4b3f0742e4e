use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Scores, StrategyContext};
use crate::error::{Result, ScoreError};

pub const NAME: &str = "ticket";

#[derive(Debug, Deserialize)]
struct TicketOptions {
    #[serde(default = "default_value")]
    value: f64,
}

fn default_value() -> f64 {
    1.0
}

/// Same score for every address; no chain reads.
pub async fn strategy(ctx: &StrategyContext<'_>, options: Value) -> Result<Scores> {
    let value = if options.is_null() {
        default_value()
    } else {
        serde_json::from_value::<TicketOptions>(options)
            .map_err(|err| ScoreError::invalid_params(format!("Invalid {NAME} options: {err}")))?
            .value
    };

    Ok(ctx
        .addresses
        .iter()
        .map(|address| (address.clone(), value))
        .collect())
}
