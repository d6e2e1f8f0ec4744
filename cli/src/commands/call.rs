use anyhow::{bail, Context, Result};
use serde_json::Value;

use editbridge_client::{BridgeClient, Outcome};
use editbridge_core::ClientConfig;

use crate::utils::{print_error, print_result};

/// Send one command and print its result as JSON
pub async fn execute(config: ClientConfig, method: &str, params: &str) -> Result<()> {
    let params = parse_params(params)?;

    let client = BridgeClient::new(config);
    let outcome = client.send_command(method, params).await;
    client.close().await;

    match outcome? {
        Outcome::Ok(result) => {
            print_result(&result);
            Ok(())
        }
        Outcome::Err(reason) => {
            print_error(&format!("{method} failed: {reason}"));
            bail!("{reason}")
        }
    }
}

fn parse_params(raw: &str) -> Result<Value> {
    let params: Value = serde_json::from_str(raw).context("Invalid --params: not JSON")?;
    match params {
        Value::Object(_) => Ok(params),
        Value::Null => Ok(Value::Object(Default::default())),
        _ => bail!("Invalid --params: expected a JSON object"),
    }
}
