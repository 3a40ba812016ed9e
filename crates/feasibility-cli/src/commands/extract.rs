use clap::Args;
use serde_json::Value;

use super::WorkbookArgs;

/// Arguments for base-model extraction
#[derive(Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub source: WorkbookArgs,
}

pub fn run_extract(args: ExtractArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let output = args.source.load()?;
    Ok(serde_json::to_value(output)?)
}
