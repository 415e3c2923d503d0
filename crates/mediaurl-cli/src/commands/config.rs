use anyhow::Result;
use colored::Colorize;
use mediaurl_resolver::ResolverConfig;

use crate::cli::OutputFormat;
use crate::output::print_json;

const REDACTED: &str = "********";

pub fn show(config: &ResolverConfig, source: Option<&str>, format: OutputFormat) -> Result<()> {
    let mut shown = config.clone();
    shown.signer.local.secret = REDACTED.to_string();
    if let Some(s3) = shown.signer.s3.as_mut() {
        s3.secret_key = REDACTED.to_string();
    }

    if matches!(format, OutputFormat::Json) {
        return print_json(&serde_json::to_value(&shown)?);
    }

    println!(
        "{}: {}",
        "Source".cyan(),
        source.unwrap_or("defaults + MEDIAURL__* environment")
    );
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}
