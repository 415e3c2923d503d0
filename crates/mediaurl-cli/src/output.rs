use crate::cli::OutputFormat;
use colored::Colorize;
use mediaurl_resolver::ResolveResult;
use serde_json::{Value, json};
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print reference/URL pairs in the requested format.
pub fn print_results(
    references: &[String],
    results: &[ResolveResult<String>],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for result in results {
                match result {
                    Ok(url) => println!("{url}"),
                    Err(e) => print_error(&e.to_string()),
                }
            }
        }
        OutputFormat::Json => {
            let items: Vec<Value> = references
                .iter()
                .zip(results)
                .map(|(reference, result)| match result {
                    Ok(url) => json!({ "reference": reference, "url": url }),
                    Err(e) => json!({ "reference": reference, "error": e.to_string() }),
                })
                .collect();
            print_json(&Value::Array(items))?;
        }
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["#", "Reference", "Result"]);
            for (i, (reference, result)) in references.iter().zip(results).enumerate() {
                let shown = match result {
                    Ok(url) => url.clone(),
                    Err(e) => format!("error: {e}"),
                };
                builder.push_record([i.to_string(), reference.clone(), shown]);
            }
            let table = builder.build().with(Style::rounded()).to_string();
            println!("{table}");
        }
    }
    Ok(())
}
