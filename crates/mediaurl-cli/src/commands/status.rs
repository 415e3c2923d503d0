use anyhow::Result;
use colored::Colorize;
use mediaurl_resolver::UrlResolver;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::output::{print_json, print_success, print_warning};

pub async fn check(resolver: &UrlResolver, format: OutputFormat) -> Result<()> {
    let distributed = resolver.distributed();
    let available = distributed.is_available().await;
    let stats = resolver.stats();

    if matches!(format, OutputFormat::Json) {
        return print_json(&json!({
            "distributed": {
                "enabled": distributed.is_enabled(),
                "available": available,
                "deadline_ms": distributed.mget_deadline().as_millis() as u64,
            },
            "local": {
                "size": stats.local.size,
                "max_entries": stats.local.max_entries,
            },
            "background_writes": {
                "in_flight": stats.background_in_flight,
                "max_in_flight": stats.background_max_in_flight,
            },
        }));
    }

    println!(
        "{}: {} (max {} entries)",
        "Local tier".cyan(),
        "ready".green(),
        stats.local.max_entries
    );
    if !distributed.is_enabled() {
        print_warning("Distributed tier disabled or unreachable; running local-only");
    } else if available {
        print_success(&format!(
            "Distributed tier reachable (bulk read deadline {} ms)",
            distributed.mget_deadline().as_millis()
        ));
    } else {
        print_warning("Distributed tier configured but not responding");
    }
    Ok(())
}
