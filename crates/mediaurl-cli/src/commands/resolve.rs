use std::io::BufRead;

use anyhow::{Context, Result};
use mediaurl_resolver::UrlResolver;

use crate::cli::OutputFormat;
use crate::output::{print_results, print_warning};

pub async fn resolve(
    resolver: &UrlResolver,
    references: &[String],
    format: OutputFormat,
) -> Result<()> {
    let mut results = Vec::with_capacity(references.len());
    for reference in references {
        results.push(resolver.resolve(reference).await);
    }
    print_results(references, &results, format)?;

    let failures = results.iter().filter(|r| r.is_err()).count();
    if failures > 0 {
        anyhow::bail!("{failures} of {} references failed to resolve", references.len());
    }
    Ok(())
}

pub async fn batch(
    resolver: &UrlResolver,
    references: &[String],
    file: Option<&str>,
    settled: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut references = references.to_vec();
    if let Some(path) = file {
        references.extend(read_references(path)?);
    }
    if references.is_empty() {
        print_warning("No references given.");
        return Ok(());
    }

    if settled {
        let results = resolver.resolve_batch_settled(&references).await;
        print_results(&references, &results, format)?;
        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures > 0 {
            print_warning(&format!(
                "{failures} of {} references failed to resolve",
                references.len()
            ));
        }
    } else {
        let urls = resolver
            .resolve_batch(&references)
            .await
            .context("batch resolution failed")?;
        let results: Vec<_> = urls.into_iter().map(Ok).collect();
        print_results(&references, &results, format)?;
    }
    Ok(())
}

pub async fn attachment(
    resolver: &UrlResolver,
    reference: &str,
    filename: &str,
    format: OutputFormat,
) -> Result<()> {
    let result = resolver.resolve_attachment(reference, filename).await;
    let failed = result.is_err();
    print_results(&[reference.to_string()], &[result], format)?;
    if failed {
        anyhow::bail!("failed to sign attachment URL for {reference}");
    }
    Ok(())
}

fn read_references(path: &str) -> Result<Vec<String>> {
    let lines: Vec<String> = if path == "-" {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<Result<_, _>>()
            .context("Failed to read references from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {path}"))?
            .lines()
            .map(str::to_string)
            .collect()
    };

    Ok(lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect())
}
