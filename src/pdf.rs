use crate::api::ApiClient;
use crate::domain::Occurrence;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const FORBIDDEN_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Strips characters Windows and macOS reject in file names.
pub fn sanitize_file_name(input: &str) -> String {
    let replaced = input
        .chars()
        .map(|ch| {
            if FORBIDDEN_CHARS.contains(&ch) || ch.is_control() {
                ' '
            } else {
                ch
            }
        })
        .collect::<String>();

    replaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', ' '])
        .trim()
        .to_string()
}

pub fn abbreviate_occurrence_title(title: &str) -> String {
    let upper = title.to_uppercase();

    if upper.contains("PARADA FORA") {
        "PARADA_IRREGULAR".to_string()
    } else if upper.contains("DESCUMPRIMENTO") {
        "DESC_OP".to_string()
    } else if upper.contains("AVARIA") {
        "AVARIA".to_string()
    } else {
        upper
            .split(' ')
            .next()
            .unwrap_or_default()
            .chars()
            .take(4)
            .collect()
    }
}

/// `<registry> - <name> - <base> - <type> - <DD.MM.YY>.pdf`, skipping empty parts.
pub fn driver_pdf_file_name(
    registry: &str,
    name: &str,
    base: Option<&str>,
    occurrence_title: &str,
    date: NaiveDate,
) -> String {
    let type_abbr = abbreviate_occurrence_title(occurrence_title);
    let date = date.format("%d.%m.%y").to_string();

    let parts = [
        registry,
        name,
        base.unwrap_or_default(),
        type_abbr.as_str(),
        date.as_str(),
    ]
    .into_iter()
    .map(sanitize_file_name)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>();

    format!("{}.pdf", parts.join(" - "))
}

/// One target per driver on the occurrence, named after the download date.
/// Falls back to `<id>.pdf` when no driver is recorded.
pub fn driver_pdf_targets(
    occurrence: &Occurrence,
    dir: &Path,
    downloaded_on: NaiveDate,
) -> Vec<PathBuf> {
    let targets = occurrence
        .drivers
        .iter()
        .map(|driver| {
            dir.join(driver_pdf_file_name(
                &driver.registry,
                &driver.name,
                Some(driver.base_code.as_str()).filter(|base| !base.is_empty()),
                &occurrence.type_title,
                downloaded_on,
            ))
        })
        .collect::<Vec<_>>();

    if targets.is_empty() {
        vec![dir.join(format!("{}.pdf", occurrence.id))]
    } else {
        targets
    }
}

/// Downloads a signed PDF link into `target`.
pub fn download_signed_pdf(client: &ApiClient, signed_url: &str, target: &Path) -> Result<()> {
    let bytes = client
        .download(signed_url)
        .context("Failed to download PDF from signed URL")?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create PDF directory: {}", parent.display()))?;
    }
    fs::write(target, &bytes)
        .with_context(|| format!("Failed to write PDF: {}", target.display()))?;

    info!(path = %target.display(), bytes = bytes.len(), "PDF saved");
    Ok(())
}
