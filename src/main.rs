mod api;
mod catalog;
mod cli;
mod config;
mod domain;
mod form;
mod pdf;
mod report;
mod scheduler;

use crate::api::{ApiClient, ApiError};
use crate::catalog::{TripCatalog, TripCatalogEntry};
use crate::cli::wizard::{driver_label, run_new_occurrence};
use crate::cli::{
    CatalogCommands, Cli, Commands, ConfigCommands, CreateOccurrenceArgs, DriverCommands,
    OccurrenceCommands, TextFormat,
};
use crate::config::Config;
use crate::domain::{CreateDriverInput, OccurrenceView, Trip};
use crate::form::OccurrenceDraft;
use crate::form::picker::Selection;
use crate::report::daily::{build_daily_report, render_summary, save_report_files};
use crate::report::{render_digest_block, render_narrative, render_whatsapp};
use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { command } => handle_config_command(command),
        Commands::Doctor => handle_doctor(),
        Commands::Catalog { command } => handle_catalog_command(command),
        Commands::Occurrence { command } => handle_occurrence_command(command),
        Commands::Driver { command } => handle_driver_command(command),
        Commands::Pdf {
            id,
            ttl,
            force,
            download,
        } => handle_pdf(&id, ttl, force, download),
        Commands::Report { date, copy, save } => handle_report(date, copy, save),
        Commands::Service => {
            let config = Config::load_or_default()?;
            tokio::runtime::Runtime::new()
                .context("Failed to start async runtime")?
                .block_on(run_service(config))
        }
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_or_default()?;
            config.set_value(&key, &value)?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = Config::load_or_default()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing");
    }

    let config = Config::load_or_default()?;

    match load_catalog(&config) {
        Ok(catalog) if catalog.is_empty() => {
            println!("[WARN] trip catalog has no usable rows");
            issues.push("catalog empty");
        }
        Ok(catalog) => println!("[OK] trip catalog loaded: {} trip(s)", catalog.len()),
        Err(error) => {
            println!("[WARN] trip catalog failed: {error:#}");
            issues.push("catalog unreadable");
        }
    }

    if let Err(error) = config.parse_report_time() {
        println!("[WARN] invalid report_time setting: {error}");
        issues.push("invalid report_time");
    } else {
        println!("[OK] report_time format valid: {}", config.report_time);
    }

    if config.report_dir.exists() {
        println!("[OK] report dir exists: {}", config.report_dir.display());
    } else {
        println!("[WARN] report dir missing: {}", config.report_dir.display());
        issues.push("report dir missing");
    }

    let client = api_client(&config)?;
    match client.list_occurrences(Local::now().date_naive()) {
        Ok(occurrences) => println!(
            "[OK] API reachable: {} ({} occurrence(s) today)",
            client.base_url(),
            occurrences.len()
        ),
        Err(error) => {
            println!(
                "[WARN] API check failed ({}): {}",
                client.base_url(),
                error.user_message()
            );
            issues.push("api unreachable");
        }
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn handle_catalog_command(command: CatalogCommands) -> Result<()> {
    let config = Config::load_or_default()?;
    let catalog = load_catalog(&config)?;

    match command {
        CatalogCommands::List => {
            for trip in catalog.rows() {
                println!("{}\t{}", trip.id, trip.label());
            }
            println!("{} trip(s)", catalog.len());
        }
        CatalogCommands::Search { query } => {
            let matches = catalog.search(&query);
            if matches.is_empty() {
                println!("Nenhuma viagem encontrada.");
            }
            for trip in matches {
                println!("{}\t{}", trip.id, trip.label());
            }
        }
        CatalogCommands::Find {
            line_code,
            line_name,
            departure_time,
            direction,
        } => {
            let trip = catalog
                .find_by_fields(&line_code, &line_name, &departure_time, &direction)
                .with_context(|| {
                    format!("Trip not found: {line_code} {line_name} {departure_time} {direction}")
                })?;
            println!("{}\t{}", trip.id, trip.label());
        }
    }

    Ok(())
}

fn handle_occurrence_command(command: OccurrenceCommands) -> Result<()> {
    let config = Config::load_or_default()?;
    let client = api_client(&config)?;

    match command {
        OccurrenceCommands::New => {
            let catalog = load_catalog(&config)?;
            run_new_occurrence(&catalog, &client)?;
            Ok(())
        }
        OccurrenceCommands::Create(args) => {
            let catalog = load_catalog(&config)?;
            create_occurrence(&catalog, &client, args)
        }
        OccurrenceCommands::Show { id, format } => {
            let occurrence = client.get_occurrence(&id).map_err(api_failure)?;

            let text = match format {
                TextFormat::Digest => render_digest_block(&occurrence, true),
                TextFormat::Json => serde_json::to_string_pretty(&occurrence)
                    .context("Failed to serialize occurrence")?,
                TextFormat::Narrative | TextFormat::Whatsapp => {
                    let view = OccurrenceView::from_occurrence(&occurrence)
                        .with_context(|| format!("Occurrence {id} has no drivers"))?;
                    if format == TextFormat::Narrative {
                        render_narrative(&view)
                    } else {
                        render_whatsapp(&view)
                    }
                }
            };

            println!("{text}");
            Ok(())
        }
        OccurrenceCommands::Upload { id, files } => {
            client.upload_evidences(&id, &files).map_err(api_failure)?;
            println!("{} evidência(s) enviada(s) para {id}", files.len());
            Ok(())
        }
    }
}

fn create_occurrence(
    catalog: &TripCatalog,
    client: &ApiClient,
    args: CreateOccurrenceArgs,
) -> Result<()> {
    let mut trip = Selection::<TripCatalogEntry>::Unselected;
    trip.select_id(args.trip.trim());
    if !trip.resolve(catalog.rows()) {
        return Err(anyhow!(
            "Trip not found in catalog: {}. Use `catalog search` to list keys.",
            args.trip
        ));
    }

    let mut draft = OccurrenceDraft {
        trip: trip.resolved().cloned().map(Trip::Catalog),
        vehicle_number: args.vehicle,
        event_date: args.date,
        trip_date: args.trip_date.unwrap_or_default(),
        start_time: args.start,
        end_time: args.end,
        place: args.place,
        ..OccurrenceDraft::default()
    };
    if let Some(type_code) = args.type_code {
        draft.type_code = type_code;
    }
    draft.primary_driver.select_id(args.driver1);
    if let Some(driver2) = args.driver2 {
        draft.secondary_enabled = true;
        draft.secondary_driver.select_id(driver2);
    }

    let payload = draft.to_payload()?;
    let created = client.create_occurrence(&payload).map_err(api_failure)?;
    info!(id = %created.id, "occurrence created");

    if !args.evidences.is_empty() {
        client
            .upload_evidences(&created.id, &args.evidences)
            .map_err(api_failure)?;
        info!(id = %created.id, files = args.evidences.len(), "evidences uploaded");
    }

    let stored = client.get_occurrence(&created.id).map_err(api_failure)?;
    println!("{}", render_digest_block(&stored, true));
    Ok(())
}

fn handle_driver_command(command: DriverCommands) -> Result<()> {
    let config = Config::load_or_default()?;
    let client = api_client(&config)?;

    match command {
        DriverCommands::Search { term } => {
            let drivers = client.search_drivers(&term).map_err(api_failure)?;
            if drivers.is_empty() {
                println!("Nenhum motorista encontrado.");
            }
            for driver in drivers {
                println!("{}\t{}", driver.id, driver_label(&driver));
            }
        }
        DriverCommands::Create { code, name, base } => {
            let input = CreateDriverInput {
                code: code.trim().to_string(),
                name: name.trim().to_string(),
                base: base
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty()),
            };
            let driver = client.create_driver(&input).map_err(api_failure)?;
            println!("{}\t{}", driver.id, driver_label(&driver));
        }
    }

    Ok(())
}

fn handle_pdf(id: &str, ttl: Option<u64>, force: bool, download: bool) -> Result<()> {
    let config = Config::load_or_default()?;
    let client = api_client(&config)?;

    let payload = client
        .occurrence_pdf(id, Some(ttl.unwrap_or(config.pdf_ttl_seconds)), force)
        .map_err(api_failure)?;
    println!("{}", payload.pdf.signed_url);
    println!(
        "- ttl: {}s{}",
        payload.pdf.ttl_seconds,
        if payload.pdf.cached { " (cached)" } else { "" }
    );
    if let Some(storage_path) = &payload.pdf.storage_path {
        println!("- storage: {storage_path}");
    }

    if !download {
        return Ok(());
    }

    let occurrence = client.get_occurrence(id).map_err(api_failure)?;
    let downloaded_on = Local::now().date_naive();

    let targets = pdf::driver_pdf_targets(&occurrence, &config.pdf_dir, downloaded_on);

    for target in targets {
        pdf::download_signed_pdf(&client, &payload.pdf.signed_url, &target)?;
        println!("- saved: {}", target.display());
    }

    Ok(())
}

fn handle_report(date: Option<String>, copy: bool, save: bool) -> Result<()> {
    let config = Config::load_or_default()?;
    let target_date = parse_optional_date(date)?;

    if save {
        return run_daily_export(&config, target_date);
    }

    let client = api_client(&config)?;
    let occurrences = client.list_occurrences(target_date).map_err(api_failure)?;
    if occurrences.is_empty() {
        println!("Nenhuma ocorrência registrada para esta data.");
        return Ok(());
    }

    let report = build_daily_report(&occurrences);
    if copy {
        println!("{}", report.text_for_copy);
    } else {
        println!("{}\n", render_summary(target_date, &report));
        println!("{}", report.text_with_markers);
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.parse_report_time()?;
    let fallback_time = config.report_time.clone();

    info!(api = %config.resolved_api_base_url(), "OccurrenceDesk service started");

    tokio::select! {
        scheduler_result = scheduler::run_daily_export_loop(move || {
            let report_time = Config::load()
                .map(|runtime| runtime.report_time)
                .unwrap_or_else(|_| fallback_time.clone());

            config::parse_hhmm(&report_time)
        }, move |date| {
            let config = config.clone();
            async move {
                let runtime_config = Config::load().unwrap_or(config);
                tokio::task::spawn_blocking(move || run_daily_export(&runtime_config, date))
                    .await
                    .context("Daily export task panicked")?
            }
        }) => {
            scheduler_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

/// Fetches the day's occurrences and writes the text and JSON report files.
fn run_daily_export(config: &Config, date: NaiveDate) -> Result<()> {
    let client = api_client(config)?;
    let occurrences = client.list_occurrences(date).map_err(api_failure)?;

    if occurrences.is_empty() {
        warn!(date = %date, "no occurrences for date, report still written");
    }

    let report = build_daily_report(&occurrences);
    let saved = save_report_files(date, &report, &config.report_dir)?;

    println!("Report generated: {}", date.format("%Y-%m-%d"));
    println!("- Text: {}", saved.text_path.display());
    println!("- JSON: {}", saved.json_path.display());

    Ok(())
}

fn parse_optional_date(input: Option<String>) -> Result<NaiveDate> {
    input
        .as_deref()
        .map(|date| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date format: {date}. Example: 2026-02-04"))
        })
        .transpose()?
        .map_or_else(|| Ok(Local::now().date_naive()), Ok)
}

fn load_catalog(config: &Config) -> Result<TripCatalog> {
    match &config.catalog_path {
        Some(path) => TripCatalog::load(path)
            .with_context(|| format!("Failed to load trip table: {}", path.display())),
        None => TripCatalog::bundled().context("Failed to load bundled trip table"),
    }
}

fn api_client(config: &Config) -> Result<ApiClient> {
    ApiClient::new(config).context("Failed to build API client")
}

fn api_failure(error: ApiError) -> anyhow::Error {
    let message = error.user_message();
    anyhow::Error::new(error).context(message)
}
