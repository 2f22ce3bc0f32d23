use crate::api::ApiClient;
use crate::catalog::{TripCatalog, TripCatalogEntry};
use crate::config::parse_hhmm;
use crate::domain::{CreateDriverInput, Driver, Trip};
use crate::form::evidence::EvidenceTray;
use crate::form::picker::{Selection, exclude_selected};
use crate::form::{OccurrenceDraft, format_time_range_with_duration, is_time_range_valid};
use crate::report::{render_narrative, render_whatsapp};
use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDate};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::path::PathBuf;

const CREATE_DRIVER_OPTION: &str = "+ Cadastrar novo motorista";

/// Walks the operator through a new occurrence, previews the texts and submits it.
pub fn run_new_occurrence(catalog: &TripCatalog, client: &ApiClient) -> Result<Option<String>> {
    println!("──────────────────────────────────────────");
    println!("  Nova ocorrência");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let mut draft = OccurrenceDraft::default();

    println!("\n[1/6] Viagem");
    draft.trip = Some(Trip::Catalog(pick_trip(&theme, catalog)?));

    println!("\n[2/6] Veículo e data");
    draft.vehicle_number = Input::with_theme(&theme)
        .with_prompt("  Número do veículo (prefixo)")
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("Informe o número do veículo")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read vehicle number")?;

    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    draft.event_date = Input::with_theme(&theme)
        .with_prompt("  Data do evento (AAAA-MM-DD)")
        .default(today)
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| "Use o formato AAAA-MM-DD")
        })
        .interact_text()
        .context("Failed to read event date")?;
    draft.trip_date = draft.event_date.clone();

    println!("\n[3/6] Horário e local");
    loop {
        draft.start_time = read_hhmm(&theme, "  Horário inicial (HH:MM)")?;
        draft.end_time = read_hhmm(&theme, "  Horário final (HH:MM)")?;

        if is_time_range_valid(&draft.start_time, &draft.end_time) {
            println!(
                "  ✓ {}",
                format_time_range_with_duration(&draft.start_time, &draft.end_time)
            );
            break;
        }
        println!("  ! O horário final deve ser posterior ao inicial");
    }

    draft.place = Input::with_theme(&theme)
        .with_prompt("  Local da parada")
        .interact_text()
        .context("Failed to read place")?;

    println!("\n[4/6] Motoristas");
    let primary = pick_driver(&theme, client, "  Motorista 01", &[])?;
    draft.primary_driver.select(primary);

    draft.secondary_enabled = Confirm::with_theme(&theme)
        .with_prompt("  Adicionar Motorista 02?")
        .default(false)
        .interact()
        .context("Failed to read second driver choice")?;
    if draft.secondary_enabled {
        let excluded = draft
            .primary_driver
            .selected_id()
            .map(|id| vec![id.to_string()])
            .unwrap_or_default();
        let excluded = excluded.iter().map(String::as_str).collect::<Vec<_>>();
        let secondary = pick_driver(&theme, client, "  Motorista 02", &excluded)?;
        draft.secondary_driver.select(secondary);
    }

    println!("\n[5/6] Evidências");
    let mut tray = EvidenceTray::new()?;
    stage_evidences(&theme, &mut tray)?;

    println!("\n[6/6] Revisão");
    let view = draft.to_view(tray.len())?;
    println!("\n{}\n", render_narrative(&view));
    println!("{}\n", render_whatsapp(&view));

    let payload = draft.to_payload()?;
    let submit = Confirm::with_theme(&theme)
        .with_prompt("  Registrar ocorrência?")
        .default(true)
        .interact()
        .context("Failed to read submit confirmation")?;

    if !submit {
        println!("  ✓ Ocorrência descartada");
        return Ok(None);
    }

    let created = client
        .create_occurrence(&payload)
        .map_err(|error| anyhow!(error.user_message()))?;
    println!("  ✓ Ocorrência registrada: {}", created.id);

    if !tray.is_empty() {
        client
            .upload_evidences(&created.id, &tray.staged_paths())
            .map_err(|error| anyhow!(error.user_message()))?;
        println!("  ✓ {} evidência(s) enviada(s)", tray.len());
    }

    Ok(Some(created.id))
}

fn pick_trip(theme: &ColorfulTheme, catalog: &TripCatalog) -> Result<TripCatalogEntry> {
    loop {
        let query: String = Input::with_theme(theme)
            .with_prompt("  Buscar viagem (linha, nome, horário ou sentido)")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read trip search")?;

        let matches = catalog.search(&query);
        if matches.is_empty() {
            println!("  ! Nenhuma viagem encontrada");
            continue;
        }

        let labels = matches.iter().map(|trip| trip.label()).collect::<Vec<_>>();
        let index = Select::with_theme(theme)
            .with_prompt("  Selecione a viagem")
            .default(0)
            .items(&labels)
            .interact()
            .context("Failed to select trip")?;

        if let Some(trip) = matches.get(index) {
            println!("  ✓ {}", trip.label());
            return Ok((*trip).clone());
        }
    }
}

fn pick_driver(
    theme: &ColorfulTheme,
    client: &ApiClient,
    prompt: &str,
    excluded: &[&str],
) -> Result<Driver> {
    let mut selection = Selection::<Driver>::Unselected;

    loop {
        selection.clear();
        let term: String = Input::with_theme(theme)
            .with_prompt(format!("{prompt}: buscar por matrícula ou nome"))
            .interact_text()
            .context("Failed to read driver search")?;

        let results = client
            .search_drivers(&term)
            .map_err(|error| anyhow!(error.user_message()))?;
        let candidates = exclude_selected(&results, excluded);

        let mut labels = candidates
            .iter()
            .map(|driver| driver_label(driver))
            .collect::<Vec<_>>();
        labels.push(CREATE_DRIVER_OPTION.to_string());

        let index = Select::with_theme(theme)
            .with_prompt(format!("{prompt}: selecione"))
            .default(0)
            .items(&labels)
            .interact()
            .context("Failed to select driver")?;

        match candidates.get(index) {
            Some(driver) => {
                selection.select_id(driver.id.clone());
                selection.resolve(&results);
            }
            None => {
                let created = create_driver(theme, client)?;
                selection.select(created);
            }
        }

        if let Some(driver) = selection.resolved() {
            println!("  ✓ {}", driver_label(driver));
            return Ok(driver.clone());
        }
    }
}

fn create_driver(theme: &ColorfulTheme, client: &ApiClient) -> Result<Driver> {
    let code: String = Input::with_theme(theme)
        .with_prompt("  Matrícula")
        .interact_text()
        .context("Failed to read driver code")?;
    let name: String = Input::with_theme(theme)
        .with_prompt("  Nome")
        .interact_text()
        .context("Failed to read driver name")?;
    let base: String = Input::with_theme(theme)
        .with_prompt("  Base (opcional)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read driver base")?;

    let input = CreateDriverInput {
        code: code.trim().to_string(),
        name: name.trim().to_string(),
        base: (!base.trim().is_empty()).then(|| base.trim().to_string()),
    };

    client
        .create_driver(&input)
        .map_err(|error| anyhow!(error.user_message()))
}

fn stage_evidences(theme: &ColorfulTheme, tray: &mut EvidenceTray) -> Result<()> {
    loop {
        let raw: String = Input::with_theme(theme)
            .with_prompt("  Caminho da foto (vazio para continuar)")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read evidence path")?;

        if raw.trim().is_empty() {
            break;
        }

        let caption: String = Input::with_theme(theme)
            .with_prompt("  Legenda (opcional)")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read evidence caption")?;

        match tray.stage(&PathBuf::from(raw.trim()), &caption) {
            Ok(staged) => println!("  ✓ {} ({})", staged.source.display(), staged.id),
            Err(error) => println!("  ! {error}"),
        }
    }

    let actions = ["Concluir", "Reordenar", "Editar legenda", "Remover"];
    while !tray.is_empty() {
        let action = Select::with_theme(theme)
            .with_prompt("  Evidências")
            .items(&actions)
            .default(0)
            .interact()
            .context("Failed to read evidence action")?;
        if action == 0 {
            break;
        }

        let labels = tray
            .items()
            .iter()
            .map(|item| format!("{} {} {}", item.id, item.source.display(), item.caption))
            .collect::<Vec<_>>();
        let index = Select::with_theme(theme)
            .with_prompt("  Qual evidência?")
            .items(&labels)
            .default(0)
            .interact()
            .context("Failed to select evidence")?;
        let id = tray.items()[index].id.clone();

        match action {
            1 => {
                let positions = (1..=labels.len())
                    .map(|position| position.to_string())
                    .collect::<Vec<_>>();
                let to = Select::with_theme(theme)
                    .with_prompt("  Para qual posição?")
                    .items(&positions)
                    .default(0)
                    .interact()
                    .context("Failed to select position")?;
                if !tray.move_item(index, to) {
                    bail!("Invalid evidence position");
                }
            }
            2 => {
                let caption: String = Input::with_theme(theme)
                    .with_prompt("  Nova legenda")
                    .allow_empty(true)
                    .interact_text()
                    .context("Failed to read evidence caption")?;
                tray.set_caption(&id, &caption);
            }
            _ => {
                tray.remove(&id);
            }
        }
    }

    Ok(())
}

fn read_hhmm(theme: &ColorfulTheme, prompt: &str) -> Result<String> {
    Input::with_theme(theme)
        .with_prompt(prompt)
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            parse_hhmm(input)
                .map(|_| ())
                .map_err(|_| "Use o formato HH:MM (ex.: 07:30)")
        })
        .interact_text()
        .context("Failed to read time")
}

pub fn driver_label(driver: &Driver) -> String {
    match driver.base.as_deref() {
        Some(base) => format!("{} — {} ({base})", driver.code, driver.name),
        None => format!("{} — {}", driver.code, driver.name),
    }
}

#[cfg(test)]
mod tests {
    use super::driver_label;
    use crate::domain::Driver;

    #[test]
    fn driver_label_includes_base_when_known() {
        let mut driver = Driver {
            id: "d1".to_string(),
            code: "10293".to_string(),
            name: "Ana Souza".to_string(),
            base: Some("SSA".to_string()),
        };
        assert_eq!(driver_label(&driver), "10293 — Ana Souza (SSA)");

        driver.base = None;
        assert_eq!(driver_label(&driver), "10293 — Ana Souza");
    }
}
