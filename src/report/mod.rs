pub mod daily;

use crate::domain::{Driver, Occurrence, OccurrenceView};

const VIOLATION_KIND: &str = "PARADA FORA DO PROGRAMADO";
const VIOLATION_CHARACTERIZATION: &str = "DESCUMPRIMENTO DE PROCEDIMENTO OPERACIONAL";
const PLACEHOLDER: &str = "—";

/// `YYYY-MM-DD` to `DD/MM/YYYY`. Anything else is returned unchanged.
pub fn format_date_br(iso: &str) -> String {
    match iso.split('-').collect::<Vec<_>>().as_slice() {
        [year, month, day] if !year.is_empty() && !month.is_empty() && !day.is_empty() => {
            format!("{day}/{month}/{year}")
        }
        _ => iso.to_string(),
    }
}

/// `HH:MM` to `HHhMM`. Anything else is returned unchanged.
pub fn format_hour_br(hhmm: &str) -> String {
    match hhmm.split(':').collect::<Vec<_>>().as_slice() {
        [hour, minute] if !hour.is_empty() && !minute.is_empty() => format!("{hour}h{minute}"),
        _ => hhmm.to_string(),
    }
}

/// Free-form paragraph for an individual report. Clauses whose field is empty are left out.
pub fn render_narrative(view: &OccurrenceView) -> String {
    let date = format_date_br(&view.event_date);

    let line_info = view
        .trip
        .line()
        .filter(|line| !line.is_empty())
        .map(|line| format!(" (linha {line})"))
        .unwrap_or_default();

    let place = view.place.trim();
    let place_clause = if place.is_empty() {
        String::new()
    } else {
        format!(", no local {place}")
    };

    let period_clause = if !view.start_time.is_empty() && !view.end_time.is_empty() {
        format!(", no período de {} às {}", view.start_time, view.end_time)
    } else {
        String::new()
    };

    let evidence = if view.evidence_count > 0 {
        format!("\n\nEvidências anexadas: {} foto(s).", view.evidence_count)
    } else {
        String::new()
    };

    format!(
        "Em {date}, durante a execução da viagem do veículo prefixo {}{line_info}, foi constatado que o motorista realizou {VIOLATION_KIND}{place_clause}{period_clause}, caracterizando {VIOLATION_CHARACTERIZATION}.\n\nA conduta impactou a regularidade da operação e o cumprimento das diretrizes estabelecidas pela empresa.\n\nRegistro para fins de apuração administrativa e aplicação de medida disciplinar cabível.{evidence}",
        view.vehicle_number
    )
}

/// WhatsApp-formatted message.
pub fn render_whatsapp(view: &OccurrenceView) -> String {
    let (origin, destination) = view.trip.endpoints();
    let roster = view
        .drivers()
        .map(driver_roster_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "🚨 *DESCUMPRIMENTO OPERACIONAL*\n\n📋 *LINHA:* {}\n🚌 *PREFIXO:* {}\n⏰ *HORÁRIO DA VIAGEM:* {}\n📍 *ORIGEM x DESTINO:* {} x {}\n\n👤 *MOTORISTA(S):*\n{}\n\n📅 *DATA:* {}\n🕐 *INÍCIO:* {}\n🕐 *FIM:* {}\n📍 *LOCAL:* {}",
        view.trip.line().unwrap_or_default(),
        view.vehicle_number,
        view.trip.scheduled_time().unwrap_or_default(),
        origin.unwrap_or_default(),
        destination.unwrap_or_default(),
        roster,
        format_date_br(&view.event_date),
        view.start_time,
        view.end_time,
        view.place.trim()
    )
}

fn driver_roster_line(driver: &Driver) -> String {
    format!(
        "{} – {} – {}",
        driver.code,
        driver.name,
        driver.base.as_deref().unwrap_or(PLACEHOLDER)
    )
}

/// Fixed-field block used by the daily digest. The evidence line is only
/// emitted for the on-screen variant.
pub fn render_digest_block(occurrence: &Occurrence, include_evidence: bool) -> String {
    let mut block = format!(
        "OCORRÊNCIA: {}\nDATA: {}\nHorario do evento: {} à {}.\nDurante a análise das atividades do veículo de número {} na viagem do dia {}, identificamos o descumprimento operacional/comercial por parte do condutor, realizando uma parada em local fora do esquema operacional.\nLINHA: {}\nLOCAL: {}\nBASE: {}\n",
        occurrence.type_title,
        format_date_br(&occurrence.event_date),
        format_hour_br(&occurrence.start_time),
        format_hour_br(&occurrence.end_time),
        occurrence.vehicle_number,
        format_date_br(&occurrence.trip_date),
        or_placeholder(occurrence.line_label.as_deref()),
        or_placeholder(occurrence.place.as_deref()),
        or_placeholder(occurrence.base_code.as_deref()),
    );

    if include_evidence {
        block.push_str(&format!("EVIDÊNCIAS: {}\n", occurrence.evidence_count));
    }

    block
}

pub(crate) fn or_placeholder(value: Option<&str>) -> &str {
    value.unwrap_or(PLACEHOLDER)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::{Driver, LegacyTrip, Occurrence, OccurrenceView, Trip};

    pub fn occurrence(id: &str, start: &str, end: &str, created_at: &str) -> Occurrence {
        Occurrence {
            id: id.to_string(),
            type_code: "PFP".to_string(),
            type_title: "PARADA FORA DO PROGRAMADO".to_string(),
            event_date: "2026-02-04".to_string(),
            trip_date: "2026-02-03".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            vehicle_number: "1234".to_string(),
            base_code: Some("SSA".to_string()),
            line_label: Some("1001".to_string()),
            place: Some("KM 45 BR-324".to_string()),
            created_at: created_at.to_string(),
            drivers: Vec::new(),
            evidence_count: 0,
        }
    }

    pub fn view() -> OccurrenceView {
        OccurrenceView {
            trip: Trip::Legacy(LegacyTrip {
                id: "trip-1".to_string(),
                line: Some("1001".to_string()),
                scheduled_time: Some("07:00".to_string()),
                origin: Some("Pirajá".to_string()),
                destination: Some("Aeroporto".to_string()),
            }),
            vehicle_number: "1234".to_string(),
            primary_driver: Driver {
                id: "d1".to_string(),
                code: "10293".to_string(),
                name: "Ana Souza".to_string(),
                base: Some("SSA".to_string()),
            },
            secondary_driver: None,
            event_date: "2026-02-04".to_string(),
            start_time: "07:30".to_string(),
            end_time: "08:15".to_string(),
            place: "KM 45 BR-324".to_string(),
            evidence_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{occurrence, view};
    use super::{
        format_date_br, format_hour_br, render_digest_block, render_narrative, render_whatsapp,
    };
    use crate::domain::Driver;

    #[test]
    fn date_and_hour_formatting_degrade_to_pass_through() {
        assert_eq!(format_date_br("2026-02-04"), "04/02/2026");
        assert_eq!(format_date_br("04/02/2026"), "04/02/2026");
        assert_eq!(format_date_br("2026--04"), "2026--04");
        assert_eq!(format_date_br(""), "");
        assert_eq!(format_hour_br("07:30"), "07h30");
        assert_eq!(format_hour_br("0730"), "0730");
    }

    #[test]
    fn narrative_contains_date_and_vehicle_without_evidence_postscript() {
        let text = render_narrative(&view());

        assert!(text.contains("04/02/2026"));
        assert!(text.contains("1234"));
        assert!(text.contains(" (linha 1001)"));
        assert!(text.contains(", no local KM 45 BR-324"));
        assert!(text.contains(", no período de 07:30 às 08:15"));
        assert!(!text.contains("Evidências anexadas"));
    }

    #[test]
    fn narrative_omits_clauses_for_missing_fields() {
        let mut occurrence = view();
        occurrence.place = "  ".to_string();
        occurrence.end_time = String::new();
        occurrence.evidence_count = 2;

        let text = render_narrative(&occurrence);
        assert!(!text.contains("no local"));
        assert!(!text.contains("no período"));
        assert!(text.ends_with("\n\nEvidências anexadas: 2 foto(s)."));
        assert_eq!(text, render_narrative(&occurrence));
    }

    #[test]
    fn whatsapp_lists_drivers_in_position_order() {
        let mut occurrence = view();
        occurrence.secondary_driver = Some(Driver {
            id: "d2".to_string(),
            code: "20411".to_string(),
            name: "Bruno Lima".to_string(),
            base: None,
        });

        let text = render_whatsapp(&occurrence);
        assert!(text.starts_with("🚨 *DESCUMPRIMENTO OPERACIONAL*\n\n"));
        let drivers = "👤 *MOTORISTA(S):*\n10293 – Ana Souza – SSA\n20411 – Bruno Lima – —\n";
        assert!(text.contains(drivers));
        assert!(text.contains("📍 *ORIGEM x DESTINO:* Pirajá x Aeroporto"));
        assert!(text.contains("📅 *DATA:* 04/02/2026"));
        assert_eq!(text, render_whatsapp(&occurrence));
    }

    #[test]
    fn digest_block_has_seven_lines_plus_optional_evidence() {
        let mut record = occurrence("o1", "07:30", "08:15", "2026-02-04T10:00:00Z");
        record.line_label = None;
        record.evidence_count = 4;

        let copy = render_digest_block(&record, false);
        assert_eq!(copy.lines().count(), 7);
        assert!(copy.contains("Horario do evento: 07h30 à 08h15.\n"));
        assert!(copy.contains("na viagem do dia 03/02/2026"));
        assert!(copy.contains("LINHA: —\n"));

        let visual = render_digest_block(&record, true);
        assert_eq!(visual.lines().count(), 8);
        assert!(visual.ends_with("EVIDÊNCIAS: 4\n"));
    }
}
