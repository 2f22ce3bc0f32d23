use crate::domain::Occurrence;
use crate::report::{or_placeholder, render_digest_block};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const SEPARATOR_WIDTH: usize = 80;
const LABEL_PLACE_CHARS: usize = 32;

/// Position of one occurrence block inside `text_with_markers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportAnchor {
    pub key: String,
    pub occurrence_id: String,
    /// Offset in chars.
    pub start_index: usize,
    pub label: String,
    pub has_evidence: bool,
    pub evidence_count: u32,
    pub base_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyTotals {
    pub occurrences: usize,
    pub evidences: u64,
    pub vehicles: usize,
    pub lines: usize,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyReport {
    pub text_with_markers: String,
    pub text_for_copy: String,
    pub anchors: Vec<ReportAnchor>,
    pub totals: DailyTotals,
}

#[derive(Debug)]
pub struct SavedReport {
    pub text_path: PathBuf,
    pub json_path: PathBuf,
}

#[derive(Serialize)]
struct ReportIndex<'a> {
    date: String,
    totals: &'a DailyTotals,
    anchors: &'a [ReportAnchor],
}

pub fn build_daily_report(occurrences: &[Occurrence]) -> DailyReport {
    let mut sorted = occurrences.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| {
        left.start_time
            .cmp(&right.start_time)
            .then_with(|| left.created_at.cmp(&right.created_at))
    });

    let totals = DailyTotals {
        occurrences: sorted.len(),
        evidences: sorted
            .iter()
            .map(|occurrence| u64::from(occurrence.evidence_count))
            .sum(),
        vehicles: sorted
            .iter()
            .map(|occurrence| occurrence.vehicle_number.as_str())
            .collect::<HashSet<_>>()
            .len(),
        lines: sorted
            .iter()
            .filter_map(|occurrence| occurrence.line_label.as_deref())
            .filter(|line| !line.is_empty())
            .collect::<HashSet<_>>()
            .len(),
        window_start: sorted.first().map(|occurrence| occurrence.start_time.clone()),
        window_end: sorted.last().map(|occurrence| occurrence.end_time.clone()),
    };

    let separator = format!("{}\n\n", "-".repeat(SEPARATOR_WIDTH));
    let separator_chars = separator.chars().count();

    let mut text_with_markers = String::new();
    let mut text_for_copy = String::new();
    let mut anchors = Vec::with_capacity(sorted.len());
    let mut offset = 0_usize;

    for (index, occurrence) in sorted.iter().enumerate() {
        let key = format!("#{:02}", index + 1);
        let place = or_placeholder(occurrence.place.as_deref());
        let base_code = or_placeholder(occurrence.base_code.as_deref());

        anchors.push(ReportAnchor {
            key: key.clone(),
            occurrence_id: occurrence.id.clone(),
            start_index: offset,
            label: format!(
                "{} • {} • {}",
                occurrence.start_time,
                occurrence.vehicle_number,
                truncate(place, LABEL_PLACE_CHARS)
            ),
            has_evidence: occurrence.evidence_count > 0,
            evidence_count: occurrence.evidence_count,
            base_code: base_code.to_string(),
        });

        let visual = format!("[{key}] {}", render_digest_block(occurrence, true));
        offset += visual.chars().count();
        text_with_markers.push_str(&visual);
        text_for_copy.push_str(&render_digest_block(occurrence, false));

        if index + 1 < sorted.len() {
            text_with_markers.push_str(&separator);
            text_for_copy.push_str(&separator);
            offset += separator_chars;
        }
    }

    DailyReport {
        text_with_markers,
        text_for_copy,
        anchors,
        totals,
    }
}

pub fn render_summary(date: NaiveDate, report: &DailyReport) -> String {
    let totals = &report.totals;
    let window = match (&totals.window_start, &totals.window_end) {
        (Some(start), Some(end)) => format!("{start} - {end}"),
        _ => "—".to_string(),
    };

    let anchor_rows = report
        .anchors
        .iter()
        .map(|anchor| {
            let evidence = if anchor.has_evidence {
                format!(" [{} foto(s)]", anchor.evidence_count)
            } else {
                String::new()
            };
            let badge = format!("[{}] {}", anchor.key, anchor.label);
            format!("- {badge} ({}){evidence}", anchor.base_code)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Relatório diário - {}\n- Ocorrências: {}\n- Evidências: {}\n- Veículos: {}\n- Linhas: {}\n- Janela: {}\n{}",
        date.format("%d/%m/%Y"),
        totals.occurrences,
        totals.evidences,
        totals.vehicles,
        totals.lines,
        window,
        anchor_rows
    )
}

pub fn save_report_files(
    date: NaiveDate,
    report: &DailyReport,
    report_dir: &Path,
) -> Result<SavedReport> {
    fs::create_dir_all(report_dir).with_context(|| {
        format!(
            "Failed to create report directory: {}",
            report_dir.display()
        )
    })?;

    let date = date.format("%Y-%m-%d").to_string();
    let text_path = report_dir.join(format!("relatorio-diario-{date}.txt"));
    let json_path = report_dir.join(format!("relatorio-diario-{date}.json"));

    fs::write(&text_path, &report.text_for_copy)
        .with_context(|| format!("Failed to write text report: {}", text_path.display()))?;

    let index = ReportIndex {
        date,
        totals: &report.totals,
        anchors: &report.anchors,
    };
    let json_content =
        serde_json::to_string_pretty(&index).context("Failed to serialize report JSON")?;
    fs::write(&json_path, json_content)
        .with_context(|| format!("Failed to write JSON report: {}", json_path.display()))?;

    Ok(SavedReport {
        text_path,
        json_path,
    })
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    let mut truncated = value.chars().take(max_chars - 1).collect::<String>();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::{build_daily_report, render_summary, save_report_files, truncate};
    use crate::report::fixtures::occurrence;
    use chrono::NaiveDate;

    #[test]
    fn empty_day_yields_empty_report() {
        let report = build_daily_report(&[]);

        assert!(report.text_with_markers.is_empty());
        assert!(report.text_for_copy.is_empty());
        assert!(report.anchors.is_empty());
        assert_eq!(report.totals.occurrences, 0);
        assert_eq!(report.totals.evidences, 0);
        assert_eq!(report.totals.vehicles, 0);
        assert_eq!(report.totals.lines, 0);
        assert_eq!(report.totals.window_start, None);
        assert_eq!(report.totals.window_end, None);
    }

    #[test]
    fn blocks_are_sorted_by_start_time_then_creation() {
        let late = occurrence("late", "09:00", "09:30", "2026-02-04T08:00:00Z");
        let tie_second = occurrence("tie-b", "07:00", "07:20", "2026-02-04T12:00:00Z");
        let tie_first = occurrence("tie-a", "07:00", "07:45", "2026-02-04T11:00:00Z");
        let input = vec![late, tie_second, tie_first];

        let report = build_daily_report(&input);
        let order = report
            .anchors
            .iter()
            .map(|anchor| anchor.occurrence_id.as_str())
            .collect::<Vec<_>>();

        assert_eq!(order, vec!["tie-a", "tie-b", "late"]);
        assert_eq!(input[0].id, "late");
        assert_eq!(report.totals.window_start.as_deref(), Some("07:00"));
        assert_eq!(report.totals.window_end.as_deref(), Some("09:30"));
    }

    #[test]
    fn markers_only_in_visual_text() {
        let input = (0..3)
            .map(|index| {
                occurrence(
                    &format!("o{index}"),
                    &format!("0{}:00", 7 + index),
                    &format!("0{}:30", 7 + index),
                    "2026-02-04T08:00:00Z",
                )
            })
            .collect::<Vec<_>>();

        let report = build_daily_report(&input);
        let separator = "-".repeat(80);

        assert_eq!(report.text_with_markers.matches("[#0").count(), 3);
        assert_eq!(report.text_for_copy.matches("[#").count(), 0);
        assert_eq!(report.text_with_markers.matches("EVIDÊNCIAS:").count(), 3);
        assert_eq!(report.text_for_copy.matches("EVIDÊNCIAS:").count(), 0);
        assert_eq!(report.text_for_copy.matches(&separator).count(), 2);
        let trailing = format!("{separator}\n\n");
        assert!(!report.text_with_markers.ends_with(&trailing));
    }

    #[test]
    fn anchors_point_at_their_markers() {
        let mut first = occurrence("a", "07:00", "07:30", "2026-02-04T08:00:00Z");
        let place = "Av. Luís Viana Filho, próximo à Estação Flamboyant";
        first.place = Some(place.to_string());
        let second = occurrence("b", "08:00", "08:30", "2026-02-04T08:00:00Z");

        let report = build_daily_report(&[second, first]);

        for (index, anchor) in report.anchors.iter().enumerate() {
            let tail = report
                .text_with_markers
                .chars()
                .skip(anchor.start_index)
                .collect::<String>();
            assert!(tail.starts_with(&format!("[#{:02}]", index + 1)));
        }
        assert_eq!(
            report.anchors[0].label,
            "07:00 • 1234 • Av. Luís Viana Filho, próximo à…"
        );
    }

    #[test]
    fn totals_count_distinct_vehicles_and_lines() {
        let mut first = occurrence("a", "07:00", "07:30", "2026-02-04T08:00:00Z");
        first.evidence_count = 2;
        let mut second = occurrence("b", "08:00", "08:30", "2026-02-04T08:00:00Z");
        second.vehicle_number = "5678".to_string();
        second.line_label = Some(String::new());
        second.evidence_count = 3;
        let mut third = occurrence("c", "09:00", "09:30", "2026-02-04T08:00:00Z");
        third.line_label = None;

        let input = vec![first, second, third];
        let report = build_daily_report(&input);

        assert_eq!(report.totals.occurrences, 3);
        assert_eq!(report.totals.evidences, 5);
        assert_eq!(report.totals.vehicles, 2);
        assert_eq!(report.totals.lines, 1);
        assert!(report.anchors[1].has_evidence);
        assert!(!report.anchors[2].has_evidence);
        assert_eq!(report, build_daily_report(&input));
    }

    #[test]
    fn truncate_keeps_short_values() {
        assert_eq!(truncate("KM 45", 32), "KM 45");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }

    #[test]
    fn saves_copy_text_and_index() {
        let dir = tempfile::tempdir().expect("temp dir");
        let date = NaiveDate::from_ymd_opt(2026, 2, 4).expect("valid date");
        let report =
            build_daily_report(&[occurrence("a", "07:00", "07:30", "2026-02-04T08:00:00Z")]);

        let saved = save_report_files(date, &report, dir.path()).expect("saved");
        let text = std::fs::read_to_string(&saved.text_path).expect("text file");

        assert!(saved.text_path.ends_with("relatorio-diario-2026-02-04.txt"));
        assert_eq!(text, report.text_for_copy);
        assert!(saved.json_path.exists());
        let summary = render_summary(date, &report);
        assert!(summary.starts_with("Relatório diário - 04/02/2026"));
    }
}
