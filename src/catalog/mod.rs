use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub const BUNDLED_TABLE: &str = include_str!("../../assets/linhas.csv");

const LINE_CODE_HEADER: &str = r"codigo\s*linha";
const LINE_NAME_HEADER: &str = r"nome\s*da\s*linha";
const DEPARTURE_HEADER: &str = r"hora\s*partida";
const DIRECTION_HEADER: &str = r"sentido";

#[derive(Debug, Error)]
pub enum CatalogFormatError {
    #[error(
        "invalid trip table: missing header column(s) {}. Expected: Codigo Linha, Nome da Linha, Hora Partida, Sentido",
        .0.join(", ")
    )]
    MissingColumns(Vec<&'static str>),

    #[error("failed to read trip table: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read trip table file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// One scheduled trip. `id` is the composite key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripCatalogEntry {
    pub id: String,
    pub line_code: String,
    pub line_name: String,
    /// `HH:MM`
    pub departure_time: String,
    pub direction: String,
}

impl TripCatalogEntry {
    pub fn label(&self) -> String {
        format!(
            "{} - {} - {} ({})",
            self.line_code, self.line_name, self.departure_time, self.direction
        )
    }

    fn matches(&self, needle: &str) -> bool {
        [
            &self.line_code,
            &self.line_name,
            &self.departure_time,
            &self.direction,
        ]
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TripCatalog {
    rows: Vec<TripCatalogEntry>,
    by_key: HashMap<String, usize>,
}

struct ColumnIndex {
    line_code: usize,
    line_name: usize,
    departure_time: usize,
    direction: usize,
}

impl TripCatalog {
    pub fn bundled() -> Result<Self, CatalogFormatError> {
        Self::build(BUNDLED_TABLE)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogFormatError> {
        let raw = fs::read_to_string(path)?;
        Self::build(&raw)
    }

    pub fn build(raw: &str) -> Result<Self, CatalogFormatError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(raw.as_bytes());

        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record?.iter().map(normalize_cell).collect::<Vec<_>>(),
            None => Vec::new(),
        };
        let columns = locate_columns(&header)?;
        let header_label = header_regex(&format!("^{LINE_CODE_HEADER}$"))?;

        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        let mut skipped = 0_usize;

        for record in records {
            let record = record?;
            let cell = |index: usize| normalize_cell(record.get(index).unwrap_or_default());

            let line_code = cell(columns.line_code);
            let line_name = cell(columns.line_name);
            let departure_time = cell(columns.departure_time);
            let direction = cell(columns.direction);

            if header_label.is_match(&line_code) {
                skipped += 1;
                continue;
            }
            if [&line_code, &line_name, &departure_time, &direction]
                .iter()
                .any(|field| field.is_empty())
            {
                skipped += 1;
                continue;
            }

            let id = composite_key(&line_code, &line_name, &departure_time, &direction);
            if !seen.insert(id.clone()) {
                skipped += 1;
                continue;
            }

            rows.push(TripCatalogEntry {
                id,
                line_code,
                line_name,
                departure_time,
                direction,
            });
        }

        let by_key = rows
            .iter()
            .enumerate()
            .map(|(index, row)| (row.id.clone(), index))
            .collect::<HashMap<_, _>>();

        debug!(skipped, "trip table rows skipped");
        info!(trips = rows.len(), "trip catalog loaded");

        Ok(Self { rows, by_key })
    }

    pub fn rows(&self) -> &[TripCatalogEntry] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TripCatalogEntry> {
        self.by_key.get(key).and_then(|index| self.rows.get(*index))
    }

    pub fn find_by_fields(
        &self,
        line_code: &str,
        line_name: &str,
        departure_time: &str,
        direction: &str,
    ) -> Option<&TripCatalogEntry> {
        let key = composite_key(line_code, line_name, departure_time, direction);
        self.get(&key)
    }

    /// Case-insensitive substring filter over the four fields. A blank query returns every row.
    pub fn search(&self, query: &str) -> Vec<&TripCatalogEntry> {
        let needle = query.trim().to_lowercase();
        self.rows
            .iter()
            .filter(|row| needle.is_empty() || row.matches(&needle))
            .collect()
    }
}

/// Builds the catalog key: code and direction uppercased, every field normalized, joined by `|`.
pub fn composite_key(
    line_code: &str,
    line_name: &str,
    departure_time: &str,
    direction: &str,
) -> String {
    format!(
        "{}|{}|{}|{}",
        normalize_cell(line_code).to_uppercase(),
        normalize_cell(line_name),
        normalize_cell(departure_time),
        normalize_cell(direction).to_uppercase()
    )
}

pub fn normalize_cell(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    let unquoted = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let unquoted = unquoted.strip_suffix('"').unwrap_or(unquoted);

    unquoted.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn locate_columns(header: &[String]) -> Result<ColumnIndex, CatalogFormatError> {
    let find = |pattern: &str| -> Result<Option<usize>, CatalogFormatError> {
        let regex = header_regex(pattern)?;
        Ok(header.iter().position(|cell| regex.is_match(cell)))
    };

    let line_code = find(LINE_CODE_HEADER)?;
    let line_name = find(LINE_NAME_HEADER)?;
    let departure_time = find(DEPARTURE_HEADER)?;
    let direction = find(DIRECTION_HEADER)?;

    match (line_code, line_name, departure_time, direction) {
        (Some(code), Some(name), Some(departure), Some(direction)) => Ok(ColumnIndex {
            line_code: code,
            line_name: name,
            departure_time: departure,
            direction,
        }),
        _ => {
            let missing = [
                (line_code, "Codigo Linha"),
                (line_name, "Nome da Linha"),
                (departure_time, "Hora Partida"),
                (direction, "Sentido"),
            ]
            .into_iter()
            .filter(|(index, _)| index.is_none())
            .map(|(_, name)| name)
            .collect::<Vec<_>>();

            Err(CatalogFormatError::MissingColumns(missing))
        }
    }
}

fn header_regex(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::{CatalogFormatError, TripCatalog, composite_key, normalize_cell};

    const TABLE: &str = "\u{feff}Codigo Linha,Nome da Linha,Hora Partida,Sentido
1001,Estação Pirajá - Aeroporto,05:30,IDA
1001,Estação Pirajá - Aeroporto,06:10,VOLTA
\"1002\",  Lapa   -  Barra ,07:00,ida
1001,Estação Pirajá - Aeroporto,05:30,ida
,Sem Código,08:00,IDA
Codigo Linha,Nome da Linha,Hora Partida,Sentido
";

    #[test]
    fn normalizes_bom_quotes_and_whitespace() {
        assert_eq!(normalize_cell("\u{feff} \"Lapa   Barra\" "), "Lapa Barra");
        assert_eq!(normalize_cell("   "), "");
    }

    #[test]
    fn duplicates_collapse_keeping_first_occurrence() {
        let catalog = TripCatalog::build(TABLE).expect("valid table");

        assert_eq!(catalog.len(), 3);
        let first = &catalog.rows()[0];
        assert_eq!(first.direction, "IDA");
        assert_eq!(first.id, "1001|Estação Pirajá - Aeroporto|05:30|IDA");
        assert_eq!(catalog.rows()[2].line_name, "Lapa - Barra");
    }

    #[test]
    fn stray_quote_only_affects_its_own_row() {
        let table = "Codigo Linha,Nome da Linha,Hora Partida,Sentido
\"1001,Lapa,05:30,IDA
1002,Barra,06:00,VOLTA
1003,Pituba,06:30,IDA
";
        let catalog = TripCatalog::build(table).expect("valid table");

        let codes = catalog
            .rows()
            .iter()
            .map(|row| row.line_code.as_str())
            .collect::<Vec<_>>();
        assert_eq!(codes, vec!["1001", "1002", "1003"]);
    }

    #[test]
    fn header_columns_are_found_in_any_order() {
        let shuffled = "sentido,HORA PARTIDA,codigo linha,Nome da  Linha
IDA,05:30,1001,Estação Pirajá - Aeroporto
VOLTA,06:10,1001,Estação Pirajá - Aeroporto
";
        let ordered = "Codigo Linha,Nome da Linha,Hora Partida,Sentido
1001,Estação Pirajá - Aeroporto,05:30,IDA
1001,Estação Pirajá - Aeroporto,06:10,VOLTA
";

        let left = TripCatalog::build(shuffled).expect("shuffled header");
        let right = TripCatalog::build(ordered).expect("ordered header");
        assert_eq!(left.rows(), right.rows());
    }

    #[test]
    fn missing_header_is_fatal() {
        let error = TripCatalog::build("Linha,Horario\n1001,05:30\n").expect_err("must fail");

        match error {
            CatalogFormatError::MissingColumns(missing) => {
                assert_eq!(
                    missing,
                    vec!["Codigo Linha", "Nome da Linha", "Hora Partida", "Sentido"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(TripCatalog::build("").is_err());
    }

    #[test]
    fn lookup_ignores_case_and_spacing() {
        let catalog = TripCatalog::build(TABLE).expect("valid table");

        let found = catalog
            .find_by_fields(" 1002", "Lapa - Barra", "07:00", "IDA ")
            .expect("trip found");
        assert_eq!(found.line_code, "1002");
        assert_eq!(
            composite_key("1002", "Lapa   -  Barra", "07:00", "ida"),
            found.id
        );
        let unknown = catalog.find_by_fields("9999", "X", "00:00", "IDA");
        assert!(unknown.is_none());
    }

    #[test]
    fn search_filters_across_fields() {
        let catalog = TripCatalog::build(TABLE).expect("valid table");

        assert_eq!(catalog.search("").len(), 3);
        assert_eq!(catalog.search("lapa").len(), 1);
        assert_eq!(catalog.search("volta").len(), 1);
        assert_eq!(
            catalog.rows()[0].label(),
            "1001 - Estação Pirajá - Aeroporto - 05:30 (IDA)"
        );
    }

    #[test]
    fn bundled_table_loads() {
        let catalog = TripCatalog::bundled().expect("bundled table is valid");
        assert!(!catalog.is_empty());
    }

    #[test]
    fn header_only_table_is_empty() {
        let table = "Codigo Linha,Nome da Linha,Hora Partida,Sentido\n";
        let catalog = TripCatalog::build(table).expect("valid header");
        assert!(catalog.is_empty());
    }
}
