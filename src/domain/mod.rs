use crate::catalog::TripCatalogEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    /// Registry number (matrícula).
    pub code: String,
    pub name: String,
    pub base: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDriverInput {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

/// Driver as recorded on an occurrence at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceDriver {
    pub position: u8,
    pub driver_id: String,
    pub registry: String,
    pub name: String,
    #[serde(default)]
    pub base_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub id: String,
    pub type_code: String,
    pub type_title: String,
    /// `YYYY-MM-DD`
    pub event_date: String,
    /// `YYYY-MM-DD`
    pub trip_date: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    pub vehicle_number: String,
    #[serde(default)]
    pub base_code: Option<String>,
    #[serde(default)]
    pub line_label: Option<String>,
    #[serde(default)]
    pub place: Option<String>,
    /// ISO-8601
    pub created_at: String,
    #[serde(default)]
    pub drivers: Vec<OccurrenceDriver>,
    #[serde(default)]
    pub evidence_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceDriverInput {
    pub position: u8,
    pub driver_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOccurrenceInput {
    pub type_code: String,
    pub event_date: String,
    pub trip_date: String,
    pub start_time: String,
    pub end_time: String,
    pub vehicle_number: String,
    pub place: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_code: Option<String>,
    pub drivers: Vec<OccurrenceDriverInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOccurrence {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrencePdf {
    #[serde(default)]
    pub storage_path: Option<String>,
    pub signed_url: String,
    pub ttl_seconds: u64,
    pub cached: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrencePdfPayload {
    pub pdf: OccurrencePdf,
}

/// Trip reference attached to a locally composed occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trip {
    Catalog(TripCatalogEntry),
    Legacy(LegacyTrip),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTrip {
    pub id: String,
    pub line: Option<String>,
    pub scheduled_time: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl Trip {
    pub fn id(&self) -> &str {
        match self {
            Trip::Catalog(entry) => &entry.id,
            Trip::Legacy(trip) => &trip.id,
        }
    }

    pub fn line(&self) -> Option<&str> {
        match self {
            Trip::Catalog(entry) => Some(entry.line_code.as_str()),
            Trip::Legacy(trip) => trip.line.as_deref(),
        }
    }

    pub fn scheduled_time(&self) -> Option<&str> {
        match self {
            Trip::Catalog(entry) => Some(entry.departure_time.as_str()),
            Trip::Legacy(trip) => trip.scheduled_time.as_deref(),
        }
    }

    /// Origin and destination. Catalog rows carry the line name and direction instead.
    pub fn endpoints(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Trip::Catalog(entry) => {
                let line_name = entry.line_name.as_str();
                (Some(line_name), Some(entry.direction.as_str()))
            }
            Trip::Legacy(trip) => (trip.origin.as_deref(), trip.destination.as_deref()),
        }
    }
}

/// Locally composed occurrence used for the narrative and messaging texts
/// before (or without) a round trip to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceView {
    pub trip: Trip,
    pub vehicle_number: String,
    pub primary_driver: Driver,
    pub secondary_driver: Option<Driver>,
    pub event_date: String,
    pub start_time: String,
    pub end_time: String,
    pub place: String,
    pub evidence_count: usize,
}

impl OccurrenceView {
    pub fn drivers(&self) -> impl Iterator<Item = &Driver> {
        std::iter::once(&self.primary_driver)
            .chain(self.secondary_driver.iter())
    }

    /// Rebuilds a view from a stored occurrence.
    pub fn from_occurrence(occurrence: &Occurrence) -> Option<Self> {
        let mut drivers = occurrence.drivers.clone();
        drivers.sort_by_key(|driver| driver.position);
        let mut snapshots = drivers.into_iter().map(|driver| Driver {
            id: driver.driver_id,
            code: driver.registry,
            name: driver.name,
            base: (!driver.base_code.is_empty()).then_some(driver.base_code),
        });

        let primary_driver = snapshots.next()?;
        let secondary_driver = snapshots.next();

        Some(Self {
            trip: Trip::Legacy(LegacyTrip {
                id: occurrence.id.clone(),
                line: occurrence.line_label.clone(),
                ..LegacyTrip::default()
            }),
            vehicle_number: occurrence.vehicle_number.clone(),
            primary_driver,
            secondary_driver,
            event_date: occurrence.event_date.clone(),
            start_time: occurrence.start_time.clone(),
            end_time: occurrence.end_time.clone(),
            place: occurrence.place.clone().unwrap_or_default(),
            evidence_count: occurrence.evidence_count as usize,
        })
    }
}
