pub mod evidence;
pub mod picker;

use crate::domain::{CreateOccurrenceInput, Driver, OccurrenceDriverInput, OccurrenceView, Trip};
use crate::form::picker::Selection;
use chrono::NaiveTime;
use thiserror::Error;

pub const DEFAULT_TYPE_CODE: &str = "PARADA_FORA_DO_PROGRAMADO";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Motorista 01 é obrigatório.")]
    MissingPrimaryDriver,

    #[error("Motorista 01 e 02 não podem ser o mesmo.")]
    DuplicateDriver,

    #[error("Horário final ({end}) deve ser posterior ao inicial ({start}).")]
    InvalidTimeRange { start: String, end: String },

    #[error("Campo obrigatório não informado: {0}.")]
    MissingField(&'static str),

    #[error("Motorista {0} ainda não foi carregado.")]
    UnresolvedDriver(String),
}

/// Form state for a new occurrence.
#[derive(Debug, Clone)]
pub struct OccurrenceDraft {
    pub type_code: String,
    pub trip: Option<Trip>,
    pub vehicle_number: String,
    pub event_date: String,
    /// Falls back to `event_date` when empty.
    pub trip_date: String,
    pub start_time: String,
    pub end_time: String,
    pub place: String,
    pub primary_driver: Selection<Driver>,
    pub secondary_enabled: bool,
    pub secondary_driver: Selection<Driver>,
}

impl Default for OccurrenceDraft {
    fn default() -> Self {
        Self {
            type_code: DEFAULT_TYPE_CODE.to_string(),
            trip: None,
            vehicle_number: String::new(),
            event_date: String::new(),
            trip_date: String::new(),
            start_time: String::new(),
            end_time: String::new(),
            place: String::new(),
            primary_driver: Selection::Unselected,
            secondary_enabled: false,
            secondary_driver: Selection::Unselected,
        }
    }
}

impl OccurrenceDraft {
    fn secondary_id(&self) -> Option<&str> {
        self.secondary_enabled
            .then(|| self.secondary_driver.selected_id())
            .flatten()
    }

    fn validate(&self) -> Result<&str, ValidationError> {
        let primary = self
            .primary_driver
            .selected_id()
            .ok_or(ValidationError::MissingPrimaryDriver)?;

        if self.secondary_id() == Some(primary) {
            return Err(ValidationError::DuplicateDriver);
        }

        let required = [
            ("data do evento", &self.event_date),
            ("horário inicial", &self.start_time),
            ("horário final", &self.end_time),
            ("veículo", &self.vehicle_number),
            ("local", &self.place),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ValidationError::MissingField(*name));
        }

        if !is_time_range_valid(&self.start_time, &self.end_time) {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start_time.clone(),
                end: self.end_time.clone(),
            });
        }

        Ok(primary)
    }

    /// Builds the creation payload. Nothing is sent when validation fails.
    pub fn to_payload(&self) -> Result<CreateOccurrenceInput, ValidationError> {
        let primary = self.validate()?;

        let drivers = std::iter::once(primary)
            .chain(self.secondary_id())
            .enumerate()
            .map(|(index, driver_id)| OccurrenceDriverInput {
                position: index as u8 + 1,
                driver_id: driver_id.to_string(),
            })
            .collect::<Vec<_>>();

        let trip_date = if self.trip_date.trim().is_empty() {
            self.event_date.trim()
        } else {
            self.trip_date.trim()
        };

        Ok(CreateOccurrenceInput {
            type_code: self.type_code.clone(),
            event_date: self.event_date.trim().to_string(),
            trip_date: trip_date.to_string(),
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
            vehicle_number: self.vehicle_number.trim().to_string(),
            place: self.place.trim().to_string(),
            trip_id: self.trip.as_ref().map(|trip| trip.id().to_string()),
            line_label: self
                .trip
                .as_ref()
                .and_then(Trip::line)
                .map(ToOwned::to_owned),
            base_code: None,
            drivers,
        })
    }

    /// Local view for the narrative and messaging texts. Drivers must be resolved.
    pub fn to_view(&self, evidence_count: usize) -> Result<OccurrenceView, ValidationError> {
        self.validate()?;

        let trip = self
            .trip
            .clone()
            .ok_or(ValidationError::MissingField("viagem"))?;
        let primary_driver = resolved(&self.primary_driver)?;
        let secondary_driver = if self.secondary_id().is_some() {
            Some(resolved(&self.secondary_driver)?)
        } else {
            None
        };

        Ok(OccurrenceView {
            trip,
            vehicle_number: self.vehicle_number.trim().to_string(),
            primary_driver,
            secondary_driver,
            event_date: self.event_date.trim().to_string(),
            start_time: self.start_time.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
            place: self.place.trim().to_string(),
            evidence_count,
        })
    }
}

fn resolved(selection: &Selection<Driver>) -> Result<Driver, ValidationError> {
    match selection {
        Selection::Resolved(driver) => Ok(driver.clone()),
        Selection::PendingResolution(id) => Err(ValidationError::UnresolvedDriver(id.clone())),
        Selection::Unselected => Err(ValidationError::MissingPrimaryDriver),
    }
}

fn parse_time(hhmm: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(hhmm.trim(), "%H:%M").ok()
}

/// End must be strictly after start. Incomplete input is not flagged yet.
pub fn is_time_range_valid(start: &str, end: &str) -> bool {
    if start.trim().is_empty() || end.trim().is_empty() {
        return true;
    }

    match (parse_time(start), parse_time(end)) {
        (Some(start), Some(end)) => end > start,
        _ => false,
    }
}

pub fn diff_minutes(start: &str, end: &str) -> u32 {
    match (parse_time(start), parse_time(end)) {
        (Some(start), Some(end)) if end > start => {
            u32::try_from((end - start).num_minutes()).unwrap_or(0)
        }
        _ => 0,
    }
}

pub fn format_time_range_with_duration(start: &str, end: &str) -> String {
    format!("{start} — {end} ({} min)", diff_minutes(start, end))
}
