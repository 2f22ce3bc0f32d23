use crate::api::{ApiClient, ApiData, ApiError};
use crate::domain::{CreateOccurrenceInput, CreatedOccurrence, Occurrence};
use chrono::NaiveDate;
use reqwest::blocking::multipart::{Form, Part};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

impl ApiClient {
    pub fn list_occurrences(&self, date: NaiveDate) -> Result<Vec<Occurrence>, ApiError> {
        let day = date.format("%Y-%m-%d").to_string();
        let payload: ApiData<Vec<Occurrence>> = self.get_json("/occurrences", &[("date", day)])?;

        info!(date = %date, count = payload.data.len(), "occurrences fetched");
        Ok(payload.data)
    }

    pub fn get_occurrence(&self, id: &str) -> Result<Occurrence, ApiError> {
        let payload: ApiData<Occurrence> = self.get_json(&format!("/occurrences/{id}"), &[])?;
        Ok(payload.data)
    }

    pub fn create_occurrence(
        &self,
        input: &CreateOccurrenceInput,
    ) -> Result<CreatedOccurrence, ApiError> {
        let url = self.endpoint("/occurrences", &[])?;
        let created: CreatedOccurrence = self.send_json(self.http().post(url).json(input))?;

        info!(id = %created.id, event_date = %input.event_date, "occurrence created");
        Ok(created)
    }

    /// Uploads evidence photos in order, as repeated multipart `files` fields.
    pub fn upload_evidences<P: AsRef<Path>>(
        &self,
        occurrence_id: &str,
        files: &[P],
    ) -> Result<Value, ApiError> {
        let form = files.iter().try_fold(Form::new(), |form, path| {
            let path = path.as_ref();
            let bytes = fs::read(path).map_err(|source| ApiError::File {
                path: path.display().to_string(),
                source,
            })?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| "evidencia".to_string());
            let mime = mime_guess::from_path(path).first_or_octet_stream();

            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(mime.as_ref())?;
            Ok::<_, ApiError>(form.part("files", part))
        })?;

        let url = self.endpoint(&format!("/occurrences/{occurrence_id}/evidences"), &[])?;
        let ack = self.send_json(self.http().post(url).multipart(form))?;

        info!(occurrence_id, files = files.len(), "evidences uploaded");
        Ok(ack)
    }
}
