use crate::api::{ApiClient, ApiData, ApiError};
use crate::domain::OccurrencePdfPayload;

impl ApiClient {
    /// Asks the backend for the rendered PDF of an occurrence. `force` bypasses its cache.
    pub fn occurrence_pdf(
        &self,
        occurrence_id: &str,
        ttl_seconds: Option<u64>,
        force: bool,
    ) -> Result<OccurrencePdfPayload, ApiError> {
        let query = ttl_seconds
            .map(|ttl| ("ttl", ttl.to_string()))
            .into_iter()
            .chain(force.then(|| ("force", "1".to_string())))
            .collect::<Vec<_>>();

        let payload: ApiData<OccurrencePdfPayload> = self.get_json(
            &format!("/reports/occurrences/{occurrence_id}/pdf"),
            &query,
        )?;
        Ok(payload.data)
    }
}
