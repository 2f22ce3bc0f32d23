use crate::api::{ApiClient, ApiData, ApiError};
use crate::domain::{CreateDriverInput, Driver};
use tracing::info;

impl ApiClient {
    /// Blank terms return no drivers without hitting the backend.
    pub fn search_drivers(&self, term: &str) -> Result<Vec<Driver>, ApiError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let payload: ApiData<Vec<Driver>> =
            self.get_json("/drivers", &[("search", term.to_string())])?;
        Ok(payload.data)
    }

    pub fn create_driver(&self, input: &CreateDriverInput) -> Result<Driver, ApiError> {
        let url = self.endpoint("/drivers", &[])?;
        let driver: Driver = self.send_json(self.http().post(url).json(input))?;

        info!(id = %driver.id, code = %driver.code, "driver created");
        Ok(driver)
    }
}
