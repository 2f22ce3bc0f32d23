pub mod drivers;
pub mod occurrences;
pub mod reports;

use crate::config::Config;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const FALLBACK_MESSAGE: &str = "Erro na requisição";
const READ_ATTEMPTS: usize = 2;

/// `{ "data": T }` envelope used by the list and detail endpoints.
#[derive(Debug, Deserialize)]
pub struct ApiData<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiIssue {
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    issues: Vec<ApiIssue>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        issues: Vec<ApiIssue>,
    },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse response: {source}. body: {body}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Message for the operator: first issue, then the top-level message, then a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Api {
                message, issues, ..
            } => issues
                .first()
                .map(|issue| issue.message.trim())
                .filter(|issue| !issue.is_empty())
                .or_else(|| Some(message.trim()).filter(|message| !message.is_empty()))
                .unwrap_or(FALLBACK_MESSAGE)
                .to_string(),
            ApiError::Status { body, .. } if !body.trim().is_empty() => body.trim().to_string(),
            ApiError::Status { .. } => FALLBACK_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Api { status, .. } | ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Builds the typed error for a non-2xx response body.
pub fn parse_error_response(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ApiError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
            issues: envelope.error.issues,
        },
        Err(_) => ApiError::Status {
            status: status.as_u16(),
            body: body.to_string(),
        },
    }
}

pub struct ApiClient {
    base_url: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        Self::with_base_url(
            &config.resolved_api_base_url(),
            Duration::from_secs(config.api_timeout_seconds.max(5)),
        )
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: Url::parse(base_url.trim_end_matches('/'))?,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        ))?;

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }

        Ok(url)
    }

    /// GET with one retry on transport failures and 5xx responses.
    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path, query)?;
        let mut attempt = 1;

        loop {
            debug!(url = %url, attempt, "GET");
            let result = self
                .http
                .get(url.clone())
                .send()
                .map_err(ApiError::from)
                .and_then(decode);

            match result {
                Err(error) if attempt < READ_ATTEMPTS && error.is_retryable() => {
                    warn!(error = %error, url = %url, "read request failed, retrying once");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    pub(crate) fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        decode(request.send()?)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Fetches an absolute URL (signed download links) as raw bytes.
    pub fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.http.get(Url::parse(url)?).send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(parse_error_response(status, &body));
        }

        Ok(response.bytes()?.to_vec())
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text()?;

    if !status.is_success() {
        return Err(parse_error_response(status, &body));
    }

    serde_json::from_str(&body).map_err(|source| ApiError::Decode { body, source })
}

#[cfg(test)]
mod tests {
    use super::{ApiClient, ApiError, FALLBACK_MESSAGE, parse_error_response};
    use crate::domain::CreateDriverInput;
    use chrono::NaiveDate;
    use reqwest::StatusCode;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    /// Answers one connection per canned response and records each request line.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        thread::spawn(move || {
            for (status, body) in responses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).expect("request line");
                let mut content_length = 0;
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).expect("header");
                    let header = header.trim_end();
                    if header.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = header.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap_or(0);
                        }
                    }
                }
                let mut payload = vec![0; content_length];
                reader.read_exact(&mut payload).expect("body");

                recorded
                    .lock()
                    .expect("lock")
                    .push(request_line.trim_end().to_string());

                let response = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let mut stream = reader.into_inner();
                stream
                    .write_all(response.as_bytes())
                    .expect("write response");
            }
        });

        (base_url, requests)
    }

    #[test]
    fn reads_retry_once_after_server_error() {
        let (base_url, requests) = serve(vec![(503, "indisponível"), (200, r#"{"data":[]}"#)]);
        let client = ApiClient::with_base_url(&base_url, Duration::from_secs(5))
            .expect("client");
        let date = NaiveDate::from_ymd_opt(2026, 2, 4).expect("valid date");

        let occurrences = client.list_occurrences(date).expect("retried");
        assert!(occurrences.is_empty());

        let requests = requests.lock().expect("lock");
        assert_eq!(
            *requests,
            vec![
                "GET /occurrences?date=2026-02-04 HTTP/1.1".to_string(),
                "GET /occurrences?date=2026-02-04 HTTP/1.1".to_string(),
            ]
        );
    }

    #[test]
    fn writes_are_sent_once_even_on_server_error() {
        let unavailable = r#"{"error":{"code":"UNAVAILABLE","message":"Serviço indisponível"}}"#;
        let created = r#"{"id":"d9","code":"1","name":"x","base":null}"#;
        let (base_url, requests) = serve(vec![(503, unavailable), (201, created)]);
        let client = ApiClient::with_base_url(&base_url, Duration::from_secs(5))
            .expect("client");
        let input = CreateDriverInput {
            code: "10293".to_string(),
            name: "Ana Souza".to_string(),
            base: None,
        };

        let error = client.create_driver(&input).expect_err("503 is surfaced");
        assert_eq!(error.user_message(), "Serviço indisponível");
        assert_eq!(
            *requests.lock().expect("lock"),
            vec!["POST /drivers HTTP/1.1".to_string()]
        );
    }

    #[test]
    fn envelope_prefers_first_issue_message() {
        let body = r#"{"error":{"code":"VALIDATION_ERROR","message":"Dados inválidos","issues":[{"path":["place"],"message":"Local é obrigatório"},{"message":"outro"}]}}"#;

        let error = parse_error_response(StatusCode::BAD_REQUEST, body);
        assert_eq!(error.user_message(), "Local é obrigatório");
        match &error {
            ApiError::Api { status, code, .. } => {
                assert_eq!(*status, 400);
                assert_eq!(code, "VALIDATION_ERROR");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn envelope_without_issues_uses_message() {
        let body = r#"{"error":{"code":"NOT_FOUND","message":"Ocorrência não encontrada"}}"#;

        let error = parse_error_response(StatusCode::NOT_FOUND, body);
        assert_eq!(error.user_message(), "Ocorrência não encontrada");
    }

    #[test]
    fn raw_bodies_are_wrapped() {
        let error = parse_error_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(error.user_message(), "upstream down");
        assert!(error.is_retryable());

        let empty = parse_error_response(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(empty.user_message(), FALLBACK_MESSAGE);

        let blank_message = parse_error_response(
            StatusCode::CONFLICT,
            r#"{"error":{"code":"CONFLICT","message":""}}"#,
        );
        assert_eq!(blank_message.user_message(), FALLBACK_MESSAGE);
        assert!(!blank_message.is_retryable());
    }

    #[test]
    fn endpoint_encodes_query_pairs() {
        let client = ApiClient::with_base_url("http://localhost:3333/", Duration::from_secs(5))
            .expect("client");

        let url = client
            .endpoint("/drivers", &[("search", "José Silva".to_string())])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:3333/drivers?search=Jos%C3%A9+Silva"
        );

        let plain = client.endpoint("/occurrences/abc", &[]).expect("url");
        assert_eq!(plain.as_str(), "http://localhost:3333/occurrences/abc");
    }
}
