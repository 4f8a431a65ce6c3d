use std::time::Duration;
use log::{debug, error};
use serde_json::Value;
use thiserror::Error;

/// Error types that can occur when interacting with HTTP clients
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("HTTP request error: {0}")]
    RequestError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Server returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Empty response from server")]
    EmptyResponse,
}

impl HttpClientError {
    /// HTTP status code, if the server answered with an error status
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A trait for HTTP client implementations
/// This version avoids generic methods to enable dynamic dispatch
pub trait HttpClient: Send + Sync + std::fmt::Debug {
    /// Send a request with an optional JSON body and return the raw response text
    fn send(
        &self,
        method: &str,
        url: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> Result<String, HttpClientError>;

    /// Send a form-encoded POST request and return the raw response text
    fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<String, HttpClientError>;

    /// Clone the client as a boxed trait object
    fn clone_box(&self) -> Box<dyn HttpClient>;

    /// Send a GET request and parse the response as JSON
    ///
    /// An empty body (e.g. 204 No Content) is reported as `EmptyResponse`.
    fn get_json_with_headers(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value, HttpClientError> {
        let text = self.send("GET", url, None, headers)?;
        parse_json(&text)
    }

    /// Send a POST request; the response body is returned unparsed
    fn post_with_headers(&self, url: &str, payload: Option<&Value>, headers: &[(&str, &str)]) -> Result<String, HttpClientError> {
        self.send("POST", url, payload, headers)
    }

    /// Send a PUT request; the response body is returned unparsed
    fn put_with_headers(&self, url: &str, payload: Option<&Value>, headers: &[(&str, &str)]) -> Result<String, HttpClientError> {
        self.send("PUT", url, payload, headers)
    }

    /// Send a form-encoded POST request and parse the response as JSON
    fn post_form_json(&self, url: &str, form: &[(&str, &str)], headers: &[(&str, &str)]) -> Result<Value, HttpClientError> {
        let text = self.post_form(url, form, headers)?;
        parse_json(&text)
    }
}

/// Parse a response body as JSON, treating an empty body as `EmptyResponse`
pub fn parse_json(text: &str) -> Result<Value, HttpClientError> {
    if text.trim().is_empty() {
        return Err(HttpClientError::EmptyResponse);
    }

    serde_json::from_str::<Value>(text).map_err(|e| {
        error!("Failed to parse JSON response: {}", e);
        debug!("Response text: {}", text);
        HttpClientError::ParseError(e.to_string())
    })
}

impl Clone for Box<dyn HttpClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// An HTTP client implementation using ureq
#[derive(Clone, Debug)]
pub struct UreqHttpClient {
    timeout: Duration,
}

impl UreqHttpClient {
    /// Create a new HTTP client with the specified timeout
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn request(&self, method: &str, url: &str, headers: &[(&str, &str)]) -> ureq::Request {
        let mut request = ureq::request(method, url).timeout(self.timeout);
        for (name, value) in headers {
            request = request.set(name, value);
        }
        request
    }

    fn read_response(result: Result<ureq::Response, ureq::Error>) -> Result<String, HttpClientError> {
        let response = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, resp)) => {
                let message = resp.into_string().unwrap_or_default();
                debug!("Request failed with status {}: {}", status, message);
                return Err(HttpClientError::Status { status, message });
            }
            Err(e) => {
                error!("Request failed: {}", e);
                return Err(HttpClientError::RequestError(e.to_string()));
            }
        };

        response.into_string().map_err(|e| {
            error!("Failed to read response body: {}", e);
            HttpClientError::ParseError(format!("Failed to read response body: {}", e))
        })
    }
}

impl Default for UreqHttpClient {
    /// Create a new HTTP client with default timeout (10 seconds)
    fn default() -> Self {
        Self::new(10)
    }
}

impl HttpClient for UreqHttpClient {
    fn send(
        &self,
        method: &str,
        url: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
    ) -> Result<String, HttpClientError> {
        debug!("{} request to {}", method, url);
        let request = self.request(method, url, headers);

        let result = match body {
            Some(payload) => {
                let json_string = serde_json::to_string(payload).map_err(|e| {
                    HttpClientError::ParseError(format!("Failed to serialize JSON payload: {}", e))
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&json_string)
            }
            // Spotify rejects body-less POST/PUT requests without a length header
            None if method != "GET" => request.set("Content-Length", "0").call(),
            None => request.call(),
        };

        Self::read_response(result)
    }

    fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<String, HttpClientError> {
        debug!("POST form request to {}", url);
        let result = self.request("POST", url, headers).send_form(form);
        Self::read_response(result)
    }

    fn clone_box(&self) -> Box<dyn HttpClient> {
        Box::new(self.clone())
    }
}

/// Create a new HTTP client using the default implementation
pub fn new_http_client(timeout_secs: u64) -> Box<dyn HttpClient> {
    Box::new(UreqHttpClient::new(timeout_secs))
}
