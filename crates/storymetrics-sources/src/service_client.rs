use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use storymetrics_core::ReportError;

/// Generic request/response client for a remote microservice.
///
/// Every call is a JSON `POST` of `{action, params, meta}` to a single URL.
/// Success responses carry the result under `data`; failures carry a
/// `message` and use the HTTP status for classification.
#[derive(Clone)]
pub struct ServiceClient {
    client: Client,
    url: Url,
    headers: HeaderMap,
}

impl ServiceClient {
    pub fn new(url: &str) -> Result<Self, ReportError> {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: &str) -> Result<Self, ReportError> {
        if url.trim().is_empty() {
            return Err(ReportError::validation("no service URL was provided"));
        }
        let url = Url::parse(url)
            .map_err(|e| ReportError::validation(format!("invalid service URL '{url}': {e}")))?;
        Ok(Self {
            client,
            url,
            headers: HeaderMap::new(),
        })
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ReportError> {
        let name = HeaderName::try_from(name)
            .map_err(|e| ReportError::validation(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value)
            .map_err(|e| ReportError::validation(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn request<P, T>(
        &self,
        action: &str,
        params: &P,
        meta: Value,
    ) -> Result<T, ReportError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = json!({ "action": action, "params": params, "meta": meta });
        debug!(action, url = %self.url, "dispatching service request");

        let resp = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&body)?)
            .send()
            .await
            .with_context(|| format!("service request '{action}' failed"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("reading service response for '{action}' failed"))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(ReportError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        // Success bodies that don't match the expected shape are malformed.
        let mut parsed: Value = serde_json::from_str(&text)
            .map_err(|e| ReportError::malformed(format!("'{action}' response is not JSON: {e}")))?;
        let data = parsed
            .get_mut("data")
            .map(Value::take)
            .ok_or_else(|| {
                ReportError::malformed(format!("'{action}' response has no data field"))
            })?;
        serde_json::from_value(data)
            .map_err(|e| ReportError::malformed(format!("'{action}' response: {e}")))
    }
}
