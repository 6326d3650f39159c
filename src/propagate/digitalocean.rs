//! A [`DnsPropagator`][super::DnsPropagator] for the DigitalOcean domains API.
//!
//! Updates a single record with
//! `PUT /v2/domains/{domain}/records/{record_id}` and a `{"data": "<address>"}` body.
use crate::config::DnsTarget;
use crate::error::Error;
use crate::propagate::{Ack, DnsPropagator, DomainRecord, PropagationError};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;

const PROVIDER_NAME: &str = "DigitalOcean API";

#[derive(Deserialize)]
struct UpdateRecordResponse {
    domain_record: DomainRecord,
}

pub struct DigitalOceanPropagator {
    http: reqwest::Client,
    api_token: String,
    record_url: Url,
}

impl fmt::Debug for DigitalOceanPropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitalOceanPropagator")
            .field("api_token", &"<REDACTED>")
            .field("record_url", &self.record_url.as_str())
            .finish()
    }
}

impl DigitalOceanPropagator {
    /// Build a propagator for `target` against the API rooted at `base_url`. Every provider
    /// call is abandoned after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] if `base_url` isn't an absolute HTTP(S) URL.
    ///
    /// Returns [`Error::HttpClient`] if the HTTP client can't be initialized.
    pub fn new(target: DnsTarget, base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let invalid_url = || Error::InvalidSetting {
            name: "DDNS_PROVIDER_URL",
            value: base_url.to_string(),
        };
        let mut record_url = Url::parse(base_url).map_err(|_| invalid_url())?;
        record_url
            .path_segments_mut()
            .map_err(|()| invalid_url())?
            .pop_if_empty()
            .extend([
                "domains",
                target.domain.as_str(),
                "records",
                target.record_id.as_str(),
            ]);

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_token: target.api_token,
            record_url,
        })
    }
}

#[async_trait::async_trait]
impl DnsPropagator for DigitalOceanPropagator {
    async fn propagate(&self, address: &str) -> Result<Ack, PropagationError> {
        tracing::debug!("PUT {} data={address}", self.record_url);
        let response = self
            .http
            .put(self.record_url.clone())
            .bearer_auth(&self.api_token)
            .json(&json!({ "data": address }))
            .send()
            .await
            .map_err(|err| PropagationError::Unreachable {
                provider: PROVIDER_NAME.to_string(),
                cause: err.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(PropagationError::ProviderRejected {
                status: status.as_u16(),
                body,
            });
        }

        // The update already happened; an undecodable body only costs us the log detail.
        let record = response
            .json::<UpdateRecordResponse>()
            .await
            .ok()
            .map(|r| r.domain_record);
        Ok(Ack { record })
    }
}
