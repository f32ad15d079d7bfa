use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{AcademicPlanSnapshot, AcademicRecordError, AcademicRecordSource};
use crate::config::AcademicServiceConfig;

const PLANS_PATH: &str = "api/v1/planes-estudio";

/// HTTP client for the academic-records service. Every call is a fresh query.
#[derive(Debug, Clone)]
pub struct AcademicRecordClient {
    http: Client,
    endpoint: Url,
    api_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlansEnvelope {
    Wrapped { planes: Vec<AcademicPlanSnapshot> },
    Bare(Vec<AcademicPlanSnapshot>),
}

impl AcademicRecordClient {
    pub fn new(config: &AcademicServiceConfig) -> Result<Self, AcademicRecordError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AcademicRecordError::Request(err.to_string()))?;

        let mut base = config.base_url.clone();
        if !base.path().ends_with('/') {
            let directory = format!("{}/", base.path());
            base.set_path(&directory);
        }
        let endpoint = base
            .join(PLANS_PATH)
            .map_err(|err| AcademicRecordError::Request(err.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            api_token: config.api_token.clone(),
        })
    }

    fn request_error(identification: &str, err: reqwest::Error) -> AcademicRecordError {
        if err.is_timeout() {
            AcademicRecordError::Timeout {
                identification: identification.to_string(),
            }
        } else {
            AcademicRecordError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl AcademicRecordSource for AcademicRecordClient {
    async fn plans_for(
        &self,
        identification: &str,
    ) -> Result<Vec<AcademicPlanSnapshot>, AcademicRecordError> {
        let mut request = self
            .http
            .get(self.endpoint.clone())
            .query(&[("documento", identification)]);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| Self::request_error(identification, err))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(identification, "academic service has no plans");
                return Ok(Vec::new());
            }
            status if !status.is_success() => {
                return Err(AcademicRecordError::Status {
                    identification: identification.to_string(),
                    status: status.as_u16(),
                });
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| Self::request_error(identification, err))?;
        let plans = match serde_json::from_slice::<PlansEnvelope>(&body)
            .map_err(|err| AcademicRecordError::Malformed(err.to_string()))?
        {
            PlansEnvelope::Wrapped { planes } => planes,
            PlansEnvelope::Bare(planes) => planes,
        };

        debug!(identification, plans = plans.len(), "academic plans fetched");
        Ok(plans)
    }
}
