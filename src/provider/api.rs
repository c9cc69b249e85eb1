// ABOUTME: Vercel deployments API client with exponential backoff and poll loop.
// ABOUTME: Selects the newest deployment for a branch/target and waits for a terminal state.

use std::time::{Duration, Instant};

use serde_json::Value;

use super::{DeployOutcome, DeployState, DeployTarget, DeploymentRecord, ProviderError};
use crate::config::RunConfig;
use crate::output::Output;

const API_URL: &str = "https://api.vercel.com/v13/deployments";
const POLL_INTERVAL: Duration = Duration::from_secs(10);
const LIST_LIMIT: u32 = 20;
const HTTP_RETRIES: u32 = 3;
const MAX_CONSECUTIVE_ERRORS: u32 = 3;

pub const ENV_TOKEN: &str = "VERCEL_TOKEN";
pub const ENV_PROJECT: &str = "VERCEL_PROJECT_ID";
pub const ENV_ORG: &str = "VERCEL_ORG_ID";

/// Bearer-token client for the provider's deployment-listing API.
#[derive(Debug)]
pub struct VercelApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
    project: String,
    org_id: Option<String>,
    retry_delay: Duration,
    poll_interval: Duration,
}

impl VercelApi {
    /// Build a client from the process environment. Token and project id
    /// are required; the organization id is optional.
    pub fn from_env(config: &RunConfig) -> Result<Self, ProviderError> {
        let token = std::env::var(ENV_TOKEN)
            .map_err(|_| ProviderError::MissingEnvVar(ENV_TOKEN.to_string()))?;
        let project = std::env::var(ENV_PROJECT)
            .map_err(|_| ProviderError::MissingEnvVar(ENV_PROJECT.to_string()))?;
        let org_id = std::env::var(ENV_ORG).ok();
        Self::new(token, project, org_id, config)
    }

    pub fn new(
        token: String,
        project: String,
        org_id: Option<String>,
        config: &RunConfig,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.health_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: API_URL.to_string(),
            token,
            project,
            org_id,
            retry_delay: config.retry_delay,
            poll_interval: POLL_INTERVAL,
        })
    }

    /// GET with exponential backoff: the delay is multiplied by the attempt
    /// number on each retry. 4xx responses are immediately fatal and never
    /// retried; 5xx and network errors retry up to the bound.
    async fn request(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, ProviderError> {
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{url}?{query}");

        let mut last_error = ProviderError::ServerError { status: 0 };

        for attempt in 1..=HTTP_RETRIES {
            match self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .header("Content-Type", "application/json")
                .header("User-Agent", concat!("shipout/", env!("CARGO_PKG_VERSION")))
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.json::<Value>().await?);
                    }
                    if status.is_client_error() {
                        return Err(ProviderError::ClientError {
                            status: status.as_u16(),
                            body: response.text().await.unwrap_or_default(),
                        });
                    }
                    last_error = ProviderError::ServerError {
                        status: status.as_u16(),
                    };
                }
                Err(e) => last_error = ProviderError::Request(e),
            }

            if attempt < HTTP_RETRIES {
                let backoff = self.retry_delay * attempt;
                tracing::warn!("API request failed (attempt {attempt}/{HTTP_RETRIES}), backing off {backoff:?}");
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error)
    }

    pub async fn list_deployments(&self, limit: u32) -> Result<Value, ProviderError> {
        let limit = limit.to_string();
        let mut params = vec![("project", self.project.as_str()), ("limit", limit.as_str())];
        if let Some(org) = &self.org_id {
            params.push(("teamId", org.as_str()));
        }
        self.request(&self.base_url, &params).await
    }

    /// Poll the deployment listing until the matching deployment reaches a
    /// terminal state, the overall timeout expires, or consecutive poll
    /// errors exceed the threshold. The error counter resets on any
    /// successful poll.
    pub async fn wait_for_deployment(
        &self,
        branch: &str,
        target: DeployTarget,
        timeout: Duration,
        output: &Output,
    ) -> (Option<DeploymentRecord>, DeployOutcome) {
        let deadline = Instant::now() + timeout;
        let mut consecutive_errors = 0u32;
        let mut last_seen: Option<DeploymentRecord> = None;

        output.progress(&format!(
            "Waiting for deployment on branch '{branch}' (target: {target})..."
        ));

        while Instant::now() < deadline {
            match self.list_deployments(LIST_LIMIT).await {
                Ok(payload) => {
                    consecutive_errors = 0;

                    match select_latest(&payload, branch, target) {
                        Some(record) => {
                            output.progress(&format!(
                                "Deployment {}: {}",
                                record.id, record.state
                            ));
                            if record.state.is_terminal() {
                                let outcome = if record.state == DeployState::Ready {
                                    DeployOutcome::Ready
                                } else {
                                    DeployOutcome::Failed(record.state.clone())
                                };
                                return (Some(record), outcome);
                            }
                            last_seen = Some(record);
                        }
                        None => output.progress("No deployment found yet, continuing to wait..."),
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        "poll error ({consecutive_errors}/{MAX_CONSECUTIVE_ERRORS}): {e}"
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        output.error("Too many consecutive provider API errors, giving up");
                        return (last_seen, DeployOutcome::Abandoned);
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        output.error(&format!("Deployment wait timed out after {timeout:?}"));
        (last_seen, DeployOutcome::Timeout)
    }
}

/// Pick the newest deployment matching the branch and target.
///
/// The listing payload exposes entries under `deployments` or `data`
/// depending on API version; branch metadata may live under several keys,
/// and entries without branch metadata are accepted.
pub fn select_latest(payload: &Value, branch: &str, target: DeployTarget) -> Option<DeploymentRecord> {
    let items = payload
        .get("deployments")
        .or_else(|| payload.get("data"))
        .and_then(Value::as_array)?;

    let mut matching: Vec<&Value> = items
        .iter()
        .filter(|item| {
            let item_target = item
                .get("target")
                .or_else(|| item.get("deploymentTarget"))
                .and_then(Value::as_str);
            if item_target != Some(target.as_str()) {
                return false;
            }

            let meta = item.get("meta");
            let item_branch = meta
                .and_then(|m| {
                    m.get("gitBranch")
                        .or_else(|| m.get("githubCommitRef"))
                        .or_else(|| m.get("branch"))
                })
                .and_then(Value::as_str);
            item_branch.is_none() || item_branch == Some(branch)
        })
        .collect();

    matching.sort_by_key(|item| {
        std::cmp::Reverse(item.get("createdAt").and_then(Value::as_i64).unwrap_or(0))
    });

    matching.first().map(|item| record_from_json(item, target))
}

fn record_from_json(item: &Value, target: DeployTarget) -> DeploymentRecord {
    let id = item
        .get("uid")
        .or_else(|| item.get("id"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let url = item.get("url").and_then(Value::as_str).map(String::from);
    let state = item
        .get("readyState")
        .or_else(|| item.get("state"))
        .and_then(Value::as_str)
        .map(DeployState::parse)
        .unwrap_or(DeployState::Unknown("UNKNOWN".to_string()));
    let created_at = item.get("createdAt").and_then(Value::as_i64);

    DeploymentRecord {
        id,
        url,
        target,
        state,
        created_at,
    }
}
