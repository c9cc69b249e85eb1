// ABOUTME: Health verification engine probing fixed endpoints on the deployed URL.
// ABOUTME: Sequential probes with per-probe retry; never aborts early.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::RunConfig;
use crate::output::Output;

/// Ordered endpoints probed on every deployed URL.
pub const HEALTH_ENDPOINTS: &[&str] = &[
    "/",
    "/api/health",
    "/favicon.ico",
    "/api/debug-auth",
    "/test-payment",
];

const PROBE_RETRIES: u32 = 3;

/// One probe result per endpoint per run. Status 0 means unreachable.
#[derive(Debug, Clone, Serialize)]
pub struct HealthProbe {
    pub path: String,
    pub status: u16,
    pub latency: Duration,
}

impl HealthProbe {
    pub fn passed(&self) -> bool {
        probe_passes(self.status)
    }
}

/// A probe passes when a response arrived, it is not a server error, and
/// the endpoint exists. 404 fails because every probed path is expected
/// to be served by the deployed project.
pub fn probe_passes(status: u16) -> bool {
    status > 0 && status < 500 && status != 404
}

/// Default to the secure scheme when the provider hands back a bare host.
pub fn normalize_base_url(base: &str) -> String {
    if base.starts_with("http://") || base.starts_with("https://") {
        base.to_string()
    } else {
        format!("https://{base}")
    }
}

/// Probe every configured endpoint in order, retrying each up to the fixed
/// bound with a delay that scales by attempt number. Always returns exactly
/// one result per endpoint; failures on earlier endpoints never stop later
/// ones.
pub async fn verify(base_url: &str, config: &RunConfig, output: &Output) -> Vec<HealthProbe> {
    let origin = normalize_base_url(base_url);
    let origin = origin.trim_end_matches('/');
    let mut results = Vec::with_capacity(HEALTH_ENDPOINTS.len());

    let client = match reqwest::Client::builder().build() {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::error!("failed to build HTTP client: {e}");
            None
        }
    };

    output.progress(&format!("Performing health checks on {origin}"));

    for path in HEALTH_ENDPOINTS {
        let url = format!("{origin}{path}");
        let mut status = 0u16;
        let mut latency = Duration::ZERO;

        if let Some(client) = &client {
            for attempt in 1..=PROBE_RETRIES {
                let start = Instant::now();
                status = match client
                    .get(&url)
                    .timeout(config.health_timeout)
                    .send()
                    .await
                {
                    Ok(response) => response.status().as_u16(),
                    Err(_) => 0,
                };
                latency = start.elapsed();

                if probe_passes(status) {
                    output.progress(&format!(
                        "  ok {path}: {status} in {:.2}s",
                        latency.as_secs_f64()
                    ));
                    break;
                }

                tracing::warn!("probe {path} returned {status} (attempt {attempt}/{PROBE_RETRIES})");
                if attempt < PROBE_RETRIES {
                    tokio::time::sleep(config.retry_delay * attempt).await;
                }
            }
        }

        if !probe_passes(status) {
            output.warning(&format!("probe {path} failed with status {status}"));
        }

        results.push(HealthProbe {
            path: path.to_string(),
            status,
            latency,
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_classification() {
        assert!(probe_passes(200));
        assert!(probe_passes(301));
        assert!(probe_passes(401));
        assert!(probe_passes(499));

        assert!(!probe_passes(0), "unreachable must fail");
        assert!(!probe_passes(404), "missing endpoint must fail");
        assert!(!probe_passes(500));
        assert!(!probe_passes(503));
    }

    #[test]
    fn normalizes_bare_host_to_https() {
        assert_eq!(
            normalize_base_url("my-app.vercel.app"),
            "https://my-app.vercel.app"
        );
        assert_eq!(
            normalize_base_url("https://my-app.vercel.app"),
            "https://my-app.vercel.app"
        );
        assert_eq!(
            normalize_base_url("http://localhost:3000"),
            "http://localhost:3000"
        );
    }

    #[test]
    fn endpoint_list_is_fixed_and_ordered() {
        assert_eq!(HEALTH_ENDPOINTS.len(), 5);
        assert_eq!(HEALTH_ENDPOINTS[0], "/");
        assert_eq!(HEALTH_ENDPOINTS[1], "/api/health");
        assert_eq!(HEALTH_ENDPOINTS[2], "/favicon.ico");
    }

    #[test]
    fn probe_passed_matches_classifier() {
        let probe = HealthProbe {
            path: "/".to_string(),
            status: 200,
            latency: Duration::from_millis(42),
        };
        assert!(probe.passed());

        let failed = HealthProbe {
            path: "/api/health".to_string(),
            status: 0,
            latency: Duration::ZERO,
        };
        assert!(!failed.passed());
    }
}
