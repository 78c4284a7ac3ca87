//! HTTP overlay clients
//!
//! `POST {host}/submit` takes raw BEEF with the target topics in the
//! `X-Topics` header and answers with per-topic admittance instructions.
//! `POST {host}/lookup` takes a JSON `{service, query}` body.
//!
//! Hosts are contacted one after another in configured order.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{BroadcastResult, Broadcaster, LookupAnswer, LookupQuestion, LookupResolver};
use crate::transaction::Beef;

/// What a host did with a submitted transaction for one topic
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdmittanceInstructions {
    #[serde(default)]
    outputs_to_admit: Vec<u32>,
    #[serde(default)]
    coins_to_retain: Vec<u32>,
    #[serde(default)]
    coins_removed: Vec<u32>,
}

impl AdmittanceInstructions {
    fn acknowledged(&self) -> bool {
        !self.outputs_to_admit.is_empty()
            || !self.coins_to_retain.is_empty()
            || !self.coins_removed.is_empty()
    }
}

fn build_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .build()
        .context("Failed to create HTTP client")
}

/// Submits transactions to overlay hosts for a set of topics
pub struct HttpBroadcaster {
    client: reqwest::Client,
    topics: Vec<String>,
    hosts: Vec<String>,
}

impl HttpBroadcaster {
    pub fn new(topics: Vec<String>, hosts: Vec<String>, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            topics,
            hosts,
        })
    }

    async fn submit(&self, host: &str, body: Vec<u8>, topics_header: &str) -> Result<bool> {
        let url = format!("{}/submit", host.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .header("X-Topics", topics_header)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach overlay host {host}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{status} - {body}");
        }

        let steak: HashMap<String, AdmittanceInstructions> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse submit response from {host}"))?;

        Ok(self
            .topics
            .iter()
            .filter_map(|topic| steak.get(topic))
            .any(AdmittanceInstructions::acknowledged))
    }
}

#[async_trait]
impl Broadcaster for HttpBroadcaster {
    async fn broadcast(&self, tx: &Beef) -> BroadcastResult {
        let Some(txid) = tx.subject().map(|t| t.txid()) else {
            return BroadcastResult::failure("ERR_NO_SUBJECT", "BEEF holds no transaction");
        };

        if self.hosts.is_empty() {
            return BroadcastResult::failure("ERR_NO_HOSTS", "No overlay hosts configured");
        }

        let topics_header = match serde_json::to_string(&self.topics) {
            Ok(header) => header,
            Err(e) => return BroadcastResult::failure("ERR_TOPICS", e.to_string()),
        };
        let body = tx.to_bytes();

        let mut acknowledged = 0;
        let mut errors = Vec::new();
        for host in &self.hosts {
            match self.submit(host, body.clone(), &topics_header).await {
                Ok(true) => {
                    debug!("Overlay host {} acknowledged {}", host, txid);
                    acknowledged += 1;
                }
                Ok(false) => debug!("Overlay host {} did not admit {}", host, txid),
                Err(e) => {
                    warn!("Overlay host {} rejected {}: {:#}", host, txid, e);
                    errors.push(format!("{host}: {e:#}"));
                }
            }
        }

        if acknowledged == 0 {
            let detail = if errors.is_empty() {
                "no host admitted the transaction".to_string()
            } else {
                errors.join("; ")
            };
            return BroadcastResult::failure(
                "ERR_NO_HOST_ACKNOWLEDGMENT",
                format!("Topics {:?} were not acknowledged: {}", self.topics, detail),
            );
        }

        info!("Broadcast {} to {} overlay host(s)", txid, acknowledged);
        BroadcastResult::success(
            txid,
            format!("Acknowledged by {acknowledged} overlay host(s)"),
        )
    }
}

/// Resolves lookup questions against overlay hosts
pub struct HttpLookupResolver {
    client: reqwest::Client,
    hosts: Vec<String>,
}

impl HttpLookupResolver {
    pub fn new(hosts: Vec<String>, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            hosts,
        })
    }

    async fn ask(&self, host: &str, question: &LookupQuestion) -> Result<LookupAnswer> {
        let url = format!("{}/lookup", host.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(question)
            .send()
            .await
            .with_context(|| format!("Failed to reach overlay host {host}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{status} - {body}");
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse lookup answer from {host}"))
    }
}

#[async_trait]
impl LookupResolver for HttpLookupResolver {
    async fn query(&self, question: &LookupQuestion) -> Result<LookupAnswer> {
        let mut last_error = None;
        for host in &self.hosts {
            match self.ask(host, question).await {
                Ok(answer) => {
                    debug!("Lookup on {} answered by {}", question.service, host);
                    return Ok(answer);
                }
                Err(e) => {
                    warn!("Lookup on {} failed at {}: {:#}", question.service, host, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("No overlay hosts configured")))
    }
}
