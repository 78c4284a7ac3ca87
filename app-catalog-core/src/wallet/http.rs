//! JSON-over-HTTP wallet client
//!
//! Talks to a locally running wallet that exposes each wallet method as
//! `POST {base_url}/{methodName}` with a JSON body.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    CreateActionArgs, CreateActionResult, GetPublicKeyArgs, SignActionArgs, SignActionResult,
    Wallet,
};
use crate::config::{CatalogConfig, Network};

/// Wallet reached over HTTP
pub struct HttpWallet {
    client: reqwest::Client,
    base_url: String,
    originator: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

#[derive(Debug, Deserialize)]
struct NetworkResponse {
    network: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

impl HttpWallet {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.wallet_url.trim_end_matches('/').to_string(),
            originator: config.originator.clone(),
        })
    }

    async fn call<A: Serialize, R: DeserializeOwned>(&self, method: &str, args: &A) -> Result<R> {
        let url = format!("{}/{}", self.base_url, method);
        debug!("Wallet request {}", url);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(args);
        if let Some(originator) = &self.originator {
            request = request.header("Originator", originator);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach wallet at {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            warn!("Wallet {} failed: {} - {}", method, status, message);
            anyhow::bail!("Wallet {method} failed: {status} - {message}");
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse wallet {method} response"))
    }
}

#[async_trait]
impl Wallet for HttpWallet {
    async fn get_public_key(&self, args: GetPublicKeyArgs) -> Result<String> {
        let response: PublicKeyResponse = self.call("getPublicKey", &args).await?;
        Ok(response.public_key)
    }

    async fn get_network(&self) -> Result<Network> {
        let response: NetworkResponse = self.call("getNetwork", &serde_json::json!({})).await?;
        match response.network.as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => anyhow::bail!("Wallet reported unknown network '{other}'"),
        }
    }

    async fn create_action(&self, args: CreateActionArgs) -> Result<CreateActionResult> {
        self.call("createAction", &args).await
    }

    async fn sign_action(&self, args: SignActionArgs) -> Result<SignActionResult> {
        self.call("signAction", &args).await
    }
}
