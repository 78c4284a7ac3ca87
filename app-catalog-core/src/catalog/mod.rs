//! App Catalog - publish, update, remove and find app listings
//!
//! Each listing is a 1-satoshi PushDrop output whose first field is the
//! listing's JSON metadata. Publishing creates the output, updating spends
//! it into a replacement in one transaction, removing spends it with no
//! successor.
//!
//! # Architecture
//!
//! ```text
//! AppCatalog
//!     │
//!     ├── TokenCodec      ← lock metadata / unlock previous token
//!     ├── Wallet          ← createAction / signAction
//!     ├── Broadcaster     ← submit to tm_apps
//!     └── LookupResolver  ← query ls_apps
//! ```
//!
//! Every call is a sequential pipeline of awaited collaborator requests.
//! Nothing is cached between calls.

mod find;


pub use find::FindReport;

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::codec::{Counterparty, ProtocolId, SignOutputs, TokenCodec, UnlockRequest};
use crate::config::{CatalogConfig, Network};
use crate::error::{CatalogError, Result};
use crate::listing::PublishedApp;
use crate::metadata::PublishedAppMetadata;
use crate::overlay::{BroadcastResult, Broadcaster, LookupResolver};
use crate::script::Script;
use crate::transaction::Beef;
use crate::wallet::{
    CreateActionArgs, CreateActionInput, CreateActionOptions, CreateActionOutput,
    GetPublicKeyArgs, SignActionArgs, SignActionSpend, Wallet,
};

/// Value locked in every listing token
pub const LISTING_SATOSHIS: u64 = 1;

/// Per-call overrides for [`AppCatalog::publish_app`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Overrides `CatalogConfig::accept_delayed_broadcast` for this call
    pub accept_delayed_broadcast: Option<bool>,
}

/// Client for the app catalog overlay
pub struct AppCatalog {
    config: CatalogConfig,
    wallet: Arc<dyn Wallet>,
    codec: Arc<dyn TokenCodec>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    resolver: Option<Arc<dyn LookupResolver>>,
}

/// Builder for [`AppCatalog`]
///
/// Collaborators left unset fall back to the HTTP implementations
/// (feature `http`), pointed at the configured wallet URL and overlay hosts.
pub struct AppCatalogBuilder {
    config: CatalogConfig,
    codec: Arc<dyn TokenCodec>,
    wallet: Option<Arc<dyn Wallet>>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    resolver: Option<Arc<dyn LookupResolver>>,
}

impl AppCatalogBuilder {
    pub fn config(mut self, config: CatalogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn LookupResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<AppCatalog> {
        self.config
            .validate()
            .map_err(|e| CatalogError::Config(format!("{e:#}")))?;

        let wallet = match self.wallet {
            Some(wallet) => wallet,
            None => default_wallet(&self.config)?,
        };

        Ok(AppCatalog {
            config: self.config,
            wallet,
            codec: self.codec,
            broadcaster: self.broadcaster,
            resolver: self.resolver,
        })
    }
}

impl AppCatalog {
    /// Start building a catalog around `codec`
    pub fn builder(codec: Arc<dyn TokenCodec>) -> AppCatalogBuilder {
        AppCatalogBuilder {
            config: CatalogConfig::default(),
            codec,
            wallet: None,
            broadcaster: None,
            resolver: None,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Publish a new listing
    ///
    /// `metadata.publisher` is replaced with the wallet's identity key.
    pub async fn publish_app(
        &self,
        metadata: PublishedAppMetadata,
        options: PublishOptions,
    ) -> Result<BroadcastResult> {
        metadata.validate()?;

        let metadata = metadata.with_publisher(self.identity_key().await?);
        let locking_script = self.lock(&metadata).await?;
        debug!(
            "Publishing '{}' ({}) as {}",
            metadata.name, metadata.domain, metadata.publisher
        );

        let accept_delayed_broadcast = options
            .accept_delayed_broadcast
            .unwrap_or(self.config.accept_delayed_broadcast);

        let created = self
            .wallet
            .create_action(CreateActionArgs {
                description: "Publish app to catalog".to_string(),
                input_beef: None,
                inputs: Vec::new(),
                outputs: vec![listing_output(locking_script)],
                options: CreateActionOptions {
                    randomize_outputs: false,
                    accept_delayed_broadcast,
                },
            })
            .await
            .map_err(|e| CatalogError::Creation(format!("{e:#}")))?;

        let tx = created.tx.ok_or_else(|| {
            CatalogError::Creation("wallet returned no transaction".to_string())
        })?;
        let beef = Beef::from_bytes(&tx).map_err(|e| {
            CatalogError::Creation(format!("wallet returned an unreadable transaction: {e}"))
        })?;

        self.broadcast(&beef).await
    }

    /// Replace a listing with new metadata in a single transaction
    pub async fn update_app(
        &self,
        prev: &PublishedApp,
        new_metadata: PublishedAppMetadata,
    ) -> Result<BroadcastResult> {
        let input_beef = require_beef(prev)?;
        new_metadata.validate()?;

        let metadata = new_metadata.with_publisher(self.identity_key().await?);
        let locking_script = self.lock(&metadata).await?;
        debug!(
            "Updating {} to '{}' version {}",
            prev.token.outpoint(),
            metadata.name,
            metadata.version
        );

        self.spend(
            prev,
            input_beef,
            Some(listing_output(locking_script)),
            "Update app listing",
        )
        .await
    }

    /// Spend a listing's token without a successor
    pub async fn remove_app(&self, prev: &PublishedApp) -> Result<BroadcastResult> {
        let input_beef = require_beef(prev)?;
        debug!("Removing {}", prev.token.outpoint());

        self.spend(prev, input_beef, None, "Remove app listing").await
    }

    async fn spend(
        &self,
        prev: &PublishedApp,
        input_beef: &[u8],
        replacement: Option<CreateActionOutput>,
        description: &str,
    ) -> Result<BroadcastResult> {
        let outpoint = prev.token.outpoint();
        let unlocker = self.codec.unlock(UnlockRequest {
            protocol_id: ProtocolId::catalog(),
            key_id: self.config.key_id.clone(),
            counterparty: Counterparty::Anyone,
            sign_outputs: SignOutputs::All,
            anyone_can_pay: false,
            source_satoshis: Some(prev.token.satoshis),
            locking_script: Some(prev.token.locking_script.clone()),
        });

        let created = self
            .wallet
            .create_action(CreateActionArgs {
                description: description.to_string(),
                input_beef: Some(input_beef.to_vec()),
                inputs: vec![CreateActionInput {
                    outpoint: outpoint.to_string(),
                    unlocking_script_length: unlocker.estimate_length(),
                    input_description: "Previous app listing".to_string(),
                }],
                outputs: replacement.into_iter().collect(),
                options: CreateActionOptions {
                    randomize_outputs: false,
                    accept_delayed_broadcast: self.config.accept_delayed_broadcast,
                },
            })
            .await
            .map_err(|e| CatalogError::Creation(format!("{e:#}")))?;

        let signable = created.signable_transaction.ok_or_else(|| {
            CatalogError::Creation(format!(
                "wallet returned no signable transaction spending {outpoint}"
            ))
        })?;
        let partial = Beef::from_bytes(&signable.tx).map_err(|e| {
            CatalogError::Creation(format!("wallet returned an unreadable transaction: {e}"))
        })?;

        let unlocking_script = unlocker
            .sign(&partial, 0)
            .await
            .map_err(|e| CatalogError::Finalization(format!("failed to unlock {outpoint}: {e:#}")))?;

        let mut spends = BTreeMap::new();
        spends.insert(0, SignActionSpend { unlocking_script });

        let signed = self
            .wallet
            .sign_action(SignActionArgs {
                spends,
                reference: signable.reference,
            })
            .await
            .map_err(|e| CatalogError::Finalization(format!("{e:#}")))?;

        let tx = signed.tx.ok_or_else(|| {
            CatalogError::Finalization("wallet returned no signed transaction".to_string())
        })?;
        let beef = Beef::from_bytes(&tx).map_err(|e| {
            CatalogError::Finalization(format!("wallet returned an unreadable transaction: {e}"))
        })?;

        self.broadcast(&beef).await
    }

    async fn broadcast(&self, beef: &Beef) -> Result<BroadcastResult> {
        let broadcaster = self.broadcaster().await?;
        let result = broadcaster.broadcast(beef).await;

        match &result {
            BroadcastResult::Success(success) => {
                info!("Broadcast {} to {}: {}", success.txid, self.config.topic, success.message)
            }
            BroadcastResult::Failure(failure) => warn!(
                "Broadcast to {} failed: {} - {}",
                self.config.topic, failure.code, failure.description
            ),
        }

        Ok(result)
    }

    async fn lock(&self, metadata: &PublishedAppMetadata) -> Result<Script> {
        let payload = metadata.to_payload()?;
        self.codec
            .lock(
                vec![payload],
                &ProtocolId::catalog(),
                &self.config.key_id,
                &Counterparty::Anyone,
                true,
            )
            .await
            .map_err(|e| CatalogError::Creation(format!("failed to build locking script: {e:#}")))
    }

    async fn identity_key(&self) -> Result<String> {
        self.wallet
            .get_public_key(GetPublicKeyArgs::identity())
            .await
            .map_err(CatalogError::Wallet)
    }

    async fn network(&self) -> Result<Network> {
        match self.config.network {
            Some(network) => Ok(network),
            None => self.wallet.get_network().await.map_err(CatalogError::Wallet),
        }
    }

    async fn broadcaster(&self) -> Result<Arc<dyn Broadcaster>> {
        match &self.broadcaster {
            Some(broadcaster) => Ok(Arc::clone(broadcaster)),
            None => default_broadcaster(&self.config, self.network().await?),
        }
    }

    async fn resolver(&self) -> Result<Arc<dyn LookupResolver>> {
        match &self.resolver {
            Some(resolver) => Ok(Arc::clone(resolver)),
            None => default_resolver(&self.config, self.network().await?),
        }
    }
}

fn listing_output(locking_script: Script) -> CreateActionOutput {
    CreateActionOutput {
        locking_script,
        satoshis: LISTING_SATOSHIS,
        output_description: "App metadata token".to_string(),
    }
}

fn require_beef(prev: &PublishedApp) -> Result<&[u8]> {
    prev.token
        .beef
        .as_deref()
        .ok_or_else(|| CatalogError::MissingProof {
            outpoint: prev.token.outpoint().to_string(),
        })
}

#[cfg(feature = "http")]
fn default_wallet(config: &CatalogConfig) -> Result<Arc<dyn Wallet>> {
    let wallet = crate::wallet::HttpWallet::new(config)
        .map_err(|e| CatalogError::Config(format!("{e:#}")))?;
    Ok(Arc::new(wallet))
}

#[cfg(not(feature = "http"))]
fn default_wallet(_config: &CatalogConfig) -> Result<Arc<dyn Wallet>> {
    Err(CatalogError::Config(
        "no wallet supplied and the `http` feature is disabled".to_string(),
    ))
}

#[cfg(feature = "http")]
fn default_broadcaster(config: &CatalogConfig, network: Network) -> Result<Arc<dyn Broadcaster>> {
    let broadcaster = crate::overlay::HttpBroadcaster::new(
        vec![config.topic.clone()],
        config.hosts_for(network),
        config.timeout_seconds,
    )
    .map_err(|e| CatalogError::Config(format!("{e:#}")))?;
    Ok(Arc::new(broadcaster))
}

#[cfg(not(feature = "http"))]
fn default_broadcaster(_config: &CatalogConfig, _network: Network) -> Result<Arc<dyn Broadcaster>> {
    Err(CatalogError::Config(
        "no broadcaster supplied and the `http` feature is disabled".to_string(),
    ))
}

#[cfg(feature = "http")]
fn default_resolver(config: &CatalogConfig, network: Network) -> Result<Arc<dyn LookupResolver>> {
    let resolver =
        crate::overlay::HttpLookupResolver::new(config.hosts_for(network), config.timeout_seconds)
            .map_err(|e| CatalogError::Config(format!("{e:#}")))?;
    Ok(Arc::new(resolver))
}

#[cfg(not(feature = "http"))]
fn default_resolver(_config: &CatalogConfig, _network: Network) -> Result<Arc<dyn LookupResolver>> {
    Err(CatalogError::Config(
        "no lookup resolver supplied and the `http` feature is disabled".to_string(),
    ))
}
