//! Test helpers shared by the integration tests
//!
//! Provides an in-memory overlay: a wallet that builds real transactions,
//! a PushDrop codec with a fixed key, a broadcaster that admits listing
//! outputs into a shared ledger and a resolver that filters that ledger.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use app_catalog_core::codec::{Counterparty, ProtocolId, TokenCodec, UnlockRequest, Unlocker};
use app_catalog_core::overlay::{
    BroadcastResult, Broadcaster, LookupAnswer, LookupOutput, LookupQuestion, LookupResolver,
};
use app_catalog_core::query::{LookupQuery, SortOrder};
use app_catalog_core::script::Script;
use app_catalog_core::transaction::{
    txid_from_hex, Beef, Outpoint, Transaction, TxInput, TxOutput,
};
use app_catalog_core::wallet::{
    CreateActionArgs, CreateActionResult, GetPublicKeyArgs, SignActionArgs, SignActionResult,
    SignableTransaction, Wallet,
};
use app_catalog_core::{
    pushdrop, AppCatalog, CatalogConfig, Network, PublishedAppMetadata,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const IDENTITY_KEY: &str =
    "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

/// Locking key used by [`FixedKeyCodec`]
pub const TOKEN_KEY: [u8; 33] = [0x03; 33];

/// Unlocking script produced by [`FixedKeyCodec`]
pub const FAKE_SIGNATURE: [u8; 4] = [0x30, 0x44, 0x02, 0x20];

/// Outputs admitted by the in-memory overlay
#[derive(Default)]
pub struct Ledger {
    state: Mutex<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    listings: Vec<Admitted>,
    submissions: usize,
    questions: Vec<LookupQuestion>,
    extra_outputs: Vec<LookupOutput>,
}

struct Admitted {
    outpoint: Outpoint,
    beef: Vec<u8>,
    metadata: PublishedAppMetadata,
}

impl Ledger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live_listings(&self) -> usize {
        self.state.lock().unwrap().listings.len()
    }

    pub fn submissions(&self) -> usize {
        self.state.lock().unwrap().submissions
    }

    pub fn lookups(&self) -> Vec<LookupQuestion> {
        self.state.lock().unwrap().questions.clone()
    }

    /// Make the resolver return an arbitrary output after the admitted ones
    pub fn inject_output(&self, output: LookupOutput) {
        self.state.lock().unwrap().extra_outputs.push(output);
    }

    fn admit(&self, beef: &Beef) -> Result<String> {
        let tx = beef
            .subject()
            .ok_or_else(|| anyhow!("bundle has no subject"))?;
        let txid = tx.txid();
        let bytes = beef.to_bytes();

        let mut state = self.state.lock().unwrap();
        state.submissions += 1;

        let spent: Vec<Outpoint> = tx.inputs.iter().map(TxInput::outpoint).collect();
        state.listings.retain(|l| !spent.contains(&l.outpoint));

        for (index, output) in tx.outputs.iter().enumerate() {
            let Ok(token) = pushdrop::decode(&output.locking_script) else {
                continue;
            };
            let Some(Ok(metadata)) = token
                .fields
                .first()
                .map(|payload| PublishedAppMetadata::from_payload(payload))
            else {
                continue;
            };
            state.listings.push(Admitted {
                outpoint: Outpoint {
                    txid: txid.clone(),
                    index: index as u32,
                },
                beef: bytes.clone(),
                metadata,
            });
        }

        Ok(txid)
    }

    fn lookup(&self, question: &LookupQuestion) -> Result<Vec<LookupOutput>> {
        let query: LookupQuery = serde_json::from_value(question.query.clone())?;

        let mut state = self.state.lock().unwrap();
        state.questions.push(question.clone());

        let mut matches: Vec<&Admitted> = state
            .listings
            .iter()
            .filter(|l| matches_query(&l.metadata, &query))
            .collect();

        if let Some(order) = query.sort_order() {
            matches.sort_by(|a, b| a.metadata.release_date.cmp(&b.metadata.release_date));
            if order == SortOrder::Desc {
                matches.reverse();
            }
        }

        let skip = query.skip().unwrap_or(0) as usize;
        let limit = query.limit().map(|l| l as usize).unwrap_or(usize::MAX);

        let mut outputs: Vec<LookupOutput> = matches
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|l| LookupOutput {
                beef: l.beef.clone(),
                output_index: l.outpoint.index,
                context: None,
            })
            .collect();
        outputs.extend(state.extra_outputs.iter().cloned());
        Ok(outputs)
    }
}

fn matches_query(metadata: &PublishedAppMetadata, query: &LookupQuery) -> bool {
    field_matches(query.domain(), &metadata.domain)
        && field_matches(query.publisher(), &metadata.publisher)
        && field_matches(query.name(), &metadata.name)
        && query
            .category()
            .map_or(true, |c| metadata.category.as_deref() == Some(c))
        && query.tags().map_or(true, |wanted| {
            metadata
                .tags
                .as_ref()
                .is_some_and(|tags| wanted.iter().any(|t| tags.contains(t)))
        })
        && query
            .start_date()
            .map_or(true, |start| metadata.release_date.as_str() >= start)
        && query
            .end_date()
            .map_or(true, |end| metadata.release_date.as_str() <= end)
}

fn field_matches(filter: Option<&str>, value: &str) -> bool {
    filter.map_or(true, |f| f == value)
}

/// What the wallet should do wrong, if anything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WalletFault {
    #[default]
    None,
    /// `create_action` errors
    RefuseCreate,
    /// `create_action` succeeds without returning a transaction
    OmitTx,
    /// `sign_action` errors
    RefuseSign,
}

/// Wallet that builds unsigned-but-structurally-real transactions
pub struct MockWallet {
    network: Network,
    fault: WalletFault,
    state: Mutex<WalletState>,
}

#[derive(Default)]
struct WalletState {
    calls: Vec<&'static str>,
    created: Vec<CreateActionArgs>,
    pending: HashMap<String, (Beef, Transaction)>,
    funding: u32,
}

impl MockWallet {
    pub fn new() -> Arc<Self> {
        Self::with_fault(WalletFault::None)
    }

    pub fn with_fault(fault: WalletFault) -> Arc<Self> {
        Arc::new(Self {
            network: Network::Local,
            fault,
            state: Mutex::new(WalletState::default()),
        })
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created(&self) -> Vec<CreateActionArgs> {
        self.state.lock().unwrap().created.clone()
    }

    fn record(&self, call: &'static str) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn funding_input(&self) -> TxInput {
        let mut state = self.state.lock().unwrap();
        state.funding += 1;
        let mut source_txid = [0xaa; 32];
        source_txid[..4].copy_from_slice(&state.funding.to_le_bytes());
        TxInput {
            source_txid,
            source_output_index: 0,
            unlocking_script: Script::new(vec![]),
            sequence: u32::MAX,
        }
    }
}

fn build_outputs(args: &CreateActionArgs) -> Vec<TxOutput> {
    args.outputs
        .iter()
        .map(|o| TxOutput {
            satoshis: o.satoshis,
            locking_script: o.locking_script.clone(),
        })
        .collect()
}

fn atomic_bytes(beef: Beef) -> Result<Vec<u8>> {
    Ok(beef
        .into_atomic()
        .ok_or_else(|| anyhow!("bundle has no subject"))?
        .to_bytes())
}

#[async_trait]
impl Wallet for MockWallet {
    async fn get_public_key(&self, args: GetPublicKeyArgs) -> Result<String> {
        self.record("get_public_key");
        if !args.identity_key {
            bail!("only the identity key is available");
        }
        Ok(IDENTITY_KEY.to_string())
    }

    async fn get_network(&self) -> Result<Network> {
        self.record("get_network");
        Ok(self.network)
    }

    async fn create_action(&self, args: CreateActionArgs) -> Result<CreateActionResult> {
        self.record("create_action");
        self.state.lock().unwrap().created.push(args.clone());

        match self.fault {
            WalletFault::RefuseCreate => bail!("Insufficient funds"),
            WalletFault::OmitTx => return Ok(CreateActionResult::default()),
            _ => {}
        }

        if args.inputs.is_empty() {
            let tx = Transaction {
                version: 1,
                inputs: vec![self.funding_input()],
                outputs: build_outputs(&args),
                lock_time: 0,
            };
            let txid = tx.txid();
            return Ok(CreateActionResult {
                txid: Some(txid),
                tx: Some(atomic_bytes(Beef::from_transaction(tx))?),
                signable_transaction: None,
            });
        }

        let input_beef = args
            .input_beef
            .as_deref()
            .ok_or_else(|| anyhow!("inputs given without inputBEEF"))?;
        let ancestry = Beef::from_bytes(input_beef)?;

        let mut inputs = Vec::new();
        for input in &args.inputs {
            let outpoint: Outpoint = input.outpoint.parse()?;
            let source_txid = txid_from_hex(&outpoint.txid)?;
            if ancestry.find_transaction(&source_txid).is_none() {
                bail!("inputBEEF does not contain {}", outpoint.txid);
            }
            inputs.push(TxInput {
                source_txid,
                source_output_index: outpoint.index,
                unlocking_script: Script::new(vec![]),
                sequence: u32::MAX,
            });
        }
        inputs.push(self.funding_input());

        let tx = Transaction {
            version: 1,
            inputs,
            outputs: build_outputs(&args),
            lock_time: 0,
        };

        let mut partial = ancestry.clone();
        partial.push_transaction(tx.clone());

        let reference = uuid::Uuid::now_v7().to_string();
        let signable = SignableTransaction {
            tx: atomic_bytes(partial)?,
            reference: reference.clone(),
        };
        self.state
            .lock()
            .unwrap()
            .pending
            .insert(reference, (ancestry, tx));

        Ok(CreateActionResult {
            txid: None,
            tx: None,
            signable_transaction: Some(signable),
        })
    }

    async fn sign_action(&self, args: SignActionArgs) -> Result<SignActionResult> {
        self.record("sign_action");
        if self.fault == WalletFault::RefuseSign {
            bail!("User rejected the signing request");
        }

        let (mut beef, mut tx) = self
            .state
            .lock()
            .unwrap()
            .pending
            .remove(&args.reference)
            .ok_or_else(|| anyhow!("unknown reference {}", args.reference))?;

        for (index, spend) in args.spends {
            let input = tx
                .inputs
                .get_mut(index as usize)
                .ok_or_else(|| anyhow!("no input {index}"))?;
            input.unlocking_script = spend.unlocking_script;
        }

        let txid = tx.txid();
        beef.push_transaction(tx);
        Ok(SignActionResult {
            txid: Some(txid),
            tx: Some(atomic_bytes(beef)?),
        })
    }
}

/// PushDrop codec with a fixed locking key and a canned signature
#[derive(Default)]
pub struct FixedKeyCodec {
    pub fail_unlock: bool,
}

struct FixedUnlocker {
    fail: bool,
    expected_script: Option<Script>,
}

#[async_trait]
impl Unlocker for FixedUnlocker {
    async fn sign(&self, tx: &Beef, input_index: usize) -> Result<Script> {
        if self.fail {
            bail!("key derivation failed");
        }
        let subject = tx.subject().ok_or_else(|| anyhow!("nothing to sign"))?;
        let input = subject
            .inputs
            .get(input_index)
            .ok_or_else(|| anyhow!("no input {input_index}"))?;
        let source = tx
            .find_transaction(&input.source_txid)
            .ok_or_else(|| anyhow!("source transaction missing from bundle"))?;
        let spent = &source.outputs[input.source_output_index as usize];
        if Some(&spent.locking_script) != self.expected_script.as_ref() {
            bail!("input {input_index} does not spend the expected token");
        }
        Ok(Script::new(FAKE_SIGNATURE.to_vec()))
    }
}

#[async_trait]
impl TokenCodec for FixedKeyCodec {
    async fn lock(
        &self,
        fields: Vec<Vec<u8>>,
        protocol_id: &ProtocolId,
        key_id: &str,
        counterparty: &Counterparty,
        for_self: bool,
    ) -> Result<Script> {
        if protocol_id != &ProtocolId::catalog() || key_id.is_empty() {
            bail!("unexpected protocol {protocol_id:?} / key {key_id}");
        }
        if counterparty != &Counterparty::Anyone || !for_self {
            bail!("catalog tokens are locked for self against anyone");
        }
        Ok(pushdrop::lock_script(&TOKEN_KEY, &fields))
    }

    fn unlock(&self, request: UnlockRequest) -> Box<dyn Unlocker> {
        Box::new(FixedUnlocker {
            fail: self.fail_unlock,
            expected_script: request.locking_script,
        })
    }
}

/// Broadcaster that admits into a [`Ledger`], or rejects everything
pub struct LedgerBroadcaster {
    ledger: Arc<Ledger>,
    reject: bool,
}

impl LedgerBroadcaster {
    pub fn new(ledger: Arc<Ledger>) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            reject: false,
        })
    }

    pub fn rejecting(ledger: Arc<Ledger>) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            reject: true,
        })
    }
}

#[async_trait]
impl Broadcaster for LedgerBroadcaster {
    async fn broadcast(&self, tx: &Beef) -> BroadcastResult {
        if self.reject {
            return BroadcastResult::failure(
                "ERR_NO_HOST_ACKNOWLEDGMENT",
                "Topics [\"tm_apps\"] were not acknowledged",
            );
        }
        match self.ledger.admit(tx) {
            Ok(txid) => BroadcastResult::success(txid, "Acknowledged by 1 overlay host(s)"),
            Err(e) => BroadcastResult::failure("ERR_INVALID", e.to_string()),
        }
    }
}

pub struct LedgerResolver {
    ledger: Arc<Ledger>,
}

#[async_trait]
impl LookupResolver for LedgerResolver {
    async fn query(&self, question: &LookupQuestion) -> Result<LookupAnswer> {
        if question.service != "ls_apps" {
            bail!("unknown lookup service {}", question.service);
        }
        Ok(LookupAnswer::OutputList {
            outputs: self.ledger.lookup(question)?,
        })
    }
}

/// A catalog wired entirely to the in-memory overlay
pub struct Harness {
    pub catalog: AppCatalog,
    pub wallet: Arc<MockWallet>,
    pub ledger: Arc<Ledger>,
}

pub fn harness() -> Harness {
    harness_with(MockWallet::new(), FixedKeyCodec::default(), false)
}

pub fn harness_with(wallet: Arc<MockWallet>, codec: FixedKeyCodec, reject: bool) -> Harness {
    init_test_logging();

    let ledger = Ledger::new();
    let broadcaster = if reject {
        LedgerBroadcaster::rejecting(Arc::clone(&ledger))
    } else {
        LedgerBroadcaster::new(Arc::clone(&ledger))
    };

    let catalog = AppCatalog::builder(Arc::new(codec))
        .config(CatalogConfig::default())
        .wallet(wallet.clone())
        .broadcaster(broadcaster)
        .resolver(Arc::new(LedgerResolver {
            ledger: Arc::clone(&ledger),
        }))
        .build()
        .unwrap();

    Harness {
        catalog,
        wallet,
        ledger,
    }
}

pub fn sample_metadata(name: &str, domain: &str) -> PublishedAppMetadata {
    PublishedAppMetadata {
        version: "1.0.0".to_string(),
        name: name.to_string(),
        description: format!("{name} on the overlay"),
        icon: format!("https://{domain}/icon.png"),
        domain: domain.to_string(),
        publisher: "not-my-key".to_string(),
        short_name: None,
        category: Some("tools".to_string()),
        tags: Some(vec!["utility".to_string()]),
        changelog: None,
        banner_image_url: None,
        screenshot_urls: None,
        release_date: "2024-01-15T12:00:00.000Z".to_string(),
    }
}
