//! App catalog client library exports
//!
//! Publish, update, remove and discover app listings held as PushDrop
//! tokens on the `tm_apps` overlay topic.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod listing;
pub mod metadata;
pub mod overlay;
pub mod pushdrop;
pub mod query;
pub mod script;
pub mod transaction;
pub mod wallet;

pub use catalog::{AppCatalog, AppCatalogBuilder, FindReport, PublishOptions};
pub use codec::{Counterparty, ProtocolId, TokenCodec, UnlockRequest, Unlocker};
pub use config::{CatalogConfig, Network};
pub use error::{CatalogError, Result};
pub use listing::{AppToken, PublishedApp};
pub use metadata::PublishedAppMetadata;
pub use overlay::{BroadcastResult, Broadcaster, LookupResolver};
pub use query::{AppCatalogQuery, FindOptions, SortOrder};
pub use wallet::Wallet;
