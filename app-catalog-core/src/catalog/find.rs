//! Catalog search

use tracing::{debug, warn};

use super::AppCatalog;
use crate::error::{CatalogError, Result};
use crate::listing::{AppToken, PublishedApp};
use crate::metadata::PublishedAppMetadata;
use crate::overlay::{LookupAnswer, LookupOutput, LookupQuestion};
use crate::query::{AppCatalogQuery, FindOptions, LookupQuery};
use crate::transaction::Beef;

/// Listings found by a query plus how many outputs were passed over
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindReport {
    pub apps: Vec<PublishedApp>,

    /// Outputs that did not decode; only non-zero with `skip_malformed`
    pub skipped: usize,
}

impl AppCatalog {
    /// Find listings matching `query`, in the order the service returns them
    ///
    /// A malformed output fails the whole call with [`CatalogError::Parse`]
    /// unless `options.skip_malformed` is set.
    pub async fn find_apps(
        &self,
        query: &AppCatalogQuery,
        options: FindOptions,
    ) -> Result<Vec<PublishedApp>> {
        Ok(self.find_apps_with_report(query, options).await?.apps)
    }

    /// Like [`find_apps`](Self::find_apps), also reporting skipped outputs
    pub async fn find_apps_with_report(
        &self,
        query: &AppCatalogQuery,
        options: FindOptions,
    ) -> Result<FindReport> {
        let question = LookupQuestion {
            service: self.config.service.clone(),
            query: serde_json::to_value(LookupQuery::from(query))?,
        };

        let resolver = self.resolver().await?;
        let answer = resolver
            .query(&question)
            .await
            .map_err(CatalogError::Lookup)?;

        let outputs = match answer {
            LookupAnswer::OutputList { outputs } => outputs,
            LookupAnswer::Freeform { .. } => {
                debug!("{} answered with a freeform result", question.service);
                return Ok(FindReport::default());
            }
        };

        let mut report = FindReport::default();
        for output in &outputs {
            match self.read_listing(output, options.include_beef) {
                Ok(app) => report.apps.push(app),
                Err(e) if options.skip_malformed => {
                    warn!("Skipping listing at output {}: {}", output.output_index, e);
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "Found {} listing(s) on {} ({} skipped)",
            report.apps.len(),
            question.service,
            report.skipped
        );
        Ok(report)
    }

    fn read_listing(&self, output: &LookupOutput, include_beef: bool) -> Result<PublishedApp> {
        let beef = Beef::from_bytes(&output.beef)
            .map_err(|e| CatalogError::Parse(format!("unreadable BEEF: {e}")))?;
        let tx = beef
            .subject()
            .ok_or_else(|| CatalogError::Parse("BEEF holds no transaction".to_string()))?;
        let txid = tx.txid();

        let tx_output = tx
            .outputs
            .get(output.output_index as usize)
            .ok_or_else(|| {
                CatalogError::Parse(format!(
                    "{txid} has no output {}",
                    output.output_index
                ))
            })?;

        let token = self
            .codec
            .decode(&tx_output.locking_script)
            .map_err(|e| CatalogError::Parse(format!("{txid}.{}: {e}", output.output_index)))?;
        let payload = token.fields.first().ok_or_else(|| {
            CatalogError::Parse(format!("{txid}.{} carries no fields", output.output_index))
        })?;
        let metadata = PublishedAppMetadata::from_payload(payload)?;

        Ok(PublishedApp {
            metadata,
            token: AppToken {
                txid,
                output_index: output.output_index,
                locking_script: tx_output.locking_script.clone(),
                satoshis: tx_output.satoshis,
                beef: include_beef.then(|| output.beef.clone()),
            },
        })
    }
}
