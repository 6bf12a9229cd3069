//! Node configuration
//!
//! Turns the shared [`ScribeConfig`] into the settings the ledger runs with.

use anyhow::{Result, bail};

use crate::ledger::{DisclosurePolicy, LedgerConfig};
use scribe_config::ScribeConfig;
use scribe_paper::Principal;

/// Build the ledger settings. The owner may be a label or a 64-char hex principal.
pub fn ledger_config(config: &ScribeConfig) -> Result<LedgerConfig> {
    let owner = config.ledger.owner.trim();
    if owner.is_empty() {
        bail!("ledger owner must not be empty");
    }
    let owner = Principal::resolve(owner);

    Ok(LedgerConfig {
        owner,
        event_capacity: config.ledger.event_capacity,
        disclosure: disclosure_policy(config),
    })
}

pub fn disclosure_policy(config: &ScribeConfig) -> DisclosurePolicy {
    DisclosurePolicy {
        final_score: config.disclosure.final_score.into(),
        share_total: config.disclosure.share_total.into(),
    }
}
