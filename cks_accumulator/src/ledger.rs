//! Read access to published registry definitions and accumulator history, and an in-memory
//! ledger implementing it.
//!
//! A ledger stores, per registry, the chain of deltas in publication order together with the
//! timestamp of each. Deltas between two timestamps are served merged.

use crate::{
    error::RevocationError,
    registry::{RevocationRegistry, RevocationRegistryDefinition, RevocationRegistryDelta},
};
use ark_ec::pairing::Pairing;
use ark_std::{collections::BTreeMap, vec::Vec};
use log::debug;
use parking_lot::RwLock;

pub trait LedgerReader<E: Pairing> {
    fn get_revoc_reg_def(&self, id: &str) -> Result<RevocationRegistryDefinition<E>, RevocationError>;

    /// Registry as of the latest entry at or before `timestamp`, with that entry's timestamp
    fn get_revoc_reg(
        &self,
        id: &str,
        timestamp: u64,
    ) -> Result<(RevocationRegistry<E>, u64), RevocationError>;

    /// Merged delta from the registry as of `from` (registry creation if `None`) to the registry
    /// as of `to`, with the timestamp of the state it leads to
    fn get_revoc_reg_delta(
        &self,
        id: &str,
        from: Option<u64>,
        to: u64,
    ) -> Result<(RevocationRegistryDelta<E>, u64), RevocationError>;
}

struct Entries<E: Pairing> {
    definitions: BTreeMap<String, RevocationRegistryDefinition<E>>,
    deltas: BTreeMap<String, Vec<(u64, RevocationRegistryDelta<E>)>>,
}

pub struct InMemoryLedger<E: Pairing> {
    entries: RwLock<Entries<E>>,
}

impl<E: Pairing> Default for InMemoryLedger<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Pairing> InMemoryLedger<E> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries {
                definitions: BTreeMap::new(),
                deltas: BTreeMap::new(),
            }),
        }
    }

    pub fn publish_definition(&self, definition: RevocationRegistryDefinition<E>) {
        debug!("Publishing revocation registry definition {}", definition.id);
        self.entries
            .write()
            .definitions
            .insert(definition.id.clone(), definition);
    }

    /// Append a delta. The first delta of a registry must start at creation and each later one
    /// must chain onto the previous and have a later timestamp.
    pub fn publish_delta(
        &self,
        id: &str,
        timestamp: u64,
        delta: RevocationRegistryDelta<E>,
    ) -> Result<(), RevocationError> {
        let mut entries = self.entries.write();
        if !entries.definitions.contains_key(id) {
            return Err(RevocationError::LedgerEntryNotFound(id.to_string()));
        }
        let chain = entries.deltas.entry(id.to_string()).or_default();
        match chain.last() {
            None if delta.prev_accum.is_some() => return Err(RevocationError::DeltaChainMismatch),
            Some((last_ts, last)) => {
                if timestamp <= *last_ts {
                    return Err(RevocationError::NonIncreasingTimestamp {
                        last: *last_ts,
                        timestamp,
                    });
                }
                if delta.prev_accum != Some(last.accum) {
                    return Err(RevocationError::DeltaChainMismatch);
                }
            }
            None => (),
        }
        debug!("Publishing delta of {} at {}", id, timestamp);
        chain.push((timestamp, delta));
        Ok(())
    }
}

fn not_found(id: &str, timestamp: u64) -> RevocationError {
    RevocationError::LedgerEntryNotFound(format!("{}@{}", id, timestamp))
}

/// Position of the latest entry at or before `timestamp`
fn position_at<T>(chain: &[(u64, T)], timestamp: u64) -> Option<usize> {
    chain.iter().rposition(|(ts, _)| *ts <= timestamp)
}

impl<E: Pairing> LedgerReader<E> for InMemoryLedger<E> {
    fn get_revoc_reg_def(&self, id: &str) -> Result<RevocationRegistryDefinition<E>, RevocationError> {
        self.entries
            .read()
            .definitions
            .get(id)
            .cloned()
            .ok_or_else(|| RevocationError::LedgerEntryNotFound(id.to_string()))
    }

    fn get_revoc_reg(
        &self,
        id: &str,
        timestamp: u64,
    ) -> Result<(RevocationRegistry<E>, u64), RevocationError> {
        let entries = self.entries.read();
        let chain = entries
            .deltas
            .get(id)
            .ok_or_else(|| RevocationError::LedgerEntryNotFound(id.to_string()))?;
        let pos = position_at(chain, timestamp).ok_or_else(|| not_found(id, timestamp))?;
        let (ts, delta) = &chain[pos];
        Ok((delta.registry(), *ts))
    }

    fn get_revoc_reg_delta(
        &self,
        id: &str,
        from: Option<u64>,
        to: u64,
    ) -> Result<(RevocationRegistryDelta<E>, u64), RevocationError> {
        let entries = self.entries.read();
        let chain = entries
            .deltas
            .get(id)
            .ok_or_else(|| RevocationError::LedgerEntryNotFound(id.to_string()))?;
        let end = position_at(chain, to).ok_or_else(|| not_found(id, to))?;
        let start = match from {
            None => 0,
            Some(from) => {
                let pos = position_at(chain, from).ok_or_else(|| not_found(id, from))?;
                if pos >= end {
                    let (ts, delta) = &chain[pos];
                    return Ok((RevocationRegistryDelta::unchanged(delta.accum), *ts));
                }
                pos + 1
            }
        };
        let merged = chain[start + 1..=end]
            .iter()
            .try_fold(chain[start].1.clone(), |acc, (_, d)| acc.merge(d))?;
        Ok((merged, chain[end].0))
    }
}
