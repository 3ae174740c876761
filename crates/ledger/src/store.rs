//! Commitment store: per-asset map from commitment hash to owner.
//!
//! Entries move through `Active -> Locked -> removed`. Operations stage their
//! changes through a [`StoreTxn`]: inputs are locked rather than removed, and
//! the transaction is either committed (locked entries are removed) or rolled
//! back (locks released, staged creations discarded). Dropping an uncommitted
//! transaction rolls it back.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::LedgerError;
use crate::types::{Address, AssetId, CommitmentHash, Metadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentState {
    Active,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Commitment {
    pub owner: Address,
    pub metadata: Metadata,
    pub state: CommitmentState,
}

impl Commitment {
    pub fn is_active(&self) -> bool {
        self.state == CommitmentState::Active
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommitmentStore {
    assets: HashMap<AssetId, HashMap<CommitmentHash, Commitment>>,
}

impl CommitmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a commitment without changing it.
    pub fn peek(&self, asset: AssetId, hash: CommitmentHash) -> Option<&Commitment> {
        self.assets.get(&asset)?.get(&hash)
    }

    /// Owner of a live commitment. Locked entries still report their owner.
    pub fn owner_of(&self, asset: AssetId, hash: CommitmentHash) -> Option<Address> {
        self.peek(asset, hash).map(|c| c.owner)
    }

    /// Number of commitments held for an asset.
    pub fn len(&self, asset: AssetId) -> usize {
        self.assets.get(&asset).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, asset: AssetId) -> bool {
        self.len(asset) == 0
    }

    pub fn create(
        &mut self,
        asset: AssetId,
        hash: CommitmentHash,
        owner: Address,
        metadata: Metadata,
    ) -> Result<(), LedgerError> {
        let entries = self.assets.entry(asset).or_default();
        if entries.contains_key(&hash) {
            return Err(LedgerError::CommitmentAlreadyExists(hash));
        }
        entries.insert(
            hash,
            Commitment {
                owner,
                metadata,
                state: CommitmentState::Active,
            },
        );
        Ok(())
    }

    /// Move an active commitment to `Locked`, checking its owner when one is
    /// required.
    pub fn lock(
        &mut self,
        asset: AssetId,
        hash: CommitmentHash,
        required_owner: Option<Address>,
    ) -> Result<Commitment, LedgerError> {
        let entry = self
            .assets
            .get_mut(&asset)
            .and_then(|m| m.get_mut(&hash))
            .ok_or(LedgerError::CommitmentNotFound(hash))?;

        if let Some(owner) = required_owner {
            if entry.owner != owner {
                return Err(LedgerError::OwnerMismatch(hash));
            }
        }
        if !entry.is_active() {
            return Err(LedgerError::CommitmentLocked(hash));
        }

        entry.state = CommitmentState::Locked;
        Ok(*entry)
    }

    /// Release a lock taken by [`CommitmentStore::lock`].
    pub fn unlock(&mut self, asset: AssetId, hash: CommitmentHash) {
        if let Some(entry) = self.assets.get_mut(&asset).and_then(|m| m.get_mut(&hash)) {
            entry.state = CommitmentState::Active;
        }
    }

    /// Remove a locked commitment for good.
    pub fn finalize(&mut self, asset: AssetId, hash: CommitmentHash) -> Option<Commitment> {
        let entries = self.assets.get_mut(&asset)?;
        let removed = match entries.get(&hash) {
            Some(c) if c.state == CommitmentState::Locked => entries.remove(&hash),
            _ => None,
        };
        if entries.is_empty() {
            self.assets.remove(&asset);
        }
        removed
    }

    /// Remove an entry and release its owner. Exactly one consumer wins.
    pub fn consume(
        &mut self,
        asset: AssetId,
        hash: CommitmentHash,
        required_owner: Option<Address>,
    ) -> Result<Commitment, LedgerError> {
        self.lock(asset, hash, required_owner)?;
        self.finalize(asset, hash)
            .ok_or(LedgerError::CommitmentNotFound(hash))
    }

    fn discard(&mut self, asset: AssetId, hash: CommitmentHash) {
        if let Some(entries) = self.assets.get_mut(&asset) {
            entries.remove(&hash);
            if entries.is_empty() {
                self.assets.remove(&asset);
            }
        }
    }

    /// Start staging changes for one asset.
    pub fn begin(&mut self, asset: AssetId) -> StoreTxn<'_> {
        StoreTxn {
            store: self,
            asset,
            journal: Vec::new(),
            done: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Undo {
    Created(CommitmentHash),
    Locked(CommitmentHash),
}

/// Staged changes against one asset of a [`CommitmentStore`].
pub struct StoreTxn<'a> {
    store: &'a mut CommitmentStore,
    asset: AssetId,
    journal: Vec<Undo>,
    done: bool,
}

impl<'a> StoreTxn<'a> {
    pub fn create(
        &mut self,
        hash: CommitmentHash,
        owner: Address,
        metadata: Metadata,
    ) -> Result<(), LedgerError> {
        self.store.create(self.asset, hash, owner, metadata)?;
        self.journal.push(Undo::Created(hash));
        Ok(())
    }

    pub fn lock(
        &mut self,
        hash: CommitmentHash,
        required_owner: Option<Address>,
    ) -> Result<Commitment, LedgerError> {
        let commitment = self.store.lock(self.asset, hash, required_owner)?;
        self.journal.push(Undo::Locked(hash));
        Ok(commitment)
    }

    /// Remove every locked input. Returns them in lock order.
    pub fn commit(mut self) -> Vec<(CommitmentHash, Commitment)> {
        self.done = true;
        let asset = self.asset;
        let journal = std::mem::take(&mut self.journal);
        journal
            .into_iter()
            .filter_map(|undo| match undo {
                Undo::Locked(hash) => self.store.finalize(asset, hash).map(|c| (hash, c)),
                Undo::Created(_) => None,
            })
            .collect()
    }

    pub fn rollback(mut self) {
        self.undo();
    }

    fn undo(&mut self) {
        self.done = true;
        while let Some(entry) = self.journal.pop() {
            match entry {
                Undo::Created(hash) => self.store.discard(self.asset, hash),
                Undo::Locked(hash) => self.store.unlock(self.asset, hash),
            }
        }
    }
}

impl Drop for StoreTxn<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.undo();
        }
    }
}
