//! Token movement between accounts and the pool.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{Address, Amount, AssetId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("{holder} holds {available}, needs {required}")]
    InsufficientBalance {
        holder: Address,
        available: Amount,
        required: Amount,
    },

    #[error("balance of {0} would overflow")]
    Overflow(Address),
}

/// One movement relative to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// Pull from an account into the pool
    In { from: Address, amount: Amount },
    /// Pay from the pool to an account
    Out { to: Address, amount: Amount },
}

/// Transfers one operation performs, applied together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub asset: AssetId,
    pub legs: Vec<Leg>,
}

impl Settlement {
    pub fn new(asset: AssetId) -> Self {
        Self { asset, legs: Vec::new() }
    }

    /// Zero-amount legs are skipped.
    pub fn pull(&mut self, from: Address, amount: Amount) -> &mut Self {
        if amount > 0 {
            self.legs.push(Leg::In { from, amount });
        }
        self
    }

    pub fn pay(&mut self, to: Address, amount: Amount) -> &mut Self {
        if amount > 0 {
            self.legs.push(Leg::Out { to, amount });
        }
        self
    }
}

/// Token custody as seen by the ledger.
pub trait TokenBank {
    fn balance_of(&self, asset: AssetId, holder: Address) -> Amount;

    /// Apply every leg of `settlement` against `pool`, or none of them.
    fn settle(&mut self, pool: Address, settlement: &Settlement) -> Result<(), BankError>;
}

/// In-memory balances keyed by `(asset, holder)`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryBank {
    balances: HashMap<(AssetId, Address), Amount>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `holder` out of thin air.
    pub fn mint(&mut self, asset: AssetId, holder: Address, amount: Amount) -> Result<(), BankError> {
        let balance = self.balances.entry((asset, holder)).or_default();
        *balance = balance.checked_add(amount).ok_or(BankError::Overflow(holder))?;
        Ok(())
    }

    fn staged(&self, staged: &HashMap<Address, Amount>, asset: AssetId, holder: Address) -> Amount {
        staged
            .get(&holder)
            .copied()
            .unwrap_or_else(|| self.balance_of(asset, holder))
    }
}

impl TokenBank for MemoryBank {
    fn balance_of(&self, asset: AssetId, holder: Address) -> Amount {
        self.balances.get(&(asset, holder)).copied().unwrap_or(0)
    }

    fn settle(&mut self, pool: Address, settlement: &Settlement) -> Result<(), BankError> {
        let asset = settlement.asset;
        let mut staged: HashMap<Address, Amount> = HashMap::new();

        for leg in &settlement.legs {
            let (from, to, amount) = match *leg {
                Leg::In { from, amount } => (from, pool, amount),
                Leg::Out { to, amount } => (pool, to, amount),
            };

            let available = self.staged(&staged, asset, from);
            let debited = available
                .checked_sub(amount)
                .ok_or(BankError::InsufficientBalance {
                    holder: from,
                    available,
                    required: amount,
                })?;
            staged.insert(from, debited);

            let credited = self
                .staged(&staged, asset, to)
                .checked_add(amount)
                .ok_or(BankError::Overflow(to))?;
            staged.insert(to, credited);
        }

        for (holder, balance) in staged {
            self.balances.insert((asset, holder), balance);
        }
        Ok(())
    }
}
