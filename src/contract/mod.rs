use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ledger::{Address, Amount, FundingLedger, NATIVE_SCALE};
use crate::oracle::{to_reference_units, PriceFeed};

/// Minimum accepted contribution, in 18-decimal reference-currency units
/// (50 USD).
pub const MINIMUM_USD: Amount = 50 * NATIVE_SCALE;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FundMeError {
    #[error("contribution of {sent} converts to {converted} reference units, minimum is {minimum}")]
    InsufficientContribution {
        sent: Amount,
        converted: Amount,
        minimum: Amount,
    },
    #[error("caller {caller} is not the contract owner")]
    NotOwner { caller: Address },
    #[error("funder index {index} out of range, {len} recorded")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("fixed-point conversion overflow")]
    Overflow,
}

/// The FundMe contract: owner, injected price feed, contribution ledger,
/// and the native balance the instance holds.
///
/// Mutating operations follow checks-effects-interactions: every state
/// change commits before the host issues any value transfer, and the host
/// rolls a call back in full when the transfer step fails (see
/// [`crate::chain`]).
pub struct FundMe<F: PriceFeed> {
    owner: Address,
    price_feed: F,
    ledger: FundingLedger,
    balance: Amount,
}

/// Saved ledger-and-balance state used by the host to undo a call whose
/// transfer step failed.
pub struct Checkpoint {
    ledger: FundingLedger,
    balance: Amount,
}

impl<F: PriceFeed> FundMe<F> {
    /// Deploy a fresh instance. The deployer becomes the immutable owner;
    /// the price feed handle is fixed for the contract's lifetime.
    pub fn deploy(deployer: impl Into<Address>, price_feed: F) -> Self {
        Self {
            owner: deployer.into(),
            price_feed,
            ledger: FundingLedger::new(),
            balance: 0,
        }
    }

    /// Accept a payment if its reference-currency value meets the
    /// minimum. On success the sender's cumulative amount and the held
    /// balance both grow by `value` and the sender is appended to the
    /// funders sequence. On failure nothing changes and the host returns
    /// the payment to the sender.
    pub fn fund(&mut self, sender: &Address, value: Amount) -> Result<(), FundMeError> {
        let quote = self.price_feed.latest_quote();
        let converted = to_reference_units(value, &quote).ok_or(FundMeError::Overflow)?;
        if converted < MINIMUM_USD {
            return Err(FundMeError::InsufficientContribution {
                sent: value,
                converted,
                minimum: MINIMUM_USD,
            });
        }
        // reserve balance headroom before touching the ledger so a failed
        // call leaves no partial state
        let new_balance = self
            .balance
            .checked_add(value)
            .ok_or(FundMeError::Overflow)?;
        self.ledger
            .record(sender, value)
            .ok_or(FundMeError::Overflow)?;
        self.balance = new_balance;
        Ok(())
    }

    /// Owner-only: release the full balance and reset the ledger, walking
    /// the funders sequence entry by entry. Returns the amount the host
    /// must transfer to the caller as the call's final effect.
    pub fn withdraw(&mut self, caller: &Address) -> Result<Amount, FundMeError> {
        self.ensure_owner(caller)?;
        let mut index = 0;
        while let Some(funder) = self.ledger.funder_at(index).cloned() {
            self.ledger.clear_amount(&funder);
            index += 1;
        }
        self.ledger.clear_funders();
        let amount = self.balance;
        self.balance = 0;
        Ok(amount)
    }

    /// Same contract as [`FundMe::withdraw`], cheaper internally: both
    /// collections are cleared wholesale instead of one funder at a time.
    pub fn cheaper_withdraw(&mut self, caller: &Address) -> Result<Amount, FundMeError> {
        self.ensure_owner(caller)?;
        self.ledger.reset();
        let amount = self.balance;
        self.balance = 0;
        Ok(amount)
    }

    fn ensure_owner(&self, caller: &Address) -> Result<(), FundMeError> {
        if caller != &self.owner {
            return Err(FundMeError::NotOwner {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn price_feed(&self) -> &F {
        &self.price_feed
    }

    pub fn price_feed_mut(&mut self) -> &mut F {
        &mut self.price_feed
    }

    /// Cumulative amount `funder` has contributed; zero if never funded.
    pub fn amount_funded(&self, funder: &Address) -> Amount {
        self.ledger.amount_of(funder)
    }

    /// Funder address at `index` in first-contribution order.
    pub fn funder(&self, index: usize) -> Result<&Address, FundMeError> {
        self.ledger
            .funder_at(index)
            .ok_or(FundMeError::IndexOutOfRange {
                index,
                len: self.ledger.funder_count(),
            })
    }

    pub fn funder_count(&self) -> usize {
        self.ledger.funder_count()
    }

    /// Native balance currently held by the contract.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            ledger: self.ledger.clone(),
            balance: self.balance,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.ledger = checkpoint.ledger;
        self.balance = checkpoint.balance;
    }

    pub fn snapshot(&self) -> ContractSnapshot {
        let amounts: BTreeMap<Address, Amount> = self
            .ledger
            .entries()
            .map(|(addr, amount)| (addr.clone(), *amount))
            .collect();
        let funders = self.ledger.funders().to_vec();
        let state_digest = hex::encode(state_digest(
            &self.owner,
            self.balance,
            &amounts,
            &funders,
        ));
        ContractSnapshot {
            owner: self.owner.clone(),
            balance: self.balance,
            amounts,
            funders,
            state_digest,
        }
    }
}

/// Serializable view of the contract state with a digest over its fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub owner: Address,
    pub balance: Amount,
    pub amounts: BTreeMap<Address, Amount>,
    pub funders: Vec<Address>,
    pub state_digest: String,
}

fn state_digest(
    owner: &Address,
    balance: Amount,
    amounts: &BTreeMap<Address, Amount>,
    funders: &[Address],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"fundme-state-v1");
    hasher.update(owner.as_bytes());
    hasher.update(balance.to_le_bytes());
    for (funder, amount) in amounts {
        hasher.update(b"amt");
        hasher.update(funder.as_bytes());
        hasher.update(amount.to_le_bytes());
    }
    for funder in funders {
        hasher.update(b"seq");
        hasher.update(funder.as_bytes());
    }
    hasher.finalize().into()
}
