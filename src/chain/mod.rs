use std::collections::{BTreeMap, BTreeSet};

use crate::contract::{ContractSnapshot, FundMe, FundMeError};
use crate::ledger::{Address, Amount};
use crate::oracle::PriceFeed;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("insufficient funds in account {account}")]
    InsufficientAccountFunds { account: Address },
    #[error("value transfer to {to} rejected by recipient")]
    TransferRejected { to: Address },
    #[error("balance overflow in account {account}")]
    BalanceOverflow { account: Address },
    #[error(transparent)]
    Contract(#[from] FundMeError),
}

/// Single-contract execution environment.
///
/// Calls are applied one at a time and each is atomic: a failed call has
/// zero effect on the contract and on account balances. The contract
/// commits its state changes before the outgoing value transfer is
/// issued; when the recipient rejects the transfer the whole call is
/// rolled back from a checkpoint taken at entry.
pub struct Chain<F: PriceFeed> {
    contract: FundMe<F>,
    balances: BTreeMap<Address, Amount>,
    rejecting: BTreeSet<Address>,
}

impl<F: PriceFeed> Chain<F> {
    /// Deploy the contract; the deploying account becomes its owner.
    pub fn deploy(deployer: impl Into<Address>, price_feed: F) -> Self {
        Self {
            contract: FundMe::deploy(deployer, price_feed),
            balances: BTreeMap::new(),
            rejecting: BTreeSet::new(),
        }
    }

    /// Faucet: mint native units into an external account.
    pub fn credit(&mut self, account: &Address, amount: Amount) -> Result<(), ChainError> {
        let balance = self.balances.entry(account.clone()).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| ChainError::BalanceOverflow {
                account: account.clone(),
            })?;
        Ok(())
    }

    /// Mark an account as refusing incoming value transfers, standing in
    /// for a recipient contract without a receive path.
    pub fn mark_rejecting(&mut self, account: &Address) {
        self.rejecting.insert(account.clone());
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn contract(&self) -> &FundMe<F> {
        &self.contract
    }

    pub fn price_feed_mut(&mut self) -> &mut F {
        self.contract.price_feed_mut()
    }

    pub fn snapshot(&self) -> ContractSnapshot {
        self.contract.snapshot()
    }

    /// Call `fund` with an attached payment. The payment leaves the
    /// sender's account up front and returns in full if the contract
    /// rejects it.
    pub fn fund(&mut self, sender: &Address, value: Amount) -> Result<(), ChainError> {
        self.debit(sender, value)?;
        if let Err(err) = self.contract.fund(sender, value) {
            // restores exactly what the debit above removed; cannot overflow
            *self.balances.entry(sender.clone()).or_default() += value;
            return Err(err.into());
        }
        Ok(())
    }

    /// Plain value transfer to the contract; routed into `fund`, the way
    /// the contract's receive path forwards bare payments.
    pub fn send(&mut self, sender: &Address, value: Amount) -> Result<(), ChainError> {
        self.fund(sender, value)
    }

    /// Call `withdraw`. Returns the amount credited to the caller.
    pub fn withdraw(&mut self, caller: &Address) -> Result<Amount, ChainError> {
        self.settle(caller, FundMe::withdraw)
    }

    /// Call `cheaper_withdraw`. Returns the amount credited to the caller.
    pub fn cheaper_withdraw(&mut self, caller: &Address) -> Result<Amount, ChainError> {
        self.settle(caller, FundMe::cheaper_withdraw)
    }

    fn settle<Op>(&mut self, caller: &Address, op: Op) -> Result<Amount, ChainError>
    where
        Op: FnOnce(&mut FundMe<F>, &Address) -> Result<Amount, FundMeError>,
    {
        let checkpoint = self.contract.checkpoint();
        let amount = op(&mut self.contract, caller)?;
        // state is fully reset here; the transfer is the last effect
        if self.rejecting.contains(caller) {
            self.contract.restore(checkpoint);
            return Err(ChainError::TransferRejected { to: caller.clone() });
        }
        match self.balance_of(caller).checked_add(amount) {
            Some(total) => {
                self.balances.insert(caller.clone(), total);
                Ok(amount)
            }
            None => {
                self.contract.restore(checkpoint);
                Err(ChainError::BalanceOverflow {
                    account: caller.clone(),
                })
            }
        }
    }

    fn debit(&mut self, account: &Address, amount: Amount) -> Result<(), ChainError> {
        let balance = self.balances.entry(account.clone()).or_default();
        if *balance < amount {
            return Err(ChainError::InsufficientAccountFunds {
                account: account.clone(),
            });
        }
        *balance -= amount;
        Ok(())
    }
}
