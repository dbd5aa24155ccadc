use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type Address = String;
pub type Amount = u128;

/// Native units per whole coin (18 decimals).
pub const NATIVE_SCALE: Amount = 1_000_000_000_000_000_000;

/// Contribution accounting for a single contract instance.
///
/// Tracks the cumulative amount contributed per address alongside the
/// funders sequence in first-call order. The sequence is appended on
/// every successful contribution, so repeat funders appear more than
/// once; the mapping key stays unique and accumulates.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FundingLedger {
    amounts: BTreeMap<Address, Amount>,
    funders: Vec<Address>,
}

impl FundingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful contribution: accumulate the mapped amount and
    /// append the funder to the sequence. Returns the funder's new
    /// cumulative total, or `None` when the accumulation would overflow,
    /// in which case nothing is recorded.
    pub fn record(&mut self, funder: &Address, amount: Amount) -> Option<Amount> {
        let entry = self.amounts.entry(funder.clone()).or_default();
        let total = entry.checked_add(amount)?;
        *entry = total;
        self.funders.push(funder.clone());
        Some(total)
    }

    /// Cumulative amount contributed by `funder`; zero if never seen.
    pub fn amount_of(&self, funder: &Address) -> Amount {
        self.amounts.get(funder).copied().unwrap_or(0)
    }

    pub fn funder_at(&self, index: usize) -> Option<&Address> {
        self.funders.get(index)
    }

    pub fn funders(&self) -> &[Address] {
        &self.funders
    }

    pub fn funder_count(&self) -> usize {
        self.funders.len()
    }

    /// Sum of every recorded contribution. Between calls this equals the
    /// contract's held balance.
    pub fn total_recorded(&self) -> Amount {
        self.amounts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty() && self.funders.is_empty()
    }

    /// Drop a single funder's mapping entry; the recorded amount reads as
    /// zero afterwards. Leaves the funders sequence untouched.
    pub fn clear_amount(&mut self, funder: &Address) {
        self.amounts.remove(funder);
    }

    pub fn clear_funders(&mut self) {
        self.funders.clear();
    }

    /// Clear both collections wholesale. One pass, no per-funder lookups.
    pub fn reset(&mut self) {
        self.amounts.clear();
        self.funders.clear();
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.amounts.iter()
    }
}
