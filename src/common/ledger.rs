//! In-memory balance ledger and the journal of ledger calls made by an operation

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::error;

use super::errors::LedgerError;
use super::traits::Ledger;
use super::types::{AccountId, Asset};

/// HashMap-backed ledger
///
/// Suitable for simulations and tests. Collateral for participants is
/// credited with [`InMemoryLedger::fund`]; everything else moves through the
/// [`Ledger`] trait.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<(Asset, AccountId), Decimal>,
    supplies: HashMap<Asset, Decimal>,
    pool: Decimal,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit collateral to an account from outside the market
    pub fn fund(&mut self, holder: &AccountId, amount: Decimal) {
        *self
            .balances
            .entry((Asset::Collateral, holder.clone()))
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Builder-style variant of [`InMemoryLedger::fund`]
    pub fn with_funds(mut self, holder: impl Into<AccountId>, amount: Decimal) -> Self {
        self.fund(&holder.into(), amount);
        self
    }

    /// All non-zero balances of an asset
    pub fn holders(&self, asset: Asset) -> Vec<(AccountId, Decimal)> {
        let mut holders: Vec<_> = self
            .balances
            .iter()
            .filter(|((a, _), amount)| *a == asset && !amount.is_zero())
            .map(|((_, holder), amount)| (holder.clone(), *amount))
            .collect();
        holders.sort();
        holders
    }

    fn credit(&mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        let balance = self
            .balances
            .entry((asset, holder.clone()))
            .or_insert(Decimal::ZERO);
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    fn debit(&mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        let available = self.balance_of(asset, holder);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                asset,
                holder: holder.clone(),
                required: amount,
                available,
            });
        }
        self.balances
            .insert((asset, holder.clone()), available - amount);
        Ok(())
    }
}

fn ensure_non_negative(amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::NegativeAmount(amount));
    }
    Ok(())
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, asset: Asset, holder: &AccountId) -> Decimal {
        self.balances
            .get(&(asset, holder.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn total_supply(&self, asset: Asset) -> Decimal {
        self.supplies.get(&asset).copied().unwrap_or(Decimal::ZERO)
    }

    fn pool_balance(&self) -> Decimal {
        self.pool
    }

    fn mint(&mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        ensure_non_negative(amount)?;
        let supply = self
            .total_supply(asset)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.credit(asset, holder, amount)?;
        self.supplies.insert(asset, supply);
        Ok(())
    }

    fn burn(&mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        ensure_non_negative(amount)?;
        self.debit(asset, holder, amount)?;
        let supply = self.total_supply(asset) - amount;
        self.supplies.insert(asset, supply);
        Ok(())
    }

    fn transfer_in(&mut self, from: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        ensure_non_negative(amount)?;
        let pool = self.pool.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.debit(Asset::Collateral, from, amount)?;
        self.pool = pool;
        Ok(())
    }

    fn transfer_out(&mut self, to: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        ensure_non_negative(amount)?;
        if self.pool < amount {
            return Err(LedgerError::InsufficientPoolBalance {
                required: amount,
                available: self.pool,
            });
        }
        self.credit(Asset::Collateral, to, amount)?;
        self.pool -= amount;
        Ok(())
    }
}

/// A single ledger call issued by a market operation
#[derive(Debug, Clone, PartialEq)]
enum LedgerOp {
    TransferIn { from: AccountId, amount: Decimal },
    TransferOut { to: AccountId, amount: Decimal },
    Mint { asset: Asset, holder: AccountId, amount: Decimal },
    Burn { asset: Asset, holder: AccountId, amount: Decimal },
}

impl LedgerOp {
    fn amount(&self) -> Decimal {
        match self {
            LedgerOp::TransferIn { amount, .. }
            | LedgerOp::TransferOut { amount, .. }
            | LedgerOp::Mint { amount, .. }
            | LedgerOp::Burn { amount, .. } => *amount,
        }
    }

    fn apply(&self, ledger: &mut dyn Ledger) -> Result<(), LedgerError> {
        match self {
            LedgerOp::TransferIn { from, amount } => ledger.transfer_in(from, *amount),
            LedgerOp::TransferOut { to, amount } => ledger.transfer_out(to, *amount),
            LedgerOp::Mint { asset, holder, amount } => ledger.mint(*asset, holder, *amount),
            LedgerOp::Burn { asset, holder, amount } => ledger.burn(*asset, holder, *amount),
        }
    }

    /// The call that undoes this one
    fn inverse(&self) -> LedgerOp {
        match self.clone() {
            LedgerOp::TransferIn { from, amount } => LedgerOp::TransferOut { to: from, amount },
            LedgerOp::TransferOut { to, amount } => LedgerOp::TransferIn { from: to, amount },
            LedgerOp::Mint { asset, holder, amount } => LedgerOp::Burn { asset, holder, amount },
            LedgerOp::Burn { asset, holder, amount } => LedgerOp::Mint { asset, holder, amount },
        }
    }
}

/// Ordered ledger calls that either all apply or are all reverted
#[derive(Debug, Clone, Default)]
pub struct LedgerBatch {
    ops: Vec<LedgerOp>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transfer_in(mut self, from: &AccountId, amount: Decimal) -> Self {
        self.ops.push(LedgerOp::TransferIn { from: from.clone(), amount });
        self
    }

    pub fn transfer_out(mut self, to: &AccountId, amount: Decimal) -> Self {
        self.ops.push(LedgerOp::TransferOut { to: to.clone(), amount });
        self
    }

    pub fn mint(mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Self {
        self.ops.push(LedgerOp::Mint { asset, holder: holder.clone(), amount });
        self
    }

    pub fn burn(mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Self {
        self.ops.push(LedgerOp::Burn { asset, holder: holder.clone(), amount });
        self
    }

    /// Append another batch's calls after this one's
    pub fn extend(mut self, other: LedgerBatch) -> Self {
        self.ops.extend(other.ops);
        self
    }

    /// Apply every call in order
    ///
    /// Zero-amount calls are skipped. If a call fails, the calls already
    /// applied are reverted in reverse order and the original error is
    /// returned.
    pub fn commit(self, ledger: &mut dyn Ledger) -> Result<(), LedgerError> {
        let mut applied: Vec<&LedgerOp> = Vec::with_capacity(self.ops.len());
        for op in self.ops.iter().filter(|op| !op.amount().is_zero()) {
            if let Err(e) = op.apply(ledger) {
                for done in applied.iter().rev() {
                    if let Err(revert_err) = done.inverse().apply(ledger) {
                        error!(?done, %revert_err, "Failed to revert ledger call");
                    }
                }
                return Err(e);
            }
            applied.push(op);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn alice() -> AccountId {
        AccountId::from("alice")
    }

    #[test]
    fn test_transfer_in_and_out() {
        let mut ledger = InMemoryLedger::new().with_funds("alice", dec!(10));
        ledger.transfer_in(&alice(), dec!(4)).unwrap();
        assert_eq!(ledger.pool_balance(), dec!(4));
        assert_eq!(ledger.balance_of(Asset::Collateral, &alice()), dec!(6));

        ledger.transfer_out(&alice(), dec!(1.5)).unwrap();
        assert_eq!(ledger.pool_balance(), dec!(2.5));
        assert_eq!(ledger.balance_of(Asset::Collateral, &alice()), dec!(7.5));
    }

    #[test]
    fn test_transfer_in_insufficient() {
        let mut ledger = InMemoryLedger::new().with_funds("alice", dec!(1));
        let err = ledger.transfer_in(&alice(), dec!(2)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.pool_balance(), Decimal::ZERO);
    }

    #[test]
    fn test_mint_burn_tracks_supply() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(Asset::Long(0), &alice(), dec!(3)).unwrap();
        assert_eq!(ledger.total_supply(Asset::Long(0)), dec!(3));
        ledger.burn(Asset::Long(0), &alice(), dec!(1)).unwrap();
        assert_eq!(ledger.total_supply(Asset::Long(0)), dec!(2));
        assert!(ledger.burn(Asset::Long(0), &alice(), dec!(5)).is_err());
        assert_eq!(ledger.holders(Asset::Long(0)), vec![(alice(), dec!(2))]);
    }

    #[test]
    fn test_batch_reverts_on_failure() {
        let mut ledger = InMemoryLedger::new().with_funds("alice", dec!(10));
        let batch = LedgerBatch::new()
            .transfer_in(&alice(), dec!(5))
            .mint(Asset::Short(1), &alice(), dec!(2))
            .burn(Asset::Long(0), &alice(), dec!(1));

        assert!(batch.commit(&mut ledger).is_err());
        assert_eq!(ledger.pool_balance(), Decimal::ZERO);
        assert_eq!(ledger.balance_of(Asset::Collateral, &alice()), dec!(10));
        assert_eq!(ledger.total_supply(Asset::Short(1)), Decimal::ZERO);
    }

    #[test]
    fn test_batch_skips_zero_amounts() {
        let mut ledger = InMemoryLedger::new();
        LedgerBatch::new()
            .transfer_out(&alice(), Decimal::ZERO)
            .commit(&mut ledger)
            .unwrap();
        assert_eq!(ledger.balance_of(Asset::Collateral, &alice()), Decimal::ZERO);
    }
}
