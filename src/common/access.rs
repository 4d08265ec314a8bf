//! Owner lookup and the per-call access context

use serde::{Deserialize, Serialize};

use super::traits::AccessControl;
use super::types::AccountId;

/// Caller identity resolved once per operation
///
/// Built by [`crate::Market::context`] and passed explicitly into every
/// state-changing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub caller: AccountId,
    pub is_owner: bool,
}

impl AccessContext {
    pub fn new(caller: AccountId, access: &dyn AccessControl) -> Self {
        let is_owner = access.is_owner(&caller);
        Self { caller, is_owner }
    }
}

/// Access control with exactly one owner account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleOwner {
    owner: AccountId,
}

impl SingleOwner {
    pub fn new(owner: impl Into<AccountId>) -> Self {
        Self {
            owner: owner.into(),
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }
}

impl AccessControl for SingleOwner {
    fn is_owner(&self, account: &AccountId) -> bool {
        &self.owner == account
    }
}
