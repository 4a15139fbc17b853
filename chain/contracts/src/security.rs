//! Shared security primitives for contract modules
//!
//! Role checks used by the strategy (management, keepers), the single-address
//! governance authority used by the locked vault, and the shutdown switch.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::ids::AccountId;

/// Strategy roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Parameter changes, shutdown, buffer migration
    Management,
    /// Allowed to trigger settlement
    Keeper,
}

/// Role-based access control manager.
///
/// Exactly one management account exists at a time. Management implicitly
/// passes keeper checks.
#[derive(Debug, Clone)]
pub struct AccessControl {
    roles: HashMap<AccountId, Role>,
    management: AccountId,
}

impl AccessControl {
    /// Create access control with an initial management account.
    pub fn new(management: AccountId) -> Self {
        let mut roles = HashMap::new();
        roles.insert(management, Role::Management);
        Self { roles, management }
    }

    /// Check if a caller has the specified role.
    pub fn has_role(&self, caller: &AccountId, role: Role) -> bool {
        self.roles.get(caller).map_or(false, |r| *r == role)
    }

    pub fn is_management(&self, caller: &AccountId) -> bool {
        self.has_role(caller, Role::Management)
    }

    /// Keepers and management may report.
    pub fn is_keeper(&self, caller: &AccountId) -> bool {
        self.has_role(caller, Role::Keeper) || self.is_management(caller)
    }

    /// Grant the keeper role. Only management can grant.
    pub fn grant_keeper(&mut self, caller: &AccountId, target: AccountId) -> bool {
        if !self.is_management(caller) || target == self.management {
            return false;
        }
        self.roles.insert(target, Role::Keeper);
        true
    }

    /// Remove a keeper. Management itself cannot be revoked this way.
    pub fn revoke_keeper(&mut self, caller: &AccountId, target: &AccountId) -> bool {
        if !self.is_management(caller) || *target == self.management {
            return false;
        }
        self.roles.remove(target);
        true
    }

    /// Hand management to a new account.
    pub fn transfer_management(&mut self, caller: &AccountId, new_management: AccountId) -> bool {
        if !self.is_management(caller) {
            return false;
        }
        self.roles.remove(caller);
        self.roles.insert(new_management, Role::Management);
        self.management = new_management;
        true
    }

    pub fn management(&self) -> &AccountId {
        &self.management
    }
}

/// Single-address governance role, separate from strategy management.
///
/// Authorization is plain equality against the stored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceAuthority {
    account: AccountId,
}

impl GovernanceAuthority {
    pub fn new(account: AccountId) -> Self {
        Self { account }
    }

    pub fn is_governance(&self, caller: &AccountId) -> bool {
        self.account == *caller
    }

    /// Hand the role over. Returns `false` if the caller is not governance.
    pub fn transfer(&mut self, caller: &AccountId, new_account: AccountId) -> bool {
        if !self.is_governance(caller) {
            return false;
        }
        self.account = new_account;
        true
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }
}

/// One-way shutdown switch.
///
/// Once shut down, value-adding operations must be rejected; withdrawals
/// and settlement keep working.
#[derive(Debug, Clone, Default)]
pub struct ShutdownGuard {
    shutdown: bool,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self { shutdown: false }
    }

    pub fn shutdown(&mut self) {
        self.shutdown = true;
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }
}
