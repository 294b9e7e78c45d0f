//! # Access Control Gate
//!
//! Stateless role checks over an [`AuthorityRegistry`]. Every mutating
//! registry operation calls exactly one of these before touching the store.

use dlr_core::{Address, RegistryError, Role};

use crate::authority::AuthorityRegistry;

/// Borrowed view of the authority set that answers role checks.
#[derive(Debug, Clone, Copy)]
pub struct AccessControlGate<'a> {
    authorities: &'a AuthorityRegistry,
}

impl<'a> AccessControlGate<'a> {
    pub fn new(authorities: &'a AuthorityRegistry) -> Self {
        Self { authorities }
    }

    /// Whether `caller` holds `role`.
    pub fn has_role(&self, caller: &Address, role: Role) -> bool {
        match role {
            Role::Owner => *caller == self.authorities.owner(),
            Role::Authority => self.authorities.is_authority(caller),
        }
    }

    /// Fail with `NotAuthorized` unless `caller` holds `role`.
    pub fn require(&self, caller: &Address, role: Role) -> Result<(), RegistryError> {
        if self.has_role(caller, role) {
            Ok(())
        } else {
            Err(RegistryError::NotAuthorized {
                caller: *caller,
                required: role,
            })
        }
    }

    pub fn require_owner(&self, caller: &Address) -> Result<(), RegistryError> {
        self.require(caller, Role::Owner)
    }

    pub fn require_active_authority(&self, caller: &Address) -> Result<(), RegistryError> {
        self.require(caller, Role::Authority)
    }
}
