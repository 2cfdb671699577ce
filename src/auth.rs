//! Operator Authorization
//!
//! Advancing epochs and injecting yield are privileged. Who counts as an
//! operator is decided by an external collaborator (in the reference system,
//! the wallet-signature auth backend); the engine only asks.

use std::collections::HashSet;

use crate::types::Address;

/// Operator capability check
pub trait OperatorAuthority: Send + Sync {
    fn is_operator(&self, caller: &Address) -> bool;
}

/// Fixed operator allow-list, typically loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticOperators {
    operators: HashSet<Address>,
}

impl StaticOperators {
    pub fn new(operators: impl IntoIterator<Item = Address>) -> Self {
        Self {
            operators: operators.into_iter().collect(),
        }
    }
}

impl OperatorAuthority for StaticOperators {
    fn is_operator(&self, caller: &Address) -> bool {
        self.operators.contains(caller)
    }
}
