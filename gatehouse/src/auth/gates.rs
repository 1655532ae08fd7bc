//! Named authorization predicates ("gates").
//!
//! A gate maps a capability name to a pure predicate over [`Identity`].
//! The registry is populated once at boot and then shared read-only by
//! handle; nothing mutates it per-request.
//!
//! Evaluating a capability that was never defined is a programming error,
//! not a caller-input error, and panics loudly rather than denying silently:
//! a misconfigured application must be distinguishable from a legitimate
//! denial. Route wiring validates names up front with [`GateRegistry::require`]
//! so a dangling reference aborts startup instead of surfacing per-request.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{Identity, Role};

type GatePredicate = Box<dyn Fn(&Identity) -> bool + Send + Sync>;

/// Ordered mapping from capability name to predicate.
#[derive(Default)]
pub struct GateRegistry {
    gates: BTreeMap<String, GatePredicate>,
}

impl fmt::Debug for GateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateRegistry").field("names", &self.names().collect::<Vec<_>>()).finish()
    }
}

impl GateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate under `name`. Re-registering an existing name
    /// overwrites it (last write wins), mirroring boot-time configuration.
    pub fn define<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Identity) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        if self.gates.insert(name.clone(), Box::new(predicate)).is_some() {
            tracing::debug!(%name, "capability predicate redefined");
        }
    }

    /// Run the predicate registered under `name` against `identity`.
    ///
    /// # Panics
    ///
    /// Panics if `name` was never defined. Callers binding routes must check
    /// names with [`GateRegistry::require`] before any request is served.
    pub fn evaluate(&self, name: &str, identity: &Identity) -> bool {
        match self.gates.get(name) {
            Some(predicate) => predicate(identity),
            None => panic!("capability '{name}' has no registered predicate"),
        }
    }

    /// Boot-time check that `name` has a registered predicate.
    pub fn require(&self, name: &str) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.gates.contains_key(name),
            "capability '{name}' has no registered predicate; define it before binding routes"
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gates.keys().map(String::as_str)
    }

    /// Evaluate every registered gate against `identity`.
    ///
    /// Read-only convenience for the rendering layer; enforcement stays with
    /// the route-level admit call.
    pub fn evaluate_all(&self, identity: &Identity) -> BTreeMap<String, bool> {
        self.gates.iter().map(|(name, predicate)| (name.clone(), predicate(identity))).collect()
    }
}

/// The standard role-threshold gate: passes identities whose role is at
/// least `role`.
pub fn role_at_least(role: Role) -> impl Fn(&Identity) -> bool + Send + Sync + 'static {
    move |identity: &Identity| identity.role >= role
}
