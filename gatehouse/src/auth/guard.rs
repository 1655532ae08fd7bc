//! The request-time access decision.
//!
//! [`AccessGuard`] composes the session manager ("is there a valid session?")
//! with the gate registry ("does the identity pass the named capability?").
//! The two-stage check matters: authentication failure and authorization
//! failure are distinct outcomes with distinct remediation (re-authenticate
//! vs. request escalated privileges), and callers must route them
//! differently.
//!
//! Decisions are values, never exceptions. Calling code branches on
//! [`Decision`] exhaustively.

use std::sync::Arc;

use tracing::trace;

use crate::auth::gates::GateRegistry;
use crate::auth::session::SessionManager;
use crate::types::Identity;

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Valid session, required capability (if any) granted.
    Allow(Identity),
    /// No valid session. Remediation: sign in.
    DenyUnauthenticated,
    /// Valid session, insufficient capability. Remediation: escalate.
    DenyForbidden { capability: String },
}

/// Composes [`SessionManager`] and [`GateRegistry`] into the single decision
/// function the routing layer calls before every protected handler.
///
/// Receives its collaborators at construction; nothing here reaches into
/// ambient process state.
#[derive(Clone)]
pub struct AccessGuard {
    sessions: Arc<SessionManager>,
    gates: Arc<GateRegistry>,
}

impl AccessGuard {
    pub fn new(sessions: Arc<SessionManager>, gates: Arc<GateRegistry>) -> Self {
        Self { sessions, gates }
    }

    /// Decide whether the caller may proceed.
    ///
    /// 1. No token, or a token that does not resolve -> `DenyUnauthenticated`.
    /// 2. A required capability that evaluates false -> `DenyForbidden`.
    /// 3. Otherwise -> `Allow(identity)`.
    ///
    /// `required` names must have been validated against the registry at
    /// route-binding time; an unregistered name panics in evaluation.
    pub fn admit(&self, token: Option<&str>, required: Option<&str>) -> Decision {
        let Some(identity) = token.and_then(|t| self.sessions.resolve(t)) else {
            trace!("admit: no valid session");
            return Decision::DenyUnauthenticated;
        };

        if let Some(capability) = required {
            if !self.gates.evaluate(capability, &identity) {
                trace!(%capability, "admit: capability denied");
                return Decision::DenyForbidden {
                    capability: capability.to_string(),
                };
            }
        }

        Decision::Allow(identity)
    }

    /// Presentation-only query: the identity behind `token`, if any.
    pub fn identity(&self, token: Option<&str>) -> Option<Identity> {
        token.and_then(|t| self.sessions.resolve(t))
    }

    /// Presentation-only query: does `identity` pass `capability`?
    ///
    /// Same registry semantics as [`AccessGuard::admit`]: unregistered names
    /// panic.
    pub fn can(&self, identity: &Identity, capability: &str) -> bool {
        self.gates.evaluate(capability, identity)
    }
}
