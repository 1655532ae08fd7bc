//! Common type definitions for identities and roles.
//!
//! This module defines:
//! - [`UserId`]: the stable identifier for a principal
//! - [`Role`]: the enumerated role attribute carried by every identity
//! - [`Identity`]: an authenticated principal as seen by the rest of the crate
//!
//! # Roles
//!
//! Roles form a total order (`Standard < Privileged`) so that capability
//! predicates can be expressed as thresholds rather than bare equality
//! checks. A gate that requires `Privileged` automatically admits any role
//! that may be added above it later, while equality gates remain expressible
//! as ordinary predicates.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stable, unique identifier for a user record.
pub type UserId = Uuid;

/// Role attribute attached to every identity.
///
/// Ordering matters: variants are declared from least to most privileged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Standard,
    Privileged,
}

/// An authenticated principal.
///
/// Identities are produced by the external user store and are read-only to
/// this crate: nothing here ever mutates one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Identity {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    /// Login identifier (email address or username).
    pub identifier: String,
    pub display_name: Option<String>,
    pub role: Role,
}

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::Standard < Role::Privileged);
        assert!(Role::Privileged >= Role::Privileged);
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Privileged).unwrap(), "\"privileged\"");
        let role: Role = serde_json::from_str("\"standard\"").unwrap();
        assert_eq!(role, Role::Standard);
    }

    #[test]
    fn test_abbrev_uuid() {
        let uuid: Uuid = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(abbrev_uuid(&uuid), "550e8400");
    }
}
