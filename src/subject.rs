//! User records and the immutable access subject built from them

use serde::{Deserialize, Serialize};

use crate::catalog::CapabilityCatalog;
use crate::constants::{ROLE_ADMIN, ROLE_USER, WILDCARD_PERMISSION};
use crate::metadata::{to_metadata, PermissionMetadata, TreePermissionMap};

/// Role of an authenticated user. Anything that is not `admin` is a plain user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Parse a role string: trimmed and lowercased before comparison
    pub fn parse(role: &str) -> Self {
        let r = role.trim().to_lowercase();
        if r == ROLE_ADMIN {
            Role::Admin
        } else {
            if r != ROLE_USER {
                tracing::debug!(role, "unknown role treated as user");
            }
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::User => ROLE_USER,
        }
    }
}

/// Where a subject's grants come from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Grants {
    #[default]
    None,
    /// Legacy `key -> bool` map; only the wildcard is interpreted
    Legacy(TreePermissionMap),
    /// Structured permission metadata
    Structured(PermissionMetadata),
}

/// Immutable per-session snapshot consulted by every access query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAccessSubject {
    role: Role,
    wildcard: bool,
    grants: Grants,
}

impl UserAccessSubject {
    /// Build a subject. A legacy map carrying `"*": true` sets the wildcard.
    pub fn new(role: Role, grants: Grants) -> Self {
        let wildcard = matches!(&grants, Grants::Legacy(map) if map.is_granted(WILDCARD_PERMISSION));
        UserAccessSubject { role, wildcard, grants }
    }

    pub fn admin() -> Self {
        Self::new(Role::Admin, Grants::None)
    }

    pub fn with_metadata(role: Role, metadata: PermissionMetadata) -> Self {
        Self::new(role, Grants::Structured(metadata))
    }

    /// Build from a wire record. Structured metadata wins over the legacy map,
    /// but a legacy wildcard is honoured either way.
    pub fn from_record(record: &UserRecord) -> Self {
        let role = Role::parse(&record.role);
        let wildcard = record
            .permissions
            .as_ref()
            .is_some_and(|p| p.is_granted(WILDCARD_PERMISSION));
        let grants = match (&record.permission_metadata, &record.permissions) {
            (Some(meta), _) => Grants::Structured(meta.clone()),
            (None, Some(legacy)) => Grants::Legacy(legacy.clone()),
            (None, None) => Grants::None,
        };
        UserAccessSubject { role, wildcard, grants }
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn grants(&self) -> &Grants {
        &self.grants
    }

    /// Admin role or legacy wildcard
    #[inline]
    pub fn has_override(&self) -> bool {
        self.role == Role::Admin || self.wildcard
    }

    /// Structured metadata, if that is where the grants live
    pub fn metadata(&self) -> Option<&PermissionMetadata> {
        match &self.grants {
            Grants::Structured(meta) => Some(meta),
            Grants::Legacy(_) | Grants::None => None,
        }
    }
}

impl From<&UserRecord> for UserAccessSubject {
    fn from(record: &UserRecord) -> Self {
        UserAccessSubject::from_record(record)
    }
}

/// User record as exchanged with the user-management service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<TreePermissionMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_metadata: Option<PermissionMetadata>,
}

impl UserRecord {
    /// Derive `permission_metadata` from a legacy-only record.
    /// Returns true when the record changed. The legacy map is kept as stored.
    pub fn upgrade_legacy(&mut self, catalog: &CapabilityCatalog) -> bool {
        if self.permission_metadata.is_some() {
            return false;
        }
        let Some(legacy) = &self.permissions else {
            return false;
        };
        let meta = to_metadata(legacy, catalog);
        tracing::debug!(factories = meta.factories.len(), "derived permission metadata from legacy map");
        self.permission_metadata = Some(meta);
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
