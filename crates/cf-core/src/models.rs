//! Role and target models shared by the command surface and the repositories.

use std::fmt;

use serde::Deserialize;

/// A named permission grant held by a user within an org or space.
///
/// Declaration order is display order: org roles come before space roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoleKind {
    OrgManager,
    BillingManager,
    OrgAuditor,
    SpaceManager,
    SpaceDeveloper,
    SpaceAuditor,
}

/// Org-scoped roles, in lookup order.
pub const ORG_ROLES: [RoleKind; 3] = [
    RoleKind::OrgManager,
    RoleKind::BillingManager,
    RoleKind::OrgAuditor,
];

/// Space-scoped roles, in lookup order.
pub const SPACE_ROLES: [RoleKind; 3] = [
    RoleKind::SpaceManager,
    RoleKind::SpaceDeveloper,
    RoleKind::SpaceAuditor,
];

impl RoleKind {
    /// Human-readable label printed in the Role column.
    pub fn label(self) -> &'static str {
        match self {
            Self::OrgManager => "ORG MANAGER",
            Self::BillingManager => "BILLING MANAGER",
            Self::OrgAuditor => "ORG AUDITOR",
            Self::SpaceManager => "SPACE MANAGER",
            Self::SpaceDeveloper => "SPACE DEVELOPER",
            Self::SpaceAuditor => "SPACE AUDITOR",
        }
    }

    /// Path segment of the Cloud Controller v2 association endpoint, relative
    /// to `/v2/organizations/{guid}` or `/v2/spaces/{guid}`.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::OrgManager | Self::SpaceManager => "managers",
            Self::BillingManager => "billing_managers",
            Self::OrgAuditor | Self::SpaceAuditor => "auditors",
            Self::SpaceDeveloper => "developers",
        }
    }

    pub fn is_org_role(self) -> bool {
        ORG_ROLES.contains(&self)
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity record returned by the role repositories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserFields {
    pub username: String,
    pub guid: String,
}

impl UserFields {
    pub fn new(username: &str, guid: &str) -> Self {
        Self {
            username: username.to_string(),
            guid: guid.to_string(),
        }
    }
}

/// Currently targeted organization. A target needs both a name and a guid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OrganizationFields {
    pub name: String,
    pub guid: String,
}

impl OrganizationFields {
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() || self.guid.trim().is_empty()
    }
}

/// Currently targeted space.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpaceFields {
    pub name: String,
    pub guid: String,
}

impl SpaceFields {
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() || self.guid.trim().is_empty()
    }
}
