//! Cloud Controller API version gating.
//!
//! Older Cloud Controllers only return user guids from the role association
//! endpoints, so usernames have to be resolved through UAA. From 2.21.0 the
//! username is part of the CC response and the UAA round trip is skipped.

use semver::Version;

/// First CC API version that returns usernames without a UAA lookup.
pub const USER_LOOKUP_WITHOUT_UAA_MIN_VERSION: Version = Version::new(2, 21, 0);

/// Which role lookup variant a command invocation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Resolve usernames through UAA.
    Legacy,
    /// Read usernames straight from the Cloud Controller.
    Direct,
}

impl DispatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Direct => "direct",
        }
    }
}

/// Decide the lookup variant for the reported API version.
///
/// Unparseable versions fall back to [`DispatchMode::Legacy`].
pub fn dispatch_mode(api_version: &str) -> DispatchMode {
    let Some(version) = parse_api_version(api_version) else {
        tracing::debug!(api_version, "unparseable api version, using legacy user lookup");
        return DispatchMode::Legacy;
    };
    if version >= USER_LOOKUP_WITHOUT_UAA_MIN_VERSION {
        DispatchMode::Direct
    } else {
        DispatchMode::Legacy
    }
}

/// Parse a dotted triplet such as `2.22.0` or `v2.22.0`.
pub fn parse_api_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }
    Version::parse(trimmed).ok()
}
