use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Capability, role};

/// Destinations under `prefix` require `capability`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    /// Path prefix, matched on whole segments
    pub prefix: String,
    #[allow(missing_docs)]
    pub capability: Capability,
}

impl AccessRule {
    #[allow(missing_docs)]
    pub fn new(prefix: impl Into<String>, capability: Capability) -> Self {
        Self {
            prefix: prefix.into(),
            capability,
        }
    }
}

/// Configuration for [crate::RouteGuard]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Where unauthenticated navigations are sent
    pub sign_in_path: String,
    /// Search parameter carrying the originally requested path
    pub return_param: String,
    /// Paths reachable without a session. An entry ending in `/*` covers
    /// everything below it; any other entry must match exactly.
    pub public_paths: Vec<String>,
    /// Roles that may not use this application at all
    pub restricted_roles: Vec<String>,
    /// Shown on the sign-in page after a restricted role was turned away
    pub denial_notice: String,
    /// Search parameter carrying [GuardConfig::denial_notice]
    pub notice_param: String,
    /// Role designation → that role's home area
    pub landing: BTreeMap<String, String>,
    /// Capability requirements by destination
    pub rules: Vec<AccessRule>,
    /// Fallback for forbidden destinations when the role has no landing area
    pub forbidden_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            sign_in_path: "/sign-in".into(),
            return_param: "redirect".into(),
            public_paths: vec![
                "/sign-in".into(),
                "/sign-up".into(),
                "/forgot-password".into(),
                "/reset-password/*".into(),
            ],
            restricted_roles: vec![role::STUDENT.into()],
            denial_notice: "This account does not have access to this application.".into(),
            notice_param: "notice".into(),
            landing: BTreeMap::from([
                (role::ADMIN.into(), "/admin".into()),
                (role::FACULTY_MEMBER.into(), "/faculty".into()),
            ]),
            rules: vec![
                AccessRule::new("/users", Capability::ViewAllUsers),
                AccessRule::new("/students", Capability::ViewStudents),
                AccessRule::new("/modules", Capability::ViewModules),
                AccessRule::new("/analytics", Capability::ViewAnalytics),
            ],
            forbidden_path: "/forbidden".into(),
        }
    }
}

impl GuardConfig {
    /// Whether `path` may be visited without a session
    pub fn is_public(&self, path: &str) -> bool {
        let route = route_of(path);
        self.public_paths
            .iter()
            .any(|pattern| match pattern.strip_suffix("/*") {
                Some(prefix) => within(prefix, route),
                None => route_of(pattern) == route,
            })
    }

    /// Whether `role` is turned away from the application
    pub fn is_restricted(&self, role: &str) -> bool {
        self.restricted_roles.iter().any(|restricted| restricted == role)
    }

    /// The home area of `role`, if it has one
    pub fn landing_for(&self, role: &str) -> Option<&str> {
        self.landing.get(role).map(String::as_str)
    }

    /// The most specific rule covering `path`
    pub fn rule_for(&self, path: &str) -> Option<&AccessRule> {
        let route = route_of(path);
        self.rules
            .iter()
            .filter(|rule| within(&rule.prefix, route))
            .max_by_key(|rule| rule.prefix.len())
    }
}

/// `path` without query, fragment or trailing slash
pub(crate) fn route_of(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    match path[..end].trim_end_matches('/') {
        "" => "/",
        route => route,
    }
}

/// Whether `route` is `prefix` or lies below it
pub(crate) fn within(prefix: &str, route: &str) -> bool {
    let prefix = route_of(prefix);
    prefix == "/"
        || route == prefix
        || route
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
