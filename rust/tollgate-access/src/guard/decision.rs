use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tollgate_session::Session;

use super::config::{route_of, within};
use crate::{Capability, GuardConfig, PermissionTable, Permissions};

/// A navigation instruction for the routing framework
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// Destination path
    pub to: String,
    /// Search parameters to attach to the destination
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub search: BTreeMap<String, String>,
}

impl Redirect {
    #[allow(missing_docs)]
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            search: BTreeMap::new(),
        }
    }

    /// Adds a search parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.search.insert(key.into(), value.into());
        self
    }

    /// The destination with its search parameters encoded, e.g.
    /// `/sign-in?redirect=%2Fmodules`
    pub fn href(&self) -> String {
        if self.search.is_empty() {
            return self.to.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.search)
            .finish();
        format!("{}?{}", self.to, query)
    }
}

/// Outcome of guarding one navigation.
///
/// Every navigation starts out checking and ends in exactly one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Render the requested destination
    Proceed,
    /// No usable session; the redirect carries the requested path so that
    /// sign-in can return there
    SignIn(Redirect),
    /// Authenticated, but sent to the role's home area instead
    Landing(Redirect),
    /// Authenticated, but not allowed at the destination. When the role is
    /// restricted the session has been ended and the redirect leads to
    /// sign-in with a notice.
    Forbidden(Redirect),
}

impl Decision {
    /// Where to go instead, unless the navigation proceeds
    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            Decision::Proceed => None,
            Decision::SignIn(redirect)
            | Decision::Landing(redirect)
            | Decision::Forbidden(redirect) => Some(redirect),
        }
    }

    #[allow(missing_docs)]
    pub fn into_redirect(self) -> Option<Redirect> {
        match self {
            Decision::Proceed => None,
            Decision::SignIn(redirect)
            | Decision::Landing(redirect)
            | Decision::Forbidden(redirect) => Some(redirect),
        }
    }

    #[allow(missing_docs)]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Decision::Proceed)
    }
}

/// What [evaluate] concluded from a session snapshot alone
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Check {
    /// Render the destination
    Proceed,
    /// No access token or no subject
    SignIn,
    /// The subject's role is unknown and must be fetched before deciding
    ResolveRole {
        /// Whose profile to fetch
        subject_id: String,
        /// Session generation the fetch is made against
        generation: u64,
    },
    /// The role may not use the application
    Restricted {
        #[allow(missing_docs)]
        role: String,
    },
    /// Send the subject to their home area
    Landing {
        #[allow(missing_docs)]
        to: String,
    },
    /// The destination requires a capability the role lacks
    Forbidden {
        /// The missing capability
        capability: Capability,
        /// Where to send the subject instead
        to: String,
    },
}

/// Decides a navigation to `path` from `session` without side effects.
///
/// With `resolve_role` unset, an unresolved role is evaluated as having no
/// capabilities instead of asking for a profile fetch.
pub fn evaluate(
    path: &str,
    session: &Session,
    config: &GuardConfig,
    table: &PermissionTable,
    resolve_role: bool,
) -> Check {
    if config.is_public(path) {
        return Check::Proceed;
    }

    let Some(subject_id) = session.subject_id().filter(|_| session.has_access_token()) else {
        return Check::SignIn;
    };

    let role = session.role_designation();
    if role.is_none() && resolve_role {
        return Check::ResolveRole {
            subject_id: subject_id.to_owned(),
            generation: session.generation,
        };
    }

    if let Some(role) = role.filter(|role| config.is_restricted(role)) {
        return Check::Restricted {
            role: role.to_owned(),
        };
    }

    let route = route_of(path);
    let landing = role.and_then(|role| config.landing_for(role));

    if route == "/" {
        if let Some(to) = landing.filter(|to| route_of(to) != "/") {
            return Check::Landing { to: to.to_owned() };
        }
    }

    if let Some(rule) = config.rule_for(path) {
        if !Permissions::new(role, table).has(rule.capability) {
            let to = landing
                .filter(|to| !within(to, route))
                .unwrap_or(config.forbidden_path.as_str());
            return Check::Forbidden {
                capability: rule.capability,
                to: to.to_owned(),
            };
        }
    }

    Check::Proceed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tollgate_session::Identity;

    fn session(role: Option<&str>) -> Session {
        let identity = match role {
            Some(role) => Identity::new("u1").with_role(role),
            None => Identity::new("u1"),
        };
        Session {
            identity: Some(identity),
            access_token: "t1".into(),
            generation: 3,
        }
    }

    fn check(path: &str, session: &Session) -> Check {
        evaluate(
            path,
            session,
            &GuardConfig::default(),
            &PermissionTable::default(),
            true,
        )
    }

    #[test]
    fn it_requires_both_token_and_subject() {
        let mut tokenless = session(Some("admin"));
        tokenless.access_token.clear();
        let anonymous = Session {
            access_token: "t1".into(),
            ..Default::default()
        };

        assert_eq!(check("/modules", &tokenless), Check::SignIn);
        assert_eq!(check("/modules", &anonymous), Check::SignIn);
        assert_eq!(check("/sign-in", &anonymous), Check::Proceed);
    }

    #[test]
    fn it_asks_for_the_role_only_when_allowed() {
        let roleless = session(None);

        assert_eq!(
            check("/modules", &roleless),
            Check::ResolveRole {
                subject_id: "u1".into(),
                generation: 3
            }
        );
        assert_eq!(
            evaluate(
                "/modules",
                &roleless,
                &GuardConfig::default(),
                &PermissionTable::default(),
                false
            ),
            Check::Forbidden {
                capability: Capability::ViewModules,
                to: "/forbidden".into()
            }
        );
    }

    #[test]
    fn it_sends_forbidden_navigations_home() {
        assert_eq!(
            check("/users/7", &session(Some("faculty_member"))),
            Check::Forbidden {
                capability: Capability::ViewAllUsers,
                to: "/faculty".into()
            }
        );
        assert_eq!(check("/students", &session(Some("faculty_member"))), Check::Proceed);
        assert_eq!(check("/users/7", &session(Some("admin"))), Check::Proceed);
    }

    #[test]
    fn it_builds_hrefs() {
        let redirect = Redirect::new("/sign-in").with_param("redirect", "/modules/4?tab=grades");

        assert_eq!(
            redirect.href(),
            "/sign-in?redirect=%2Fmodules%2F4%3Ftab%3Dgrades"
        );
        assert_eq!(Redirect::new("/admin").href(), "/admin");
    }
}
