use std::sync::Arc;

use tollgate_http::ApiClient;
use tollgate_session::SessionStore;

use crate::{ApiProfiles, PermissionTable, Permissions, ProfileConfig, ProfileSource};

mod config;
pub use config::*;

mod decision;
pub use decision::*;

/// Profile fetches per navigation. A fetch is repeated only when the
/// session changed while the previous one was in flight.
const PROFILE_ATTEMPTS: usize = 2;

/// Runs before each navigation and decides whether it may proceed.
///
/// Nothing is remembered between navigations; everything is read from the
/// session each time. The guard only writes to the session to store a
/// fetched profile, or to end the session when the profile cannot be
/// fetched or the role is restricted.
#[derive(Clone)]
pub struct RouteGuard {
    client: ApiClient,
    profiles: Arc<dyn ProfileSource>,
    config: GuardConfig,
    table: PermissionTable,
}

impl std::fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGuard")
            .field("client", &self.client)
            .field("config", &self.config)
            .finish()
    }
}

impl RouteGuard {
    /// A guard over `client`'s session that fetches missing roles from the
    /// default profile endpoint
    pub fn new(client: ApiClient, config: GuardConfig) -> Self {
        let profiles = Arc::new(ApiProfiles::new(client.clone(), ProfileConfig::default()));
        Self {
            client,
            profiles,
            config,
            table: PermissionTable::default(),
        }
    }

    /// Fetches missing roles from `profiles` instead
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileSource>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Evaluates capabilities against `table` instead of the default one
    pub fn with_permissions(mut self, table: PermissionTable) -> Self {
        self.table = table;
        self
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    #[allow(missing_docs)]
    pub fn session(&self) -> &SessionStore {
        self.client.session()
    }

    /// Checks a capability for whoever is signed in right now
    pub fn check_permission(&self, capability: &str) -> bool {
        let session = self.session().snapshot();
        Permissions::for_session(&session, &self.table).check_permission(capability)
    }

    /// The routing framework's hook: `None` to proceed, otherwise where to
    /// go instead
    pub async fn before_load(&self, path: &str) -> Option<Redirect> {
        self.before_navigate(path).await.into_redirect()
    }

    /// Decides a navigation to `path`, fetching the subject's profile first
    /// when the session does not yet know their role
    pub async fn before_navigate(&self, path: &str) -> Decision {
        let mut resolved = false;
        let mut attempts = 0;

        loop {
            let session = self.session().snapshot();
            match evaluate(path, &session, &self.config, &self.table, !resolved) {
                Check::ResolveRole { subject_id, .. } if attempts == PROFILE_ATTEMPTS => {
                    tracing::debug!(path, %subject_id, "Session kept changing while resolving role");
                    return self.conclude(path, Check::SignIn);
                }
                Check::ResolveRole {
                    subject_id,
                    generation,
                } => {
                    attempts += 1;
                    match self.profiles.fetch_profile(&subject_id).await {
                        Ok(identity) => {
                            resolved = self.session().set_identity_if_current(generation, identity);
                        }
                        Err(error) if self.session().snapshot().generation != generation => {
                            tracing::debug!(%error, %subject_id, "Ignoring failed profile fetch for a replaced session");
                        }
                        Err(error) => {
                            tracing::warn!(%error, %subject_id, "Profile fetch failed; ending session");
                            self.client.end_session();
                            return self.conclude(path, Check::SignIn);
                        }
                    }
                }
                check => return self.conclude(path, check),
            }
        }
    }

    fn conclude(&self, path: &str, check: Check) -> Decision {
        let decision = match check {
            Check::Proceed => Decision::Proceed,
            Check::SignIn | Check::ResolveRole { .. } => Decision::SignIn(
                Redirect::new(&self.config.sign_in_path).with_param(&self.config.return_param, path),
            ),
            Check::Restricted { role } => {
                tracing::debug!(%role, "Role is restricted; ending session");
                self.client.end_session();
                Decision::Forbidden(
                    Redirect::new(&self.config.sign_in_path)
                        .with_param(&self.config.notice_param, &self.config.denial_notice),
                )
            }
            Check::Landing { to } => Decision::Landing(Redirect::new(to)),
            Check::Forbidden { capability, to } => {
                tracing::debug!(path, %capability, "Destination requires a missing capability");
                Decision::Forbidden(Redirect::new(to))
            }
        };

        tracing::debug!(path, ?decision, "Navigation decided");
        decision
    }
}
