use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tollgate_session::Session;

use crate::Capability;

/// Role designations the default table knows about
pub mod role {
    #[allow(missing_docs)]
    pub const ADMIN: &str = "admin";
    #[allow(missing_docs)]
    pub const FACULTY_MEMBER: &str = "faculty_member";
    #[allow(missing_docs)]
    pub const STUDENT: &str = "student";
}

/// Static mapping from role designation to the capabilities it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTable {
    roles: BTreeMap<String, BTreeSet<Capability>>,
}

impl Default for PermissionTable {
    fn default() -> Self {
        use Capability::*;

        PermissionTable::empty()
            .with_role(role::ADMIN, Capability::all().iter().copied())
            .with_role(
                role::FACULTY_MEMBER,
                [
                    ViewDashboard,
                    ViewStudents,
                    ViewModules,
                    ManageModules,
                    ManageSubjects,
                    ManageAssessments,
                    ViewAnalytics,
                ],
            )
            .with_role(role::STUDENT, [ViewDashboard, ViewModules, TakeAssessments])
    }
}

impl PermissionTable {
    /// A table that grants nothing to anyone
    pub fn empty() -> Self {
        Self {
            roles: BTreeMap::new(),
        }
    }

    /// Grants `capabilities` to `role`, replacing whatever it had
    pub fn with_role(
        mut self,
        role: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        self.roles
            .insert(role.into(), capabilities.into_iter().collect());
        self
    }

    /// Whether `role` is granted `capability`
    pub fn grants(&self, role: &str, capability: Capability) -> bool {
        self.roles
            .get(role)
            .is_some_and(|granted| granted.contains(&capability))
    }

    /// Capabilities granted to `role`, in a stable order
    pub fn capabilities(&self, role: &str) -> impl Iterator<Item = Capability> + '_ {
        self.roles.get(role).into_iter().flatten().copied()
    }
}

/// Permission checks for one role designation.
///
/// A missing role grants nothing, and so does a role or capability name the
/// table does not know.
#[derive(Debug, Clone, Copy)]
pub struct Permissions<'a> {
    role: Option<&'a str>,
    table: &'a PermissionTable,
}

impl<'a> Permissions<'a> {
    #[allow(missing_docs)]
    pub fn new(role: Option<&'a str>, table: &'a PermissionTable) -> Self {
        Self {
            role: role.filter(|role| !role.is_empty()),
            table,
        }
    }

    /// Permissions of whoever `session` identifies
    pub fn for_session(session: &'a Session, table: &'a PermissionTable) -> Self {
        Self::new(session.role_designation(), table)
    }

    /// The resolved role designation
    pub fn role(&self) -> Option<&'a str> {
        self.role
    }

    /// Checks a capability by name
    pub fn check_permission(&self, capability: &str) -> bool {
        Capability::parse(capability).is_some_and(|capability| self.has(capability))
    }

    /// Checks a capability
    pub fn has(&self, capability: Capability) -> bool {
        self.role
            .is_some_and(|role| self.table.grants(role, capability))
    }

    #[allow(missing_docs)]
    pub fn is_admin(&self) -> bool {
        self.role == Some(role::ADMIN)
    }

    #[allow(missing_docs)]
    pub fn is_faculty_member(&self) -> bool {
        self.role == Some(role::FACULTY_MEMBER)
    }

    #[allow(missing_docs)]
    pub fn is_student(&self) -> bool {
        self.role == Some(role::STUDENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tollgate_session::{Identity, Profile};

    fn session_with(identity: Option<Identity>) -> Session {
        Session {
            identity,
            access_token: "t1".into(),
            generation: 1,
        }
    }

    #[test]
    fn it_grants_faculty_members_their_capabilities() {
        let table = PermissionTable::default();
        let session = session_with(Some(Identity::new("u1").with_role("faculty_member")));
        let permissions = Permissions::for_session(&session, &table);

        assert!(!permissions.check_permission("view_all_users"));
        assert!(permissions.check_permission("view_students"));
        assert!(permissions.check_permission("view_dashboard"));
        assert!(permissions.is_faculty_member());
        assert!(!permissions.is_admin());
    }

    #[test]
    fn it_reserves_user_listing_for_admins() {
        let table = PermissionTable::default();

        for role in [None, Some(""), Some("faculty_member"), Some("student"), Some("Admin")] {
            assert!(
                !Permissions::new(role, &table).check_permission("view_all_users"),
                "{role:?} must not view all users"
            );
        }
        assert!(Permissions::new(Some("admin"), &table).check_permission("view_all_users"));
    }

    #[test]
    fn it_grants_nothing_without_a_role() {
        let table = PermissionTable::default();
        let anonymous = session_with(None);
        let roleless = session_with(Some(Identity::new("u1")));

        for session in [&anonymous, &roleless] {
            let permissions = Permissions::for_session(session, &table);
            assert_eq!(permissions.role(), None);
            assert!(
                Capability::all()
                    .iter()
                    .all(|capability| !permissions.has(*capability))
            );
        }
    }

    #[test]
    fn it_fails_closed_on_unknown_capabilities() {
        let table = PermissionTable::default();
        let admin = Permissions::new(Some("admin"), &table);

        assert!(!admin.check_permission("launch_rockets"));
        assert!(!admin.check_permission(""));
    }

    #[test]
    fn it_falls_back_to_the_profile_role() {
        let table = PermissionTable::default();
        let session = session_with(Some(
            Identity::new("u1").with_profile(Profile::with_role("student")),
        ));
        let permissions = Permissions::for_session(&session, &table);

        assert!(permissions.is_student());
        assert!(permissions.check_permission("take_assessments"));
        assert!(!permissions.check_permission("manage_modules"));
    }

    #[test]
    fn it_loads_tables_from_json() -> anyhow::Result<()> {
        let table: PermissionTable = serde_json::from_value(serde_json::json!({
            "librarian": ["view_modules", "view_students"]
        }))?;

        assert_eq!(
            table.capabilities("librarian").collect::<Vec<_>>(),
            vec![Capability::ViewStudents, Capability::ViewModules]
        );
        assert!(!table.grants("admin", Capability::ViewModules));
        Ok(())
    }
}
