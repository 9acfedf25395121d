use std::fmt;

use serde::{Deserialize, Serialize};

/// A named permission checked before showing a view or an action.
///
/// The set is closed: names outside it are never granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// See every user account
    ViewAllUsers,
    /// Create, edit and remove user accounts
    ManageUsers,
    /// See the dashboard
    ViewDashboard,
    /// See student records
    ViewStudents,
    /// See modules
    ViewModules,
    /// Create, edit and remove modules
    ManageModules,
    /// Create, edit and remove subjects
    ManageSubjects,
    /// Create, edit and grade assessments
    ManageAssessments,
    /// Sit assessments
    TakeAssessments,
    /// See analytics
    ViewAnalytics,
}

impl Capability {
    /// The capability's wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewAllUsers => "view_all_users",
            Capability::ManageUsers => "manage_users",
            Capability::ViewDashboard => "view_dashboard",
            Capability::ViewStudents => "view_students",
            Capability::ViewModules => "view_modules",
            Capability::ManageModules => "manage_modules",
            Capability::ManageSubjects => "manage_subjects",
            Capability::ManageAssessments => "manage_assessments",
            Capability::TakeAssessments => "take_assessments",
            Capability::ViewAnalytics => "view_analytics",
        }
    }

    /// Looks a capability up by its wire name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Capability::all()
            .iter()
            .copied()
            .find(|capability| capability.as_str() == name)
    }

    /// Every capability
    pub fn all() -> &'static [Capability] {
        &[
            Capability::ViewAllUsers,
            Capability::ManageUsers,
            Capability::ViewDashboard,
            Capability::ViewStudents,
            Capability::ViewModules,
            Capability::ManageModules,
            Capability::ManageSubjects,
            Capability::ManageAssessments,
            Capability::TakeAssessments,
            Capability::ViewAnalytics,
        ]
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
