//! Role-based permission resolution
//!
//! The role's permission set is the general authority. Two pieces layer on
//! top of it:
//! - the reserved `admin`/`superadmin` role names, which bypass explicit
//!   sets entirely, and
//! - a static per-permission override table (the training module's
//!   role allow-lists) consulted at lookup time.
//!
//! When both the role set and the override table cover the same permission
//! and disagree, the resolver answers from the override table and logs the
//! drift instead of hiding it.

use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::models::RoleAssignment;

/// Role names that hold every permission implicitly
pub const ADMIN_ROLES: [&str; 2] = ["admin", "superadmin"];

/// Marker the wire format uses for the wildcard tier
pub const WILDCARD: &str = "*";

/// Result of resolving a user's permissions
///
/// The wildcard is a variant, not a sentinel inside the literal set;
/// callers can never mistake it for a permission named `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionAccess {
    /// Admin tier: every permission, present and future
    All,
    /// The literal permission-name set granted through the role
    Explicit(HashSet<String>),
}

impl PermissionAccess {
    pub fn allows(&self, permission: &str) -> bool {
        match self {
            Self::All => true,
            Self::Explicit(names) => names.contains(permission),
        }
    }

    /// Wire shape: `["*"]` for the admin tier, sorted names otherwise
    pub fn to_wire(&self) -> Vec<String> {
        match self {
            Self::All => vec![WILDCARD.to_string()],
            Self::Explicit(names) => {
                let mut sorted: Vec<String> = names.iter().cloned().collect();
                sorted.sort();
                sorted
            }
        }
    }
}

/// Permission lookup authority
pub struct PermissionResolver {
    /// permission name -> role names allowed regardless of the role's set
    overrides: HashMap<String, Vec<String>>,
}

impl PermissionResolver {
    /// Resolver with the training-module override table
    pub fn new() -> Self {
        let mut overrides = HashMap::new();

        overrides.insert(
            "capacitaciones.ver".to_string(),
            vec!["admin", "supervisor", "operador", "consulta"],
        );
        overrides.insert("capacitaciones.crear".to_string(), vec!["admin", "supervisor"]);
        overrides.insert("capacitaciones.editar".to_string(), vec!["admin", "supervisor"]);
        overrides.insert("capacitaciones.eliminar".to_string(), vec!["admin"]);
        overrides.insert(
            "capacitaciones.gestionar_participantes".to_string(),
            vec!["admin", "supervisor", "operador"],
        );
        overrides.insert("capacitaciones.asignar".to_string(), vec!["admin", "supervisor"]);
        overrides.insert("capacitaciones.exportar".to_string(), vec!["admin", "supervisor"]);

        Self {
            overrides: overrides
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().map(String::from).collect()))
                .collect(),
        }
    }

    /// Resolver without any override entries (tests, future cleanup)
    pub fn without_overrides() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    /// Effective permissions for a user's role
    pub fn effective_permissions(&self, assignment: Option<&RoleAssignment>) -> PermissionAccess {
        match assignment {
            None => PermissionAccess::Explicit(HashSet::new()),
            Some(a) if is_admin_role(&a.role.name) => PermissionAccess::All,
            Some(a) => PermissionAccess::Explicit(a.permission_names()),
        }
    }

    /// Does the role hold the permission?
    ///
    /// No role means no permissions. Admin tiers hold everything. For
    /// permissions named in the override table the allow-list governs.
    pub fn has_permission(&self, assignment: Option<&RoleAssignment>, permission: &str) -> bool {
        let Some(assignment) = assignment else {
            return false;
        };

        if is_admin_role(&assignment.role.name) {
            return true;
        }

        let from_set = assignment.permission_names().contains(permission);

        if let Some(allowed_roles) = self.overrides.get(permission) {
            let from_override = allowed_roles.iter().any(|r| r == &assignment.role.name);

            if from_override != from_set {
                warn!(
                    permission = permission,
                    role = %assignment.role.name,
                    role_set = from_set,
                    override_table = from_override,
                    "Permission sources disagree; answering from the override table"
                );
            }

            return from_override;
        }

        from_set
    }
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn is_admin_role(name: &str) -> bool {
    ADMIN_ROLES.contains(&name)
}
