//! Who may open which page and touch which record.

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::user::{Role, User};

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const SIGN_UP_PATH: &str = "/sign-up";

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn is_protected(path: &str) -> bool {
    under(path, "/admin") || under(path, "/client")
}

/// Whether `role` may open the page at `path`.
pub fn can_access_path(role: Role, path: &str) -> bool {
    match role {
        Role::SuperAdmin => true,
        Role::Broker => under(path, "/admin") && !under(path, "/admin/superadmin"),
        Role::Client => under(path, "/client"),
    }
}

/// Session as seen by the page gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Missing,
    Invalid,
    Valid(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
}

pub fn route_decision(path: &str, session: SessionState) -> RouteDecision {
    if path == SIGN_IN_PATH || path == SIGN_UP_PATH {
        return match session {
            SessionState::Valid(role) => RouteDecision::Redirect(role.dashboard_path()),
            _ => RouteDecision::Allow,
        };
    }

    if !is_protected(path) {
        return RouteDecision::Allow;
    }

    match session {
        SessionState::Missing | SessionState::Invalid => RouteDecision::Redirect(SIGN_IN_PATH),
        SessionState::Valid(role) if can_access_path(role, path) => RouteDecision::Allow,
        SessionState::Valid(role) => RouteDecision::Redirect(role.dashboard_path()),
    }
}

/// What an actor may do with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePermissions {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_create: bool,
}

impl ResourcePermissions {
    /// `owner_id` is the creator of the record, `None` when asking about creation in general.
    pub fn resolve(actor: &User, owner_id: Option<&str>) -> Self {
        let owns = owner_id.is_some_and(|owner| owner == actor.id);
        match actor.role {
            Role::SuperAdmin => Self {
                can_view: true,
                can_edit: true,
                can_delete: true,
                can_create: true,
            },
            Role::Broker => Self {
                can_view: true,
                can_edit: owns,
                can_delete: owns,
                can_create: true,
            },
            Role::Client => Self {
                can_view: owns,
                can_edit: owns,
                can_delete: false,
                can_create: false,
            },
        }
    }
}

/// Hides records the actor may not see.
pub fn ensure_view(actor: &User, owner_id: &str, what: &str) -> Result<ResourcePermissions> {
    let permissions = ResourcePermissions::resolve(actor, Some(owner_id));
    if !permissions.can_view {
        return Err(AppError::NotFound(what.to_string()));
    }
    Ok(permissions)
}

pub fn ensure_edit(actor: &User, owner_id: &str, what: &str) -> Result<()> {
    if !ensure_view(actor, owner_id, what)?.can_edit {
        return Err(AppError::Forbidden(format!("cannot edit {what}")));
    }
    Ok(())
}

pub fn ensure_create(actor: &User, what: &str) -> Result<()> {
    if !ResourcePermissions::resolve(actor, None).can_create {
        return Err(AppError::Forbidden(format!("cannot create {what}")));
    }
    Ok(())
}

pub fn ensure_staff(actor: &User) -> Result<()> {
    if !actor.role.is_staff() {
        return Err(AppError::Forbidden("staff only".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            email: format!("{id}@clex.test"),
            name: id.into(),
            role,
            password_hash: String::new(),
            company_name: None,
            company_address: None,
            contact_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn broker_is_kept_out_of_superadmin_area() {
        assert!(can_access_path(Role::Broker, "/admin/overview"));
        assert!(can_access_path(Role::Broker, "/admin/services/import/abc"));
        assert!(!can_access_path(Role::Broker, "/admin/superadmin/users"));
        assert!(!can_access_path(Role::Broker, "/client/overview"));
        assert!(can_access_path(Role::SuperAdmin, "/admin/superadmin/users"));
        assert!(can_access_path(Role::SuperAdmin, "/client/overview"));
    }

    #[test]
    fn client_is_confined_to_client_area() {
        assert!(can_access_path(Role::Client, "/client/overview"));
        assert!(!can_access_path(Role::Client, "/admin/overview"));
        // prefix must end at a segment boundary
        assert!(!can_access_path(Role::Client, "/clientele"));
    }

    #[test]
    fn protected_pages_without_session_go_to_sign_in() {
        for session in [SessionState::Missing, SessionState::Invalid] {
            assert_eq!(
                route_decision("/admin/clients", session),
                RouteDecision::Redirect("/sign-in")
            );
            assert_eq!(
                route_decision("/client/overview", session),
                RouteDecision::Redirect("/sign-in")
            );
            assert_eq!(route_decision("/sign-in", session), RouteDecision::Allow);
        }
    }

    #[test]
    fn signed_in_users_skip_auth_pages() {
        assert_eq!(
            route_decision("/sign-in", SessionState::Valid(Role::Client)),
            RouteDecision::Redirect("/client/overview")
        );
        assert_eq!(
            route_decision("/sign-up", SessionState::Valid(Role::Broker)),
            RouteDecision::Redirect("/admin/overview")
        );
    }

    #[test]
    fn forbidden_page_redirects_to_own_dashboard() {
        assert_eq!(
            route_decision("/admin/superadmin/users", SessionState::Valid(Role::Broker)),
            RouteDecision::Redirect("/admin/overview")
        );
        assert_eq!(
            route_decision("/admin/overview", SessionState::Valid(Role::Client)),
            RouteDecision::Redirect("/client/overview")
        );
        assert_eq!(
            route_decision("/admin/overview", SessionState::Valid(Role::Broker)),
            RouteDecision::Allow
        );
    }

    #[test]
    fn broker_edits_only_own_records() {
        let broker = user("b1", Role::Broker);
        let own = ResourcePermissions::resolve(&broker, Some("b1"));
        let other = ResourcePermissions::resolve(&broker, Some("b2"));
        assert!(own.can_view && own.can_edit && own.can_delete && own.can_create);
        assert!(other.can_view && !other.can_edit && !other.can_delete);
    }

    #[test]
    fn client_never_creates_or_deletes() {
        let client = user("c1", Role::Client);
        let own = ResourcePermissions::resolve(&client, Some("c1"));
        assert!(own.can_view && own.can_edit);
        assert!(!own.can_delete && !own.can_create);
        assert!(matches!(
            ensure_view(&client, "someone-else", "Shipment"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(ensure_create(&client, "shipment"), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn super_admin_can_do_everything() {
        let admin = user("a1", Role::SuperAdmin);
        let p = ResourcePermissions::resolve(&admin, Some("x"));
        assert!(p.can_view && p.can_edit && p.can_delete && p.can_create);
        assert!(ensure_edit(&admin, "x", "Shipment").is_ok());
    }
}
