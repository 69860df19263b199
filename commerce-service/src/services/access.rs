//! Invoice access guard.
//!
//! A pure policy over (principal, action). Handlers resolve the target
//! invoice first, so a missing id is reported as not-found before this runs.

use crate::models::Principal;
use crate::services::metrics::ERRORS_TOTAL;
use crate::services::CommerceError;

/// Something a caller is attempting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    ListAllInvoices,
    ListOwnInvoices,
    ReadInvoice { owner_id: &'a str },
    CreateInvoice,
    UpdateInvoice,
    DeleteInvoice,
    ManageCatalog,
    ListUsers,
}

impl Action<'_> {
    fn name(&self) -> &'static str {
        match self {
            Action::ListAllInvoices => "list_all_invoices",
            Action::ListOwnInvoices => "list_own_invoices",
            Action::ReadInvoice { .. } => "read_invoice",
            Action::CreateInvoice => "create_invoice",
            Action::UpdateInvoice => "update_invoice",
            Action::DeleteInvoice => "delete_invoice",
            Action::ManageCatalog => "manage_catalog",
            Action::ListUsers => "list_users",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Forbid,
    Unauthenticated,
}

/// Decides whether `principal` may perform `action`.
pub fn authorize(principal: Option<&Principal>, action: Action<'_>) -> Decision {
    let Some(principal) = principal else {
        return Decision::Unauthenticated;
    };

    let allowed = match action {
        Action::ListOwnInvoices | Action::CreateInvoice => principal.is_visitor(),
        Action::ReadInvoice { owner_id } => principal.is_admin() || principal.user_id == owner_id,
        Action::ListAllInvoices
        | Action::UpdateInvoice
        | Action::DeleteInvoice
        | Action::ManageCatalog
        | Action::ListUsers => principal.is_admin(),
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Forbid
    }
}

/// [`authorize`] as a `Result`, logging refusals.
pub fn enforce(principal: Option<&Principal>, action: Action<'_>) -> Result<(), CommerceError> {
    let err = match authorize(principal, action) {
        Decision::Allow => return Ok(()),
        Decision::Unauthenticated => {
            tracing::warn!(action = action.name(), "Unauthenticated request refused");
            CommerceError::Unauthenticated
        }
        Decision::Forbid => {
            tracing::warn!(
                action = action.name(),
                user_id = %principal.map(|p| p.user_id.as_str()).unwrap_or_default(),
                "Request forbidden"
            );
            CommerceError::Forbidden(format!("not allowed to {}", action.name().replace('_', " ")))
        }
    };

    ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn principal(id: &str, role: Option<Role>) -> Principal {
        Principal {
            user_id: id.to_string(),
            user_name: id.to_string(),
            role,
        }
    }

    #[test]
    fn anonymous_is_unauthenticated_for_everything() {
        let actions = [
            Action::ListAllInvoices,
            Action::ListOwnInvoices,
            Action::ReadInvoice { owner_id: "u1" },
            Action::CreateInvoice,
            Action::UpdateInvoice,
            Action::DeleteInvoice,
            Action::ManageCatalog,
            Action::ListUsers,
        ];
        for action in actions {
            assert_eq!(authorize(None, action), Decision::Unauthenticated);
        }
    }

    #[test]
    fn admin_only_actions() {
        let admin = principal("admin", Some(Role::Admin));
        let visitor = principal("v1", Some(Role::Visitor));

        for action in [
            Action::ListAllInvoices,
            Action::UpdateInvoice,
            Action::DeleteInvoice,
            Action::ManageCatalog,
            Action::ListUsers,
        ] {
            assert_eq!(authorize(Some(&admin), action), Decision::Allow);
            assert_eq!(authorize(Some(&visitor), action), Decision::Forbid);
        }
    }

    #[test]
    fn visitor_only_actions() {
        let admin = principal("admin", Some(Role::Admin));
        let visitor = principal("v1", Some(Role::Visitor));

        for action in [Action::ListOwnInvoices, Action::CreateInvoice] {
            assert_eq!(authorize(Some(&visitor), action), Decision::Allow);
            assert_eq!(authorize(Some(&admin), action), Decision::Forbid);
        }
    }

    #[test]
    fn read_allows_admin_or_owner() {
        let admin = principal("admin", Some(Role::Admin));
        let owner = principal("v1", Some(Role::Visitor));
        let other = principal("v2", Some(Role::Visitor));
        let read = Action::ReadInvoice { owner_id: "v1" };

        assert_eq!(authorize(Some(&admin), read), Decision::Allow);
        assert_eq!(authorize(Some(&owner), read), Decision::Allow);
        assert_eq!(authorize(Some(&other), read), Decision::Forbid);
    }

    #[test]
    fn unknown_role_keeps_owner_reads_only() {
        let roleless = principal("v1", None);

        assert_eq!(
            authorize(Some(&roleless), Action::ReadInvoice { owner_id: "v1" }),
            Decision::Allow
        );
        assert_eq!(
            authorize(Some(&roleless), Action::CreateInvoice),
            Decision::Forbid
        );
        assert_eq!(
            authorize(Some(&roleless), Action::ListAllInvoices),
            Decision::Forbid
        );
    }

    #[test]
    fn enforce_maps_decisions_to_errors() {
        let visitor = principal("v1", Some(Role::Visitor));

        assert!(enforce(Some(&visitor), Action::CreateInvoice).is_ok());
        assert!(matches!(
            enforce(Some(&visitor), Action::DeleteInvoice),
            Err(CommerceError::Forbidden(_))
        ));
        assert!(matches!(
            enforce(None, Action::CreateInvoice),
            Err(CommerceError::Unauthenticated)
        ));
    }
}
