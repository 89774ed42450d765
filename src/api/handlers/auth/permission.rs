//! Role- and ownership-based access policies.
//!
//! Handlers resolve the target first so a missing object is a `404` even for
//! callers that would be denied; only then is the policy consulted.

use super::{principal::Principal, role::Role};
use crate::api::handlers::error::ApiError;

/// Anything that belongs to a single account.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Administrators only; ownership is irrelevant.
    Admin,
    /// Suppliers and administrators may create; changes need ownership unless admin.
    SupplierOrAdmin,
    /// Any account may create; changes need ownership unless admin.
    Authenticated,
}

impl Policy {
    const fn allows(self, role: Role) -> bool {
        match self {
            Self::Admin => matches!(role, Role::Admin),
            Self::SupplierOrAdmin => matches!(role, Role::Supplier | Role::Admin),
            Self::Authenticated => true,
        }
    }

    /// Role gate for routes without a target object (creation).
    pub fn check_role(self, principal: &Principal) -> Result<(), ApiError> {
        if self.allows(principal.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not enough permissions for this action."))
        }
    }

    /// Gate for changing an existing object: the role must match and, unless
    /// the caller is an administrator, the caller must own the object.
    pub fn check_object<T: Owned>(self, principal: &Principal, target: &T) -> Result<(), ApiError> {
        self.check_role(principal)?;
        if principal.role.is_admin() || target.owner_id() == principal.user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Only the owner or an administrator can change this object.",
            ))
        }
    }

    /// Resolves `target` (`404` when absent) and checks it in one step.
    pub fn authorize<T: Owned>(
        self,
        principal: &Principal,
        target: Option<T>,
        not_found: &'static str,
    ) -> Result<T, ApiError> {
        let target = target.ok_or(ApiError::NotFound(not_found))?;
        self.check_object(principal, &target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    struct Thing(i64);

    impl Owned for Thing {
        fn owner_id(&self) -> i64 {
            self.0
        }
    }

    fn principal(user_id: i64, role: Role) -> Principal {
        Principal {
            user_id,
            username: format!("user{user_id}"),
            role,
        }
    }

    fn status<T>(result: Result<T, ApiError>) -> Option<StatusCode> {
        result.err().map(|err| err.status())
    }

    #[test]
    fn role_gates() {
        let customer = principal(1, Role::Customer);
        let supplier = principal(2, Role::Supplier);
        let admin = principal(3, Role::Admin);

        assert_eq!(status(Policy::Admin.check_role(&customer)), Some(StatusCode::FORBIDDEN));
        assert_eq!(status(Policy::Admin.check_role(&supplier)), Some(StatusCode::FORBIDDEN));
        assert!(Policy::Admin.check_role(&admin).is_ok());

        assert_eq!(
            status(Policy::SupplierOrAdmin.check_role(&customer)),
            Some(StatusCode::FORBIDDEN)
        );
        assert!(Policy::SupplierOrAdmin.check_role(&supplier).is_ok());
        assert!(Policy::SupplierOrAdmin.check_role(&admin).is_ok());

        assert!(Policy::Authenticated.check_role(&customer).is_ok());
    }

    #[test]
    fn owners_and_admins_may_change_objects() {
        let owner = principal(7, Role::Supplier);
        let other_supplier = principal(8, Role::Supplier);
        let admin = principal(9, Role::Admin);
        let product = Thing(7);

        assert!(Policy::SupplierOrAdmin.check_object(&owner, &product).is_ok());
        assert!(Policy::SupplierOrAdmin.check_object(&admin, &product).is_ok());
        assert_eq!(
            status(Policy::SupplierOrAdmin.check_object(&other_supplier, &product)),
            Some(StatusCode::FORBIDDEN)
        );
    }

    #[test]
    fn review_owner_may_be_any_role() {
        let author = principal(4, Role::Customer);
        let stranger = principal(5, Role::Customer);
        let review = Thing(4);

        assert!(Policy::Authenticated.check_object(&author, &review).is_ok());
        assert_eq!(
            status(Policy::Authenticated.check_object(&stranger, &review)),
            Some(StatusCode::FORBIDDEN)
        );
    }

    #[test]
    fn missing_target_is_not_found_before_forbidden() {
        let stranger = principal(5, Role::Customer);
        let result = Policy::SupplierOrAdmin.authorize::<Thing>(&stranger, None, "Product not found.");
        assert_eq!(status(result), Some(StatusCode::NOT_FOUND));

        let result = Policy::SupplierOrAdmin.authorize(&stranger, Some(Thing(1)), "Product not found.");
        assert_eq!(status(result), Some(StatusCode::FORBIDDEN));
    }
}
