//! Who may do what to which record. Checked before validation and before
//! anything is written.

use crate::cheeses::model::CheeseListing;
use crate::users::model::User;

pub const EDIT_LISTING_DENIED: &str = "Only the creator can edit a cheese listing";
pub const EDIT_USER_DENIED: &str = "You can only edit your own account";
pub const ADMIN_REQUIRED: &str = "Access Denied.";
pub const AUTHENTICATION_REQUIRED: &str = "Full authentication is required to access this resource.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub reason: String,
    /// False when the caller was anonymous.
    pub authenticated: bool,
}

impl AccessDenied {
    pub fn anonymous() -> Self {
        Self {
            reason: AUTHENTICATION_REQUIRED.into(),
            authenticated: false,
        }
    }

    pub fn forbidden(reason: &str) -> Self {
        Self {
            reason: reason.into(),
            authenticated: true,
        }
    }
}

type Decision = Result<(), AccessDenied>;

fn authenticated(caller: Option<&User>) -> Result<&User, AccessDenied> {
    caller.ok_or_else(AccessDenied::anonymous)
}

fn admin(caller: Option<&User>) -> Decision {
    if authenticated(caller)?.is_admin() {
        Ok(())
    } else {
        Err(AccessDenied::forbidden(ADMIN_REQUIRED))
    }
}

/// `target` is `None` for collection operations.
pub fn check_listing(op: Operation, caller: Option<&User>, target: Option<&CheeseListing>) -> Decision {
    match op {
        Operation::List | Operation::Read => Ok(()),
        Operation::Create => authenticated(caller).map(|_| ()),
        Operation::Update => {
            let caller = authenticated(caller)?;
            let owns = target.is_some_and(|l| l.owner_id == caller.id);
            if owns || caller.is_admin() {
                Ok(())
            } else {
                Err(AccessDenied::forbidden(EDIT_LISTING_DENIED))
            }
        }
        Operation::Delete => admin(caller),
    }
}

pub fn check_user(op: Operation, caller: Option<&User>, target: Option<&User>) -> Decision {
    match op {
        Operation::Create => Ok(()),
        Operation::List | Operation::Read => authenticated(caller).map(|_| ()),
        Operation::Update => {
            let caller = authenticated(caller)?;
            if target.is_some_and(|t| t.id == caller.id) {
                Ok(())
            } else {
                Err(AccessDenied::forbidden(EDIT_USER_DENIED))
            }
        }
        Operation::Delete => admin(caller),
    }
}
