/// Role policy
///
/// Pure predicates deciding what a caller may do. Every role check in the
/// crate goes through this module; callers are passed explicitly, and an
/// unauthenticated request is represented by `None`.
use crate::account::{Account, Role};
use serde::{Deserialize, Serialize};

/// Identity of the account performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    pub role: Role,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Caller {
    /// Active Admin-role caller
    pub fn is_admin(&self) -> bool {
        self.is_active && self.role == Role::Admin
    }

    /// Active Admin-role caller that is both staff and superuser
    pub fn is_superuser(&self) -> bool {
        self.is_admin() && self.is_staff && self.is_superuser
    }
}

impl From<&Account> for Caller {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            role: account.role,
            is_active: account.is_active,
            is_staff: account.is_staff,
            is_superuser: account.is_superuser,
        }
    }
}

/// Minimal view of the account an action targets
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub id: &'a str,
    pub role: Role,
}

impl<'a> From<&'a Account> for Target<'a> {
    fn from(account: &'a Account) -> Self {
        Self {
            id: &account.id,
            role: account.role,
        }
    }
}

pub fn can_list_accounts(caller: Option<&Caller>) -> bool {
    caller.is_some_and(Caller::is_admin)
}

/// Whether a permitted listing also returns Admin-role accounts
pub fn listing_includes_admins(caller: Option<&Caller>) -> bool {
    caller.is_some_and(Caller::is_superuser)
}

/// Self-service registration is open for every role except Admin, which
/// requires an active super-user caller.
pub fn can_create_account(caller: Option<&Caller>, requested_role: Role) -> bool {
    match requested_role {
        Role::Admin => caller.is_some_and(Caller::is_superuser),
        Role::HomeSeeker | Role::PropertyOwner => true,
    }
}

pub fn can_view_or_edit_own_profile(caller: Option<&Caller>) -> bool {
    caller.is_some_and(|c| c.is_active)
}

/// Self, an Admin acting on a non-Admin target, or any super-user
pub fn can_upload_image(caller: Option<&Caller>, target: Target<'_>) -> bool {
    let Some(caller) = caller else {
        return false;
    };

    if !caller.is_active {
        return false;
    }

    if caller.id == target.id {
        return true;
    }

    if caller.is_superuser() {
        return true;
    }

    caller.is_admin() && target.role != Role::Admin
}
