/// Account service
///
/// Named account operations. Every operation takes the caller explicitly and
/// consults the role policy before touching the credential store.
use crate::{
    account::{
        normalize_email, password::hash_password, validation_message, Account, AccountManager,
        AccountView, Gender, NewAccount, RegisterRequest, Role, UpdateProfileRequest,
    },
    config::SuperuserBootstrap,
    error::{AccountError, AccountResult},
    image_store::ImageStore,
    policy::{self, Caller, Target},
};
use std::sync::Arc;
use validator::{Validate, ValidateEmail};

pub struct AccountService {
    accounts: Arc<AccountManager>,
    images: ImageStore,
}

impl AccountService {
    pub fn new(accounts: Arc<AccountManager>, images: ImageStore) -> Self {
        Self { accounts, images }
    }

    /// Register a new account
    ///
    /// Open to unauthenticated callers for non-Admin roles. Requesting the
    /// Admin role without an active super-user caller is `Forbidden` and
    /// persists nothing.
    pub async fn register(
        &self,
        caller: Option<&Caller>,
        req: RegisterRequest,
    ) -> AccountResult<AccountView> {
        let role = Role::parse(required(req.user_type.as_deref(), "user_type")?)?;

        if !policy::can_create_account(caller, role) {
            tracing::warn!(
                caller = caller.map(|c| c.id.as_str()).unwrap_or("anonymous"),
                "Rejected admin account creation"
            );
            return Err(AccountError::Forbidden(
                "Only superusers can create admin users.".to_string(),
            ));
        }

        req.validate().map_err(validation_message)?;
        let gender = Gender::parse(required(req.gender.as_deref(), "gender")?)?;

        let account = self
            .accounts
            .create_account(NewAccount {
                email: normalize_email(&req.email),
                password_hash: hash_password(&req.password)?,
                name: req.name,
                gender,
                role,
                is_active: req.is_active.unwrap_or(true),
                is_staff: role == Role::Admin,
                is_superuser: false,
            })
            .await?;

        Ok(AccountView::from(&account))
    }

    /// Create a super-user account
    ///
    /// Bootstrap path only; no HTTP route reaches it.
    pub async fn create_superuser(
        &self,
        email: &str,
        password: &str,
        name: &str,
        gender: Gender,
    ) -> AccountResult<Account> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(AccountError::Validation(
                "email: Enter a valid email address.".to_string(),
            ));
        }

        if password.is_empty() {
            return Err(AccountError::Validation(
                "password: This field may not be blank.".to_string(),
            ));
        }

        let account = self
            .accounts
            .create_account(NewAccount {
                email,
                password_hash: hash_password(password)?,
                name: name.to_string(),
                gender,
                role: Role::Admin,
                is_active: true,
                is_staff: true,
                is_superuser: true,
            })
            .await?;

        tracing::info!(account_id = %account.id, "Superuser created");

        Ok(account)
    }

    /// Create the configured super-user unless the email is already taken
    ///
    /// Returns true if an account was created.
    pub async fn ensure_superuser(&self, bootstrap: &SuperuserBootstrap) -> AccountResult<bool> {
        if self
            .accounts
            .email_exists(&normalize_email(&bootstrap.email))
            .await?
        {
            tracing::debug!("Bootstrap superuser already exists");
            return Ok(false);
        }

        self.create_superuser(
            &bootstrap.email,
            &bootstrap.password,
            &bootstrap.name,
            bootstrap.gender,
        )
        .await?;

        Ok(true)
    }

    pub async fn get_own_profile(&self, caller: &Caller) -> AccountResult<AccountView> {
        ensure_own_profile_access(caller)?;

        let account = self.accounts.get_account(&caller.id).await?;
        Ok(AccountView::from(&account))
    }

    /// Update the caller's name and/or password
    ///
    /// Email, role, gender and flags cannot change through this path.
    pub async fn update_own_profile(
        &self,
        caller: &Caller,
        req: UpdateProfileRequest,
    ) -> AccountResult<AccountView> {
        ensure_own_profile_access(caller)?;
        req.validate().map_err(validation_message)?;

        let password_hash = req.password.as_deref().map(hash_password).transpose()?;

        let account = self
            .accounts
            .update_profile(&caller.id, req.name.as_deref(), password_hash.as_deref())
            .await?;

        tracing::info!(
            account_id = %account.id,
            password_changed = password_hash.is_some(),
            "Profile updated"
        );

        Ok(AccountView::from(&account))
    }

    /// List accounts visible to an Admin caller
    ///
    /// Plain Admins never see Admin-role accounts; super-users see every
    /// account along with its staff/superuser flags.
    pub async fn list_accounts(&self, caller: &Caller) -> AccountResult<Vec<AccountView>> {
        if !policy::can_list_accounts(Some(caller)) {
            return Err(AccountError::Forbidden(
                "You do not have permission to perform this action.".to_string(),
            ));
        }

        let include_admins = policy::listing_includes_admins(Some(caller));
        let accounts = self.accounts.list_accounts(include_admins).await?;

        Ok(accounts
            .iter()
            .map(|account| {
                let view = AccountView::from(account);
                if include_admins {
                    view.with_privileges(account)
                } else {
                    view
                }
            })
            .collect())
    }

    /// Replace the profile image of `target_id`
    ///
    /// The previous image, if any, is released after the new reference is
    /// committed.
    pub async fn upload_image(
        &self,
        caller: &Caller,
        target_id: &str,
        data: Vec<u8>,
    ) -> AccountResult<AccountView> {
        let target = self
            .accounts
            .find_account(target_id)
            .await?
            .ok_or_else(|| AccountError::NotFound("No account matches the given id.".to_string()))?;

        if !policy::can_upload_image(Some(caller), Target::from(&target)) {
            tracing::warn!(caller = %caller.id, target = %target.id, "Rejected image upload");
            return Err(AccountError::Forbidden(
                "You do not have permission to perform this action.".to_string(),
            ));
        }

        let stored = self.images.store(data).await?;

        let (account, previous) = match self
            .accounts
            .set_image(&target.id, Some(&stored.reference))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                if let Err(cleanup) = self.images.delete(&stored.reference).await {
                    tracing::warn!("Failed to release orphaned image: {}", cleanup);
                }
                return Err(e);
            }
        };

        if let Some(previous) = previous {
            if let Err(e) = self.images.delete(&previous).await {
                tracing::warn!(%previous, "Failed to release replaced image: {}", e);
            }
        }

        tracing::info!(
            caller = %caller.id,
            target = %account.id,
            reference = %stored.reference,
            "Profile image replaced"
        );

        Ok(AccountView::from(&account))
    }

    pub async fn upload_own_image(&self, caller: &Caller, data: Vec<u8>) -> AccountResult<AccountView> {
        self.upload_image(caller, &caller.id, data).await
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> AccountResult<&'a str> {
    value.ok_or_else(|| AccountError::Validation(format!("{}: This field is required.", field)))
}

fn ensure_own_profile_access(caller: &Caller) -> AccountResult<()> {
    if policy::can_view_or_edit_own_profile(Some(caller)) {
        Ok(())
    } else {
        Err(AccountError::Forbidden("Account is inactive.".to_string()))
    }
}
