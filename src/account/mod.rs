/// Account management system
///
/// Account records, roles, the credential store, and the request/response
/// shapes used by the HTTP layer.

mod manager;
pub mod password;

pub use manager::{AccountManager, NewAccount};

use crate::{
    db::account::AccountRecord,
    error::{AccountError, AccountResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Authorization tier of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    HomeSeeker,
    PropertyOwner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::HomeSeeker => "home_seeker",
            Role::PropertyOwner => "property_owner",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> AccountResult<Self> {
        match s {
            "home_seeker" => Ok(Role::HomeSeeker),
            "property_owner" => Ok(Role::PropertyOwner),
            "admin" => Ok(Role::Admin),
            _ => Err(AccountError::Validation(format!(
                "\"{}\" is not a valid user_type; expected home_seeker, property_owner or admin",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn parse(s: &str) -> AccountResult<Self> {
        match s {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            _ => Err(AccountError::Validation(format!(
                "\"{}\" is not a valid gender; expected M or F",
                s
            ))),
        }
    }
}

/// Account with typed role and gender
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub gender: Gender,
    pub role: Role,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn from_record(record: AccountRecord) -> AccountResult<Self> {
        Ok(Account {
            gender: Gender::parse(&record.gender)
                .map_err(|e| AccountError::Internal(format!("Corrupt account row: {}", e)))?,
            role: Role::parse(&record.user_type)
                .map_err(|e| AccountError::Internal(format!("Corrupt account row: {}", e)))?,
            id: record.id,
            email: record.email,
            password_hash: record.password_hash,
            name: record.name,
            is_active: record.is_active,
            is_staff: record.is_staff,
            is_superuser: record.is_superuser,
            image: record.image,
            created_at: record.created_at,
        })
    }
}

/// Normalize an email address by lower-casing the domain part
///
/// The local part keeps its case. Input without an `@` is returned trimmed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Path under which a stored image reference is served
pub fn media_url(reference: &str) -> String {
    format!("/media/{}", reference)
}

/// Public projection of an account (never carries the password hash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub gender: Gender,
    pub user_type: Role,
    pub is_active: bool,
    pub image: Option<String>,
    /// Only exposed to super-user callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_staff: Option<bool>,
    /// Only exposed to super-user callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
}

impl AccountView {
    /// Include the staff/superuser flags
    pub fn with_privileges(mut self, account: &Account) -> Self {
        self.is_staff = Some(account.is_staff);
        self.is_superuser = Some(account.is_superuser);
        self
    }
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            gender: account.gender,
            user_type: account.role,
            is_active: account.is_active,
            image: account.image.as_deref().map(media_url),
            is_staff: None,
            is_superuser: None,
        }
    }
}

/// Registration request
///
/// `gender` and `user_type` stay as strings so that unknown values surface
/// as validation errors rather than body rejections.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
    pub gender: Option<String>,
    pub user_type: Option<String>,
    pub is_active: Option<bool>,
}

/// Profile update request (only name and password are honored)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

/// Token pair returned by login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// Refresh and logout request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Access token returned by refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Flatten validator errors into a single message
pub fn validation_message(errors: validator::ValidationErrors) -> AccountError {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let messages: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            format!("{}: {}", field, messages.join(" "))
        })
        .collect();
    parts.sort();
    AccountError::Validation(parts.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_lowercases_domain_only() {
        assert_eq!(normalize_email("Test1@EXAMPLE.com"), "Test1@example.com");
        assert_eq!(normalize_email("test2@Example.com"), "test2@example.com");
        assert_eq!(normalize_email("TEST3@EXAMPLE.COM"), "TEST3@example.com");
        assert_eq!(normalize_email("test4@example.COM"), "test4@example.com");
    }

    #[test]
    fn test_normalize_email_is_idempotent() {
        for raw in ["A@X.COM", " b@Y.org ", "plain", "we@ird@Host.IO", ""] {
            let once = normalize_email(raw);
            assert_eq!(normalize_email(&once), once);
        }
    }

    #[test]
    fn test_role_round_trip_and_rejects_unknown() {
        for role in [Role::HomeSeeker, Role::PropertyOwner, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
        assert!(matches!(Role::parse("landlord"), Err(AccountError::Validation(_))));
        assert!(Role::parse("Admin").is_err());
    }

    #[test]
    fn test_gender_rejects_unknown() {
        assert_eq!(Gender::parse("F").unwrap(), Gender::Female);
        assert!(matches!(Gender::parse("X"), Err(AccountError::Validation(_))));
    }

    #[test]
    fn test_account_view_hides_privileges_by_default() {
        let view = AccountView {
            id: "1".into(),
            email: "a@x.com".into(),
            name: String::new(),
            gender: Gender::Male,
            user_type: Role::HomeSeeker,
            is_active: true,
            image: None,
            is_staff: None,
            is_superuser: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("is_staff").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["user_type"], "home_seeker");
        assert_eq!(json["gender"], "M");
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            password: "pw".into(),
            name: String::new(),
            gender: Some("M".into()),
            user_type: Some("home_seeker".into()),
            is_active: None,
        };
        let err = validation_message(req.validate().unwrap_err());
        let msg = err.to_string();
        assert!(msg.contains("email"));
        assert!(msg.contains("password"));
    }
}
