/// Authentication extractors
use crate::{
    account::Account,
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::AccountError,
    policy::Caller,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated caller resolved from a bearer access token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub caller: Caller,
    pub account: Account,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AccountError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            AccountError::Authentication(
                "Authentication credentials were not provided.".to_string(),
            )
        })?;

        let account = state.session_manager.validate_access_token(&token).await?;

        Ok(AuthContext {
            caller: Caller::from(&account),
            account,
        })
    }
}

/// Optional authenticated context
///
/// No header means anonymous. A header carrying an invalid token is still
/// rejected, so a stale token never silently downgrades to anonymous.
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub auth: Option<AuthContext>,
}

impl OptionalAuthContext {
    pub fn caller(&self) -> Option<&Caller> {
        self.auth.as_ref().map(|auth| &auth.caller)
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = AccountError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        if extract_bearer_token(&parts.headers).is_none() {
            return Ok(OptionalAuthContext { auth: None });
        }

        let auth = AuthContext::from_request_parts(parts, state).await?;
        Ok(OptionalAuthContext { auth: Some(auth) })
    }
}
