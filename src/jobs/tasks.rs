/// Background task implementations
use crate::{context::AppContext, db, error::AccountResult};

/// Drop expired refresh tokens from the outstanding and blacklist ledgers
///
/// Returns the number of ledger rows removed.
pub async fn flush_expired_tokens(ctx: &AppContext) -> AccountResult<u64> {
    let (outstanding, blacklisted) = ctx.session_manager.flush_expired_tokens().await?;
    Ok(outstanding + blacklisted)
}

/// Verify the account database answers
pub async fn health_check(ctx: &AppContext) -> AccountResult<()> {
    db::test_connection(&ctx.account_db).await
}
