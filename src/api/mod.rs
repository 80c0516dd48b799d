/// API routes and handlers
pub mod me;
pub mod media;
pub mod middleware;
pub mod token;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(users::routes())
        .merge(me::routes())
        .merge(token::routes())
        .merge(media::routes())
}
