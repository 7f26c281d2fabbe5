//! Handlers for the demonstration site.
//!
//! Each [`SiteRoute`] maps to one handler; [`dispatch`] is the function the
//! routing stage calls once a request has been parsed.

mod client;
mod echo;
mod health;

use std::sync::Arc;

use axum::response::{IntoResponse, Response};

use crate::error::AppResult;
use crate::routes::SiteRoute;
use crate::state::AppState;

pub use client::{consent, whoami};
pub use echo::echo;
pub use health::{health_check, home, robots};

/// Run the handler for `route`.
pub async fn dispatch(route: SiteRoute, state: Arc<AppState>) -> AppResult<Response> {
    let response = match route {
        SiteRoute::Home => home(),
        SiteRoute::Health => health_check(state.environment).into_response(),
        SiteRoute::Robots => robots(),
        SiteRoute::Echo(message) => echo(&message)?.into_response(),
        SiteRoute::Consent(request) => consent(&state, &request.choice)?,
        SiteRoute::WhoAmI => whoami()?.into_response(),
    };
    Ok(response)
}
