use axum::{
    Router,
    routing::{get, post},
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::applications::{self, APPLICATIONS_PATH};
use crate::config::{
    AUTHORIZE_PATH, CALLBACK_PATH, DISCOVERY_PATH, LOGIN_PATH, RESOURCE_PATH, TOKEN_PATH,
};
use crate::identity;
use crate::relying_party;
use crate::state::SharedState;

/// Relying party, identity provider and application management on one origin
pub(crate) fn site_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(relying_party::home))
        .route(RESOURCE_PATH, get(relying_party::about))
        .route(
            CALLBACK_PATH,
            get(relying_party::signin_get).post(relying_party::signin_post),
        )
        .route(&DISCOVERY_PATH, get(identity::openid_configuration))
        .route(&AUTHORIZE_PATH, get(identity::authorize))
        .route(
            &LOGIN_PATH,
            get(identity::login_page).post(identity::login_submit),
        )
        .route(&TOKEN_PATH, post(identity::token))
        .route(
            &format!("{APPLICATIONS_PATH}/{{client_id}}"),
            get(applications::application),
        )
        .route(
            &format!("{APPLICATIONS_PATH}/{{client_id}}/RedirectUris/Remove"),
            get(applications::remove_redirect_uri_page).post(applications::remove_redirect_uri),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}
