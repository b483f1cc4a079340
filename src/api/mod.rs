pub mod auth;
pub mod error;
mod events;
mod extract;
mod interviews;
mod live;
pub mod metrics;
mod system;
mod users;
mod validation;


use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let session_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/session", get(auth::session));

    let user_routes = Router::new()
        .route("/users", put(users::create_user))
        .route("/users/:email", get(users::get_user).patch(users::update_user))
        .route("/users/:email/changepwd", post(users::change_password))
        .route("/users/:email/resetpwd", post(users::reset_password))
        .route("/users/:email/interviews", get(users::user_interviews))
        .route("/users/:email/events/notregistered", get(users::events_not_registered))
        .route("/users/:email/events/registered", get(users::events_registered))
        .route("/users/:email/events/approved", get(users::events_approved));

    let event_routes = Router::new()
        .route("/events", put(events::create_event).get(events::list_events))
        .route(
            "/events/:event_name",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:event_name/register", post(events::register))
        .route("/events/:event_name/registrations", get(events::list_registrations))
        .route("/events/:event_name/approve", post(events::approve))
        .route("/events/:event_name/registered", get(events::list_approved));

    let interview_routes = Router::new()
        .route(
            "/events/:event_name/interviews",
            put(interviews::create_interview).get(interviews::list_interviews),
        )
        .route(
            "/events/:event_name/interviews/:id",
            get(interviews::get_interview)
                .patch(interviews::update_interview)
                .delete(interviews::delete_interview),
        )
        .route("/events/:event_name/interviews/:id/start", post(live::start))
        .route("/events/:event_name/interviews/:id/end", post(live::end))
        .route("/events/:event_name/interviews/:id/setlang", post(live::set_language))
        .route("/compile", post(live::compile));

    let mut router = Router::new()
        .route("/time", get(system::current_time))
        .route("/health", get(system::health))
        .route("/metrics", get(metrics::metrics_endpoint))
        .merge(session_routes)
        .merge(user_routes)
        .merge(event_routes)
        .merge(interview_routes)
        .fallback(extract::unknown_route)
        .layer(middleware::from_fn(metrics::metrics_middleware));

    if state.config.server.environment.is_development() {
        router = router.layer(middleware::from_fn(error::expose_diagnostics));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
