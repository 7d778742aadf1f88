use axum::Router;

pub mod events;
pub mod system;
pub mod users;

pub fn router() -> Router {
    Router::new()
        .nest("/events", events::router())
        .nest("/users", users::router())
}
