use axum::Router;

pub mod courses;
pub mod lessons;
pub mod system;
pub mod users;

pub fn router() -> Router {
    Router::new()
        .nest("/courses", courses::router())
        .nest("/lessons", lessons::router())
        .nest("/users", users::router())
}
