pub mod appresult;
pub mod clock;
pub mod config;
pub mod db;
pub mod messages;
pub mod participants;
pub mod status;
pub mod sweeper;
pub mod validate;

use axum::{extract::FromRef, http::HeaderMap, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use config::{Config, LimitMode};
pub use db::Store;

pub(crate) const NAME_TAKEN: &str = "Esse nome já existe";
pub(crate) const NO_SUCH_PARTICIPANT: &str = "Esse participante não existe";

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Store,
    pub limit_mode: LimitMode,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(participants::router())
        .merge(messages::router())
        .merge(status::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Who a request speaks for, taken from the `user` header. Browsers send
/// non-ASCII names as latin-1, other clients as UTF-8; both are accepted.
pub trait GetUser {
    fn user(&self) -> Option<String>;
}

impl GetUser for HeaderMap {
    fn user(&self) -> Option<String> {
        let bytes = self.get("user")?.as_bytes();
        let user = match std::str::from_utf8(bytes) {
            Ok(user) => user.to_owned(),
            Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
        };

        Some(user).filter(|user| !user.is_empty())
    }
}
