mod list;
mod post;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list::list_messages).post(post::post_message))
}
