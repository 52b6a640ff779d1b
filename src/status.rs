use axum::{
    debug_handler,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};

use crate::{clock, db::Store, AppError, AppResult, AppState, GetUser, NO_SUCH_PARTICIPANT};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", post(keep_alive))
}

/// Marks the `user` as still around so the sweeper leaves them be.
#[debug_handler(state = AppState)]
pub(crate) async fn keep_alive(State(store): State<Store>, headers: HeaderMap) -> AppResult<Response> {
    let Some(user) = headers.user() else {
        return Err(AppError::NotFound(NO_SUCH_PARTICIPANT));
    };

    if !store.touch(&user, clock::now_millis()).await? {
        return Err(AppError::NotFound(NO_SUCH_PARTICIPANT));
    }

    Ok((StatusCode::OK, "Status atualizado com sucesso").into_response())
}
