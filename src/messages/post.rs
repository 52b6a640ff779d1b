use axum::{debug_handler, extract::State, http::{HeaderMap, StatusCode}, response::{IntoResponse, Response}};
use serde::Deserialize;

use crate::{
    clock,
    db::{Message, MessageType, Store},
    validate::{self, Payload, Schema, Valid},
    AppError, AppResult, AppState, GetUser, NO_SUCH_PARTICIPANT,
};

#[derive(Debug, Deserialize)]
pub(crate) struct NewMessage {
    to: String,
    text: String,
    #[serde(rename = "type")]
    kind: MessageType,
}

impl Payload for NewMessage {
    const SCHEMA: Schema = validate::MESSAGE;
}

#[debug_handler(state = AppState)]
pub(crate) async fn post_message(
    State(store): State<Store>,
    headers: HeaderMap,
    Valid(NewMessage { to, text, kind }): Valid<NewMessage>,
) -> AppResult<Response> {
    let Some(from) = headers.user() else {
        return Err(AppError::Unprocessable);
    };

    if !store.participant_exists(&from).await? {
        return Err(AppError::NotFound(NO_SUCH_PARTICIPANT));
    }

    tracing::debug!(%from, %to, %kind, "message posted");
    store
        .insert_message(&Message {
            from,
            to,
            text,
            kind,
            time: clock::wall_clock()?,
        })
        .await?;

    Ok((StatusCode::CREATED, "Mensagem cadastrada com sucesso!").into_response())
}
