use axum::{debug_handler, extract::State, http::StatusCode, response::{IntoResponse, Response}};
use serde::Deserialize;

use crate::{clock, db::Store, validate::{self, Payload, Schema, Valid}, AppError, AppResult, AppState, NAME_TAKEN};

#[derive(Debug, Deserialize)]
pub(crate) struct NewParticipant {
    name: String,
}

impl Payload for NewParticipant {
    const SCHEMA: Schema = validate::PARTICIPANT;
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(store): State<Store>,
    Valid(NewParticipant { name }): Valid<NewParticipant>,
) -> AppResult<Response> {
    if !store.register(&name, clock::now_millis(), clock::wall_clock()?).await? {
        return Err(AppError::Conflict(NAME_TAKEN));
    }

    tracing::info!(%name, "participant joined");

    Ok((StatusCode::CREATED, "Participante cadastrado com sucesso!").into_response())
}
