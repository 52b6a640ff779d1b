use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{AppError, AppResult};

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Required, a string, not empty.
    Text,
    /// Required, one of the listed strings.
    OneOf(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [(&'static str, Rule)],
}

pub const PARTICIPANT: Schema = Schema {
    fields: &[("name", Rule::Text)],
};

pub const MESSAGE: Schema = Schema {
    fields: &[
        ("to", Rule::Text),
        ("text", Rule::Text),
        ("type", Rule::OneOf(&["message", "private_message", "status"])),
    ],
};

impl Schema {
    /// Checks `body` against every rule and reports all violations at once.
    /// Keys the schema doesn't name are violations too.
    pub fn validate(&self, body: &Value) -> Result<(), Vec<String>> {
        let Some(object) = body.as_object() else {
            return Err(vec![r#""value" must be of type object"#.to_owned()]);
        };

        let mut errors: Vec<String> = self
            .fields
            .iter()
            .filter_map(|(field, rule)| check(field, *rule, object))
            .collect();

        errors.extend(
            object
                .keys()
                .filter(|key| !self.fields.iter().any(|(field, _)| *field == key.as_str()))
                .map(|key| format!(r#""{key}" is not allowed"#)),
        );

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn check(field: &str, rule: Rule, object: &Map<String, Value>) -> Option<String> {
    let Some(value) = object.get(field) else {
        return Some(format!(r#""{field}" is required"#));
    };
    let Some(value) = value.as_str() else {
        return Some(format!(r#""{field}" must be a string"#));
    };

    match rule {
        Rule::Text if value.is_empty() => Some(format!(r#""{field}" is not allowed to be empty"#)),
        Rule::Text => None,
        Rule::OneOf(allowed) if !allowed.iter().any(|option| *option == value) => {
            Some(format!(r#""{field}" must be one of [{}]"#, allowed.join(", ")))
        }
        Rule::OneOf(_) => None,
    }
}

/// A request payload with a schema of its own.
pub trait Payload: DeserializeOwned {
    const SCHEMA: Schema;
}

/// Extracts a JSON body, whatever its content type, and checks it against
/// `T::SCHEMA`. An empty body counts as `{}`; one that isn't JSON fails the
/// schema.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: Payload,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> AppResult<Self> {
        let bytes = Bytes::from_request(req, state).await?;
        let body = parse_body(&bytes);

        T::SCHEMA.validate(&body).map_err(AppError::Invalid)?;

        Ok(Valid(serde_json::from_value(body)?))
    }
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Map::new());
    }
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}
