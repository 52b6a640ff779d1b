use axum::{
    debug_handler,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::{db::{Message, Store}, AppError, AppResult, AppState, GetUser, LimitMode, NO_SUCH_PARTICIPANT};

#[debug_handler(state = AppState)]
pub(crate) async fn list_messages(
    State(store): State<Store>,
    State(limit_mode): State<LimitMode>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Response> {
    let Some(user) = headers.user() else {
        return Err(AppError::NotFound(NO_SUCH_PARTICIPANT));
    };

    if !store.participant_exists(&user).await? {
        return Err(AppError::NotFound(NO_SUCH_PARTICIPANT));
    }

    let messages = store.messages_for(&user).await?;

    Ok(select_page(messages, limit_from_query(&params), limit_mode).into_response())
}

/// `limit` as given once. Repeated, it can't be read as a number.
pub(crate) fn limit_from_query(params: &[(String, String)]) -> f64 {
    let mut limits = params.iter().filter(|(key, _)| key == "limit").map(|(_, value)| value.as_str());
    match (limits.next(), limits.next()) {
        (limit, None) => parse_limit(limit),
        _ => f64::NAN,
    }
}

/// Reads `limit` the lenient way browser clients send it: surrounding
/// whitespace ignored, blank means zero, `0x`/`0o`/`0b` prefixes and
/// `Infinity` accepted, anything else that isn't a decimal is NaN, as is an
/// absent limit.
pub(crate) fn parse_limit(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim) else {
        return f64::NAN;
    };
    if raw.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if raw.get(..2).is_some_and(|head| head.eq_ignore_ascii_case(prefix)) {
            return parse_radix(&raw[2..], radix);
        }
    }

    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if unsigned == "Infinity" {
        return if raw.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }

    // rules out the "inf" and "nan" spellings f64 parsing would accept
    if !unsigned.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
        return f64::NAN;
    }
    raw.parse().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0, |value: f64, c| c.to_digit(radix).map(|digit| value * f64::from(radix) + f64::from(digit)))
        .unwrap_or(f64::NAN)
}

#[derive(Debug, PartialEq)]
pub(crate) enum Page {
    Messages(Vec<Message>),
    /// The limit itself, answered in [`LimitMode::Legacy`].
    Raw(Value),
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        match self {
            Page::Messages(messages) => Json(messages).into_response(),
            Page::Raw(value) => Json(value).into_response(),
        }
    }
}

/// The last `ceil(limit)` messages in their original order. Negative limits
/// select nothing; zero and NaN are up to `mode`.
pub(crate) fn select_page(messages: Vec<Message>, limit: f64, mode: LimitMode) -> Page {
    if limit.is_nan() || limit == 0.0 {
        return match mode {
            LimitMode::All => Page::Messages(messages),
            LimitMode::Legacy if limit == 0.0 => Page::Raw(json!(0)),
            LimitMode::Legacy => Page::Raw(Value::Null),
        };
    }

    if limit < 0.0 {
        return Page::Messages(Vec::new());
    }

    // saturates for huge and infinite limits
    let take = (limit.ceil() as usize).min(messages.len());
    let skip = messages.len() - take;
    Page::Messages(messages.into_iter().skip(skip).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MessageType;

    fn numbered(count: usize) -> Vec<Message> {
        (1..=count)
            .map(|i| Message {
                from: "Alice".to_owned(),
                to: "Todos".to_owned(),
                text: i.to_string(),
                kind: MessageType::Message,
                time: "12:00:00".to_owned(),
            })
            .collect()
    }

    fn texts(page: Page) -> Vec<String> {
        match page {
            Page::Messages(messages) => messages.into_iter().map(|m| m.text).collect(),
            Page::Raw(value) => panic!("expected messages, got {value}"),
        }
    }

    #[test]
    fn limit_parsing() {
        assert!(parse_limit(None).is_nan());
        assert!(parse_limit(Some("lots")).is_nan());
        assert_eq!(parse_limit(Some("")), 0.0);
        assert_eq!(parse_limit(Some(" 3 ")), 3.0);
        assert_eq!(parse_limit(Some("-2")), -2.0);
        assert_eq!(parse_limit(Some("1.5")), 1.5);
        assert_eq!(parse_limit(Some("1e1")), 10.0);
    }

    #[test]
    fn limit_parsing_follows_browser_number_rules() {
        assert_eq!(parse_limit(Some("0x10")), 16.0);
        assert_eq!(parse_limit(Some("0B101")), 5.0);
        assert_eq!(parse_limit(Some("0o17")), 15.0);
        assert!(parse_limit(Some("0x")).is_nan());
        assert!(parse_limit(Some("0x1g")).is_nan());
        assert_eq!(parse_limit(Some("Infinity")), f64::INFINITY);
        assert_eq!(parse_limit(Some("-Infinity")), f64::NEG_INFINITY);
        assert!(parse_limit(Some("inf")).is_nan());
        assert!(parse_limit(Some("NaN")).is_nan());
        assert!(parse_limit(Some("infinity")).is_nan());
        assert!(parse_limit(Some("é")).is_nan());
    }

    #[test]
    fn repeated_limit_is_not_a_number() {
        let query = |pairs: &[(&str, &str)]| -> Vec<(String, String)> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        assert_eq!(limit_from_query(&query(&[("limit", "3")])), 3.0);
        assert!(limit_from_query(&query(&[])).is_nan());
        assert!(limit_from_query(&query(&[("limit", "1"), ("limit", "2")])).is_nan());
        assert_eq!(limit_from_query(&query(&[("other", "x"), ("limit", "2")])), 2.0);
    }

    #[test]
    fn takes_the_tail_in_order() {
        assert_eq!(texts(select_page(numbered(5), 2.0, LimitMode::All)), ["4", "5"]);
        assert_eq!(texts(select_page(numbered(5), 1.5, LimitMode::All)), ["4", "5"]);
        assert_eq!(texts(select_page(numbered(3), 10.0, LimitMode::All)), ["1", "2", "3"]);
        assert_eq!(texts(select_page(numbered(3), f64::INFINITY, LimitMode::Legacy)), ["1", "2", "3"]);
        assert!(texts(select_page(numbered(3), -1.0, LimitMode::All)).is_empty());
    }

    #[test]
    fn missing_limit_depends_on_mode() {
        assert_eq!(texts(select_page(numbered(3), f64::NAN, LimitMode::All)), ["1", "2", "3"]);
        assert_eq!(texts(select_page(numbered(3), 0.0, LimitMode::All)), ["1", "2", "3"]);
        assert_eq!(select_page(numbered(3), 0.0, LimitMode::Legacy), Page::Raw(json!(0)));
        assert_eq!(select_page(numbered(3), f64::NAN, LimitMode::Legacy), Page::Raw(Value::Null));
    }
}
