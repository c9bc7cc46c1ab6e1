use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::outcome::{ApiFailure, ApiOutcome, FailureKind, RawResponse};

/// Keys checked, in order, for a server-provided error message.
const MESSAGE_KEYS: &[&str] = &["message", "error", "detail"];

/// Classify a received response. Never panics and never errors: every path
/// ends in an `ApiOutcome`.
pub fn validate(response: &RawResponse, context: &str) -> ApiOutcome {
    let status = response.status;
    debug!(status, context, bytes = response.body.len(), "validating response");

    match status {
        200..=299 => match decode_body(response) {
            Ok(json) => ApiOutcome::Success(json),
            Err(e) => failure(
                FailureKind::DecodeError,
                context,
                Some(status),
                format!("invalid JSON body: {}", e),
                Some(response.text()),
            ),
        },
        400..=499 => failure(
            FailureKind::ClientError,
            context,
            Some(status),
            error_message(response),
            Some(response.text()),
        ),
        500..=u16::MAX => failure(
            FailureKind::ServerError,
            context,
            Some(status),
            error_message(response),
            Some(response.text()),
        ),
        _ => failure(
            FailureKind::Unexpected,
            context,
            Some(status),
            format!("unexpected status {}", status_line(status)),
            Some(response.text()),
        ),
    }
}

/// Same as [`validate`], but also classifies transport errors (nothing was
/// received, so there is no status and no body).
pub fn validate_transport(
    result: Result<RawResponse, reqwest::Error>,
    context: &str,
) -> ApiOutcome {
    match result {
        Ok(response) => validate(&response, context),
        Err(e) => {
            let kind = if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
                || e.is_decode()
            {
                FailureKind::TransportError
            } else {
                FailureKind::Unexpected
            };
            failure(kind, context, e.status().map(|s| s.as_u16()), e.to_string(), None)
        }
    }
}

fn failure(
    kind: FailureKind,
    context: &str,
    status: Option<u16>,
    message: String,
    raw_text: Option<String>,
) -> ApiOutcome {
    ApiOutcome::Failure(ApiFailure {
        kind,
        context: context.to_string(),
        status,
        message,
        raw_text,
    })
}

fn decode_body(response: &RawResponse) -> Result<Value, serde_json::Error> {
    match &response.json {
        Some(json) => Ok(json.clone()),
        None => serde_json::from_slice(&response.body),
    }
}

/// Best-effort message for an error response: a conventional key from a JSON
/// object body, else the raw text, else the status line.
fn error_message(response: &RawResponse) -> String {
    if let Ok(Value::Object(map)) = decode_body(response) {
        let found = MESSAGE_KEYS.iter().find_map(|key| match map.get(*key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        });
        if let Some(msg) = found {
            return msg;
        }
    }

    let text = response.text();
    if text.trim().is_empty() {
        status_line(response.status)
    } else {
        text
    }
}

fn status_line(status: u16) -> String {
    match StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
    {
        Some(reason) => format!("{} {}", status, reason),
        None => format!("HTTP {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind_of(outcome: &ApiOutcome) -> Option<FailureKind> {
        outcome.failure().map(|f| f.kind)
    }

    #[test]
    fn success_returns_body_unmodified() {
        let body = json!({"user_id": "0af3", "nested": {"a": [1, 2.5, null]}});
        let resp = RawResponse::new(200, serde_json::to_vec(&body).unwrap());
        assert_eq!(validate(&resp, "login"), ApiOutcome::Success(body));
    }

    #[test]
    fn success_prefers_predecoded_json() {
        let resp = RawResponse::new(204, Vec::new()).with_json(json!([1, 2]));
        assert_eq!(validate(&resp, "login"), ApiOutcome::Success(json!([1, 2])));
    }

    #[test]
    fn success_with_broken_body_is_decode_error() {
        let resp = RawResponse::new(200, "<html>maintenance</html>");
        let outcome = validate(&resp, "user overview retrieval");
        assert_eq!(kind_of(&outcome), Some(FailureKind::DecodeError));
        let f = outcome.failure().unwrap();
        assert_eq!(f.raw_text.as_deref(), Some("<html>maintenance</html>"));
        assert_eq!(f.status, Some(200));
    }

    #[test]
    fn unauthorized_uses_message_key() {
        let resp = RawResponse::new(401, r#"{"message":"Login failed"}"#);
        let outcome = validate(&resp, "user id retrieval");
        let f = outcome.failure().expect("should fail");
        assert_eq!(f.kind, FailureKind::ClientError);
        assert_eq!(f.message, "Login failed");
        assert_eq!(f.raw_text.as_deref(), Some(r#"{"message":"Login failed"}"#));
    }

    #[test]
    fn message_keys_are_checked_in_order() {
        let resp = RawResponse::new(
            404,
            r#"{"detail":"third","error":"second","status":404}"#,
        );
        assert_eq!(validate(&resp, "x").failure().unwrap().message, "second");

        let resp = RawResponse::new(422, r#"{"message":"","detail":"only detail"}"#);
        assert_eq!(validate(&resp, "x").failure().unwrap().message, "only detail");

        let resp = RawResponse::new(400, r#"{"error":{"code":7}}"#);
        assert_eq!(validate(&resp, "x").failure().unwrap().message, r#"{"code":7}"#);
    }

    #[test]
    fn object_without_known_keys_falls_back_to_text() {
        let body = r#"{"status":403}"#;
        let resp = RawResponse::new(403, body);
        assert_eq!(validate(&resp, "x").failure().unwrap().message, body);
    }

    #[test]
    fn json_array_body_falls_back_to_text() {
        let resp = RawResponse::new(400, r#"["bad"]"#);
        assert_eq!(validate(&resp, "x").failure().unwrap().message, r#"["bad"]"#);
    }

    #[test]
    fn server_error_with_plain_text() {
        let resp = RawResponse::new(500, "oops");
        let outcome = validate(&resp, "user overview retrieval");
        let f = outcome.failure().unwrap();
        assert_eq!(f.kind, FailureKind::ServerError);
        assert_eq!(f.message, "oops");
        assert_eq!(f.status, Some(500));
    }

    #[test]
    fn empty_error_body_uses_status_line() {
        let resp = RawResponse::new(503, "");
        assert_eq!(
            validate(&resp, "x").failure().unwrap().message,
            "503 Service Unavailable"
        );
    }

    #[test]
    fn redirects_and_informational_are_unexpected() {
        for status in [101, 302, 399] {
            let outcome = validate(&RawResponse::new(status, ""), "x");
            assert_eq!(kind_of(&outcome), Some(FailureKind::Unexpected), "{}", status);
        }
    }

    #[test]
    fn transport_ok_delegates_to_validate() {
        let resp = RawResponse::new(200, "{}");
        assert_eq!(
            validate_transport(Ok(resp), "x"),
            ApiOutcome::Success(json!({}))
        );
    }

    #[tokio::test]
    async fn transport_connect_failure_has_no_status() {
        // Port 9 on loopback is closed on any sane test host.
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:9/")
            .send()
            .await
            .expect_err("connect must fail");
        let outcome = validate_transport(Err(err), "user id retrieval");
        let f = outcome.failure().unwrap();
        assert_eq!(f.kind, FailureKind::TransportError);
        assert_eq!(f.status, None);
        assert_eq!(f.raw_text, None);
    }

    #[tokio::test]
    async fn transport_builder_failure_is_unexpected() {
        let err = reqwest::Client::new()
            .get("not a url")
            .send()
            .await
            .expect_err("builder must fail");
        let outcome = validate_transport(Err(err), "x");
        assert_eq!(kind_of(&outcome), Some(FailureKind::Unexpected));
    }
}
