use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::GatewayError;

/// Unwrapped body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed JSON. Never `null`: empty bodies become `{}`.
    Json(Value),
    /// Raw bytes of a binary response, untouched.
    Binary {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

impl Payload {
    /// The empty structure returned in place of an absent body.
    pub fn empty() -> Self {
        Payload::Json(Value::Object(Map::new()))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Payload::Binary { .. })
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Binary { .. } => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Binary { .. } => None,
        }
    }

    /// Deserialize a JSON payload into a typed structure.
    pub fn parse<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.as_json().map(|value| T::deserialize(value))
    }

    pub(crate) fn from_body(content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }

        let essence = content_type.map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        });

        if let Some(ref mime) = essence {
            if !is_textual(mime) {
                return Payload::Binary {
                    content_type: content_type.map(str::to_string),
                    bytes,
                };
            }
        }

        // Textual bodies that fail to parse are handed back as a JSON string
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Null) => Self::empty(),
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Json(Value::String(String::from_utf8_lossy(&bytes).into_owned())),
        }
    }
}

fn is_textual(mime: &str) -> bool {
    mime.starts_with("text/")
        || mime == "application/json"
        || mime.ends_with("+json")
        || mime == "application/xml"
        || mime.ends_with("+xml")
        || mime == "application/javascript"
}

/// Turn a response into a payload, classifying non-success statuses.
pub(crate) async fn read_response(response: reqwest::Response) -> Result<Payload, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            status = status.as_u16(),
            body = %GatewayError::truncate_body(&body),
            "Request failed"
        );
        return Err(GatewayError::from_status(status, &body));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .bytes()
        .await
        .map_err(GatewayError::NetworkUnreachable)?;

    Ok(Payload::from_body(content_type.as_deref(), bytes.to_vec()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_body_is_empty_object() {
        assert_eq!(Payload::from_body(None, Vec::new()), Payload::empty());
        assert_eq!(Payload::from_body(Some("application/json"), Vec::new()), Payload::empty());
        assert_eq!(Payload::empty().as_json(), Some(&json!({})));
    }

    #[test]
    fn test_json_null_is_empty_object() {
        let payload = Payload::from_body(Some("application/json"), b"null".to_vec());
        assert_eq!(payload, Payload::empty());
    }

    #[test]
    fn test_json_body_is_unwrapped() {
        let payload = Payload::from_body(
            Some("application/json; charset=utf-8"),
            br#"{"name":"Ada"}"#.to_vec(),
        );
        assert_eq!(payload.into_json(), Some(json!({"name": "Ada"})));
    }

    #[test]
    fn test_vendor_json_is_textual() {
        let payload = Payload::from_body(Some("application/problem+json"), br#"[1,2]"#.to_vec());
        assert_eq!(payload.into_json(), Some(json!([1, 2])));
    }

    #[test]
    fn test_binary_body_is_untouched() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0, 1, 2];
        let payload = Payload::from_body(Some("image/png"), bytes.clone());
        assert_eq!(
            payload,
            Payload::Binary {
                content_type: Some("image/png".to_string()),
                bytes,
            }
        );
    }

    #[test]
    fn test_octet_stream_that_looks_like_json_stays_binary() {
        let payload = Payload::from_body(Some("application/octet-stream"), b"{}".to_vec());
        assert!(payload.is_binary());
        assert_eq!(payload.as_json(), None);
    }

    #[test]
    fn test_plain_text_becomes_string() {
        let payload = Payload::from_body(Some("text/plain"), b"pong".to_vec());
        assert_eq!(payload.into_json(), Some(Value::String("pong".to_string())));
    }

    #[test]
    fn test_missing_content_type_parses_json() {
        let payload = Payload::from_body(None, br#"{"ok":true}"#.to_vec());
        assert_eq!(payload.into_json(), Some(json!({"ok": true})));
    }

    #[test]
    fn test_parse_typed() {
        #[derive(serde::Deserialize)]
        struct Named {
            name: String,
        }

        let payload = Payload::Json(json!({"name": "Ada"}));
        let named: Named = payload.parse().unwrap().unwrap();
        assert_eq!(named.name, "Ada");

        let binary = Payload::Binary { content_type: None, bytes: vec![1] };
        assert!(binary.parse::<Named>().is_none());
    }
}
