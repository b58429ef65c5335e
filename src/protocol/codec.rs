//! Line-delimited JSON wire codec
//!
//! Requests are one compact JSON object followed by `\n`. The stream is
//! closed by the caller after the line is written; the close is the
//! end-of-input signal. Responses are read as one JSON object, which may span
//! several lines when a demo pretty-prints its echo.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{Error, Result};

use super::types::{Envelope, Response};

/// Largest response accepted from a demo process
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Encode an envelope as a single newline-terminated line
///
/// serde_json escapes control characters inside strings, so multiline field
/// values never break the one-line framing.
pub fn encode_line(envelope: &Envelope) -> Result<String> {
    let mut line = serde_json::to_string(envelope)?;
    line.push('\n');
    Ok(line)
}

/// Write an envelope to the stream and flush it
pub async fn write_envelope<W: AsyncWrite + Unpin>(writer: &mut W, envelope: &Envelope) -> Result<()> {
    let line = encode_line(envelope)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one response envelope from the stream
pub async fn read_envelope<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Response> {
    let mut text = String::new();

    loop {
        let bytes_read = reader.read_line(&mut text).await?;

        if bytes_read == 0 {
            if text.trim().is_empty() {
                return Err(Error::protocol(
                    "demo closed its output without sending a response",
                    text,
                ));
            }
            return Err(Error::protocol(
                "response ended before the JSON object was complete",
                text,
            ));
        }

        if text.len() > MAX_RESPONSE_BYTES {
            return Err(Error::protocol(
                format!("response exceeds {} bytes", MAX_RESPONSE_BYTES),
                String::new(),
            ));
        }

        if text.trim().is_empty() {
            text.clear();
            continue;
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => return decode_envelope(value, &text),
            // Incomplete object; keep reading lines
            Err(e) if e.is_eof() => continue,
            Err(e) => {
                return Err(Error::protocol(format!("malformed JSON response: {}", e), text));
            }
        }
    }
}

/// Decode a parsed JSON value as a response envelope
///
/// Only the shape is checked here: `builder_models` must be an object. Its
/// values are left for the verifier, which reports bad ones per field.
pub fn decode_envelope(value: Value, raw: &str) -> Result<Response> {
    let Value::Object(mut object) = value else {
        return Err(Error::protocol("response is not a JSON object", raw));
    };
    match object.remove("builder_models") {
        Some(Value::Object(builder_models)) => Ok(Envelope { builder_models }),
        Some(other) => Err(Error::protocol(
            format!("'builder_models' must be an object, got {}", other),
            raw,
        )),
        None => Err(Error::protocol("response is missing 'builder_models'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Fixture;
    use serde_json::json;
    use std::io::Cursor;
    use tokio::io::BufReader;

    fn sample() -> Envelope {
        Envelope::new(
            Fixture::from_value(json!({
                "textbuffer": "Well, isn't this interesting\nA multiline piece of test!\n",
                "adjustment": 1.234,
            }))
            .unwrap(),
        )
    }

    #[test]
    fn test_encode_is_single_line() {
        let line = encode_line(&sample()).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.starts_with(r#"{"builder_models":{"#));
    }

    #[tokio::test]
    async fn test_write_envelope() {
        let mut output = Vec::new();
        write_envelope(&mut output, &sample()).await.unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), encode_line(&sample()).unwrap());
    }

    #[tokio::test]
    async fn test_read_single_line() {
        let data = encode_line(&sample()).unwrap();
        let mut reader = BufReader::new(Cursor::new(data.into_bytes()));
        let response = read_envelope(&mut reader).await.unwrap();
        assert_eq!(
            Value::Object(response.builder_models),
            serde_json::to_value(&sample().builder_models).unwrap()
        );
    }

    #[tokio::test]
    async fn test_read_pretty_printed_response() {
        let data = b"{\n\"builder_models\": {\n  \"togglebutton\": true,\n  \"entrybuffer\": \"Hello World\"\n}\n}\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));
        let response = read_envelope(&mut reader).await.unwrap();
        assert_eq!(
            response.builder_models.get("entrybuffer"),
            Some(&json!("Hello World"))
        );
    }

    #[tokio::test]
    async fn test_read_response_with_extra_nested_model() {
        let data = b"{\"builder_models\":{\"adjustment\":1.234,\"panzoom\":{\"offset_x\":0}}}\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));
        let response = read_envelope(&mut reader).await.unwrap();
        assert_eq!(response.builder_models.get("adjustment"), Some(&json!(1.234)));
        assert_eq!(response.builder_models.get("panzoom"), Some(&json!({"offset_x": 0})));
    }

    #[tokio::test]
    async fn test_read_response_with_null_value() {
        let data = b"{\"builder_models\":{\"adjustment\":null,\"entrybuffer\":\"x\"}}\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));
        let response = read_envelope(&mut reader).await.unwrap();
        assert_eq!(response.builder_models.get("adjustment"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_read_builder_models_not_an_object() {
        let mut reader = BufReader::new(Cursor::new(b"{\"builder_models\": [1]}\n".to_vec()));
        let err = read_envelope(&mut reader).await.unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[tokio::test]
    async fn test_read_empty_stream() {
        let mut reader = BufReader::new(Cursor::new(Vec::new()));
        let err = read_envelope(&mut reader).await.unwrap_err();
        assert!(err.to_string().contains("without sending a response"));
    }

    #[tokio::test]
    async fn test_read_truncated_object() {
        let mut reader = BufReader::new(Cursor::new(b"{\"builder_models\": {\"a\":".to_vec()));
        let err = read_envelope(&mut reader).await.unwrap_err();
        assert!(err.to_string().contains("before the JSON object was complete"));
        assert_eq!(err.payload(), Some("{\"builder_models\": {\"a\":"));
    }

    #[tokio::test]
    async fn test_read_malformed() {
        let mut reader = BufReader::new(Cursor::new(b"not json\n".to_vec()));
        let err = read_envelope(&mut reader).await.unwrap_err();
        assert!(err.to_string().contains("malformed JSON"));
        assert_eq!(err.payload(), Some("not json\n"));
    }

    #[tokio::test]
    async fn test_read_missing_builder_models() {
        let mut reader = BufReader::new(Cursor::new(b"{\"models\": {}}\n".to_vec()));
        let err = read_envelope(&mut reader).await.unwrap_err();
        assert!(err.to_string().contains("missing 'builder_models'"));
    }
}
