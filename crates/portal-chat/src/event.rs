use serde::Deserialize;

/// One decoded `data:` record of the reply stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text content delta
    Chunk { content: String },
    /// Stream finished; the server may hand out a (new) session id
    Done { session_id: Option<String> },
    /// Server-side failure
    Error { message: Option<String> },
}

impl StreamEvent {
    /// Create a chunk event
    pub fn chunk(content: impl Into<String>) -> Self {
        Self::Chunk {
            content: content.into(),
        }
    }

    /// Create a done event
    pub fn done(session_id: Option<&str>) -> Self {
        Self::Done {
            session_id: session_id.map(str::to_string),
        }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: Some(message.into()),
        }
    }

    /// Parse the JSON payload that follows `data: `.
    ///
    /// Returns `Ok(None)` for well-formed records of a type this client does
    /// not handle.
    pub fn parse_data(payload: &str) -> serde_json::Result<Option<Self>> {
        let raw: RawEvent = serde_json::from_str(payload)?;
        let event = match raw.event_type.as_str() {
            "chunk" => Self::Chunk {
                content: raw.content.unwrap_or_default(),
            },
            "done" => Self::Done {
                session_id: raw.session_id.filter(|id| !id.is_empty()),
            },
            "error" => Self::Error { message: raw.error },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    content: Option<String>,
    session_id: Option<String>,
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk() {
        let event = StreamEvent::parse_data(r#"{"type":"chunk","content":"您好"}"#).unwrap();
        assert_eq!(event, Some(StreamEvent::chunk("您好")));
    }

    #[test]
    fn test_parse_done_with_and_without_session() {
        let event = StreamEvent::parse_data(r#"{"type":"done","session_id":"S1"}"#).unwrap();
        assert_eq!(event, Some(StreamEvent::done(Some("S1"))));

        let event = StreamEvent::parse_data(r#"{"type":"done"}"#).unwrap();
        assert_eq!(event, Some(StreamEvent::done(None)));

        let event = StreamEvent::parse_data(r#"{"type":"done","session_id":null}"#).unwrap();
        assert_eq!(event, Some(StreamEvent::done(None)));
    }

    #[test]
    fn test_parse_error_reads_error_field() {
        let event = StreamEvent::parse_data(r#"{"type":"error","error":"oops"}"#).unwrap();
        assert_eq!(event, Some(StreamEvent::error("oops")));

        let event = StreamEvent::parse_data(r#"{"type":"error"}"#).unwrap();
        assert_eq!(event, Some(StreamEvent::Error { message: None }));
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let event = StreamEvent::parse_data(r#"{"type":"ping"}"#).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_malformed_payload_is_error() {
        assert!(StreamEvent::parse_data(r#"{"type":"chunk","#).is_err());
        assert!(StreamEvent::parse_data(r#"{"content":"no type"}"#).is_err());
    }
}
