use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome classification of one request/response round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// The server reported zero failed data points.
    Ok,
    /// The server processed the request but reported at least one failure.
    SendFailed,
    /// The response was valid JSON but its `info` text could not be interpreted.
    ParseError,
    /// The response framing or body was malformed.
    InvalidResponse,
    /// The exchange failed at the transport level.
    ConnectionError,
}

impl ResultCode {
    /// Numeric code, stable across releases and used as the process exit code.
    pub fn code(self) -> u8 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::SendFailed => 1,
            ResultCode::ParseError => 2,
            ResultCode::InvalidResponse => 254,
            ResultCode::ConnectionError => 255,
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, ResultCode::Ok)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::Ok => "ok",
            ResultCode::SendFailed => "send_failed",
            ResultCode::ParseError => "parse_error",
            ResultCode::InvalidResponse => "invalid_response",
            ResultCode::ConnectionError => "connection_error",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

/// Parsed JSON body returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    /// The `response` field, usually `"success"`.
    pub response: Option<String>,
    /// Free-form processing summary, e.g. `processed: 3; failed: 0; ...`.
    pub info: Option<String>,
    /// The whole body as received.
    pub raw: serde_json::Value,
}

impl ServerResponse {
    pub fn from_value(raw: serde_json::Value) -> Self {
        let response = raw
            .get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let info = raw.get("info").and_then(|v| v.as_str()).map(str::to_string);
        Self {
            response,
            info,
            raw,
        }
    }
}

impl fmt::Display for ServerResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Figures extracted from the server's `info` text.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InfoSummary {
    pub failed: u64,
    pub processed: Option<u64>,
    pub total: Option<u64>,
    pub seconds_spent: Option<f64>,
}

/// What accompanies a result code: the server's reply, or a diagnostic text
/// when no usable reply was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Response(ServerResponse),
    Error(String),
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Response(response) => write!(f, "{response}"),
            ServerMessage::Error(text) => write!(f, "{text}"),
        }
    }
}

/// Result of a single batch transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    pub code: ResultCode,
    pub message: ServerMessage,
    pub summary: Option<InfoSummary>,
}

impl SendResult {
    pub fn from_response(
        code: ResultCode,
        response: ServerResponse,
        summary: Option<InfoSummary>,
    ) -> Self {
        Self {
            code,
            message: ServerMessage::Response(response),
            summary,
        }
    }

    pub fn from_error(code: ResultCode, text: impl Into<String>) -> Self {
        Self {
            code,
            message: ServerMessage::Error(text.into()),
            summary: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    /// Number of data points the server reported as failed, when the reply
    /// could be interpreted.
    pub fn failed_count(&self) -> Option<u64> {
        self.summary.map(|s| s.failed)
    }

    pub fn response(&self) -> Option<&ServerResponse> {
        match &self.message {
            ServerMessage::Response(response) => Some(response),
            ServerMessage::Error(_) => None,
        }
    }
}

impl fmt::Display for SendResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.code, self.message)
    }
}
