use super::serialization::{FRAME_PREFIX, HEADER_LEN};
use crate::domain::{InfoSummary, ResultCode, SendResult, ServerResponse};
use bytes::Buf;
use regex::Regex;

/// Interprets the server's acknowledgement body.
///
/// Returning `None` means the body does not have the expected shape.
pub trait ResponseInterpreter: Send + Sync {
    fn interpret(&self, response: &ServerResponse) -> Option<InfoSummary>;
}

/// Reads the failure count out of the free-text `info` field, e.g.
/// `processed: 3; failed: 1; total: 4; seconds spent: 0.000123`.
#[derive(Debug, Clone)]
pub struct FailureCountInterpreter {
    failed: Regex,
    processed: Regex,
    total: Regex,
    seconds: Regex,
}

impl FailureCountInterpreter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            failed: Regex::new(r"^.*failed.+?(\d+).*$")?,
            processed: Regex::new(r"processed:?\s*(\d+)")?,
            total: Regex::new(r"total:?\s*(\d+)")?,
            seconds: Regex::new(r"(?:seconds|time) spent:?\s*(\d*\.?\d+)")?,
        })
    }

    fn capture<T: std::str::FromStr>(regex: &Regex, text: &str) -> Option<T> {
        regex
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl ResponseInterpreter for FailureCountInterpreter {
    fn interpret(&self, response: &ServerResponse) -> Option<InfoSummary> {
        let info = response.info.as_deref().unwrap_or_default().to_lowercase();
        let failed = Self::capture(&self.failed, &info)?;

        Some(InfoSummary {
            failed,
            processed: Self::capture(&self.processed, &info),
            total: Self::capture(&self.total, &info),
            seconds_spent: Self::capture(&self.seconds, &info),
        })
    }
}

/// Turns raw response bytes into a classified [`SendResult`].
pub struct ResponseDecoder {
    interpreter: Box<dyn ResponseInterpreter>,
}

impl ResponseDecoder {
    pub fn new(interpreter: impl ResponseInterpreter + 'static) -> Self {
        Self {
            interpreter: Box::new(interpreter),
        }
    }

    /// `sent` is the JSON request the response answers; it is echoed in
    /// framing errors so the offending batch can be inspected.
    pub fn decode(&self, raw: &[u8], sent: &str) -> SendResult {
        if !raw.starts_with(FRAME_PREFIX) || raw.len() < HEADER_LEN {
            return invalid_response(sent);
        }

        // Only the low half of the 8-byte length field is significant.
        let mut length_field = &raw[FRAME_PREFIX.len()..HEADER_LEN];
        let declared = length_field.get_u32_le() as usize;

        let body = &raw[HEADER_LEN..];
        if body.len() < declared {
            return invalid_response(sent);
        }

        let value: serde_json::Value = match serde_json::from_slice(&body[..declared]) {
            Ok(value) => value,
            Err(_) => return invalid_response(sent),
        };
        let response = ServerResponse::from_value(value);

        match self.interpreter.interpret(&response) {
            None => SendResult::from_response(ResultCode::ParseError, response, None),
            Some(summary) if summary.failed > 0 => {
                SendResult::from_response(ResultCode::SendFailed, response, Some(summary))
            }
            Some(summary) => SendResult::from_response(ResultCode::Ok, response, Some(summary)),
        }
    }
}

fn invalid_response(sent: &str) -> SendResult {
    SendResult::from_error(
        ResultCode::InvalidResponse,
        format!("Invalid response from server. Malformed data?\n---\n{sent}\n---"),
    )
}
