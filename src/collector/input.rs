use crate::domain::DataPoint;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncReadExt;

/// Host placeholder replaced by the configured default host.
pub const DEFAULT_HOST_MARKER: &str = "-";

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
    #[error("IO error reading input: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses `host key [clock] value` lines into data points.
///
/// Tokens are whitespace separated and may be double-quoted (`\"` and `\\`
/// escapes). The value is the remainder of the line. Blank lines and lines
/// starting with `#` are skipped.
#[derive(Debug, Clone)]
pub struct InputParser {
    default_host: String,
    with_timestamps: bool,
}

impl InputParser {
    pub fn new(default_host: impl Into<String>, with_timestamps: bool) -> Self {
        Self {
            default_host: default_host.into(),
            with_timestamps,
        }
    }

    pub fn parse_str(&self, text: &str) -> Result<Vec<DataPoint>, InputError> {
        let mut points = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if let Some(point) = self.parse_line(index + 1, line)? {
                points.push(point);
            }
        }
        Ok(points)
    }

    /// Reads a file, or stdin when `path` is `-`.
    pub async fn read_path(&self, path: &Path) -> Result<Vec<DataPoint>, InputError> {
        let text = if path.as_os_str() == "-" {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        } else {
            tokio::fs::read_to_string(path).await?
        };
        self.parse_str(&text)
    }

    pub fn parse_line(&self, line_no: usize, line: &str) -> Result<Option<DataPoint>, InputError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let malformed = |reason: &str| InputError::MalformedLine {
            line: line_no,
            reason: reason.to_string(),
        };

        let (host, rest) = next_token(trimmed)
            .map_err(malformed)?
            .ok_or_else(|| malformed("missing host"))?;
        let (key, rest) = next_token(rest)
            .map_err(malformed)?
            .ok_or_else(|| malformed("missing key"))?;

        let (clock, rest) = if self.with_timestamps {
            let (raw, rest) = next_token(rest)
                .map_err(malformed)?
                .ok_or_else(|| malformed("missing timestamp"))?;
            let clock = raw
                .parse::<i64>()
                .map_err(|_| malformed(&format!("invalid timestamp '{raw}'")))?;
            (Some(clock), rest)
        } else {
            (None, rest)
        };

        let value = parse_value(rest).map_err(malformed)?;

        let host = if host == DEFAULT_HOST_MARKER {
            self.default_host.clone()
        } else {
            host
        };

        DataPoint::new(host, key, value, clock)
            .map(Some)
            .map_err(|e| malformed(&e.to_string()))
    }
}

/// Splits the next token off `input`, returning it with the remainder.
fn next_token(input: &str) -> Result<Option<(String, &str)>, &'static str> {
    let input = input.trim_start();
    if input.is_empty() {
        return Ok(None);
    }

    if input.starts_with('"') {
        let (token, consumed) = unquote(input)?;
        let rest = &input[consumed..];
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return Err("unexpected character after closing quote");
        }
        return Ok(Some((token, rest)));
    }

    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    Ok(Some((input[..end].to_string(), &input[end..])))
}

fn parse_value(rest: &str) -> Result<String, &'static str> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err("missing value");
    }
    if rest.starts_with('"') {
        let (value, consumed) = unquote(rest)?;
        if !rest[consumed..].trim().is_empty() {
            return Err("unexpected text after quoted value");
        }
        return Ok(value);
    }
    Ok(rest.to_string())
}

/// Decodes a double-quoted string at the start of `input`; returns it with the
/// number of bytes consumed including both quotes.
fn unquote(input: &str) -> Result<(String, usize), &'static str> {
    let mut out = String::new();
    let mut chars = input.char_indices().skip(1);

    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Ok((out, index + 1)),
            '\\' => match chars.next() {
                Some((_, escaped @ ('"' | '\\'))) => out.push(escaped),
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            other => out.push(other),
        }
    }

    Err("unterminated quoted string")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_timestamped_lines() {
        let plain = InputParser::new("localhost", false);
        let point = plain.parse_line(1, "web01 cpu.load 0.42").unwrap().unwrap();
        assert_eq!(point, DataPoint::new("web01", "cpu.load", "0.42", None).unwrap());

        let timed = InputParser::new("localhost", true);
        let point = timed
            .parse_line(1, "web01 cpu.load 1700000000 0.42")
            .unwrap()
            .unwrap();
        assert_eq!(point.clock, Some(1_700_000_000));
        assert_eq!(point.value, "0.42");
    }

    #[test]
    fn test_value_keeps_inner_spaces() {
        let parser = InputParser::new("localhost", false);
        let point = parser
            .parse_line(1, "web01 app.status  all systems   go ")
            .unwrap()
            .unwrap();
        assert_eq!(point.value, "all systems   go");
    }

    #[test]
    fn test_quoted_tokens() {
        let parser = InputParser::new("localhost", false);
        let point = parser
            .parse_line(
                1,
                r#""db host" "Queue.Depth[\"acct\", \"eu-west-1\"]" "say \"hi\"""#,
            )
            .unwrap()
            .unwrap();
        assert_eq!(point.host, "db host");
        assert_eq!(point.key, r#"Queue.Depth["acct", "eu-west-1"]"#);
        assert_eq!(point.value, r#"say "hi""#);
    }

    #[test]
    fn test_default_host_marker() {
        let parser = InputParser::new("collector-01", false);
        let point = parser.parse_line(1, "- k 1").unwrap().unwrap();
        assert_eq!(point.host, "collector-01");
    }

    #[test]
    fn test_skips_comments_and_blank_lines() {
        let parser = InputParser::new("localhost", false);
        let points = parser
            .parse_str("# header\n\nh k1 1\n   \nh k2 2\n")
            .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].key, "k2");
    }

    #[test]
    fn test_malformed_lines_report_line_number() {
        let parser = InputParser::new("localhost", true);
        let cases = [
            "h k",
            "h k notanumber 1",
            "h k 100",
            r#"h "k 100 1"#,
            r#""h"x k 100 1"#,
        ];
        for case in cases {
            let err = parser.parse_str(&format!("h k0 1 1\n{case}")).unwrap_err();
            match err {
                InputError::MalformedLine { line, .. } => assert_eq!(line, 2, "{case}"),
                other => panic!("unexpected error for {case}: {other}"),
            }
        }
    }
}
