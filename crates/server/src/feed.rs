//! Line-oriented discovery feed.
//!
//! Each non-blank line is one of:
//!
//! ```text
//! {"kind":"added","interface":"com.example.UserService","address":"10.0.0.1:20880",...}
//! + /dubbo/com.example.UserService/providers/dubbo%3A%2F%2F10.0.0.1%3A20880%2F...
//! - /dubbo/com.example.UserService/providers/dubbo%3A%2F%2F10.0.0.1%3A20880%2F...
//! ```
//!
//! Lines starting with `#` are comments.

use thiserror::Error;

use zkmcp_discovery::{event_from_path, PathParseError, ProviderEvent};

/// A feed line that could not be turned into an event.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Malformed JSON event.
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Malformed registry path.
    #[error("invalid provider path: {0}")]
    Path(#[from] PathParseError),
    /// Neither JSON nor a `+`/`-` path.
    #[error("unrecognized feed line: {0}")]
    Unrecognized(String),
}

/// Parses one feed line; blank lines and comments yield `None`.
pub fn parse_feed_line(line: &str) -> Result<Option<ProviderEvent>, FeedError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if line.starts_with('{') {
        return Ok(Some(serde_json::from_str(line)?));
    }
    let (added, rest) = if let Some(rest) = line.strip_prefix('+') {
        (true, rest)
    } else if let Some(rest) = line.strip_prefix('-') {
        (false, rest)
    } else {
        return Err(FeedError::Unrecognized(line.to_string()));
    };
    Ok(Some(event_from_path(rest.trim(), added)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/dubbo/com.example.UserService/providers/\
        dubbo%3A%2F%2F10.0.0.1%3A20880%2Fcom.example.UserService%3Fversion%3D1.0.0%26methods%3DgetUserById%2CgetAllUsers";

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert!(parse_feed_line("   ").unwrap().is_none());
        assert!(parse_feed_line("# note").unwrap().is_none());
    }

    #[test]
    fn json_events_parse() {
        let line = r#"{"kind":"removed","interface":"a.S","address":"h:1"}"#;
        let event = parse_feed_line(line).unwrap().unwrap();
        assert!(matches!(event, ProviderEvent::Removed(_)));
        assert_eq!(event.key().interface, "a.S");
    }

    #[test]
    fn path_lines_parse() {
        let event = parse_feed_line(&format!("+ {PATH}")).unwrap().unwrap();
        let ProviderEvent::Added(info) = event else {
            panic!("expected add");
        };
        assert_eq!(info.address, "10.0.0.1:20880");
        assert_eq!(info.key.version.as_deref(), Some("1.0.0"));
        assert!(matches!(
            parse_feed_line(&format!("-{PATH}")).unwrap(),
            Some(ProviderEvent::Removed(_))
        ));
    }

    #[test]
    fn garbage_is_reported() {
        assert!(matches!(
            parse_feed_line("hello"),
            Err(FeedError::Unrecognized(_))
        ));
        assert!(matches!(
            parse_feed_line("+ /not/a/provider"),
            Err(FeedError::Path(_))
        ));
        assert!(matches!(parse_feed_line("{oops"), Err(FeedError::Json(_))));
    }
}
