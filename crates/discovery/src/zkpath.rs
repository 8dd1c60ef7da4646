//! Parsing of provider node paths from the coordination tree.
//!
//! Providers register as children of `/<root>/<interface>/providers`, each
//! node name being a URL-encoded provider URL such as
//! `dubbo://10.0.0.1:20880/com.example.UserService?version=1.0.0&methods=a,b`.

use thiserror::Error;
use url::Url;

use crate::types::{ProviderEvent, ProviderInfo, ServiceKey};

const PROVIDERS_SEGMENT: &str = "/providers/";

/// Errors raised while parsing a provider node path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PathParseError {
    /// The path has no `/providers/` segment.
    #[error("not a provider path: {0}")]
    NotProviderPath(String),
    /// The node name is not valid percent-encoded UTF-8.
    #[error("provider node is not valid UTF-8 after decoding: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
    /// The decoded node name is not a URL.
    #[error("invalid provider url {url}: {source}")]
    InvalidUrl {
        /// Decoded URL text.
        url: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// The provider URL has no host.
    #[error("provider url has no host: {0}")]
    MissingHost(String),
}

/// Parses a provider node path into provider info.
///
/// The interface comes from the path segment before `/providers/`; the
/// provider URL's `interface` query parameter wins when present.
///
/// ```
/// use zkmcp_discovery::parse_provider_path;
///
/// let path = "/dubbo/com.example.UserService/providers/\
///     dubbo%3A%2F%2F10.0.0.1%3A20880%2Fcom.example.UserService%3Fversion%3D1.0.0%26methods%3DgetUserById%2CgetAllUsers";
/// let info = parse_provider_path(path).unwrap();
/// assert_eq!(info.address, "10.0.0.1:20880");
/// assert_eq!(info.key.version.as_deref(), Some("1.0.0"));
/// assert_eq!(info.methods, vec!["getUserById", "getAllUsers"]);
/// ```
pub fn parse_provider_path(path: &str) -> Result<ProviderInfo, PathParseError> {
    let (prefix, node) = path
        .rsplit_once(PROVIDERS_SEGMENT)
        .ok_or_else(|| PathParseError::NotProviderPath(path.to_string()))?;
    let path_interface = prefix.rsplit('/').next().unwrap_or_default();
    if path_interface.is_empty() || node.is_empty() {
        return Err(PathParseError::NotProviderPath(path.to_string()));
    }

    let decoded = urlencoding::decode(node)?.into_owned();
    let url = Url::parse(&decoded).map_err(|source| PathParseError::InvalidUrl {
        url: decoded.clone(),
        source,
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| PathParseError::MissingHost(decoded.clone()))?;
    let address = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut interface = path_interface.to_string();
    let mut version = None;
    let mut group = None;
    let mut application = None;
    let mut methods = Vec::new();
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            "interface" if !value.is_empty() => interface = value.into_owned(),
            "version" => version = Some(value.into_owned()),
            "group" => group = Some(value.into_owned()),
            "application" if !value.is_empty() => application = Some(value.into_owned()),
            "methods" => {
                methods = value
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
    }

    let mut key = ServiceKey::new(interface);
    if let Some(v) = version {
        key = key.with_version(v);
    }
    if let Some(g) = group {
        key = key.with_group(g);
    }

    Ok(ProviderInfo {
        key,
        address,
        protocol: url.scheme().to_string(),
        application,
        methods,
    })
}

/// Builds an `Added` or `Removed` event from a provider node path.
pub fn event_from_path(path: &str, added: bool) -> Result<ProviderEvent, PathParseError> {
    let info = parse_provider_path(path)?;
    Ok(if added {
        ProviderEvent::Added(info)
    } else {
        ProviderEvent::Removed(info)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(url: &str) -> String {
        urlencoding::encode(url).into_owned()
    }

    #[test]
    fn parses_group_application_and_protocol() {
        let node = encoded(
            "tri://192.168.1.5:50051/com.example.OrderService?application=shop&group=blue&version=2.1",
        );
        let path = format!("/dubbo/com.example.OrderService/providers/{node}");
        let info = parse_provider_path(&path).unwrap();
        assert_eq!(info.protocol, "tri");
        assert_eq!(info.application.as_deref(), Some("shop"));
        assert_eq!(info.key.to_string(), "com.example.OrderService:2.1:blue");
        assert!(info.methods.is_empty());
    }

    #[test]
    fn query_interface_overrides_path_segment() {
        let node = encoded("dubbo://h:1/x?interface=com.example.Real");
        let path = format!("/dubbo/com.example.Alias/providers/{node}");
        let info = parse_provider_path(&path).unwrap();
        assert_eq!(info.key.interface, "com.example.Real");
    }

    #[test]
    fn rejects_non_provider_paths() {
        let err = parse_provider_path("/dubbo/com.example.A/consumers/x").unwrap_err();
        assert!(matches!(err, PathParseError::NotProviderPath(_)));
    }

    #[test]
    fn rejects_garbage_node() {
        let err = parse_provider_path("/dubbo/a.B/providers/not-a-url").unwrap_err();
        assert!(matches!(err, PathParseError::InvalidUrl { .. }));
    }

    #[test]
    fn builds_removed_event() {
        let node = encoded("dubbo://h:1/a.B");
        let event = event_from_path(&format!("/dubbo/a.B/providers/{node}"), false).unwrap();
        assert!(matches!(event, ProviderEvent::Removed(_)));
        assert_eq!(event.provider().address, "h:1");
    }
}
