//! Response representation negotiation.
//!
//! A `.xml`, `.json` or `.js` suffix on the last path segment wins, then the
//! `Accept` header, then HTML.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Html,
    Xml,
    Json,
    Js,
}

impl Format {
    fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "xml" => Some(Self::Xml),
            "json" => Some(Self::Json),
            "js" => Some(Self::Js),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    fn from_accept(headers: &HeaderMap) -> Option<Self> {
        let accept = headers.get(header::ACCEPT)?.to_str().ok()?;
        accept.split(',').find_map(|media| {
            let media = media.split(';').next().unwrap_or_default().trim();
            match media {
                "application/xml" | "text/xml" => Some(Self::Xml),
                "application/json" => Some(Self::Json),
                "text/javascript" | "application/javascript" => Some(Self::Js),
                "text/html" => Some(Self::Html),
                _ => None,
            }
        })
    }

    pub fn negotiate(path: &str, headers: &HeaderMap) -> Self {
        let last = path.rsplit('/').next().unwrap_or_default();
        split_extension(last)
            .1
            .or_else(|| Self::from_accept(headers))
            .unwrap_or_default()
    }

    pub fn is_machine(self) -> bool {
        matches!(self, Self::Xml | Self::Json)
    }
}

/// Split `"12.xml"` into `("12", Some(Format::Xml))`. Unknown suffixes stay
/// part of the stem.
pub(crate) fn split_extension(segment: &str) -> (&str, Option<Format>) {
    match segment.rsplit_once('.') {
        Some((stem, extension)) => match Format::from_extension(extension) {
            Some(format) => (stem, Some(format)),
            None => (segment, None),
        },
        None => (segment, None),
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Format {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::negotiate(parts.uri.path(), &parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn suffix_beats_accept_header() {
        assert_eq!(
            Format::negotiate("/users/3.xml", &accept("application/json")),
            Format::Xml
        );
        assert_eq!(Format::negotiate("/users.json", &HeaderMap::new()), Format::Json);
        assert_eq!(Format::negotiate("/users/3.js", &HeaderMap::new()), Format::Js);
    }

    #[test]
    fn accept_header_is_used_without_suffix() {
        assert_eq!(
            Format::negotiate("/users", &accept("application/xml")),
            Format::Xml
        );
        assert_eq!(
            Format::negotiate("/users", &accept("text/html,application/xhtml+xml;q=0.9")),
            Format::Html
        );
        assert_eq!(Format::negotiate("/users", &accept("*/*")), Format::Html);
    }

    #[test]
    fn split_keeps_unknown_suffix() {
        assert_eq!(split_extension("12.xml"), ("12", Some(Format::Xml)));
        assert_eq!(split_extension("12"), ("12", None));
        assert_eq!(split_extension("a.b"), ("a.b", None));
    }
}
