//! Machine representation: XML (the native API format) and JSON.

use axum::{
    body::Bytes,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::Format;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Serialize `value` as the body of a response. Anything but JSON gets XML.
pub(crate) fn document<T: Serialize>(format: Format, status: StatusCode, value: &T) -> Response {
    let rendered = match format {
        Format::Json => serde_json::to_string(value)
            .map(|body| (JSON_CONTENT_TYPE, body))
            .map_err(|err| err.to_string()),
        _ => quick_xml::se::to_string(value)
            .map(|body| (XML_CONTENT_TYPE, body))
            .map_err(|err| err.to_string()),
    };

    match rendered {
        Ok((content_type, body)) => {
            (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(err) => {
            tracing::error!("failed to serialize response: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Plain confirmation text.
pub(crate) fn text(status: StatusCode, body: &str) -> Response {
    (status, body.to_string()).into_response()
}

/// Decode a request body by its content type.
pub(crate) fn decode<T: DeserializeOwned>(content_type: &str, body: &Bytes) -> Option<T> {
    if content_type.contains("json") {
        return serde_json::from_slice(body).ok();
    }
    let text = std::str::from_utf8(body).ok()?;
    quick_xml::de::from_str(text).ok()
}
