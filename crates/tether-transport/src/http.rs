//! Plain HTTP responses served next to the WebSocket upgrade.
//!
//! The request and response types are hyper's, re-exported so that the
//! relay's endpoint code doesn't depend on hyper directly.

use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, HeaderValue};
pub use hyper::{Body, Method, Request, Response, StatusCode};

/// Builds a JSON response that pages on any origin may read.
pub fn json_response(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}
