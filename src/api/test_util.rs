use axum::body::{self, Body};
use axum::http::{Method, Request, header};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Used in tests to both extract the raw bytes from the HTTP response body and then deserialize them into the
/// requested type. Will panic and fail the test if either step fails somehow.
pub async fn deserialize_body<T: DeserializeOwned>(response_body: Body) -> T {
    let bytes = body::to_bytes(response_body, usize::MAX)
        .await
        .expect("Could not read data from response body!");

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        panic!(
            "Could not parse body content into data structure! Error: {}, Received body: {:?}",
            err, bytes
        )
    })
}

/// Reads the whole response body as bytes, for responses which aren't JSON
pub async fn body_bytes(response_body: Body) -> Vec<u8> {
    body::to_bytes(response_body, usize::MAX)
        .await
        .expect("Could not read data from response body!")
        .to_vec()
}

/// Builds a request for driving a router in tests. [token] is sent as a bearer token when present.
pub fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    builder
        .body(Body::empty())
        .expect("test request should be well formed")
}

/// Same as [request], but with a JSON body
pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    payload: &impl Serialize,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let payload = serde_json::to_vec(payload).expect("test payload should serialize");
    builder
        .body(Body::from(payload))
        .expect("test request should be well formed")
}
