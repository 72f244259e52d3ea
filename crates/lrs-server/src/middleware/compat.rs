//! Cross-origin compatibility rewrite.
//!
//! Browsers that cannot issue PUT/DELETE or set custom headers tunnel the
//! real request through `POST ...?method=<VERB>` with a urlencoded body.
//! This middleware rebuilds such requests into their canonical form before
//! anything else sees them:
//!
//! - the method is replaced by the `method` query parameter
//! - the `content` body field becomes the request body (absent means empty)
//! - whitelisted body fields are promoted to real headers, comma-split into
//!   one header value per segment
//! - every remaining body field becomes a query parameter, replacing the
//!   original query string entirely
//!
//! The rewrite runs before authentication and version negotiation, so a
//! tunnelled `authorization` field is indistinguishable from a real header
//! downstream. A tunnelled request that cannot be rebuilt (unparseable body,
//! bogus method or header values) is rejected with a 400 before dispatch.

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{HeaderName, HeaderValue, Method, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Body fields promoted to headers during the rewrite.
const PROMOTED_HEADERS: &[&str] = &["content-type", "authorization"];

/// Largest tunnelled body the rewrite will buffer.
const MAX_TUNNELLED_BODY: usize = 8 * 1024 * 1024;

/// Middleware entry point.
pub async fn rewrite_tunnelled_request(request: Request, next: Next) -> Response {
    match rewrite(request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

/// Target method of a tunnelled request, if it is one.
fn tunnelled_method(request: &Request) -> Option<String> {
    if request.method() != Method::POST {
        return None;
    }
    let query = request.uri().query()?;
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;
    pairs.into_iter().find(|(k, _)| k == "method").map(|(_, v)| v)
}

async fn rewrite(request: Request) -> Result<Request, ApiError> {
    let Some(raw_method) = tunnelled_method(&request) else {
        return Ok(request);
    };

    let method = Method::from_bytes(raw_method.to_ascii_uppercase().as_bytes())
        .map_err(|_| ApiError::BadRequest(format!("invalid tunnelled method: {raw_method}")))?;

    let (mut parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_TUNNELLED_BODY)
        .await
        .map_err(|_| ApiError::BadRequest("tunnelled request body unreadable".to_string()))?;

    let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(&bytes)
        .map_err(|_| ApiError::BadRequest("tunnelled request body is not urlencoded".to_string()))?;

    let mut content = String::new();
    let mut leftover: Vec<(String, String)> = Vec::new();

    for (key, value) in fields {
        let lowered = key.to_ascii_lowercase();
        if lowered == "content" {
            content = value;
        } else if PROMOTED_HEADERS.contains(&lowered.as_str()) {
            let name = HeaderName::from_bytes(lowered.as_bytes())
                .map_err(|_| ApiError::BadRequest(format!("invalid tunnelled header: {key}")))?;
            parts.headers.remove(&name);
            for segment in value.split(',') {
                let header_value = HeaderValue::from_str(segment.trim()).map_err(|_| {
                    ApiError::BadRequest(format!("invalid tunnelled header value for {key}"))
                })?;
                parts.headers.append(name.clone(), header_value);
            }
        } else {
            leftover.push((key, value));
        }
    }

    parts.method = method;
    parts.uri = replace_query(&parts.uri, &leftover)?;

    Ok(Request::from_parts(parts, Body::from(content)))
}

/// The original URI with its query string replaced by `pairs`.
fn replace_query(uri: &Uri, pairs: &[(String, String)]) -> Result<Uri, ApiError> {
    let path = uri.path();
    let target = if pairs.is_empty() {
        path.to_string()
    } else {
        let query = serde_urlencoded::to_string(pairs)
            .map_err(|_| ApiError::BadRequest("tunnelled parameters unencodable".to_string()))?;
        format!("{path}?{query}")
    };

    target
        .parse()
        .map_err(|_| ApiError::BadRequest("tunnelled request target invalid".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunnelled(target: &str, body: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri(target)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(request: Request) -> (axum::http::request::Parts, String) {
        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        (parts, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_full_rewrite() {
        let request = tunnelled(
            "/statements?method=PUT",
            "content-type=application%2Fjson&authorization=Basic%20dTpw&\
             content=%7B%22id%22%3A%22abc%22%7D&statementId=abc",
        );

        let rewritten = rewrite(request).await.unwrap();
        let (parts, body) = body_string(rewritten).await;

        assert_eq!(parts.method, Method::PUT);
        assert_eq!(parts.uri.path(), "/statements");
        assert_eq!(parts.uri.query(), Some("statementId=abc"));
        assert_eq!(parts.headers.get("content-type").unwrap(), "application/json");
        assert_eq!(parts.headers.get("authorization").unwrap(), "Basic dTpw");
        assert_eq!(body, r#"{"id":"abc"}"#);
    }

    #[tokio::test]
    async fn test_missing_content_means_empty_body() {
        let request = tunnelled("/statements?method=GET", "statementId=abc");
        let (parts, body) = body_string(rewrite(request).await.unwrap()).await;

        assert_eq!(parts.method, Method::GET);
        assert_eq!(body, "");
        assert_eq!(parts.uri.query(), Some("statementId=abc"));
    }

    #[tokio::test]
    async fn test_comma_separated_header_values_split() {
        let request = tunnelled("/x?method=GET", "authorization=a,b");
        let (parts, _) = body_string(rewrite(request).await.unwrap()).await;

        let values: Vec<_> = parts.headers.get_all("authorization").iter().collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_original_query_is_discarded() {
        let request = tunnelled("/x?method=DELETE&stale=1", "fresh=2");
        let (parts, _) = body_string(rewrite(request).await.unwrap()).await;

        assert_eq!(parts.method, Method::DELETE);
        assert_eq!(parts.uri.query(), Some("fresh=2"));
    }

    #[tokio::test]
    async fn test_non_tunnelled_requests_pass_through() {
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/statements?statementId=abc")
            .body(Body::from("untouched"))
            .unwrap();

        let (parts, body) = body_string(rewrite(request).await.unwrap()).await;
        assert_eq!(parts.method, Method::PUT);
        assert_eq!(parts.uri.query(), Some("statementId=abc"));
        assert_eq!(body, "untouched");

        // POST without a method parameter is also left alone.
        let request = tunnelled("/statements?foo=1", "a=b");
        let (parts, body) = body_string(rewrite(request).await.unwrap()).await;
        assert_eq!(parts.method, Method::POST);
        assert_eq!(body, "a=b");
    }

    #[tokio::test]
    async fn test_bogus_method_is_rejected() {
        let request = tunnelled("/x?method=NO%20SUCH", "");
        assert!(matches!(
            rewrite(request).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_tunnelled_authorization_replaces_real_header() {
        let mut request = tunnelled("/x?method=GET", "authorization=Bearer%20tunnelled");
        request
            .headers_mut()
            .insert("authorization", HeaderValue::from_static("Bearer outer"));

        let (parts, _) = body_string(rewrite(request).await.unwrap()).await;
        let values: Vec<_> = parts.headers.get_all("authorization").iter().collect();
        assert_eq!(values, vec!["Bearer tunnelled"]);
    }
}
