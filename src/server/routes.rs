//! HTTP router and handlers

use axum::{Extension, Router, http::HeaderMap, routing::get};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::mtls::TlsSession;

/// Body of `GET /hello`.
pub const HELLO_BODY: &str = "Hello, world!\n";

/// Create the router shared by the plaintext and TLS listeners.
pub fn create_router() -> Router {
    Router::new()
        .route("/hello", get(hello_handler))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// GET /hello
///
/// Logs the request headers and, on the TLS listener, the negotiated session
/// and verified peer chain.
async fn hello_handler(
    session: Option<Extension<TlsSession>>,
    headers: HeaderMap,
) -> &'static str {
    for (name, value) in &headers {
        debug!(header = %name, value = ?value, "Request header");
    }

    match session {
        Some(Extension(session)) => {
            info!(
                protocol = %session.protocol_version,
                cipher_suite = %session.cipher_suite,
                alpn = session.alpn_protocol.as_deref().unwrap_or("-"),
                resumed = session.resumed,
                "GET /hello over TLS"
            );
            for (depth, cert) in session.peer_chain.iter().enumerate() {
                info!(depth, subject = %cert.subject, issuer = %cert.issuer, serial = %cert.serial, "Peer certificate");
            }
        }
        None => info!("GET /hello over plaintext"),
    }

    HELLO_BODY
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn hello_returns_greeting_without_session() {
        // GIVEN: the router with no TLS session extension
        let app = create_router();
        // WHEN: GET /hello
        let resp = app
            .oneshot(Request::get("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        // THEN: 200 with the fixed body
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], HELLO_BODY.as_bytes());
    }

    #[tokio::test]
    async fn hello_reads_session_extension() {
        let session = TlsSession {
            protocol_version: "TLSv1_3".into(),
            cipher_suite: "TLS13_AES_256_GCM_SHA384".into(),
            alpn_protocol: Some("h2".into()),
            resumed: false,
            peer_chain: Vec::new(),
        };
        let app = create_router().layer(Extension(session));
        let resp = app
            .oneshot(Request::get("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let resp = create_router()
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_hello_is_405() {
        let resp = create_router()
            .oneshot(Request::post("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
