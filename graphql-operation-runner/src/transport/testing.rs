//! An HTTPS server presenting a self-signed certificate.
//!
//! The certificate in `testdata` was created with:
//! openssl req -x509 -newkey ec -pkeyopt ec_paramgen_curve:prime256v1 -nodes -keyout server.key -out server_self_signed.crt -days 3650 -subj "/CN=localhost" -addext "subjectAltName=DNS:localhost,IP:127.0.0.1"

use std::sync::Arc;

use axum::body::Body;
use http::header::CONTENT_TYPE;
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use url::Url;

fn tls_config() -> ServerConfig {
    let certificates = rustls_pemfile::certs(&mut include_str!("testdata/server_self_signed.crt").as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("certificate is valid PEM");
    let key = rustls_pemfile::private_key(&mut include_str!("testdata/server.key").as_bytes())
        .expect("key is valid PEM")
        .expect("key file has a key");
    ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .expect("ring supports the default protocol versions")
        .with_no_client_auth()
        .with_single_cert(certificates, key)
        .expect("built our tls config")
}

/// Answers every request with `body`. Returns the `https` URL of `/graphql`.
pub(crate) async fn self_signed_server(body: &'static str) -> Url {
    let acceptor = TlsAcceptor::from(Arc::new(tls_config()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.expect("accepting connections");
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                // fails when the client rejects the certificate
                let Ok(stream) = acceptor.accept(stream).await else {
                    return;
                };
                let service = hyper::service::service_fn(move |_request: http::Request<Incoming>| async move {
                    http::Response::builder()
                        .header(CONTENT_TYPE, "application/json")
                        .body(Body::from(body))
                });
                if let Err(err) = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    eprintln!("failed to serve connection: {err:#}");
                }
            });
        }
    });

    Url::parse(&format!("https://127.0.0.1:{}/graphql", address.port())).unwrap()
}
