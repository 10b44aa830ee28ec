//! Hyper request to connection scope conversion.

use std::net::SocketAddr;

use bytes::Bytes;
use http::request::Parts;
use http::Version;
use percent_encoding::percent_decode_str;

use crate::protocol::ConnectionScope;

/// Build the scope for one request.
///
/// The path is percent-decoded; the query string stays raw. HTTP/2 requests
/// carry the host in the URI authority, so it is added as a `host` header
/// when the client sent none.
pub fn build_scope(parts: &Parts, client: SocketAddr, server: SocketAddr) -> ConnectionScope {
    let path = percent_decode_str(parts.uri.path())
        .decode_utf8_lossy()
        .into_owned();

    let mut scope = ConnectionScope::http(parts.method.as_str(), path)
        .with_scheme(parts.uri.scheme_str().unwrap_or("http"))
        .with_http_version(http_version(parts.version))
        .with_client(client.ip().to_string(), client.port())
        .with_server(server.ip().to_string(), server.port());

    if let Some(query) = parts.uri.query() {
        scope = scope.with_query(Bytes::copy_from_slice(query.as_bytes()));
    }

    scope.headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                Bytes::copy_from_slice(name.as_str().as_bytes()),
                Bytes::copy_from_slice(value.as_bytes()),
            )
        })
        .collect();

    if !parts.headers.contains_key(http::header::HOST) {
        if let Some(authority) = parts.uri.authority() {
            scope = scope.with_header("host", authority.as_str());
        }
    }

    scope
}

fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(request: http::Request<()>) -> Parts {
        request.into_parts().0
    }

    fn addrs() -> (SocketAddr, SocketAddr) {
        (
            "10.0.0.7:51000".parse().unwrap(),
            "127.0.0.1:8080".parse().unwrap(),
        )
    }

    #[test]
    fn test_http1_request() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/caf%C3%A9/?q=a%20b&x=1")
            .header("host", "example.com")
            .header("accept", "a")
            .header("accept", "b")
            .body(())
            .unwrap();
        let (client, server) = addrs();
        let scope = build_scope(&parts(req), client, server);

        assert!(scope.is_http());
        assert_eq!(scope.method, "POST");
        assert_eq!(scope.path, "/café/");
        assert_eq!(scope.query_string.as_ref(), b"q=a%20b&x=1");
        assert_eq!(scope.http_version.as_deref(), Some("1.1"));
        assert_eq!(scope.scheme.as_deref(), Some("http"));
        assert_eq!(scope.client, Some(("10.0.0.7".to_string(), 51000)));
        assert_eq!(scope.server, Some(("127.0.0.1".to_string(), 8080)));
        assert_eq!(scope.headers.len(), 3);
        assert_eq!(scope.headers[1].1.as_ref(), b"a");
        assert_eq!(scope.headers[2].1.as_ref(), b"b");
    }

    #[test]
    fn test_http2_authority_becomes_host() {
        let req = http::Request::builder()
            .uri("https://example.com:8443/test/")
            .version(Version::HTTP_2)
            .body(())
            .unwrap();
        let (client, server) = addrs();
        let scope = build_scope(&parts(req), client, server);

        assert_eq!(scope.http_version.as_deref(), Some("2"));
        assert_eq!(scope.scheme.as_deref(), Some("https"));
        assert_eq!(
            scope.headers,
            vec![(Bytes::from_static(b"host"), Bytes::from_static(b"example.com:8443"))]
        );
    }
}
