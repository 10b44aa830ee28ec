//! HTTP tests against a live server: GET, POST, OPTIONS, 404, cookies.

use crate::helpers::*;
use reqwest::{Method, StatusCode};

/// Test GET request to a view
#[tokio::test]
async fn test_get_view() {
    let server = TestServer::start().await;
    let resp = server.get("/test/").await;

    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "x-frame-options", "DENY");
    assert_body_eq(resp, "ok").await;
}

/// Test path without trailing slash
#[tokio::test]
async fn test_get_appends_slash() {
    let server = TestServer::start().await;
    let resp = server.get("/test").await;

    assert_status(&resp, StatusCode::OK);
}

/// Test POST request with form data
#[tokio::test]
async fn test_post_form_data() {
    let server = TestServer::start().await;
    let resp = server.post_form("/test/", &[("message", "hi there")]).await;

    assert_status(&resp, StatusCode::OK);
    assert_body_eq(resp, "message=hi there").await;
}

/// Test path converter arguments
#[tokio::test]
async fn test_route_arguments() {
    let server = TestServer::start().await;
    let resp = server.get("/items/7/").await;

    assert_status(&resp, StatusCode::OK);
    assert_body_eq(resp, "item 7").await;
}

/// Test 404 for non-existent path
#[tokio::test]
async fn test_404_not_found() {
    let server = TestServer::start().await;
    let resp = server.get("/missing/").await;

    assert_status(&resp, StatusCode::NOT_FOUND);
}

/// Test 500 hides handler details
#[tokio::test]
async fn test_500_handler_failure() {
    let server = TestServer::start().await;
    let resp = server.get("/fail/").await;

    assert_status(&resp, StatusCode::INTERNAL_SERVER_ERROR);
    assert_body_eq(resp, "Internal Server Error").await;
}

/// Test OPTIONS lists allowed verbs
#[tokio::test]
async fn test_options_allow() {
    let server = TestServer::start().await;
    let resp = server.request(Method::OPTIONS, "/test/").await;

    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "allow", "GET, POST, HEAD, OPTIONS");
}

/// Test 405 for an unmapped verb
#[tokio::test]
async fn test_method_not_allowed() {
    let server = TestServer::start().await;
    let resp = server.request(Method::PUT, "/test/").await;

    assert_status(&resp, StatusCode::METHOD_NOT_ALLOWED);
    assert_header(&resp, "allow", "GET, POST, HEAD, OPTIONS");
}

/// Test HEAD falls back to GET
#[tokio::test]
async fn test_head_request() {
    let server = TestServer::start().await;
    let resp = server.request(Method::HEAD, "/test/").await;

    assert_status(&resp, StatusCode::OK);
}

/// Test Set-Cookie header
#[tokio::test]
async fn test_set_cookie() {
    let server = TestServer::start().await;
    let resp = server.get("/cookie/").await;

    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "set-cookie", "sessionid=abc; Path=/");
}

/// Test request headers reach the request metadata
#[tokio::test]
async fn test_request_headers() {
    let server = TestServer::start().await;
    let resp = server
        .get_with_headers("/meta/", &[("accept", "text/plain")])
        .await;

    assert_status(&resp, StatusCode::OK);
    assert_body_eq(resp, "accept=text/plain length=0 cookies_cached=true").await;
}

/// Test deferred template response
#[tokio::test]
async fn test_template_response() {
    let server = TestServer::start().await;
    let resp = server.get("/template/").await;

    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "content-type", "text/html; charset=utf-8");
    assert_body_eq(resp, "<p>Hello context test.</p>").await;
}
