//! Full request lifecycle over in-memory channels.

use std::time::Duration;

use bytes::Bytes;
use tokio_asgi::core::Error;
use tokio_asgi::protocol::{ConnectionScope, InboundEvent, OutboundEvent};
use tracing_test::traced_test;

use crate::helpers::*;

fn get(path: &str) -> ConnectionScope {
    ConnectionScope::http("GET", path)
}

fn done() -> Vec<InboundEvent> {
    vec![InboundEvent::last(Bytes::new())]
}

#[tokio::test]
async fn test_get_emits_start_then_body() {
    let app = app(false, &journal());
    let sent = run_lifecycle(&app, get("/test/"), done()).await.unwrap();

    assert_eq!(sent.len(), 2);
    assert_eq!(start_status(&sent), 200);
    assert_eq!(
        sent[1],
        OutboundEvent::ResponseBody {
            body: Bytes::from_static(b"ok"),
            more_body: false
        }
    );
}

#[tokio::test]
#[traced_test]
async fn test_missing_route_is_404() {
    let app = app(false, &journal());
    let sent = run_lifecycle(&app, get("/missing/"), done()).await.unwrap();

    assert_eq!(start_status(&sent), 404);
    assert!(logs_contain("Not Found: /missing/"));
}

#[tokio::test]
#[traced_test]
async fn test_handler_failure_is_500_with_one_record() {
    let app = app(false, &journal());
    let sent = run_lifecycle(&app, get("/fail/"), done()).await.unwrap();

    assert_eq!(start_status(&sent), 500);
    assert!(!body_text(&sent).contains("database exploded"));
    logs_assert(|lines: &[&str]| {
        let records = lines
            .iter()
            .filter(|line| line.contains("Internal Server Error: /fail/"))
            .count();
        match records {
            1 => Ok(()),
            n => Err(format!("expected one error record, found {}", n)),
        }
    });
}

#[tokio::test]
async fn test_debug_failure_body_has_details() {
    let app = app(true, &journal());
    let sent = run_lifecycle(&app, get("/fail/"), done()).await.unwrap();

    assert_eq!(start_status(&sent), 500);
    assert!(body_text(&sent).contains("database exploded"));
}

#[tokio::test]
async fn test_missing_response_in_debug_names_handler() {
    let app = app(true, &journal());
    let err = run_lifecycle(&app, get("/none/"), done()).await.unwrap_err();

    match err {
        Error::HandlerContractViolation { handler, scope } => {
            assert_eq!(handler, "forgetful");
            assert_eq!(scope, "ForgetfulView");
        }
        other => panic!("expected contract violation, got {:?}", other),
    }
}

#[tokio::test]
#[traced_test]
async fn test_missing_response_in_production_is_500() {
    let app = app(false, &journal());
    let sent = run_lifecycle(&app, get("/none/"), done()).await.unwrap();

    assert_eq!(start_status(&sent), 500);
    assert!(logs_contain("ForgetfulView::forgetful"));
}

#[tokio::test]
async fn test_disconnect_before_body_sends_nothing() {
    let app = app(false, &journal());
    let sent = run_lifecycle(
        &app,
        ConnectionScope::http("POST", "/test/"),
        vec![InboundEvent::chunk("message=hel"), InboundEvent::Disconnect],
    )
    .await
    .unwrap();

    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_non_http_scope_rejected_before_io() {
    let app = app(false, &journal());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<InboundEvent>();
    tx.send(InboundEvent::last(Bytes::new())).unwrap();

    let err = app
        .call(ConnectionScope::http("GET", "/ws/").with_type("websocket"))
        .err()
        .unwrap();

    assert!(matches!(err, Error::UnsupportedScopeType(ref kind) if kind == "websocket"));
    assert_eq!(rx.try_recv().unwrap(), InboundEvent::last(Bytes::new()));
}

#[tokio::test]
async fn test_chunked_form_post() {
    let app = app(false, &journal());
    let scope = ConnectionScope::http("POST", "/test/")
        .with_header("content-type", "application/x-www-form-urlencoded");
    let sent = run_lifecycle(
        &app,
        scope,
        vec![
            InboundEvent::chunk("message=hel"),
            InboundEvent::chunk("lo+wor"),
            InboundEvent::last("ld"),
        ],
    )
    .await
    .unwrap();

    assert_eq!(start_status(&sent), 200);
    assert_eq!(body_text(&sent), "message=hello world");
}

#[tokio::test]
async fn test_headers_merge_and_lenient_length() {
    let app = app(false, &journal());
    let scope = get("/meta/")
        .with_header("Accept", "a")
        .with_header("Accept", "b")
        .with_header("Content-Length", "abc")
        .with_header("Cookie", "a=1; b=2");
    let sent = run_lifecycle(&app, scope, done()).await.unwrap();

    assert_eq!(body_text(&sent), "accept=a,b length=0 cookies_cached=true");
}

#[tokio::test]
async fn test_route_arguments() {
    let app = app(false, &journal());

    let sent = run_lifecycle(&app, get("/items/42/"), done()).await.unwrap();
    assert_eq!(body_text(&sent), "item 42");

    let sent = run_lifecycle(&app, get("/archive/2024/"), done()).await.unwrap();
    assert_eq!(body_text(&sent), "year 2024");

    let sent = run_lifecycle(&app, get("/items/abc/"), done()).await.unwrap();
    assert_eq!(start_status(&sent), 404);
}

#[tokio::test]
async fn test_trailing_slash_appended() {
    let app = app(false, &journal());
    let sent = run_lifecycle(&app, get("/test"), done()).await.unwrap();
    assert_eq!(start_status(&sent), 200);
}

#[tokio::test]
async fn test_atomic_requests_commit_and_rollback() {
    let journal = journal();
    let app = app(false, &journal);

    run_lifecycle(&app, get("/test/"), done()).await.unwrap();
    run_lifecycle(&app, get("/fail/"), done()).await.unwrap();

    assert_eq!(
        *journal.lock().unwrap(),
        vec!["begin:default", "commit:default", "begin:default", "rollback:default"]
    );
}

#[tokio::test]
async fn test_unmapped_verb_is_405() {
    let app = app(false, &journal());
    let sent = run_lifecycle(&app, ConnectionScope::http("DELETE", "/test/"), done())
        .await
        .unwrap();

    assert_eq!(start_status(&sent), 405);
    match &sent[0] {
        OutboundEvent::ResponseStart { headers, .. } => {
            assert!(headers
                .iter()
                .any(|(n, v)| &n[..] == b"allow" && &v[..] == b"GET, POST, HEAD, OPTIONS"));
        }
        other => panic!("expected start, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deferred_template_rendered_before_emit() {
    let app = app(false, &journal());
    let sent = run_lifecycle(&app, get("/template/"), done()).await.unwrap();

    assert_eq!(start_status(&sent), 200);
    assert_eq!(body_text(&sent), "<p>Hello context test.</p>");
}

#[tokio::test]
async fn test_error_responses_carry_frame_options() {
    let app = app(false, &journal());
    let sent = run_lifecycle(&app, get("/missing/"), done()).await.unwrap();

    match &sent[0] {
        OutboundEvent::ResponseStart { headers, .. } => {
            assert!(headers
                .iter()
                .any(|(n, v)| &n[..] == b"x-frame-options" && &v[..] == b"DENY"));
        }
        other => panic!("expected start, got {:?}", other),
    }
}

#[tokio::test]
async fn test_body_timeout_is_408() {
    let app = app(false, &journal()).with_body_receive_timeout(Some(Duration::from_millis(20)));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    tx.send(InboundEvent::chunk("message=")).unwrap();

    let mut sent = Vec::new();
    app.call(ConnectionScope::http("POST", "/test/"))
        .unwrap()
        .run(&mut rx, &mut sent)
        .await
        .unwrap();

    assert_eq!(start_status(&sent), 408);
    drop(tx);
}
