use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use hoops_terminal::error::FetchError;
use hoops_terminal::fetch::{CancelToken, Fetch, HttpFetcher, PanelRequest};

const WAIT: Duration = Duration::from_secs(5);

fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Accepts one connection on a local port, reports the request head, waits
/// `delay`, then answers with `response`.
fn serve_once(response: String, delay: Duration) -> (String, Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let end = line == "\r\n";
                    head.push_str(&line);
                    if end {
                        break;
                    }
                }
            }
        }
        let _ = tx.send(head);
        thread::sleep(delay);
        let mut stream = reader.into_inner();
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
    });
    (format!("http://{addr}/"), rx)
}

fn request(path: &'static str, query: &[(&str, &str)], timeout: Option<Duration>) -> PanelRequest {
    PanelRequest {
        path,
        query: query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        timeout,
    }
}

#[test]
fn success_sends_path_and_query() {
    let body = r##"{"ok":true,"markdown":"# Slate"}"##;
    let (base, head) = serve_once(http_response("200 OK", body), Duration::ZERO);
    let fetcher = HttpFetcher::new(base);

    let req = request("/nba/narrative/markdown", &[("mode", "ai")], Some(WAIT));
    let payload = fetcher.fetch(&req, &CancelToken::new()).expect("payload");

    assert_eq!(payload["markdown"], "# Slate");
    let head = head.recv_timeout(WAIT).expect("request head");
    assert!(
        head.starts_with("GET /nba/narrative/markdown?mode=ai HTTP/1.1"),
        "{head}"
    );
}

#[test]
fn non_success_status_reports_fastapi_detail() {
    let body = r#"{"detail":"Upstream API error: x"}"#;
    let (base, _head) = serve_once(http_response("502 Bad Gateway", body), Duration::ZERO);
    let fetcher = HttpFetcher::new(base);

    let err = fetcher
        .fetch(&request("/nba/teams/offense", &[], Some(WAIT)), &CancelToken::new())
        .expect_err("502 must fail");

    assert_eq!(err.to_string(), "HTTP 502: Upstream API error: x");
}

#[test]
fn non_success_status_without_body_uses_reason() {
    let (base, _head) = serve_once(http_response("503 Service Unavailable", ""), Duration::ZERO);
    let fetcher = HttpFetcher::new(base);

    let err = fetcher
        .fetch(&request("/nba/teams/offense", &[], Some(WAIT)), &CancelToken::new())
        .expect_err("503 must fail");

    assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
}

#[test]
fn malformed_json_is_a_parse_error() {
    let (base, _head) = serve_once(http_response("200 OK", "not json"), Duration::ZERO);
    let fetcher = HttpFetcher::new(base);

    let err = fetcher
        .fetch(&request("/nba/odds/today", &[], Some(WAIT)), &CancelToken::new())
        .expect_err("garbage must fail");

    assert!(matches!(err, FetchError::Parse { .. }), "{err:?}");
    assert!(
        err.to_string().starts_with("Invalid JSON from backend:"),
        "{err}"
    );
}

#[test]
fn slow_backend_times_out() {
    let (base, _head) = serve_once(
        http_response("200 OK", r#"{"ok":true}"#),
        Duration::from_secs(3),
    );
    let fetcher = HttpFetcher::new(base);

    let req = request("/nba/teams/defense", &[], Some(Duration::from_secs(1)));
    let err = fetcher
        .fetch(&req, &CancelToken::new())
        .expect_err("must time out");

    assert_eq!(err.to_string(), "Request timed out after 1s");
}

#[test]
fn cancelled_request_never_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.set_nonblocking(true).expect("nonblocking");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let fetcher = HttpFetcher::new(base);

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = fetcher
        .fetch(&request("/nba/teams/offense", &[], Some(WAIT)), &cancel)
        .expect_err("cancelled");

    assert_eq!(err, FetchError::Cancelled);
    assert_eq!(err.to_string(), "request cancelled");
    thread::sleep(Duration::from_millis(50));
    match listener.accept() {
        Err(e) if e.kind() == ErrorKind::WouldBlock => {}
        other => panic!("unexpected connection: {other:?}"),
    }
}
