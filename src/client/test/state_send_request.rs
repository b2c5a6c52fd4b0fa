use std::net::TcpListener;

use http::{Method, Request};

use super::scenario::Scenario;
use crate::{Body, Client, Config, Error, ErrorKind};

#[test]
fn get_head_on_the_wire() {
    let scenario = Scenario::builder().get("/page?x=1").ok("").build();
    let addr = scenario.addr();

    let (result, received) = scenario.run();
    result.unwrap();

    assert_eq!(received.len(), 1);
    let r = &received[0];
    assert_eq!(r.method, "GET");
    assert_eq!(r.target, "/page?x=1");
    assert_eq!(r.version, 1);
    assert_eq!(r.header("host"), Some(addr.to_string().as_str()));
    assert_eq!(r.header("content-length"), Some("0"));
    assert_eq!(r.header("connection"), Some("close"));
    assert_eq!(
        r.header_names(),
        ["host", "content-length", "connection"]
    );
}

#[test]
fn user_headers_are_sent() {
    let scenario = Scenario::builder()
        .get("/")
        .header("x-foo", "bar")
        .header("accept", "text/html")
        .header("accept", "text/plain")
        .ok("")
        .build();

    let (result, received) = scenario.run();
    result.unwrap();

    let r = &received[0];
    assert_eq!(r.header("x-foo"), Some("bar"));
    assert_eq!(r.header("accept"), Some("text/html, text/plain"));
}

#[test]
fn given_host_is_kept() {
    let scenario = Scenario::builder()
        .get("/")
        .header("host", "virtual.test")
        .ok("")
        .build();

    let (result, received) = scenario.run();
    result.unwrap();

    assert_eq!(received[0].header("host"), Some("virtual.test"));
}

#[test]
fn delete_request() {
    let scenario = Scenario::builder()
        .method(Method::DELETE, "/thing/1")
        .ok("")
        .build();

    let (result, received) = scenario.run();
    result.unwrap();

    assert_eq!(received[0].method, "DELETE");
    assert_eq!(received[0].target, "/thing/1");
}

#[test]
fn get_with_body_is_not_sent() {
    let scenario = Scenario::builder().get("/").body("oops").build();

    let (result, received) = scenario.run();

    let err = result.unwrap_err();
    assert!(matches!(err, Error::MethodForbidsBody(_)));
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(received.is_empty());
}

#[test]
fn connection_refused() {
    // Grab a free port, then close it again.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = Client::new(Config::default()).unwrap();
    let request = Request::get(format!("http://127.0.0.1:{}/x", port))
        .header("x-trace", "1")
        .body(Body::empty())
        .unwrap();

    let err = client.send_request(request).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    let failed = err.request().unwrap();
    assert_eq!(failed.uri().path(), "/x");
    assert_eq!(failed.headers()["x-trace"], "1");
}

#[test]
fn unresolvable_host() {
    let client = Client::new(Config::default()).unwrap();
    let request = Request::get("http://host.invalid/")
        .body(Body::empty())
        .unwrap();

    let err = client.send_request(request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[test]
fn invalid_config_is_rejected() {
    let config = Config {
        max_head_size: 0,
        ..Default::default()
    };
    let err = Client::new(config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}
