//! End-to-end tests of the user API over real HTTP connections.
//!
//! Each test starts its own server on a free port with a freshly seeded store, so
//! tests that create or delete users do not affect each other.

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use userspec::app::build_service;
use userspec::config::{ResponseValidation, ServiceConfig};
use userspec::dispatcher::{Dispatcher, HandlerResponse};
use userspec::router::Router;
use userspec::schema::{materialize_ref, validate};
use userspec::server::{AppService, HttpServer, ServerHandle};
use userspec::{load_document, load_spec};

mod common;
use common::http::{get, parse_parts, send_request, with_body};
use common::test_server::{free_addr, setup_may_runtime};

const SPEC: &str = "api/swagger.yaml";

/// Running server, stopped on drop.
struct TestServer {
    handle: Option<ServerHandle>,
    addr: SocketAddr,
}

impl TestServer {
    fn start(service: AppService) -> Self {
        setup_may_runtime();
        let handle = HttpServer(service).start(free_addr()).unwrap();
        handle.wait_ready().unwrap();
        Self {
            addr: handle.addr(),
            handle: Some(handle),
        }
    }

    fn petstore() -> Self {
        Self::start(build_service(Path::new(SPEC), &ServiceConfig::default()).unwrap())
    }

    fn addr(&self) -> &SocketAddr {
        &self.addr
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("body {body:?} is not JSON: {e}"))
}

#[test]
fn test_get_seeded_user_matches_declared_schema() {
    let server = TestServer::petstore();
    let (status, content_type, body) = parse_parts(&get(server.addr(), "/v2/user/user1"));
    assert_eq!(status, 200);
    assert!(content_type.starts_with("application/json"), "{content_type}");

    let user = json_body(&body);
    assert_eq!(user["username"], json!("user1"));
    assert_eq!(user["id"], json!(123));

    let doc = load_document(SPEC).unwrap();
    let schema = materialize_ref(
        &doc,
        &"#/paths/~1user~1{username}/get/responses/200".parse().unwrap(),
    )
    .unwrap();
    assert!(validate(&schema, &user).is_empty());
}

#[test]
fn test_unknown_user_is_404() {
    let server = TestServer::petstore();
    let (status, _, body) = parse_parts(&get(server.addr(), "/v2/user/nobody"));
    assert_eq!(status, 404);
    assert_eq!(json_body(&body), json!({ "error": "User not found" }));
}

#[test]
fn test_unknown_path_is_404() {
    let server = TestServer::petstore();
    let (status, _, body) = parse_parts(&get(server.addr(), "/v2/store/inventory"));
    assert_eq!(status, 404);
    let body = json_body(&body);
    assert_eq!(body["error"], json!("Not Found"));
    assert_eq!(body["path"], json!("/v2/store/inventory"));
}

#[test]
fn test_create_then_fetch() {
    let server = TestServer::petstore();
    let resp = with_body(
        server.addr(),
        "POST",
        "/v2/user",
        r#"{"id":7,"username":"neo","email":"neo@example.com"}"#,
    );
    let (status, _, _) = parse_parts(&resp);
    assert_eq!(status, 200);

    let (status, _, body) = parse_parts(&get(server.addr(), "/v2/user/neo"));
    assert_eq!(status, 200);
    assert_eq!(
        json_body(&body),
        json!({ "id": 7, "username": "neo", "email": "neo@example.com" })
    );
}

#[test]
fn test_invalid_body_is_rejected_with_details() {
    let server = TestServer::petstore();
    let resp = with_body(server.addr(), "POST", "/v2/user", r#"{"id":"seven"}"#);
    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 400);
    let body = json_body(&body);
    assert_eq!(body["error"], json!("Request validation failed"));
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["path"], json!("username"));
    assert_eq!(details[0]["kind"], json!("MissingRequired"));
    assert_eq!(details[1]["path"], json!("id"));
    assert_eq!(details[1]["kind"], json!("TypeMismatch"));
}

#[test]
fn test_malformed_json_is_400() {
    let server = TestServer::petstore();
    let resp = with_body(server.addr(), "POST", "/v2/user", "{not json");
    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 400);
    assert_eq!(json_body(&body)["error"], json!("Invalid JSON body"));
}

#[test]
fn test_missing_required_body_is_400() {
    let server = TestServer::petstore();
    let resp = send_request(
        server.addr(),
        "POST /v2/user HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n",
    );
    let (status, _, _) = parse_parts(&resp);
    assert_eq!(status, 400);
}

#[test]
fn test_array_body_errors_name_item_index() {
    let server = TestServer::petstore();
    let resp = with_body(
        server.addr(),
        "POST",
        "/v2/user/createWithArray",
        r#"[{"id":1,"username":"a"},{"id":2}]"#,
    );
    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 400);
    assert_eq!(json_body(&body)["details"][0]["path"], json!("1/username"));
}

#[test]
fn test_update_and_delete() {
    let server = TestServer::petstore();
    let resp = with_body(
        server.addr(),
        "PUT",
        "/v2/user/user1",
        r#"{"id":123,"username":"user1","phone":"555-0100"}"#,
    );
    assert_eq!(parse_parts(&resp).0, 200);

    let (_, _, body) = parse_parts(&get(server.addr(), "/v2/user/user1"));
    assert_eq!(json_body(&body)["phone"], json!("555-0100"));

    let resp = send_request(
        server.addr(),
        "DELETE /v2/user/user1 HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    assert_eq!(parse_parts(&resp).0, 200);
    assert_eq!(parse_parts(&get(server.addr(), "/v2/user/user1")).0, 404);
}

#[test]
fn test_update_unknown_user_is_404() {
    let server = TestServer::petstore();
    let resp = with_body(
        server.addr(),
        "PUT",
        "/v2/user/ghost",
        r#"{"id":1,"username":"ghost"}"#,
    );
    assert_eq!(parse_parts(&resp).0, 404);
}

#[test]
fn test_rename_onto_existing_user_is_409() {
    let server = TestServer::petstore();
    let resp = with_body(server.addr(), "POST", "/v2/user", r#"{"id":8,"username":"trinity"}"#);
    assert_eq!(parse_parts(&resp).0, 200);

    let resp = with_body(
        server.addr(),
        "PUT",
        "/v2/user/trinity",
        r#"{"id":8,"username":"user1"}"#,
    );
    let (status, _, body) = parse_parts(&resp);
    assert_eq!(status, 409);
    assert_eq!(json_body(&body), json!({ "error": "Username already taken" }));

    let (_, _, body) = parse_parts(&get(server.addr(), "/v2/user/user1"));
    assert_eq!(json_body(&body)["id"], json!(123));
    assert_eq!(parse_parts(&get(server.addr(), "/v2/user/trinity")).0, 200);
}

#[test]
fn test_login_and_logout() {
    let server = TestServer::petstore();
    let login = get(server.addr(), "/v2/user/login?username=user1&password=secret");
    assert_eq!(parse_parts(&login).0, 200);
    assert_eq!(parse_parts(&get(server.addr(), "/v2/user/logout")).0, 200);
}

#[test]
fn test_health_and_swagger_endpoints() {
    let server = TestServer::petstore();
    let (status, _, body) = parse_parts(&get(server.addr(), "/health"));
    assert_eq!(status, 200);
    assert_eq!(json_body(&body), json!({ "status": "ok" }));

    let (status, content_type, body) = parse_parts(&get(server.addr(), "/swagger.yaml"));
    assert_eq!(status, 200);
    assert_eq!(content_type, "text/yaml");
    assert!(body.contains("swagger: \"2.0\""));
}

fn service_with_bad_user_handler(mode: ResponseValidation) -> AppService {
    let (doc, routes) = load_spec(SPEC).unwrap();
    let mut dispatcher = Dispatcher::new();
    dispatcher.register_handler("getUserByName", |_req| {
        HandlerResponse::json(200, json!({ "id": "not-a-number" }))
    });
    let config = ServiceConfig {
        response_validation: mode,
        ..ServiceConfig::default()
    };
    AppService::new(Arc::new(doc), Arc::new(Router::new(routes)), Arc::new(dispatcher))
        .with_config(&config)
}

#[test]
fn test_enforced_response_validation_replaces_body() {
    let server = TestServer::start(service_with_bad_user_handler(ResponseValidation::Enforce));
    let (status, _, body) = parse_parts(&get(server.addr(), "/v2/user/user1"));
    assert_eq!(status, 500);
    let body = json_body(&body);
    assert_eq!(body["error"], json!("Response validation failed"));
    assert_eq!(body["details"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_warn_mode_passes_response_through() {
    let server = TestServer::start(service_with_bad_user_handler(ResponseValidation::Warn));
    let (status, _, body) = parse_parts(&get(server.addr(), "/v2/user/user1"));
    assert_eq!(status, 200);
    assert_eq!(json_body(&body), json!({ "id": "not-a-number" }));
}

#[test]
fn test_unregistered_handler_is_500() {
    let server = TestServer::start(service_with_bad_user_handler(ResponseValidation::Off));
    let (status, _, _) = parse_parts(&get(server.addr(), "/v2/user/logout"));
    assert_eq!(status, 500);
}
