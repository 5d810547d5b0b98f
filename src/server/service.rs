use super::request::{parse_request, ParsedRequest};
use super::response::{write_handler_response, write_json_error};
use crate::config::{ResponseValidation, ServiceConfig};
use crate::dispatcher::{Dispatcher, HandlerResponse, RequestId};
use crate::router::{RouteMatch, Router};
use crate::schema::{validate, Reference, SchemaCache, SchemaError};
use crate::spec::Document;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The `may_minihttp` service: built-in endpoints, routing, body validation,
/// dispatch and response validation.
#[derive(Clone)]
pub struct AppService {
    pub doc: Arc<Document>,
    pub router: Arc<Router>,
    pub dispatcher: Arc<Dispatcher>,
    pub schemas: SchemaCache,
    pub spec_path: Option<PathBuf>,
    pub response_validation: ResponseValidation,
}

impl AppService {
    pub fn new(doc: Arc<Document>, router: Arc<Router>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            doc,
            router,
            dispatcher,
            schemas: SchemaCache::default(),
            spec_path: None,
            response_validation: ResponseValidation::default(),
        }
    }

    /// Apply runtime settings from [`ServiceConfig`].
    #[must_use]
    pub fn with_config(mut self, config: &ServiceConfig) -> Self {
        self.schemas = SchemaCache::new(config.schema_cache);
        self.response_validation = config.response_validation;
        self
    }

    /// Serve this file at `GET /swagger.yaml`.
    #[must_use]
    pub fn with_spec_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.spec_path = Some(path.into());
        self
    }

    /// Materialize every request and response schema the routes refer to, so
    /// document errors show up in the startup log instead of on first request.
    pub fn precompile_schemas(&self) -> usize {
        let references: Vec<&Reference> = self
            .router
            .routes()
            .flat_map(|r| {
                r.request_body
                    .iter()
                    .chain(r.responses.iter().map(|(_, reference)| reference))
            })
            .collect();
        self.schemas.precompile(&self.doc, references)
    }

    /// Check a request body against the route's body parameter.
    ///
    /// `Ok(None)` when the route declares no body and none was sent, or when the
    /// body is not JSON on a route without a body parameter.
    fn request_body(
        &self,
        route_match: &RouteMatch,
        raw: Option<&str>,
        request_id: RequestId,
    ) -> Result<Option<Value>, (u16, Value)> {
        let route = &route_match.route;
        let Some(reference) = &route.request_body else {
            return Ok(raw.and_then(|s| serde_json::from_str(s).ok()));
        };

        let Some(raw) = raw else {
            if route.request_body_required {
                return Err((400, json!({ "error": "Request body required" })));
            }
            return Ok(None);
        };

        let body: Value = serde_json::from_str(raw).map_err(|e| {
            (400, json!({ "error": "Invalid JSON body", "details": e.to_string() }))
        })?;

        let schema = self.schemas.get_or_materialize(&self.doc, reference).map_err(|e| {
            error!(request_id = %request_id, reference = %reference, error = %e, "Request schema unusable");
            (500, json!({ "error": "Request schema unusable", "details": e.to_string() }))
        })?;

        let errors = validate(&schema, &body);
        if !errors.is_empty() {
            info!(
                request_id = %request_id,
                handler_name = %route_match.handler_name,
                error_count = errors.len(),
                "Request validation failed"
            );
            return Err((
                400,
                json!({ "error": "Request validation failed", "details": errors }),
            ));
        }
        Ok(Some(body))
    }

    /// Check a handler's body against the schema declared for its status.
    ///
    /// Returns a replacement response only in `enforce` mode.
    fn check_response(
        &self,
        route_match: &RouteMatch,
        resp: &HandlerResponse,
        request_id: RequestId,
    ) -> Option<HandlerResponse> {
        if self.response_validation == ResponseValidation::Off {
            return None;
        }
        let body = resp.body.as_ref()?;
        let reference = route_match.route.response_for(resp.status)?;

        let schema = match self.schemas.get_or_materialize(&self.doc, reference) {
            Ok(schema) => schema,
            Err(SchemaError::NoSchemaOnResponse { .. }) => return None,
            Err(e) => {
                warn!(request_id = %request_id, reference = %reference, error = %e, "Response schema unusable");
                return None;
            }
        };

        let errors = validate(&schema, body);
        if errors.is_empty() {
            return None;
        }
        warn!(
            request_id = %request_id,
            handler_name = %route_match.handler_name,
            status = resp.status,
            errors = ?errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Response does not match declared schema"
        );
        match self.response_validation {
            ResponseValidation::Enforce => Some(HandlerResponse::json(
                500,
                json!({ "error": "Response validation failed", "details": errors }),
            )),
            _ => None,
        }
    }
}

/// Basic health check endpoint returning `{ "status": "ok" }`.
pub fn health_endpoint(res: &mut Response) -> io::Result<()> {
    write_handler_response(res, &HandlerResponse::json(200, json!({ "status": "ok" })));
    Ok(())
}

/// Streams the document file as `text/yaml`.
pub fn swagger_endpoint(res: &mut Response, spec_path: Option<&Path>) -> io::Result<()> {
    match spec_path.map(std::fs::read) {
        Some(Ok(bytes)) => {
            res.status_code(200, "OK");
            res.header("Content-Type: text/yaml");
            res.body_vec(bytes);
        }
        _ => write_json_error(res, 404, json!({ "error": "Spec not found" })),
    }
    Ok(())
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        let request_id = RequestId::from_header_or_new(parsed.get_header("x-request-id"));
        let ParsedRequest {
            method,
            path,
            headers,
            query_params,
            body,
        } = parsed;

        if method == "GET" && path == "/health" {
            return health_endpoint(res);
        }
        if method == "GET" && path == "/swagger.yaml" {
            return swagger_endpoint(res, self.spec_path.as_deref());
        }

        let route = Method::from_bytes(method.as_bytes())
            .ok()
            .and_then(|m| self.router.route(m, &path));
        let Some(mut route_match) = route else {
            write_json_error(
                res,
                404,
                json!({ "error": "Not Found", "method": method, "path": path }),
            );
            return Ok(());
        };
        route_match.query_params = query_params;

        let body = match self.request_body(&route_match, body.as_deref(), request_id) {
            Ok(body) => body,
            Err((status, error_body)) => {
                write_json_error(res, status, error_body);
                return Ok(());
            }
        };

        match self
            .dispatcher
            .dispatch(route_match.clone(), body, headers, request_id)
        {
            Some(hr) => {
                let hr = self
                    .check_response(&route_match, &hr, request_id)
                    .unwrap_or(hr);
                write_handler_response(res, &hr);
            }
            None => write_json_error(
                res,
                500,
                json!({
                    "error": "Handler failed or not registered",
                    "method": method,
                    "path": path
                }),
            ),
        }
        Ok(())
    }
}
