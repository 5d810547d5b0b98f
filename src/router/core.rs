use crate::spec::RouteMeta;
use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Path variables stored inline up to this count before spilling to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Variable bindings for one request. Names are shared with the routing table;
/// values are per-request text taken verbatim from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// One entry per template variable, in template order.
    pub path_params: ParamVec,
    pub handler_name: String,
    /// Query string parameters (populated by the server)
    pub query_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    ///
    /// Last occurrence wins if a template repeats a variable name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path variables as an owned map. Allocates; prefer [`Self::get_path_param`].
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

#[derive(Clone)]
struct CompiledRoute {
    method: Method,
    regex: Regex,
    meta: Arc<RouteMeta>,
    param_names: Vec<Arc<str>>,
}

/// Matches `(method, path)` pairs against the templates of a document.
///
/// Templates with fewer variables are tried first, so a literal route such as
/// `/v2/user/login` is never captured by `/v2/user/{username}`. Declaration order
/// breaks ties.
#[derive(Clone)]
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    #[must_use]
    pub fn new(routes: Vec<RouteMeta>) -> Self {
        let mut compiled: Vec<CompiledRoute> = routes
            .into_iter()
            .filter_map(|route| {
                let full_path = route.full_path();
                match Self::path_to_regex(&full_path) {
                    Ok((regex, names)) => Some(CompiledRoute {
                        method: route.method.clone(),
                        regex,
                        meta: Arc::new(route),
                        param_names: names.into_iter().map(Arc::from).collect(),
                    }),
                    Err(e) => {
                        warn!(path = %full_path, error = %e, "Skipping route with invalid template");
                        None
                    }
                }
            })
            .collect();
        compiled.sort_by_key(|r| r.param_names.len());

        let routes_summary: Vec<String> = compiled
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method, r.meta.full_path()))
            .collect();
        info!(
            routes_count = compiled.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self { routes: compiled }
    }

    /// Registered routes in matching order.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteMeta>> {
        self.routes.iter().map(|r| &r.meta)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Match an HTTP request to a route.
    ///
    /// Variables bind to the raw segment text; nothing is decoded or coerced.
    ///
    /// ```
    /// use http::Method;
    /// use userspec::router::Router;
    /// use userspec::spec::{build_routes, Document};
    /// use serde_json::json;
    ///
    /// let doc = Document::from_value(json!({
    ///     "swagger": "2.0",
    ///     "basePath": "/v2",
    ///     "paths": { "/user/{username}": { "get": {
    ///         "operationId": "getUserByName",
    ///         "responses": { "200": { "description": "ok" } }
    ///     } } }
    /// }));
    /// let router = Router::new(build_routes(&doc).unwrap());
    ///
    /// let m = router.route(Method::GET, "/v2/user/user1").unwrap();
    /// assert_eq!(m.get_path_param("username"), Some("user1"));
    /// assert!(router.route(Method::GET, "/v2/user/user1/extra").is_none());
    /// ```
    #[must_use]
    pub fn route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");

        for route in self.routes.iter().filter(|r| r.method == method) {
            let Some(caps) = route.regex.captures(path) else {
                continue;
            };
            let path_params: ParamVec = route
                .param_names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    caps.get(i + 1)
                        .map(|m| (Arc::clone(name), m.as_str().to_string()))
                })
                .collect();
            let handler_name = route.meta.handler_name.to_string();
            debug!(
                method = %method,
                path = %path,
                handler_name = %handler_name,
                route_pattern = %route.meta.path_pattern,
                path_params = ?path_params,
                "Route matched"
            );
            return Some(RouteMatch {
                route: Arc::clone(&route.meta),
                path_params,
                handler_name,
                query_params: ParamVec::new(),
            });
        }

        warn!(method = %method, path = %path, "No route matched");
        None
    }

    /// Convert a path template to an anchored regex and its variable names.
    ///
    /// `/users/{id}` becomes `^/users/([^/]+)$` with names `["id"]`. Literal
    /// segments are escaped, so `.` or `+` in a template match only themselves.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), regex::Error> {
        if path == "/" || path.is_empty() {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/').skip(1) {
            pattern.push('/');
            if segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}') {
                pattern.push_str("([^/]+)");
                param_names.push(segment[1..segment.len() - 1].to_string());
            } else {
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}
