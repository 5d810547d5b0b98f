//! Wiring of the user service: document, routes, handlers and HTTP service.

use crate::config::ServiceConfig;
use crate::dispatcher::Dispatcher;
use crate::handlers::{register_user_handlers, UserStore};
use crate::router::Router;
use crate::server::AppService;
use crate::spec::load_spec;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load `spec_path` and assemble the service with a freshly seeded [`UserStore`].
pub fn build_service(spec_path: &Path, config: &ServiceConfig) -> anyhow::Result<AppService> {
    build_service_with_store(spec_path, config, Arc::new(UserStore::seeded()))
}

pub fn build_service_with_store(
    spec_path: &Path,
    config: &ServiceConfig,
    store: Arc<UserStore>,
) -> anyhow::Result<AppService> {
    let (doc, routes) = load_spec(spec_path)
        .with_context(|| format!("failed to load document {}", spec_path.display()))?;

    let mut dispatcher = Dispatcher::new();
    register_user_handlers(&mut dispatcher, store);
    for route in routes.iter().filter(|r| !dispatcher.has_handler(&r.handler_name)) {
        warn!(
            method = %route.method,
            path = %route.full_path(),
            handler_name = %route.handler_name,
            "Route has no registered handler"
        );
    }

    let router = Router::new(routes);
    let service = AppService::new(Arc::new(doc), Arc::new(router), Arc::new(dispatcher))
        .with_config(config)
        .with_spec_path(spec_path);
    let compiled = service.precompile_schemas();
    info!(
        spec = %spec_path.display(),
        schemas = compiled,
        response_validation = %config.response_validation,
        "Service assembled"
    );
    Ok(service)
}
