use crate::app::build_service;
use crate::config::ServiceConfig;
use crate::router::Router;
use crate::schema::{materialize, resolve, validate, Reference};
use crate::server::HttpServer;
use crate::spec::{load_document, load_spec};
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// Command-line interface for the user API service
#[derive(Parser, Debug)]
#[command(name = "userspec", version)]
#[command(about = "Swagger 2.0 user service and schema checker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the user API described by a Swagger 2.0 document
    Serve {
        /// Path to the Swagger document (YAML or JSON)
        #[arg(short, long, default_value = "api/swagger.yaml")]
        spec: PathBuf,

        /// Address to bind
        #[arg(short, long, env = "USERAPI_ADDR", default_value = "0.0.0.0:8080")]
        addr: String,
    },
    /// Print the routing table derived from a document
    Routes {
        #[arg(short, long, default_value = "api/swagger.yaml")]
        spec: PathBuf,
    },
    /// Materialize the schema behind a reference, optionally validating an instance
    ///
    /// Without an instance the standalone schema is printed as JSON. With one, every
    /// violation is printed and the command fails if there are any.
    Check {
        #[arg(short, long, default_value = "api/swagger.yaml")]
        spec: PathBuf,

        /// Reference such as `#/definitions/User` or `#/paths/~1user~1{username}/get/responses/200`
        #[arg(short, long)]
        reference: String,

        /// Instance as inline JSON
        #[arg(short, long, conflicts_with = "instance_file")]
        instance: Option<String>,

        /// Instance read from a JSON file
        #[arg(long)]
        instance_file: Option<PathBuf>,
    },
}

pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { spec, addr } => serve(spec, &addr),
        Commands::Routes { spec } => routes(spec),
        Commands::Check {
            spec,
            reference,
            instance,
            instance_file,
        } => check(spec, &reference, instance, instance_file),
    }
}

fn serve(spec: PathBuf, addr: &str) -> anyhow::Result<()> {
    let config = ServiceConfig::from_env();
    may::config().set_stack_size(config.stack_size);
    let service = build_service(&spec, &config)?;
    let handle = HttpServer(service)
        .start(addr)
        .with_context(|| format!("failed to bind {addr}"))?;
    handle
        .join()
        .map_err(|e| anyhow!("server coroutine panicked: {e:?}"))
}

fn routes(spec: PathBuf) -> anyhow::Result<()> {
    let (_doc, routes) = load_spec(&spec)?;
    let router = Router::new(routes);
    println!("[routes] count={}", router.len());
    for route in router.routes() {
        println!("[route] {} {} -> {}", route.method, route.full_path(), route.handler_name);
    }
    Ok(())
}

fn read_instance(instance: Option<String>, instance_file: Option<PathBuf>) -> anyhow::Result<Option<Value>> {
    let text = match (instance, instance_file) {
        (Some(inline), _) => inline,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => return Ok(None),
    };
    serde_json::from_str(&text)
        .map(Some)
        .context("instance is not valid JSON")
}

fn check(
    spec: PathBuf,
    reference: &str,
    instance: Option<String>,
    instance_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let doc = load_document(&spec)?;
    let reference: Reference = reference.parse()?;
    let node = resolve(&doc, &reference)?;
    let schema = materialize(&doc, &node)?;

    let Some(instance) = read_instance(instance, instance_file)? else {
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    };

    let errors = validate(&schema, &instance);
    if errors.is_empty() {
        println!("valid: {reference} ({})", node.kind);
        return Ok(());
    }
    for error in &errors {
        println!("{error}");
    }
    Err(anyhow!("{} validation error(s) against {reference}", errors.len()))
}
