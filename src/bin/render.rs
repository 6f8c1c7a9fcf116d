//! Render Graph CLI
//!
//! Renders one schema as a single-node graph and prints the JSON result.
//! `--live` and `--offline` override the configured `[render] live` mode.

use anyhow::{bail, Context};
use clap::Parser;
use render_graph::{Graph, RenderConfig, RenderContext, Schema};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "render-graph")]
#[command(about = "Render a schema from live endpoints or synthesized data")]
struct Cli {
    /// Config file layered over render.toml and RENDER__* variables
    #[arg(short, long)]
    config: Option<String>,

    /// Directory of definition files
    #[arg(short, long)]
    definitions: Option<PathBuf>,

    /// Identifier of the definition to render
    #[arg(short, long)]
    schema: String,

    /// Endpoint template (defaults to the definition's `endpoint`)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Fetch from the endpoint instead of synthesizing data
    #[arg(long, conflicts_with = "offline")]
    live: bool,

    /// Synthesize data without any request
    #[arg(long)]
    offline: bool,

    /// Render child graphs one at a time
    #[arg(long)]
    sequential: bool,

    /// Endpoint variables, as key=value
    #[arg(long = "set", value_name = "KEY=VALUE")]
    vars: Vec<String>,

    /// Explicit input data (JSON) used instead of synthesized values
    #[arg(long)]
    data: Option<String>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    /// Mode forced on the command line, if any
    fn live_override(&self) -> Option<bool> {
        match (self.live, self.offline) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = RenderConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(directory) = &cli.definitions {
        config.definitions.directory = Some(directory.clone());
    }
    if let Some(live) = cli.live_override() {
        config.render.live = live;
    }
    if cli.sequential {
        config.render.concurrent = false;
    }

    let ctx = RenderContext::from_config(&config)?;
    info!("{} definitions available", ctx.definitions.len());

    let schema = Schema::from_id(&ctx, &cli.schema)?;
    let mut graph = Graph::new(schema);
    if let Some(endpoint) = &cli.endpoint {
        graph = graph.with_endpoint(endpoint.clone());
    }
    for var in &cli.vars {
        let Some((key, value)) = var.split_once('=') else {
            bail!("invalid --set {:?}, expected KEY=VALUE", var);
        };
        graph = graph.with_config(key, value);
    }

    let explicit = match &cli.data {
        Some(data) => serde_json::from_str(data).context("--data is not valid JSON")?,
        None => Value::Null,
    };

    let output = graph.render_with(&ctx, explicit).await?;
    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);

    Ok(())
}
