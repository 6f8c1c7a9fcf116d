//! Graph Composition
//!
//! A [`Graph`] binds a [`Schema`] to an endpoint template and to child graphs.
//! Rendering a graph:
//!
//! 1. expands its endpoint from inherited relationship values, then its own
//!    configuration
//! 2. renders its schema (fetching in live mode, synthesizing offline)
//! 3. derives each child's inherited values from the rendered data through the
//!    child's relationships (`parent field -> child field`)
//! 4. renders children once, or once per element when the schema is an array
//! 5. merges everything into one flat map keyed by title
//!
//! Children are rendered concurrently when the context allows it. The first
//! failing branch aborts the whole render and drops the branches still in
//! flight. Per-element child results keep the parent array's order.

pub mod endpoint;

pub use endpoint::EndpointTemplate;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::context::RenderContext;
use crate::error::Result;
use crate::schema::Schema;

/// Rendered output: titles (and nested graph titles) to data
pub type Output = Map<String, Value>;

/// A schema bound to an endpoint, relationships and child graphs
#[derive(Debug, Clone)]
pub struct Graph {
    schema: Arc<Schema>,
    title: Option<String>,
    endpoint: Option<EndpointTemplate>,
    /// (parent field, child field) pairs
    relationships: Vec<(String, String)>,
    /// Catch-all endpoint variables
    config: Map<String, Value>,
    graphs: Vec<Graph>,
}

impl Graph {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
            title: None,
            endpoint: None,
            relationships: Vec::new(),
            config: Map::new(),
            graphs: Vec::new(),
        }
    }

    // =========================================================================
    // Builder
    // =========================================================================

    /// Endpoint template; defaults to the schema's declared endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(EndpointTemplate::new(endpoint));
        self
    }

    /// Feed `parent_key` of the parent's data into this graph as `child_key`
    pub fn with_relationship(mut self, parent_key: impl Into<String>, child_key: impl Into<String>) -> Self {
        self.relationships.push((parent_key.into(), child_key.into()));
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_graph(mut self, graph: Graph) -> Self {
        self.graphs.push(graph);
        self
    }

    /// Output key override; defaults to the schema title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| self.schema.title())
    }

    pub fn endpoint_template(&self) -> EndpointTemplate {
        match &self.endpoint {
            Some(template) => template.clone(),
            None => EndpointTemplate::new(self.schema.endpoint().unwrap_or_default()),
        }
    }

    pub fn relationships(&self) -> &[(String, String)] {
        &self.relationships
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn graphs(&self) -> &[Graph] {
        &self.graphs
    }

    /// Expand the endpoint from inherited values, then configuration
    pub fn endpoint(&self, inherited: &Map<String, Value>) -> Result<String> {
        self.endpoint_template().expand(&[inherited, &self.config])
    }

    /// Values this graph inherits from its parent's rendered data.
    ///
    /// Keyed parent data is read by field; any other parent data (an array
    /// element that is a scalar, say) is passed whole. Null values are skipped.
    pub fn relationship_info(&self, parental: &Value) -> Map<String, Value> {
        let mut info = Map::new();
        for (parent_key, child_key) in &self.relationships {
            let value = match parental {
                Value::Object(map) => map.get(parent_key).cloned(),
                other => Some(other.clone()),
            };
            if let Some(value) = value.filter(|v| !v.is_null()) {
                info.insert(child_key.clone(), value);
            }
        }
        info
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render this graph and all of its children
    pub async fn render(&self, ctx: &RenderContext) -> Result<Value> {
        self.render_with(ctx, Value::Null).await
    }

    /// Render with explicit root data; offline it overrides synthesized values
    pub async fn render_with(&self, ctx: &RenderContext, explicit: Value) -> Result<Value> {
        let output = self.render_node(ctx, Map::new(), explicit).await?;
        Ok(Value::Object(output))
    }

    fn render_node<'a>(
        &'a self,
        ctx: &'a RenderContext,
        inherited: Map<String, Value>,
        seed: Value,
    ) -> BoxFuture<'a, Result<Output>> {
        async move {
            let endpoint = self.endpoint(&inherited)?;
            debug!(title = self.title(), %endpoint, "rendering graph");

            let input = self.input(inherited, seed);
            let data = self.schema.render(ctx, &input, &endpoint).await?;

            let mut output = Output::new();
            output.insert(self.title().to_string(), data.clone());

            if self.graphs.is_empty() {
                return Ok(output);
            }

            match &data {
                Value::Array(elements) if self.schema.is_array() => {
                    let results = self.render_children(ctx, elements).await?;
                    let n = elements.len();
                    for (index, child) in self.graphs.iter().enumerate() {
                        merge_aligned(&mut output, child, &results[index * n..(index + 1) * n]);
                    }
                }
                parental => {
                    let results = self.render_children(ctx, std::slice::from_ref(parental)).await?;
                    for result in results {
                        output.extend(result);
                    }
                }
            }

            Ok(output)
        }
        .boxed()
    }

    /// Input for this node's schema.
    ///
    /// Array schemas get the raw parental data. Object schemas get the
    /// configuration, overlaid by inherited values, overlaid by the seed.
    fn input(&self, inherited: Map<String, Value>, seed: Value) -> Value {
        if self.schema.is_array() {
            return seed;
        }

        let mut input = self.config.clone();
        input.extend(inherited);
        if let Value::Object(explicit) = seed {
            input.extend(explicit);
        }
        Value::Object(input)
    }

    /// Render every child against every parental value, child-major
    async fn render_children(&self, ctx: &RenderContext, parentals: &[Value]) -> Result<Vec<Output>> {
        let mut branches: Vec<BoxFuture<'_, Result<Output>>> =
            Vec::with_capacity(self.graphs.len() * parentals.len());

        for child in &self.graphs {
            for parental in parentals {
                let inherited = child.relationship_info(parental);
                let seed = if child.schema.is_array() {
                    parental.clone()
                } else {
                    Value::Null
                };
                branches.push(child.render_node(ctx, inherited, seed));
            }
        }

        if ctx.concurrent {
            try_join_all(branches).await
        } else {
            let mut results = Vec::with_capacity(branches.len());
            for branch in branches {
                results.push(branch.await?);
            }
            Ok(results)
        }
    }
}

/// Merge per-element child outputs as index-aligned lists, one per key
fn merge_aligned(output: &mut Output, child: &Graph, per_element: &[Output]) {
    let mut keys: Vec<&String> = Vec::new();
    for result in per_element {
        for key in result.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    if keys.is_empty() {
        output.insert(child.title().to_string(), Value::Array(Vec::new()));
        return;
    }

    let merged: Vec<(String, Value)> = keys
        .into_iter()
        .map(|key| {
            let aligned = per_element
                .iter()
                .map(|result| result.get(key).cloned().unwrap_or(Value::Null))
                .collect();
            (key.clone(), Value::Array(aligned))
        })
        .collect();
    output.extend(merged);
}
