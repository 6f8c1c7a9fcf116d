//! Render Graph
//!
//! Schema-driven data modeling: resolve JSON-Schema-like definitions into
//! attribute trees, serialize data against them, synthesize faux data when no
//! live data is available, and compose schemas into endpoint graphs.
//!
//! ## Features
//!
//! - **Reference Resolution**: `$ref` pointers across loaded definitions and
//!   within a document, closest scope first
//! - **Coercion**: values are converted to their declared types
//! - **Faux Data**: constraint-aware generators, overridable per type and name
//! - **Graphs**: parent data flows into child endpoints, fanned out concurrently
//!
//! ## Architecture
//!
//! ```text
//! RenderContext
//! ├── TypeRegistry        type/format names -> TypeTag
//! ├── DefinitionRegistry  raw definitions by id
//! ├── GeneratorRegistry   faux value algorithms
//! └── Transport           GET for live mode
//!
//! Graph ── Schema ── FieldAttribute / ElementAttribute ── Schema ...
//!   └── Graph ...
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use render_graph::{Graph, RenderContext, Schema};
//! use serde_json::json;
//!
//! # async fn run() -> render_graph::Result<()> {
//! let ctx = RenderContext::new().with_live(false);
//! let film = Schema::from_definition(&ctx, json!({ "title": "film", "name": "string" }))?;
//! let output = Graph::new(film).render(&ctx).await?;
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod config;
pub mod context;
pub mod definition;
pub mod error;
pub mod faux;
pub mod generator;
pub mod graph;
pub mod path;
pub mod resolver;
pub mod schema;
pub mod transport;
pub mod types;

pub use attribute::{Constraints, ElementAttribute, ElementShape, FieldAttribute, TypeInfo};
pub use config::RenderConfig;
pub use context::RenderContext;
pub use definition::{DefinitionFiles, DefinitionRegistry, FsDefinitionFiles};
pub use error::{RenderError, Result};
pub use generator::{Generator, GeneratorRegistry};
pub use graph::{EndpointTemplate, Graph};
pub use path::{get_path, ValuePath};
pub use resolver::Resolver;
pub use schema::{Attributes, Schema, SchemaSource, SchemaType};
pub use transport::{HttpTransport, Transport, TransportResponse};
pub use types::{TypeRegistry, TypeTag};
