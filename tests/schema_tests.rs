//! Schema Tests
//!
//! Resolution, serialization and faux data against the fixture definitions.

use std::path::{Path, PathBuf};

use render_graph::{DefinitionRegistry, RenderContext, RenderError, Schema, TypeTag, ValuePath};
use serde_json::{json, Value};

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/definitions")
}

fn context(live: bool) -> RenderContext {
    let mut definitions = DefinitionRegistry::new();
    definitions.load_from_directory(&fixtures_path()).unwrap();
    RenderContext::new().with_live(live).with_definitions(definitions)
}

// =============================================================================
// Loading & Resolution
// =============================================================================

#[test]
fn test_fixtures_load() {
    let ctx = context(true);
    assert_eq!(
        ctx.definitions.ids(),
        vec!["director", "film", "films", "http://schemas.render.local/core#", "shelf"]
    );
}

#[test]
fn test_foreign_references_resolve() {
    let ctx = context(true);
    let film = Schema::from_id(&ctx, "film").unwrap();

    let year = film.field("year").unwrap().info();
    assert_eq!(year.types, vec![TypeTag::Integer]);
    assert_eq!(year.constraints.minimum, Some(1900.0));

    let id = film.field("id").unwrap().info();
    assert_eq!(id.constraints.max_length, Some(12));
    assert_eq!(film.required(), ["id".to_string(), "name".to_string()]);
}

#[test]
fn test_closest_scope_wins() {
    let ctx = context(true);
    let shelf = Schema::from_id(&ctx, "shelf").unwrap();

    assert_eq!(shelf.field("published").unwrap().info().types, vec![TypeTag::Float]);
    let book = shelf.field("book").unwrap().schema().unwrap();
    assert_eq!(book.field("year").unwrap().info().types, vec![TypeTag::Integer]);
}

#[test]
fn test_invalid_definition_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ \"id\": ").unwrap();

    let mut definitions = DefinitionRegistry::new();
    let err = definitions.load_from_directory(dir.path()).unwrap_err();
    assert!(matches!(err, RenderError::InvalidDefinition { .. }));
}

#[test]
fn test_definition_without_id_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("anonymous.json"), r#"{ "title": "anonymous" }"#).unwrap();

    let mut definitions = DefinitionRegistry::new();
    let err = definitions.load_from_directory(dir.path()).unwrap_err();
    assert!(matches!(err, RenderError::DefinitionMissingId { .. }));
}

// =============================================================================
// Serialization
// =============================================================================

#[test]
fn test_round_trip_identity() {
    let ctx = context(true);
    let film = Schema::from_id(&ctx, "film").unwrap();

    let input = json!({
        "id": "F1",
        "name": "Alien",
        "year": 1979,
        "genre": "sci-fi",
        "rating": 8.5,
        "director_id": "D1",
        "tags": ["space", "horror"]
    });
    assert_eq!(film.serialize(&ctx, &input).unwrap(), input);
}

#[test]
fn test_coerces_input() {
    let ctx = context(true);
    let film = Schema::from_id(&ctx, "film").unwrap();

    let output = film
        .serialize(&ctx, &json!({ "id": 12, "year": "1982", "rating": "7.5" }))
        .unwrap();
    assert_eq!(output["id"], "12");
    assert_eq!(output["year"], 1982);
    assert_eq!(output["rating"], 7.5);
    assert_eq!(output["tags"], json!([]));
}

#[test]
fn test_default_on_absence() {
    for live in [true, false] {
        let ctx = context(live);
        let film = Schema::from_id(&ctx, "film").unwrap();
        let output = film.serialize(&ctx, &json!({})).unwrap();
        assert_eq!(output["rating"], json!(5.0), "live = {}", live);
    }
}

#[test]
fn test_required_cross_check() {
    let ctx = context(true);
    let err = Schema::from_definition(
        &ctx,
        json!({
            "title": "film",
            "properties": { "name": { "type": "string" } },
            "required": ["name", "year"]
        }),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::InvalidRequire { name, .. } if name == "year"));
}

#[test]
fn test_uniqueness() {
    let ctx = context(true);
    let ids = Schema::from_definition(
        &ctx,
        json!({ "title": "ids", "type": "array", "uniqueItems": true, "items": { "type": "integer" } }),
    )
    .unwrap();
    assert_eq!(ids.serialize(&ctx, &json!([1, 1, 2, "2"])).unwrap(), json!([1, 2]));
}

// =============================================================================
// Faux Data
// =============================================================================

#[test]
fn test_faux_data_respects_bounds() {
    let ctx = context(false);
    let schema = Schema::from_definition(
        &ctx,
        json!({
            "title": "bounded",
            "properties": {
                "count": { "type": "integer", "minimum": 5, "maximum": 10, "exclusiveMinimum": true }
            }
        }),
    )
    .unwrap();

    for _ in 0..1000 {
        let output = schema.serialize(&ctx, &json!({})).unwrap();
        let v = output["count"].as_i64().unwrap();
        assert!(5 < v && v <= 10, "{} out of bounds", v);
    }
}

#[test]
fn test_faux_film() {
    let ctx = context(false);
    let film = Schema::from_id(&ctx, "film").unwrap();

    for _ in 0..100 {
        let output = film.serialize(&ctx, &Value::Null).unwrap();

        let name = output.get_path_str("name").unwrap();
        assert!((3..=40).contains(&name.chars().count()));

        let year = output["year"].as_i64().unwrap();
        assert!((1900..=2030).contains(&year));

        let genre = output["genre"].as_str().unwrap();
        assert!(["horror", "action", "sci-fi"].contains(&genre));

        let tags = output["tags"].as_array().unwrap();
        assert!((2..=4).contains(&tags.len()));
        assert!(tags.iter().all(Value::is_string));
    }
}

#[test]
fn test_explicit_values_override_faux_data() {
    let ctx = context(false);
    let film = Schema::from_id(&ctx, "film").unwrap();
    let output = film.serialize(&ctx, &json!({ "name": "Heat", "tags": ["crime"] })).unwrap();
    assert_eq!(output["name"], "Heat");
    assert_eq!(output["tags"], json!(["crime"]));
}

#[test]
fn test_custom_generator_shadows_builtin() {
    let mut ctx = context(false);
    ctx.generators
        .register(TypeTag::String, "^name$", |_| Some(json!("The Thing")))
        .unwrap();

    let film = Schema::from_id(&ctx, "film").unwrap();
    let output = film.serialize(&ctx, &json!({})).unwrap();
    assert_eq!(output["name"], "The Thing");
    assert_ne!(output["director_id"], "The Thing");
}

#[test]
fn test_faux_array_limit() {
    let ctx = context(false).with_faux_array_limit(1);
    let names = Schema::from_definition(
        &ctx,
        json!({ "title": "names", "type": "array", "items": { "type": "string" } }),
    )
    .unwrap();

    for _ in 0..50 {
        let output = names.serialize(&ctx, &Value::Null).unwrap();
        assert!(output.as_array().unwrap().len() <= 1);
    }
}

#[test]
fn test_terse_schema_keeps_id_field() {
    let ctx = context(false);
    let director = Schema::from_definition(&ctx, json!({ "title": "director", "id": "string", "name": "string" })).unwrap();

    assert_eq!(director.fields().len(), 2);
    let output = director.serialize(&ctx, &json!({ "id": "D1" })).unwrap();
    assert_eq!(output["id"], "D1");
    assert!(output["name"].is_string());
}

#[test]
fn test_faux_data_at_numeric_limits() {
    let ctx = context(false);
    let schema = Schema::from_definition(
        &ctx,
        json!({
            "title": "limits",
            "huge": { "type": "integer", "minimum": 9.3e18 },
            "tiny": { "type": "integer", "maximum": -9.3e18, "exclusiveMaximum": true },
            "wide": { "type": "number", "minimum": -1.7e308, "maximum": 1.7e308 }
        }),
    )
    .unwrap();

    for _ in 0..100 {
        let output = schema.serialize(&ctx, &json!({})).unwrap();
        assert_eq!(output["huge"], json!(i64::MAX));
        assert_eq!(output["tiny"], json!(i64::MIN));
        assert!(output["wide"].as_f64().unwrap().is_finite());
    }
}
