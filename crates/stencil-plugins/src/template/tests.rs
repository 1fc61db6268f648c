//! Unit tests for the template integration.

use std::error::Error as _;
use std::fs;

use minijinja::context;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::tests::{MockSpawner, StubSpawner, nix_plugin};

const ECHO_LOOP: &str = r#"{% for item in plugin("nix", "echoPlugin", data) %}{{ item }}{% endfor %}"#;

#[fixture]
fn function() -> PluginFunction<StubSpawner> {
    PluginFunction::new(PluginInvoker::new(StubSpawner::default()), Vec::new())
}

fn environment(function: PluginFunction<StubSpawner>) -> Environment<'static> {
    let mut env = Environment::new();
    function.register(&mut env);
    env
}

// ---------------------------------------------------------------------------
// Direct calls
// ---------------------------------------------------------------------------

#[rstest]
fn scalar_data_is_wrapped_then_typed(function: PluginFunction<StubSpawner>) {
    let result = function
        .call("nix", "echoPlugin", &json!("Hello,World"))
        .expect("call");
    assert_eq!(
        result,
        Normalized::Strings(vec!["Hello,Worldnix echoPlugin".into()])
    );
}

#[rstest]
#[case::uniform("list", Normalized::Strings(vec!["things".into(), "and".into(), "stuff".into()]))]
#[case::with_null(
    "mixed",
    Normalized::Untyped(vec![json!("things"), Value::Null, json!("stuff")])
)]
fn sequence_data_is_normalised(
    function: PluginFunction<StubSpawner>,
    #[case] plugin_function: &str,
    #[case] expected: Normalized,
) {
    let result = function
        .call("nix", plugin_function, &Value::Null)
        .expect("call");
    assert_eq!(result, expected);
}

#[rstest]
fn missing_data_field_is_an_error(function: PluginFunction<StubSpawner>) {
    let err = function
        .call("nix", "nodata", &Value::Null)
        .expect_err("no data field");
    assert!(matches!(err, PluginError::MissingData { .. }), "got {err}");
}

// ---------------------------------------------------------------------------
// Plugin location
// ---------------------------------------------------------------------------

#[test]
fn bare_names_resolve_through_search_dirs() {
    let dir = TempDir::new().expect("tempdir");
    let plugin = dir.path().join("nix");
    fs::write(&plugin, "").expect("write plugin");

    let function = PluginFunction::new(
        PluginInvoker::new(StubSpawner::default()),
        vec![dir.path().to_path_buf()],
    );
    assert_eq!(function.locate("nix").expect("locate"), plugin);
    let result = function.call("nix", "list", &Value::Null).expect("call");
    assert_eq!(result.len(), 3);
}

#[test]
fn unresolvable_names_fail_before_spawning() {
    let dir = TempDir::new().expect("tempdir");
    let mut spawner = MockSpawner::new();
    spawner.expect_spawn().never();

    let function = PluginFunction::new(PluginInvoker::new(spawner), vec![dir.path().to_path_buf()]);
    let err = function
        .call("nix", "list", &Value::Null)
        .expect_err("not found");
    assert!(matches!(err, PluginError::NotFound { searched: 1, .. }), "got {err}");
}

#[test]
fn path_identifiers_are_used_verbatim() {
    let mut spawner = MockSpawner::new();
    spawner
        .expect_spawn()
        .withf(|program, args| program == Path::new("./bin/nix") && args == ["list"])
        .times(1)
        .returning(|program, args| StubSpawner::new(nix_plugin).spawn(program, args));

    let function = PluginFunction::new(
        PluginInvoker::new(spawner),
        vec![PathBuf::from("/nowhere")],
    );
    let result = function
        .call("./bin/nix", "list", &Value::Null)
        .expect("call");
    assert!(result.is_typed());
}

#[rstest]
fn bare_names_pass_through_without_search_dirs(function: PluginFunction<StubSpawner>) {
    assert_eq!(function.locate("nix").expect("locate"), PathBuf::from("nix"));
}

// ---------------------------------------------------------------------------
// Template rendering
// ---------------------------------------------------------------------------

#[rstest]
fn loop_over_scalar_result_emits_single_item(function: PluginFunction<StubSpawner>) {
    let env = environment(function);
    let rendered = env
        .render_str(ECHO_LOOP, context! { data => "Hello,World" })
        .expect("render");
    assert_eq!(rendered, "Hello,Worldnix echoPlugin");
}

#[rstest]
fn loop_over_sequence_keeps_order(function: PluginFunction<StubSpawner>) {
    let env = environment(function);
    let rendered = env
        .render_str(
            r#"{% for item in plugin("nix", "list", none) %}[{{ item }}]{% endfor %}"#,
            context! {},
        )
        .expect("render");
    assert_eq!(rendered, "[things][and][stuff]");
}

#[rstest]
fn mixed_results_keep_null_in_place(function: PluginFunction<StubSpawner>) {
    let env = environment(function);
    let rendered = env
        .render_str(
            r#"{% for item in plugin("nix", "mixed", none) %}{{ item is none }},{% endfor %}"#,
            context! {},
        )
        .expect("render");
    assert_eq!(rendered, "false,true,false,");
}

#[rstest]
fn structured_arguments_cross_the_boundary(function: PluginFunction<StubSpawner>) {
    let env = environment(function);
    let rendered = env
        .render_str(
            r#"{{ plugin("nix", "echo", {"a": [1, 2]})[0].a | join("-") }}"#,
            context! {},
        )
        .expect("render");
    assert_eq!(rendered, "1-2");
}

#[rstest]
fn plugin_failure_aborts_rendering(function: PluginFunction<StubSpawner>) {
    let env = environment(function);
    let err = env
        .render_str(r#"before {{ plugin("nix", "fail", 1) }} after"#, context! {})
        .expect_err("render fails");
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    let source = err
        .source()
        .and_then(|source| source.downcast_ref::<PluginError>())
        .expect("plugin error source");
    assert!(matches!(source, PluginError::NonZeroExit { status: 3, .. }));
}

#[test]
fn to_template_value_preserves_items() {
    let value = to_template_value(Normalized::Integers(vec![3, 1, 2]));
    assert_eq!(value.len(), Some(3));
    assert_eq!(value.to_string(), "[3, 1, 2]");
}
