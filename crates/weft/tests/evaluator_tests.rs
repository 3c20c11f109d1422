//! Integration tests for core language semantics: closures, scoping,
//! control flow, error handling, and the default builtin surface. These
//! drive the evaluator only through the public `Engine` façade, the way an
//! embedder actually would.

use std::sync::Arc;

use weft::{CollectingHooks, Engine};

/// Runs `code` to completion and returns everything written to stdout.
fn run(code: &str) -> String {
    let hooks = Arc::new(CollectingHooks::new());
    let engine = Engine::new().with_hooks(hooks.clone());
    engine.execute(code, "test").expect("script should succeed");
    hooks.output()
}

/// A script that fails should surface its `RuntimeError`/`ScriptError`
/// rather than panicking the host.
fn run_err(code: &str) -> weft::ScriptError {
    let engine = Engine::new();
    engine.execute(code, "test").expect_err("script should fail")
}

#[test]
fn closures_capture_mutable_state_across_calls() {
    let output = run(
        r"
function mk() var c = 0
  return function() c = c + 1; return c end
end
f = mk(); print(f()); print(f()); print(f())
",
    );
    assert_eq!(output, "1\n2\n3\n");
}

#[test]
fn independent_closures_do_not_share_state() {
    let output = run(
        r"
function mk() var c = 0
  return function() c = c + 1; return c end
end
a = mk(); b = mk()
print(a()); print(a()); print(b())
",
    );
    assert_eq!(output, "1\n2\n1\n");
}

#[test]
fn plain_assignment_to_a_name_unbound_anywhere_stays_local_to_the_call() {
    let err = run_err(
        r"
function set_it() answer = 42 end
set_it()
print(answer)
",
    );
    match err {
        weft::ScriptError::Runtime(e) => assert_eq!(e.kind, weft::RuntimeErrorKind::UndefinedVariable),
        other => panic!("expected undefined variable error, got {other:?}"),
    }
}

#[test]
fn plain_assignment_to_an_already_bound_name_updates_it_through_a_call() {
    let output = run(
        r"
answer = 0
function set_it() answer = 42 end
set_it()
print(answer)
",
    );
    assert_eq!(output, "42\n");
}

#[test]
fn for_loop_over_array_and_numeric_range() {
    let output = run(
        r"
total = 0
for x in [1, 2, 3] do total = total + x end
for i = 1, 3 do total = total + i end
print(total)
",
    );
    assert_eq!(output, "12\n");
}

#[test]
fn try_catch_recovers_thrown_object() {
    let output = run(r#"try throw({code = "ERR_404", status = 404}) catch (e) print(e.code) end"#);
    assert_eq!(output, "ERR_404\n");
}

#[test]
fn uncaught_throw_surfaces_as_thrown_script_error() {
    let err = run_err(r#"throw("boom")"#);
    assert!(matches!(err, weft::ScriptError::Thrown(_)));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let err = run_err("x = 1 / 0");
    match err {
        weft::ScriptError::Runtime(e) => assert_eq!(e.kind, weft::RuntimeErrorKind::DivisionByZero),
        other => panic!("expected runtime error, got {other:?}"),
    }
}

#[test]
fn higher_order_functions_compose() {
    let output = run(
        r"
doubled = map([1, 2, 3], function(x) return x * 2 end)
evens = filter(doubled, function(x) return x > 2 end)
total = reduce(evens, function(acc, x) return acc + x end, 0)
print(total)
",
    );
    assert_eq!(output, "10\n");
}

#[test]
fn array_and_string_builtins() {
    let output = run(
        r#"
a = [3, 1, 2]
push(a, 4)
a = sort(a)
print(join(a, ","))
print(upper(trim(" hi ")))
"#,
    );
    assert_eq!(output, "1,2,3,4\nHI\n");
}

#[test]
fn json_round_trip() {
    let output = run(r#"print(format_json(parse_json("[{\"name\":\"Ann\"}]")))"#);
    assert_eq!(output, "[{\"name\":\"Ann\"}]\n");
}

#[test]
fn deep_copy_does_not_alias_the_original() {
    let output = run(
        r"
a = [1, [2, 3]]
b = deep_copy(a)
b[0] = 99
print(a[0])
",
    );
    assert_eq!(output, "1\n");
}

#[test]
fn array_aliasing_is_visible_through_every_reference() {
    let output = run(
        r"
a = [1, 2, 3]
b = a
b[0] = 99
print(a[0])
",
    );
    assert_eq!(output, "99\n");
}
