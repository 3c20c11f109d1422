//! Integration tests for the `parallel` concurrency combinator (spec
//! §4.5–§4.6): real-thread execution, shape-preserving result collection,
//! per-task failure isolation, and scope isolation between sibling tasks.

use std::sync::Arc;

use weft::{CollectingHooks, Engine};

fn run(code: &str) -> String {
    let hooks = Arc::new(CollectingHooks::new());
    let engine = Engine::new().with_hooks(hooks.clone());
    engine.execute(code, "test").expect("script should succeed");
    hooks.output()
}

#[test]
fn varargs_form_returns_array_in_call_order() {
    let output = run("results = parallel(function() return 1 end, function() return 2 end, function() return 3 end); print(len(results))");
    assert_eq!(output, "3\n");
}

#[test]
fn array_form_preserves_index_order() {
    let output = run(
        r"
results = parallel([function() return 10 end, function() return 20 end, function() return 30 end])
print(results[0]); print(results[1]); print(results[2])
",
    );
    assert_eq!(output, "10\n20\n30\n");
}

#[test]
fn object_form_preserves_keys() {
    let output = run(
        r#"
results = parallel({a = function() return 1 end, b = function() return 2 end})
print(results.a); print(results.b)
"#,
    );
    assert_eq!(output, "1\n2\n");
}

#[test]
fn failing_task_contributes_nil_without_aborting_siblings() {
    let output = run(
        r"
results = parallel(function() return 1 / 0 end, function() return 42 end)
print(results[0]); print(results[1])
",
    );
    assert_eq!(output, "nil\n42\n");
}

#[test]
fn sibling_tasks_do_not_observe_each_others_writes() {
    let output = run(
        r"
shared = 0
parallel(
  function() shared = 1; return shared end,
  function() shared = 2; return shared end
)
print(shared)
",
    );
    assert_eq!(output, "0\n");
}

#[test]
fn task_writes_through_a_nested_call_still_never_mutate_an_already_bound_ancestor() {
    let output = run(
        r"
counter = 0
increment_counter = function() counter = counter + 1 end
results = parallel(increment_counter, increment_counter)
print(counter)
",
    );
    assert_eq!(output, "0\n");
}

#[test]
fn blocks_until_every_task_has_completed() {
    let output = run(
        r"
results = parallel(
  function() sleep(0.02); return 'slow' end,
  function() return 'fast' end
)
print(results[0]); print(results[1])
",
    );
    assert_eq!(output, "slow\nfast\n");
}
