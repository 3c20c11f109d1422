//! Integration tests for the `datastore(ns [, cfg])` coordination store
//! (spec §4.7–§4.8): per-method contracts, the reserved `sys` namespace,
//! and persistence round-trips through a real temp file.

use std::sync::Arc;

use weft::{CollectingHooks, Engine};

fn run(code: &str) -> String {
    let hooks = Arc::new(CollectingHooks::new());
    let engine = Engine::new().with_hooks(hooks.clone());
    engine.execute(code, "test").expect("script should succeed");
    hooks.output()
}

fn run_err(code: &str) -> weft::ScriptError {
    let engine = Engine::new();
    engine.execute(code, "test").expect_err("script should fail")
}

#[test]
fn set_and_get_round_trip() {
    let output = run(
        r#"
db = datastore("set_and_get")
db.set("name", "Ann")
print(db.get("name"))
print(db.get("missing"))
"#,
    );
    assert_eq!(output, "Ann\nnil\n");
}

#[test]
fn get_returns_a_deep_copy_not_the_live_array() {
    let output = run(
        r#"
db = datastore("get_deep_copy")
db.set("items", [1, 2, 3])
a = db.get("items")
a[0] = 99
print(db.get("items")[0])
"#,
    );
    assert_eq!(output, "1\n");
}

#[test]
fn increment_starts_from_zero_and_accumulates() {
    let output = run(
        r#"
db = datastore("increment_zero")
print(db.increment("hits"))
print(db.increment("hits"))
print(db.increment("hits", 5))
"#,
    );
    assert_eq!(output, "1\n2\n7\n");
}

#[test]
fn set_once_is_atomic_no_op_on_second_call() {
    let output = run(
        r#"
db = datastore("set_once")
print(db.set_once("k", 1))
print(db.set_once("k", 2))
print(db.get("k"))
"#,
    );
    assert_eq!(output, "true\nfalse\n1\n");
}

#[test]
fn push_pop_shift_unshift_behave_like_a_deque() {
    let output = run(
        r#"
db = datastore("deque")
print(db.push("q", 1))
print(db.push("q", 2))
print(db.unshift("q", 0))
print(db.shift("q"))
print(db.pop("q"))
print(db.get("q"))
"#,
    );
    assert_eq!(output, "1\n2\n3\n0\n2\n[1]\n");
}

#[test]
fn swap_returns_previous_value() {
    let output = run(
        r#"
db = datastore("swap")
print(db.swap("k", "first"))
print(db.swap("k", "second"))
"#,
    );
    assert_eq!(output, "nil\nfirst\n");
}

#[test]
fn rename_moves_value_and_clears_old_key() {
    let output = run(
        r#"
db = datastore("rename")
db.set("old", 42)
db.rename("old", "new")
print(db.exists("old"))
print(db.get("new"))
"#,
    );
    assert_eq!(output, "false\n42\n");
}

#[test]
fn delete_and_clear_remove_keys() {
    let output = run(
        r#"
db = datastore("delete_clear")
db.set("a", 1); db.set("b", 2)
db.delete("a")
print(db.exists("a")); print(db.exists("b"))
db.clear()
print(db.exists("b"))
"#,
    );
    assert_eq!(output, "false\ntrue\nfalse\n");
}

#[test]
fn keys_lists_every_current_key() {
    let output = run(
        r#"
db = datastore("keys")
db.set("a", 1); db.set("b", 2)
k = sort(db.keys())
print(join(k, ","))
"#,
    );
    assert_eq!(output, "a,b\n");
}

#[test]
fn wait_unblocks_once_another_thread_sets_the_key() {
    let output = run(
        r#"
db = datastore("wait_unblock")
results = parallel(
  function() return db.wait("ready") end,
  function() sleep(0.01); db.set("ready", "go"); return "setter" end
)
print(results[0]); print(results[1])
"#,
    );
    assert_eq!(output, "go\nsetter\n");
}

#[test]
fn wait_for_unblocks_once_predicate_is_satisfied() {
    let output = run(
        r#"
db = datastore("wait_for_unblock")
db.set("count", 0)
results = parallel(
  function() return db.wait_for("count", function(v) return v >= 3 end) end,
  function()
    sleep(0.01); db.increment("count")
    sleep(0.01); db.increment("count")
    sleep(0.01); db.increment("count")
    return "done"
  end
)
print(results[0]); print(results[1])
"#,
    );
    assert_eq!(output, "3\ndone\n");
}

#[test]
fn wait_times_out_when_the_key_never_arrives() {
    let err = run_err(r#"datastore("wait_timeout").wait("never", nil, 0.01)"#);
    assert!(matches!(err, weft::ScriptError::WaitTimeout(_)));
}

#[test]
fn sys_namespace_is_read_only() {
    let err = run_err(r#"datastore("sys").set("x", 1)"#);
    match err {
        weft::ScriptError::Runtime(e) => assert_eq!(e.kind, weft::RuntimeErrorKind::PermissionDenied),
        other => panic!("expected permission denied, got {other:?}"),
    }
}

#[test]
fn sys_namespace_exposes_host_metrics() {
    let output = run(r#"print(type(datastore("sys").get("uptime_seconds")))"#);
    assert_eq!(output, "number\n");
}

#[test]
fn sys_namespace_rejects_config() {
    let err = run_err(r#"datastore("sys", {persist = "/tmp/wherever"})"#);
    match err {
        weft::ScriptError::Runtime(e) => assert_eq!(e.kind, weft::RuntimeErrorKind::BadArgument),
        other => panic!("expected bad argument, got {other:?}"),
    }
}

#[test]
fn save_and_load_round_trip_through_a_real_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("store.json");
    let path_str = path.to_str().unwrap().replace('\\', "\\\\");

    run(&format!(
        r#"
db = datastore("persist_out", {{persist = "{path_str}"}})
db.set("answer", 42)
db.save()
"#
    ));

    let output = run(&format!(
        r#"
db = datastore("persist_in", {{persist = "{path_str}"}})
print(db.get("answer"))
"#
    ));
    assert_eq!(output, "42\n");
}
