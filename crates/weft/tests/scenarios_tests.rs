//! The six literal end-to-end scenarios this language's design is anchored
//! on: each is reproduced here verbatim, source and expected stdout alike.

use std::sync::Arc;

use weft::{CollectingHooks, Engine};

fn run(code: &str) -> String {
    let hooks = Arc::new(CollectingHooks::new());
    let engine = Engine::new().with_hooks(hooks.clone());
    engine.execute(code, "test").expect("script should succeed");
    hooks.output()
}

#[test]
fn scenario_1_closure_counter() {
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
fn scenario_2_parallel_sum() {
    let output = run("results = parallel(function() return 1 end, function() return 2 end, function() return 3 end); print(len(results))");
    assert_eq!(output, "3\n");
}

#[test]
fn scenario_3_datastore_increment_under_contention() {
    let output = run(
        r#"
db = datastore("contention")
workers = []
for i = 1, 10 do
  push(workers, function()
    for j = 1, 100 do db.increment("n", 1) end
  end)
end
parallel(workers)
print(db.get("n"))
"#,
    );
    assert_eq!(output, "1000\n");
}

#[test]
fn scenario_4_wait_for_value() {
    let output = run(
        r#"
db = datastore("wait_for_value")
results = parallel(
  function()
    db.set("s", "pending")
    sleep(0.01)
    db.set("s", "done")
    return "setter"
  end,
  function() return db.wait("s", "done", 5) end
)
print(results[1])
"#,
    );
    assert_eq!(output, "done\n");
}

#[test]
fn scenario_5_try_catch_object() {
    let output = run(r#"try throw({code="ERR_404", status=404}) catch (e) print(e.code) end"#);
    assert_eq!(output, "ERR_404\n");
}

#[test]
fn scenario_6_template_round_trip() {
    let output = run(r#"print(format_json(parse_json("[{\"name\":\"Ann\"}]")))"#);
    assert_eq!(output, "[{\"name\":\"Ann\"}]\n");
}
