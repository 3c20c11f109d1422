//! Lexical environments: the parent-pointer scope chain used for both
//! variable resolution and `self` dispatch (spec §3.2, §4.6).
//!
//! Grounded on `ouros::namespace::Namespace` for the parent-chain-plus-
//! `self`-slot shape, rewired from slot-indexed to name-keyed bindings and
//! made `Arc<Mutex<_>>`-backed so a `parallel` block can hand each spawned
//! thread a handle into the same chain (see DESIGN.md, "Arc over Rc").

use std::sync::{Arc, Mutex};

use ahash::AHashMap;

use crate::value::Value;

struct EnvironmentInner {
    parent: Option<EnvHandle>,
    bindings: AHashMap<String, Value>,
    /// Names bound as function parameters in *this* scope. Assignment to a
    /// parameter name always rebinds locally even if an ancestor scope also
    /// has a binding of that name (spec §3.2).
    params: std::collections::HashSet<String>,
    self_value: Option<Value>,
    /// Set on the scope a `parallel` task body runs in (spec §4.6). While
    /// set, an assignment to a name that isn't already bound in *this*
    /// scope or marked as a parameter here never walks up to mutate an
    /// ancestor: it always creates a fresh local binding, so sibling tasks
    /// and the parent scope never observe each other's writes.
    parallel_context: bool,
}

/// A reference-counted handle to a scope. Cloning an `EnvHandle` is cheap
/// and shares the same underlying bindings.
#[derive(Clone)]
pub struct EnvHandle(Arc<Mutex<EnvironmentInner>>);

impl EnvHandle {
    #[must_use]
    pub fn root() -> Self {
        Self(Arc::new(Mutex::new(EnvironmentInner {
            parent: None,
            bindings: AHashMap::new(),
            params: std::collections::HashSet::new(),
            self_value: None,
            parallel_context: false,
        })))
    }

    /// A fresh child scope, e.g. a block body or a loop iteration.
    #[must_use]
    pub fn child(&self) -> Self {
        Self(Arc::new(Mutex::new(EnvironmentInner {
            parent: Some(self.clone()),
            bindings: AHashMap::new(),
            params: std::collections::HashSet::new(),
            self_value: None,
            parallel_context: false,
        })))
    }

    /// A child scope marked as a `parallel` task body (spec §4.6).
    #[must_use]
    pub fn child_parallel(&self) -> Self {
        let env = self.child();
        env.0.lock().unwrap().parallel_context = true;
        env
    }

    pub fn mark_param(&self, name: &str) {
        self.0.lock().unwrap().params.insert(name.to_string());
    }

    /// Whether `name` is parameter-marked in *this* scope specifically,
    /// ignoring ancestors (spec §4.3.1: a local `var` declaration must not
    /// shadow a parameter of the enclosing call).
    #[must_use]
    pub fn is_param_here(&self, name: &str) -> bool {
        self.0.lock().unwrap().params.contains(name)
    }

    /// Binds `name` in *this* scope, shadowing any ancestor binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.lock().unwrap().bindings.insert(name.into(), value);
    }

    pub fn set_self(&self, value: Value) {
        self.0.lock().unwrap().self_value = Some(value);
    }

    /// The nearest enclosing `self` binding, if any (methods walk up through
    /// block/loop scopes to find the one their containing function set).
    #[must_use]
    pub fn resolve_self(&self) -> Option<Value> {
        let inner = self.0.lock().unwrap();
        if let Some(v) = &inner.self_value {
            return Some(v.clone());
        }
        inner.parent.as_ref().and_then(EnvHandle::resolve_self)
    }

    /// Name resolution: `self.<name>` field lookup takes precedence when a
    /// `self` object has a matching field, otherwise the scope chain is
    /// walked outward (spec §3.2 point 3).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(Value::Object(obj)) = self.resolve_self() {
            if let Some(v) = obj.lock().unwrap().get(name) {
                return Some(v.clone());
            }
        }
        self.get_lexical(name)
    }

    /// Scope-chain lookup only, ignoring `self` fields. Used by the
    /// assignment path, which must distinguish "no such variable anywhere"
    /// from "only reachable through `self`" (spec §4.6).
    #[must_use]
    pub fn get_lexical(&self, name: &str) -> Option<Value> {
        let inner = self.0.lock().unwrap();
        if let Some(v) = inner.bindings.get(name) {
            return Some(v.clone());
        }
        inner.parent.as_ref().and_then(|p| p.get_lexical(name))
    }

    /// Assignment (spec §3.2, §4.6):
    ///
    /// - If `name` is bound in this scope (directly or as a parameter),
    ///   update it here.
    /// - Otherwise, if this scope is a `parallel` task body, create the
    ///   binding *locally* rather than walking to the parent — this is what
    ///   isolates sibling tasks from each other's writes.
    /// - Otherwise, walk to the nearest ancestor scope that already has the
    ///   binding and update it there.
    /// - If no ancestor has it either, create it in the current scope (a
    ///   bare assignment to a previously-unbound name defines it locally,
    ///   per spec §3.2).
    pub fn assign(&self, name: &str, value: Value) {
        let (has_local, is_parallel) = {
            let inner = self.0.lock().unwrap();
            (inner.bindings.contains_key(name) || inner.params.contains(name), inner.parallel_context)
        };
        if has_local {
            self.0.lock().unwrap().bindings.insert(name.to_string(), value);
            return;
        }
        if is_parallel {
            self.0.lock().unwrap().bindings.insert(name.to_string(), value);
            return;
        }
        if self.assign_existing_ancestor(name, value.clone()) {
            return;
        }
        self.0.lock().unwrap().bindings.insert(name.to_string(), value);
    }

    fn assign_existing_ancestor(&self, name: &str, value: Value) -> bool {
        let parent = self.0.lock().unwrap().parent.clone();
        match parent {
            Some(p) => {
                let has = {
                    let inner = p.0.lock().unwrap();
                    inner.bindings.contains_key(name) || inner.params.contains(name)
                };
                if has {
                    p.0.lock().unwrap().bindings.insert(name.to_string(), value);
                    true
                } else if p.0.lock().unwrap().parallel_context {
                    false
                } else {
                    p.assign_existing_ancestor(name, value)
                }
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_assignment_creates_local_binding() {
        let root = EnvHandle::root();
        let child = root.child();
        child.assign("x", Value::Number(1.0));
        assert!(root.get("x").is_none());
        assert_eq!(child.get("x").map(|v| v.is_truthy()), Some(true));
    }

    #[test]
    fn assignment_updates_existing_ancestor() {
        let root = EnvHandle::root();
        root.define("x", Value::Number(1.0));
        let child = root.child();
        child.assign("x", Value::Number(2.0));
        if let Some(Value::Number(n)) = root.get("x") {
            assert_eq!(n, 2.0);
        } else {
            panic!("expected updated number");
        }
    }

    #[test]
    fn parallel_context_isolates_writes_to_unknown_names() {
        let root = EnvHandle::root();
        let task = root.child_parallel();
        task.assign("y", Value::Number(5.0));
        assert!(root.get("y").is_none());
        assert!(task.get("y").is_some());
    }

    #[test]
    fn parallel_context_isolates_writes_even_to_an_already_bound_ancestor() {
        let root = EnvHandle::root();
        root.define("y", Value::Number(1.0));
        let task = root.child_parallel();
        task.assign("y", Value::Number(9.0));
        if let Some(Value::Number(n)) = root.get("y") {
            assert_eq!(n, 1.0, "a parallel task must never mutate an ancestor's binding");
        } else {
            panic!("root binding should still exist");
        }
        if let Some(Value::Number(n)) = task.get("y") {
            assert_eq!(n, 9.0);
        } else {
            panic!("expected the task's own redirected binding");
        }
    }

    #[test]
    fn self_field_takes_precedence_over_lexical_binding() {
        let root = EnvHandle::root();
        root.define("name", Value::string("lexical"));
        let mut fields = indexmap::IndexMap::new();
        fields.insert("name".to_string(), Value::string("field"));
        root.set_self(Value::object(fields));
        match root.get("name") {
            Some(Value::String(s)) => assert_eq!(&*s, "field"),
            _ => panic!("expected self field"),
        }
    }
}
