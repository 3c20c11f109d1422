//! Call dispatch: constructor-copy, script function invocation, host
//! function invocation (spec §4.3.3).

use ahash::AHashMap;

use super::Evaluator;
use crate::ast::{Arg, Expr, ExprKind, FunctionDef, Position};
use crate::error::{EvalResult, RuntimeErrorKind, StackFrame, Unwind};
use crate::function::{ArgMap, FunctionValue, Param, ScriptFunction};
use crate::value::Value;

impl Evaluator {
    pub(crate) fn make_script_function(&self, def: &FunctionDef, position: Position) -> Value {
        let params = def
            .params
            .iter()
            .map(|p| Param { name: p.name.clone(), default: p.default.clone() })
            .collect();
        Value::Function(std::sync::Arc::new(FunctionValue::Script(ScriptFunction {
            name: def.name.clone(),
            params,
            body: def.body.clone(),
            closure: self.env.clone(),
            file: self.file.clone(),
            position,
        })))
    }

    pub(crate) fn eval_call(&mut self, callee: &Expr, args: &[Arg], position: Position) -> EvalResult<Value> {
        let (callee_value, receiver) = match &callee.kind {
            ExprKind::Property { target, name } => {
                let recv = self.eval_expr(target)?;
                let value = self.property_get(&recv, name, callee.position)?;
                (value, Some(recv))
            }
            _ => (self.eval_expr(callee)?, None),
        };

        if let Value::Object(_) = &callee_value {
            return self.construct_copy(&callee_value, args, position);
        }

        let (positional, named) = self.eval_args(args)?;
        match &callee_value {
            Value::Function(func) => self.call_function(func.clone(), positional, named, receiver, position),
            other => Err(self.runtime_error(RuntimeErrorKind::NotCallable, format!("{} is not callable", other.type_name()), position)),
        }
    }

    fn eval_args(&mut self, args: &[Arg]) -> EvalResult<(Vec<Value>, AHashMap<String, Value>)> {
        let mut positional = Vec::new();
        let mut named = AHashMap::new();
        for arg in args {
            match arg {
                Arg::Positional(expr) => positional.push(self.eval_expr(expr)?),
                Arg::Named(name, expr) => {
                    let value = self.eval_expr(expr)?;
                    named.insert(name.clone(), value);
                }
            }
        }
        Ok((positional, named))
    }

    /// `SomeObject(field = value, ...)`: shallow-copy the object, then
    /// apply named-argument overrides in order inside a transient scope so
    /// a later override can reference an earlier one by name (spec
    /// §4.3.3 point 2).
    fn construct_copy(&mut self, callee_value: &Value, args: &[Arg], position: Position) -> EvalResult<Value> {
        let Value::Object(obj) = callee_value else { unreachable!() };
        let mut copy = obj.lock().unwrap().clone();
        let transient = self.env.child();
        for arg in args {
            let Arg::Named(name, expr) = arg else {
                return Err(self.runtime_error(
                    RuntimeErrorKind::BadArgument,
                    "constructor copy accepts only named arguments",
                    position,
                ));
            };
            let previous = self.env.clone();
            self.env = transient.clone();
            let value = self.eval_expr(expr);
            self.env = previous;
            let value = value?;
            transient.define(name.clone(), value.clone());
            copy.insert(name.clone(), value);
        }
        Ok(Value::object(copy))
    }

    pub(crate) fn call_function(
        &mut self,
        func: std::sync::Arc<FunctionValue>,
        positional: Vec<Value>,
        named: AHashMap<String, Value>,
        receiver: Option<Value>,
        position: Position,
    ) -> EvalResult<Value> {
        match &*func {
            FunctionValue::Script(script) => self.call_script_function(script, positional, named, receiver, position),
            FunctionValue::Host(host) => {
                let args = ArgMap::new(positional, named);
                let previous = self.call_position;
                self.call_position = position;
                let result = (host.func)(self, &args);
                self.call_position = previous;
                result
            }
        }
    }

    fn call_script_function(
        &mut self,
        script: &ScriptFunction,
        positional: Vec<Value>,
        named: AHashMap<String, Value>,
        receiver: Option<Value>,
        position: Position,
    ) -> EvalResult<Value> {
        self.recursion.enter(&self.file, position).map_err(|e| {
            let mut e = e;
            e.call_stack = self.call_stack.clone();
            Unwind::Error(e.into())
        })?;
        self.call_stack.push(StackFrame {
            function: script.name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
            file: script.file.clone(),
            position,
        });

        // A task's call frames all block assignment walk-up (spec §3.3,
        // §4.6), not just the one the task's closure was entered from, so
        // a helper function it calls stays isolated too.
        let call_env = if self.in_parallel_task { script.closure.child_parallel() } else { script.closure.child() };
        if let Some(recv) = receiver {
            call_env.set_self(recv);
        }
        for (i, param) in script.params.iter().enumerate() {
            let value = if let Some(v) = named.get(&param.name) {
                v.clone()
            } else if let Some(v) = positional.get(i) {
                v.clone()
            } else if let Some(default) = &param.default {
                // Default expressions evaluate in the function's closure
                // scope, not the call site (spec §9 open question, resolved).
                let previous = std::mem::replace(&mut self.env, script.closure.clone());
                let result = self.eval_expr(default);
                self.env = previous;
                result?
            } else {
                Value::Nil
            };
            call_env.mark_param(&param.name);
            call_env.define(param.name.clone(), value);
        }

        let result = match self.exec_block_in(script.body.as_slice(), call_env) {
            Ok(()) => Ok(Value::Nil),
            Err(Unwind::Return(v)) => Ok(v),
            Err(other) => Err(other),
        };

        self.call_stack.pop();
        self.recursion.leave();
        result
    }
}
