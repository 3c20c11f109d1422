//! Statement execution (spec §4.3.1).

use super::Evaluator;
use crate::ast::{ForClause, IfBranch, Stmt};
use crate::env::EnvHandle;
use crate::error::{EvalResult, RuntimeErrorKind, ScriptError, Unwind};
use crate::value::Value;

impl Evaluator {
    /// Executes `stmts` with `env` as the active scope, restoring the
    /// previously active scope before returning (including on error/unwind).
    pub(crate) fn exec_block_in(&mut self, stmts: &[Stmt], env: EnvHandle) -> EvalResult<()> {
        let previous = std::mem::replace(&mut self.env, env);
        let result = self.exec_stmts(stmts);
        self.env = previous;
        result
    }

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> EvalResult<()> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    /// Evaluates a single top-level statement and returns the value of an
    /// expression statement (or `nil` for any other kind), converting an
    /// unwind into a [`ScriptError`]. Used by
    /// [`crate::engine::Engine::eval_in_environment`] for debug-REPL
    /// evaluation, where `break`/`continue`/`return`/`exit` reaching the
    /// top level are treated as simply yielding `nil` rather than errors.
    pub(crate) fn eval_single_statement(&mut self, stmt: &Stmt) -> Result<Value, ScriptError> {
        if let Stmt::Expr { expr, .. } = stmt {
            return match self.eval_expr(expr) {
                Ok(v) => Ok(v),
                Err(Unwind::Error(e)) => Err(e),
                Err(_) => Ok(Value::Nil),
            };
        }
        match self.exec_stmt(stmt) {
            Ok(()) => Ok(Value::Nil),
            Err(Unwind::Error(e)) => Err(e),
            Err(_) => Ok(Value::Nil),
        }
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        match stmt {
            Stmt::Expr { expr, .. } => {
                self.eval_expr(expr)?;
                Ok(())
            }
            Stmt::Assign { target, op, value, position } => self.exec_assign(target, *op, value, *position),
            Stmt::PostIncDec { target, increment, position } => self.exec_post_inc_dec(target, *increment, *position),
            Stmt::If { branches, else_body, .. } => self.exec_if(branches, else_body.as_deref()),
            Stmt::While { condition, body, .. } => self.exec_while(condition, body),
            Stmt::For { clause, body, position } => self.exec_for(clause, body, *position),
            Stmt::FunctionDecl { def, position } => {
                let func = self.make_script_function(def, *position);
                self.env.define(def.name.clone().unwrap_or_default(), func);
                Ok(())
            }
            Stmt::Try { body, catch_var, catch_body, .. } => self.exec_try(body, catch_var, catch_body),
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(v))
            }
            Stmt::Break { .. } => Err(Unwind::Break),
            Stmt::Continue { .. } => Err(Unwind::Continue),
        }
    }

    fn exec_if(&mut self, branches: &[IfBranch], else_body: Option<&[Stmt]>) -> EvalResult<()> {
        for branch in branches {
            if self.eval_expr(&branch.condition)?.is_truthy() {
                return self.exec_block_in(&branch.body, self.env.child());
            }
        }
        if let Some(body) = else_body {
            return self.exec_block_in(body, self.env.child());
        }
        Ok(())
    }

    fn exec_while(&mut self, condition: &crate::ast::Expr, body: &[Stmt]) -> EvalResult<()> {
        while self.eval_expr(condition)?.is_truthy() {
            match self.exec_block_in(body, self.env.child()) {
                Ok(()) => {}
                Err(Unwind::Break) => break,
                Err(Unwind::Continue) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    fn exec_for(&mut self, clause: &ForClause, body: &[Stmt], position: crate::error::Position) -> EvalResult<()> {
        match clause {
            ForClause::Numeric { var, start, end, step } => self.exec_for_numeric(var, start, end, step.as_ref(), body, position),
            ForClause::Iterator { var, collection } => self.exec_for_iterator(var, collection, body),
        }
    }

    fn exec_for_numeric(
        &mut self,
        var: &str,
        start: &crate::ast::Expr,
        end: &crate::ast::Expr,
        step: Option<&crate::ast::Expr>,
        body: &[Stmt],
        position: crate::error::Position,
    ) -> EvalResult<()> {
        let start = require_integer(self, self.eval_expr(start)?, position)?;
        let end = require_integer(self, self.eval_expr(end)?, position)?;
        let step = match step {
            Some(e) => require_integer(self, self.eval_expr(e)?, position)?,
            None => 1,
        };
        if step == 0 {
            return Err(self.runtime_error(RuntimeErrorKind::BadArgument, "for-loop step cannot be zero", position));
        }
        let mut i = start;
        loop {
            if step > 0 && i > end {
                break;
            }
            if step < 0 && i < end {
                break;
            }
            // Fresh binding per iteration (spec §9 open question, resolved):
            // a closure captured inside the loop body sees the value `i`
            // had on its own iteration, not a shared mutable loop variable.
            let iter_env = self.env.child();
            iter_env.define(var, Value::Number(i as f64));
            match self.exec_block_in(body, iter_env) {
                Ok(()) => {}
                Err(Unwind::Break) => break,
                Err(Unwind::Continue) => {}
                Err(other) => return Err(other),
            }
            i += step;
        }
        Ok(())
    }

    fn exec_for_iterator(&mut self, var: &str, collection: &crate::ast::Expr, body: &[Stmt]) -> EvalResult<()> {
        let collection_value = self.eval_expr(collection)?;
        let items: Vec<Value> = match &collection_value {
            Value::Array(a) => a.lock().unwrap().clone(),
            Value::Object(o) => o.lock().unwrap().keys().map(|k| Value::string(k.as_str())).collect(),
            other => {
                return Err(self.runtime_error(
                    RuntimeErrorKind::TypeMismatch,
                    format!("cannot iterate over {}", other.type_name()),
                    collection.position,
                ))
            }
        };
        for item in items {
            let iter_env = self.env.child();
            iter_env.define(var, item);
            match self.exec_block_in(body, iter_env) {
                Ok(()) => {}
                Err(Unwind::Break) => break,
                Err(Unwind::Continue) => {}
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    fn exec_try(&mut self, body: &[Stmt], catch_var: &str, catch_body: &[Stmt]) -> EvalResult<()> {
        match self.exec_block_in(body, self.env.child()) {
            Ok(()) => Ok(()),
            Err(Unwind::Error(err)) => {
                let bound = script_error_to_catch_value(&err);
                let catch_env = self.env.child();
                catch_env.define(catch_var, bound);
                self.exec_block_in(catch_body, catch_env)
            }
            Err(other) => Err(other),
        }
    }
}

/// The value bound to the `catch(e)` variable: the original thrown
/// `Value` by identity for `throw(v)`, or a plain string message otherwise
/// (spec §4.3.1, §7).
fn script_error_to_catch_value(err: &ScriptError) -> Value {
    match err {
        ScriptError::Thrown(t) => t.value.clone(),
        other => Value::string(other.to_string()),
    }
}

/// Numeric for-loop bounds/step must be integers (spec §4.3.1): a float
/// with a non-zero fractional part fails.
fn require_integer(eval: &Evaluator, value: Value, position: crate::error::Position) -> EvalResult<i64> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(n as i64),
        Value::Number(_) => Err(eval.runtime_error(RuntimeErrorKind::BadArgument, "for-loop bounds must be integers", position)),
        other => Err(eval.runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!("for-loop bounds must be numbers, found {}", other.type_name()),
            position,
        )),
    }
}

