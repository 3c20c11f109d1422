//! Expression evaluation, binary/unary operators, and assignment-target
//! resolution (spec §4.3.1, §4.3.2).

use super::Evaluator;
use crate::ast::{AssignOp, AssignTarget, BinOp, Expr, ExprKind, Literal, Position, UnOp};
use crate::error::{EvalResult, RuntimeErrorKind};
use crate::value::Value;

/// An assignment target with its receiver(s) already evaluated exactly
/// once, so compound assignment (`+=`) and post-inc/dec can read the
/// current value and write the new one without re-evaluating a receiver
/// expression that might have side effects.
enum Resolved {
    Identifier(String),
    Declaration(String),
    Index { container: Value, index: Value, position: Position },
    Property { container: Value, name: String, position: Position },
}

impl Evaluator {
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(literal_value(lit)),
            ExprKind::Identifier(name) => self
                .env
                .get(name)
                .ok_or_else(|| self.runtime_error(RuntimeErrorKind::UndefinedVariable, format!("undefined variable '{name}'"), expr.position)),
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::Object(fields) => {
                let mut map = indexmap::IndexMap::new();
                for (name, value_expr) in fields {
                    let value = self.eval_expr(value_expr)?;
                    map.insert(name.clone(), value);
                }
                Ok(Value::object(map))
            }
            ExprKind::Template(parts) => self.eval_template(parts),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, expr.position),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, expr.position),
            ExprKind::Ternary { condition, if_true, if_false } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.eval_expr(if_true)
                } else {
                    self.eval_expr(if_false)
                }
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args, expr.position),
            ExprKind::Index { target, index } => {
                let container = self.eval_expr(target)?;
                let index_value = self.eval_expr(index)?;
                self.index_get(&container, &index_value, expr.position)
            }
            ExprKind::Property { target, name } => {
                let container = self.eval_expr(target)?;
                self.property_get(&container, name, expr.position)
            }
            ExprKind::FunctionExpr(def) => Ok(self.make_script_function(def, expr.position)),
        }
    }

    pub(crate) fn index_get(&self, container: &Value, index: &Value, position: Position) -> EvalResult<Value> {
        match container {
            Value::Array(arr) => {
                let i = require_array_index(self, index, position)?;
                let items = arr.lock().unwrap();
                items.get(i).cloned().ok_or_else(|| {
                    self.runtime_error(RuntimeErrorKind::IndexOutOfBounds, format!("index {i} out of bounds (len {})", items.len()), position)
                })
            }
            Value::Object(obj) => {
                let key = require_string_key(self, index, position)?;
                Ok(obj.lock().unwrap().get(&key).cloned().unwrap_or(Value::Nil))
            }
            other => Err(self.runtime_error(RuntimeErrorKind::TypeMismatch, format!("cannot index into {}", other.type_name()), position)),
        }
    }

    pub(crate) fn property_get(&self, container: &Value, name: &str, position: Position) -> EvalResult<Value> {
        match container {
            Value::Object(obj) => Ok(obj.lock().unwrap().get(name).cloned().unwrap_or(Value::Nil)),
            other => Err(self.runtime_error(
                RuntimeErrorKind::TypeMismatch,
                format!("cannot access property '{name}' on {}", other.type_name()),
                position,
            )),
        }
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr, position: Position) -> EvalResult<Value> {
        match op {
            BinOp::And => {
                let l = self.eval_expr(left)?;
                if !l.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let r = self.eval_expr(right)?;
                return Ok(Value::Bool(r.is_truthy()));
            }
            BinOp::Or => {
                let l = self.eval_expr(left)?;
                if l.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let r = self.eval_expr(right)?;
                return Ok(Value::Bool(r.is_truthy()));
            }
            _ => {}
        }
        let l = self.eval_expr(left)?;
        let r = self.eval_expr(right)?;
        self.apply_binary(op, l, r, position)
    }

    pub(crate) fn apply_binary(&self, op: BinOp, l: Value, r: Value, position: Position) -> EvalResult<Value> {
        match op {
            BinOp::Add => match (&l, &r) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                _ if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) => Ok(Value::string(format!("{l}{r}"))),
                _ => Err(self.runtime_error(RuntimeErrorKind::TypeMismatch, "'+' requires numbers or a string operand", position)),
            },
            BinOp::Sub => numeric_op(self, l, r, position, "-", |a, b| Ok(a - b)),
            BinOp::Mul => numeric_op(self, l, r, position, "*", |a, b| Ok(a * b)),
            BinOp::Div => numeric_op(self, l, r, position, "/", |a, b| if b == 0.0 { Err(()) } else { Ok(a / b) }),
            BinOp::Mod => {
                if let (Value::Number(a), Value::Number(b)) = (&l, &r) {
                    if *b == 0.0 {
                        return Err(self.runtime_error(RuntimeErrorKind::DivisionByZero, "modulo by zero", position));
                    }
                    Ok(Value::Number(a % b))
                } else {
                    Err(self.runtime_error(RuntimeErrorKind::TypeMismatch, "'%' requires numbers", position))
                }
            }
            BinOp::Eq => Ok(Value::Bool(l.equals(&r))),
            BinOp::NotEq => Ok(Value::Bool(!l.equals(&r))),
            BinOp::Lt => compare(self, l, r, position, |o| o == std::cmp::Ordering::Less),
            BinOp::LtEq => compare(self, l, r, position, |o| o != std::cmp::Ordering::Greater),
            BinOp::Gt => compare(self, l, r, position, |o| o == std::cmp::Ordering::Greater),
            BinOp::GtEq => compare(self, l, r, position, |o| o != std::cmp::Ordering::Less),
            BinOp::And | BinOp::Or => unreachable!("short-circuit operators handled in eval_binary"),
        }
    }

    fn eval_unary(&mut self, op: UnOp, operand: &Expr, position: Position) -> EvalResult<Value> {
        match op {
            UnOp::Not => Ok(Value::Bool(!self.eval_expr(operand)?.is_truthy())),
            UnOp::Neg => match self.eval_expr(operand)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(self.runtime_error(RuntimeErrorKind::TypeMismatch, format!("cannot negate {}", other.type_name()), position)),
            },
            UnOp::PreInc | UnOp::PreDec => {
                let target = self.resolve_target_from_expr(operand)?;
                let current = self.read_resolved(&target)?;
                let n = match current {
                    Value::Number(n) => n,
                    other => {
                        return Err(self.runtime_error(
                            RuntimeErrorKind::TypeMismatch,
                            format!("cannot increment/decrement {}", other.type_name()),
                            position,
                        ))
                    }
                };
                let new_value = Value::Number(if op == UnOp::PreInc { n + 1.0 } else { n - 1.0 });
                self.write_resolved(&target, new_value.clone())?;
                Ok(new_value)
            }
        }
    }

    pub(crate) fn exec_assign(&mut self, target: &AssignTarget, op: AssignOp, value_expr: &Expr, position: Position) -> EvalResult<()> {
        let resolved = self.resolve_target(target)?;
        let new_value = if op == AssignOp::Assign {
            self.eval_expr(value_expr)?
        } else {
            let current = self.read_resolved(&resolved)?;
            let rhs = self.eval_expr(value_expr)?;
            let bin_op = match op {
                AssignOp::AddAssign => BinOp::Add,
                AssignOp::SubAssign => BinOp::Sub,
                AssignOp::MulAssign => BinOp::Mul,
                AssignOp::DivAssign => BinOp::Div,
                AssignOp::ModAssign => BinOp::Mod,
                AssignOp::Assign => unreachable!(),
            };
            self.apply_binary(bin_op, current, rhs, position)?
        };
        self.write_resolved(&resolved, new_value)
    }

    pub(crate) fn exec_post_inc_dec(&mut self, target: &AssignTarget, increment: bool, position: Position) -> EvalResult<()> {
        let resolved = self.resolve_target(target)?;
        let current = self.read_resolved(&resolved)?;
        let n = match current {
            Value::Number(n) => n,
            other => {
                return Err(self.runtime_error(
                    RuntimeErrorKind::TypeMismatch,
                    format!("cannot increment/decrement {}", other.type_name()),
                    position,
                ))
            }
        };
        let new_value = Value::Number(if increment { n + 1.0 } else { n - 1.0 });
        self.write_resolved(&resolved, new_value)
    }

    fn resolve_target(&mut self, target: &AssignTarget) -> EvalResult<Resolved> {
        match target {
            AssignTarget::Identifier(name) => Ok(Resolved::Identifier(name.clone())),
            AssignTarget::Declaration(name) => Ok(Resolved::Declaration(name.clone())),
            AssignTarget::Index { target, index } => {
                let container = self.eval_expr(target)?;
                let index_value = self.eval_expr(index)?;
                Ok(Resolved::Index { container, index: index_value, position: target.position })
            }
            AssignTarget::Property { target, name } => {
                let container = self.eval_expr(target)?;
                Ok(Resolved::Property { container, name: name.clone(), position: target.position })
            }
        }
    }

    /// Used by prefix `++`/`--`, which operate on an arbitrary lvalue
    /// expression rather than a statement-level `AssignTarget`.
    fn resolve_target_from_expr(&mut self, expr: &Expr) -> EvalResult<Resolved> {
        match &expr.kind {
            ExprKind::Identifier(name) => Ok(Resolved::Identifier(name.clone())),
            ExprKind::Index { target, index } => {
                let container = self.eval_expr(target)?;
                let index_value = self.eval_expr(index)?;
                Ok(Resolved::Index { container, index: index_value, position: expr.position })
            }
            ExprKind::Property { target, name } => {
                let container = self.eval_expr(target)?;
                Ok(Resolved::Property { container, name: name.clone(), position: expr.position })
            }
            _ => Err(self.runtime_error(RuntimeErrorKind::BadArgument, "invalid target for '++'/'--'", expr.position)),
        }
    }

    fn read_resolved(&self, resolved: &Resolved) -> EvalResult<Value> {
        match resolved {
            Resolved::Identifier(name) | Resolved::Declaration(name) => self
                .env
                .get(name)
                .ok_or_else(|| self.runtime_error(RuntimeErrorKind::UndefinedVariable, format!("undefined variable '{name}'"), Position::default())),
            Resolved::Index { container, index, position } => self.index_get(container, index, *position),
            Resolved::Property { container, name, position } => self.property_get(container, name, *position),
        }
    }

    fn write_resolved(&mut self, resolved: &Resolved, value: Value) -> EvalResult<()> {
        match resolved {
            Resolved::Identifier(name) => {
                self.env.assign(name, value);
                Ok(())
            }
            Resolved::Declaration(name) => {
                if self.env.is_param_here(name) {
                    return Err(self.runtime_error(
                        RuntimeErrorKind::BadArgument,
                        format!("'{name}' is already a parameter in this scope"),
                        Position::default(),
                    ));
                }
                self.env.mark_param(name);
                self.env.define(name.clone(), value);
                Ok(())
            }
            Resolved::Index { container, index, position } => match container {
                Value::Array(arr) => {
                    let i = require_array_index(self, index, *position)?;
                    let mut items = arr.lock().unwrap();
                    let len = items.len();
                    match items.get_mut(i) {
                        Some(slot) => {
                            *slot = value;
                            Ok(())
                        }
                        None => Err(self.runtime_error(RuntimeErrorKind::IndexOutOfBounds, format!("index {i} out of bounds (len {len})"), *position)),
                    }
                }
                Value::Object(obj) => {
                    let key = require_string_key(self, index, *position)?;
                    obj.lock().unwrap().insert(key, value);
                    Ok(())
                }
                other => Err(self.runtime_error(RuntimeErrorKind::TypeMismatch, format!("cannot index into {}", other.type_name()), *position)),
            },
            Resolved::Property { container, name, position } => match container {
                Value::Object(obj) => {
                    obj.lock().unwrap().insert(name.clone(), value);
                    Ok(())
                }
                other => Err(self.runtime_error(
                    RuntimeErrorKind::TypeMismatch,
                    format!("cannot set property '{name}' on {}", other.type_name()),
                    *position,
                )),
            },
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::string(s.as_str()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Nil => Value::Nil,
    }
}

fn numeric_op(
    eval: &Evaluator,
    l: Value,
    r: Value,
    position: Position,
    symbol: &str,
    f: impl Fn(f64, f64) -> Result<f64, ()>,
) -> EvalResult<Value> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => match f(a, b) {
            Ok(v) => Ok(Value::Number(v)),
            Err(()) => Err(eval.runtime_error(RuntimeErrorKind::DivisionByZero, format!("division by zero in '{symbol}'"), position)),
        },
        (l, r) => Err(eval.runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!("'{symbol}' requires numbers, found {} and {}", l.type_name(), r.type_name()),
            position,
        )),
    }
}

fn compare(eval: &Evaluator, l: Value, r: Value, position: Position, accept: impl Fn(std::cmp::Ordering) -> bool) -> EvalResult<Value> {
    let ordering = match (&l, &r) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.as_ref().cmp(b.as_ref())),
        _ => {
            let a = coerce_to_number(&l);
            let b = coerce_to_number(&r);
            match (a, b) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => {
                    return Err(eval.runtime_error(
                        RuntimeErrorKind::TypeMismatch,
                        format!("cannot compare {} and {}", l.type_name(), r.type_name()),
                        position,
                    ))
                }
            }
        }
    };
    match ordering {
        Some(o) => Ok(Value::Bool(accept(o))),
        None => Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, "comparison produced no ordering (NaN?)", position)),
    }
}

fn coerce_to_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => Some(*n),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn require_array_index(eval: &Evaluator, index: &Value, position: Position) -> EvalResult<usize> {
    match index {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => Ok(*n as usize),
        Value::Number(_) => Err(eval.runtime_error(RuntimeErrorKind::BadArgument, "array index must be a non-negative integer", position)),
        other => Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, format!("array index must be a number, found {}", other.type_name()), position)),
    }
}

fn require_string_key(eval: &Evaluator, index: &Value, position: Position) -> EvalResult<String> {
    match index {
        Value::String(s) => Ok(s.to_string()),
        other => Err(eval.runtime_error(RuntimeErrorKind::TypeMismatch, format!("object key must be a string, found {}", other.type_name()), position)),
    }
}
