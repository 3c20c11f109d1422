//! Template literal evaluation (spec §4.3.4).

use super::Evaluator;
use crate::ast::TemplatePart;
use crate::error::EvalResult;
use crate::value::Value;

impl Evaluator {
    /// Evaluates each embedded expression, converts it to its string
    /// representation, and concatenates with the interleaved text parts.
    pub(crate) fn eval_template(&mut self, parts: &[TemplatePart]) -> EvalResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Text(text) => out.push_str(text),
                TemplatePart::Expr(expr) => {
                    let value = self.eval_expr(expr)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(Value::string(out))
    }
}
