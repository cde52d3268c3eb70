//! Expression evaluation
//!
//! Evaluation is a recursive walk with an exhaustive match over
//! [`Expression`]. Lambda arguments live on a binding stack that is unwound
//! after each callback application; nothing else is mutable.

use super::ast::{Expression, Literal};
use super::builtins;
use super::error::ExpressionError;
use super::scope::Scope;
use super::value::{as_number, get_path, number_value, truthy, values_equal};
use crate::config::compile_time::expressions::MAX_EXPRESSION_DEPTH;
use serde_json::{Map, Value};

/// Evaluate `expr` against `scope`
pub fn evaluate(expr: &Expression, scope: &dyn Scope) -> Result<Value, ExpressionError> {
    Evaluator::new(scope).evaluate(expr)
}

pub struct Evaluator<'s> {
    scope: &'s dyn Scope,
    bindings: Vec<(String, Value)>,
    depth: usize,
    max_depth: usize,
}

impl<'s> Evaluator<'s> {
    pub fn new(scope: &'s dyn Scope) -> Self {
        Self {
            scope,
            bindings: Vec::new(),
            depth: 0,
            max_depth: MAX_EXPRESSION_DEPTH,
        }
    }

    /// Lower the nesting limit; it can never exceed the compile-time bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.min(MAX_EXPRESSION_DEPTH);
        self
    }

    pub fn scope(&self) -> &'s dyn Scope {
        self.scope
    }

    pub fn evaluate(&mut self, expr: &Expression) -> Result<Value, ExpressionError> {
        self.bindings.clear();
        self.depth = 0;
        self.eval(expr)
    }

    pub(super) fn eval(&mut self, expr: &Expression) -> Result<Value, ExpressionError> {
        if self.depth >= self.max_depth {
            return Err(ExpressionError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        self.depth += 1;
        let result = self.eval_inner(expr);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, expr: &Expression) -> Result<Value, ExpressionError> {
        match expr {
            Expression::Literal { literal } => Ok(self.eval_literal(literal)),

            Expression::SelfOperator { paths } => self.scope.resolve_self(paths),

            Expression::DotOperator { paths, source } => self.eval_dot(source, paths),

            Expression::SymbolOperator { name } => self
                .bindings
                .iter()
                .rev()
                .find(|(bound, _)| bound == name)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| ExpressionError::missing_symbol(name)),

            Expression::LambdaOperator { .. } => Err(ExpressionError::invalid_invocation(
                "lambdaOperator",
                "a lambda is only valid as a callback parameter",
            )),

            Expression::FunctionInvocation {
                function,
                parameters,
            } => builtins::invoke(self, *function, parameters),

            Expression::EqualsOperator { left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                Ok(Value::Bool(values_equal(&l, &r)))
            }

            Expression::SumOperator { left, right } => {
                let l = as_number(&self.eval(left)?, "sumOperator")?;
                let r = as_number(&self.eval(right)?, "sumOperator")?;
                number_value(l + r)
            }

            Expression::RuleOperator { condition, then } => {
                let matched = self.eval(condition)?;
                if truthy(&matched, "ruleOperator.condition")? {
                    self.eval(then)
                } else {
                    Err(ExpressionError::NoMatchingRule)
                }
            }

            Expression::RulesOperator { rules, otherwise } => {
                for rule in rules {
                    let matched = self.eval(&rule.condition)?;
                    if truthy(&matched, "rulesOperator.condition")? {
                        return self.eval(&rule.then);
                    }
                }
                match otherwise {
                    Some(fallback) => self.eval(fallback),
                    None => Err(ExpressionError::NoMatchingRule),
                }
            }

            Expression::ObjectOfExpressions { members } => {
                let mut object = Map::new();
                for (name, member) in members {
                    object.insert(name.clone(), self.eval(member)?);
                }
                Ok(Value::Object(object))
            }

            Expression::LiteralListOfExpressions { items } => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),

            Expression::TargetOperator { target } => self.scope.resolve_target(target),
        }
    }

    fn eval_literal(&self, literal: &Literal) -> Value {
        match literal {
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Number(n) => Value::Number(n.clone()),
            Literal::List(items) => Value::Array(items.clone()),
            Literal::Object(map) => Value::Object(map.clone()),
            Literal::UniqueId => Value::String(self.scope.next_unique_id()),
        }
    }

    /// Dot access evaluates only the member it reaches when the source is a
    /// structural expression, and delegates reference paths to the scope so
    /// row keys resolve the same way as everywhere else.
    fn eval_dot(&mut self, source: &Expression, paths: &[String]) -> Result<Value, ExpressionError> {
        let Some((first, rest)) = paths.split_first() else {
            return self.eval(source);
        };

        match source {
            Expression::ObjectOfExpressions { members } => match members.get(first) {
                Some(member) => self.eval_dot(member, rest),
                None => Ok(Value::Null),
            },
            Expression::LiteralListOfExpressions { items } => {
                match first.parse::<usize>().ok().and_then(|i| items.get(i)) {
                    Some(item) => self.eval_dot(item, rest),
                    None => Ok(Value::Null),
                }
            }
            Expression::SelfOperator { paths: base } => {
                let joined: Vec<String> = base.iter().chain(paths).cloned().collect();
                self.scope.resolve_self(&joined)
            }
            Expression::TargetOperator { target } => {
                let joined = format!("{}.{}", target, paths.join("."));
                self.scope.resolve_target(&joined)
            }
            _ => {
                let value = self.eval(source)?;
                Ok(get_path(&value, paths).cloned().unwrap_or(Value::Null))
            }
        }
    }

    /// Apply a `lambdaOperator` callback, binding its arguments positionally
    pub(super) fn apply_lambda(
        &mut self,
        function: &str,
        lambda: &Expression,
        args: Vec<Value>,
    ) -> Result<Value, ExpressionError> {
        let Expression::LambdaOperator { args: names, body } = lambda else {
            return Err(ExpressionError::invalid_invocation(
                function,
                &format!("callback must be a lambdaOperator, found {}", lambda.kind_name()),
            ));
        };

        let mark = self.bindings.len();
        for (name, value) in names.iter().zip(args) {
            self.bindings.push((name.clone(), value));
        }
        let result = self.eval(body);
        self.bindings.truncate(mark);
        result
    }
}
