//! Builtin function registry
//!
//! Builtins take named parameters. Parameters are evaluated on demand, so
//! `callback` lambdas are applied per element instead of being evaluated as
//! values.

use super::ast::Expression;
use super::error::ExpressionError;
use super::evaluator::Evaluator;
use super::value::{as_number, display_string, number_value, truthy, type_name};
use crate::config::compile_time::expressions::MAX_CALLBACK_ELEMENTS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Builtin {
    Map,
    Filter,
    Concat,
    Join,
    Count,
    Sum,
    Not,
    And,
    Or,
    Coalesce,
    Matches,
    FormatDate,
    ExecuteQuery,
    EvaluateNamedExpression,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Filter => "filter",
            Self::Concat => "concat",
            Self::Join => "join",
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Not => "not",
            Self::And => "and",
            Self::Or => "or",
            Self::Coalesce => "coalesce",
            Self::Matches => "matches",
            Self::FormatDate => "formatDate",
            Self::ExecuteQuery => "executeQuery",
            Self::EvaluateNamedExpression => "evaluateNamedExpression",
        }
    }

    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            Self::Map | Self::Filter => &["sourceArray", "callback"],
            Self::Count => &["sourceArray"],
            Self::Concat | Self::Join | Self::Sum | Self::And | Self::Or | Self::Coalesce => {
                &["values"]
            }
            Self::Not => &["value"],
            Self::Matches => &["value", "pattern"],
            Self::FormatDate => &["value", "format"],
            Self::ExecuteQuery => &["query"],
            Self::EvaluateNamedExpression => &["name"],
        }
    }

    pub fn optional_parameters(&self) -> &'static [&'static str] {
        match self {
            Self::Join => &["separator"],
            Self::ExecuteQuery | Self::EvaluateNamedExpression => &["parameters"],
            _ => &[],
        }
    }

    /// Whether this builtin reaches the query port
    pub fn uses_query_port(&self) -> bool {
        matches!(self, Self::ExecuteQuery | Self::EvaluateNamedExpression)
    }
}

/// Check declared parameters against the builtin's signature
pub fn check_parameters(
    function: Builtin,
    parameters: &BTreeMap<String, Expression>,
) -> Result<(), ExpressionError> {
    for required in function.required_parameters() {
        if !parameters.contains_key(*required) {
            return Err(ExpressionError::invalid_invocation(
                function.name(),
                &format!("missing parameter '{}'", required),
            ));
        }
    }

    for name in parameters.keys() {
        let known = function.required_parameters().contains(&name.as_str())
            || function.optional_parameters().contains(&name.as_str());
        if !known {
            return Err(ExpressionError::invalid_invocation(
                function.name(),
                &format!("unexpected parameter '{}'", name),
            ));
        }
    }

    Ok(())
}

/// Execute a builtin with its (unevaluated) parameters
pub(super) fn invoke(
    evaluator: &mut Evaluator<'_>,
    function: Builtin,
    parameters: &BTreeMap<String, Expression>,
) -> Result<Value, ExpressionError> {
    check_parameters(function, parameters)?;

    let mut args = Args {
        function,
        parameters,
        evaluator,
    };

    match function {
        Builtin::Map => execute_map(&mut args),
        Builtin::Filter => execute_filter(&mut args),
        Builtin::Concat => execute_concat(&mut args),
        Builtin::Join => execute_join(&mut args),
        Builtin::Count => execute_count(&mut args),
        Builtin::Sum => execute_sum(&mut args),
        Builtin::Not => {
            let value = args.value("value")?;
            Ok(Value::Bool(!truthy(&value, "not")?))
        }
        Builtin::And => execute_logical(&mut args, true),
        Builtin::Or => execute_logical(&mut args, false),
        Builtin::Coalesce => execute_coalesce(&mut args),
        Builtin::Matches => execute_matches(&mut args),
        Builtin::FormatDate => execute_format_date(&mut args),
        Builtin::ExecuteQuery => {
            let name = args.string("query")?;
            let params = args.optional_value("parameters")?;
            args.evaluator.scope().execute_query(&name, &params)
        }
        Builtin::EvaluateNamedExpression => {
            let name = args.string("name")?;
            let params = args.optional_value("parameters")?;
            args.evaluator
                .scope()
                .evaluate_named_expression(&name, &params)
        }
    }
}

struct Args<'a, 'e, 's> {
    function: Builtin,
    parameters: &'a BTreeMap<String, Expression>,
    evaluator: &'e mut Evaluator<'s>,
}

impl<'a> Args<'a, '_, '_> {
    fn expression(&self, name: &str) -> Result<&'a Expression, ExpressionError> {
        let parameters: &'a BTreeMap<String, Expression> = self.parameters;
        parameters.get(name).ok_or_else(|| {
            ExpressionError::invalid_invocation(
                self.function.name(),
                &format!("missing parameter '{}'", name),
            )
        })
    }

    fn value(&mut self, name: &str) -> Result<Value, ExpressionError> {
        let expr = self.expression(name)?;
        self.evaluator.eval(expr)
    }

    fn optional_value(&mut self, name: &str) -> Result<Value, ExpressionError> {
        let parameters: &'a BTreeMap<String, Expression> = self.parameters;
        match parameters.get(name) {
            Some(expr) => self.evaluator.eval(expr),
            None => Ok(Value::Null),
        }
    }

    fn string(&mut self, name: &str) -> Result<String, ExpressionError> {
        match self.value(name)? {
            Value::String(s) => Ok(s),
            other => Err(ExpressionError::type_mismatch(
                "string",
                type_name(&other),
                &format!("{}.{}", self.function.name(), name),
            )),
        }
    }

    /// A list parameter; absent evaluates to an empty list
    fn list(&mut self, name: &str) -> Result<Vec<Value>, ExpressionError> {
        match self.value(name)? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => {
                if items.len() > MAX_CALLBACK_ELEMENTS {
                    return Err(ExpressionError::invalid_invocation(
                        self.function.name(),
                        &format!("more than {} elements", MAX_CALLBACK_ELEMENTS),
                    ));
                }
                Ok(items)
            }
            other => Err(ExpressionError::type_mismatch(
                "list",
                type_name(&other),
                &format!("{}.{}", self.function.name(), name),
            )),
        }
    }

    /// Apply the `callback` lambda to one element, binding `(element, index)`
    fn call_back(&mut self, element: Value, index: usize) -> Result<Value, ExpressionError> {
        let callback = self.expression("callback")?;
        let index = Value::from(index);
        self.evaluator
            .apply_lambda(self.function.name(), callback, vec![element, index])
    }
}

fn execute_map(args: &mut Args<'_, '_, '_>) -> Result<Value, ExpressionError> {
    let items = args.list("sourceArray")?;
    let mut mapped = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        mapped.push(args.call_back(item, index)?);
    }
    Ok(Value::Array(mapped))
}

fn execute_filter(args: &mut Args<'_, '_, '_>) -> Result<Value, ExpressionError> {
    let items = args.list("sourceArray")?;
    let mut kept = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        let keep = args.call_back(item.clone(), index)?;
        if truthy(&keep, "filter.callback")? {
            kept.push(item);
        }
    }
    Ok(Value::Array(kept))
}

/// Strings concatenate as text; when every value is a list, the lists are appended
fn execute_concat(args: &mut Args<'_, '_, '_>) -> Result<Value, ExpressionError> {
    let values = args.list("values")?;

    if !values.is_empty() && values.iter().all(Value::is_array) {
        let joined = values
            .into_iter()
            .flat_map(|v| match v {
                Value::Array(items) => items,
                _ => Vec::new(),
            })
            .collect();
        return Ok(Value::Array(joined));
    }

    Ok(Value::String(values.iter().map(display_string).collect()))
}

fn execute_join(args: &mut Args<'_, '_, '_>) -> Result<Value, ExpressionError> {
    let values = args.list("values")?;
    let separator = match args.optional_value("separator")? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => {
            return Err(ExpressionError::type_mismatch(
                "string",
                type_name(&other),
                "join.separator",
            ))
        }
    };

    let parts: Vec<String> = values
        .iter()
        .filter(|v| !v.is_null())
        .map(display_string)
        .collect();
    Ok(Value::String(parts.join(&separator)))
}

fn execute_count(args: &mut Args<'_, '_, '_>) -> Result<Value, ExpressionError> {
    Ok(Value::from(args.list("sourceArray")?.len()))
}

fn execute_sum(args: &mut Args<'_, '_, '_>) -> Result<Value, ExpressionError> {
    let mut total = 0.0;
    for value in args.list("values")? {
        total += as_number(&value, "sum")?;
    }
    number_value(total)
}

fn execute_logical(args: &mut Args<'_, '_, '_>, all: bool) -> Result<Value, ExpressionError> {
    let context = args.function.name();
    for value in args.list("values")? {
        let b = truthy(&value, context)?;
        if all && !b {
            return Ok(Value::Bool(false));
        }
        if !all && b {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(all))
}

fn execute_coalesce(args: &mut Args<'_, '_, '_>) -> Result<Value, ExpressionError> {
    Ok(args
        .list("values")?
        .into_iter()
        .find(|v| !v.is_null())
        .unwrap_or(Value::Null))
}

fn execute_matches(args: &mut Args<'_, '_, '_>) -> Result<Value, ExpressionError> {
    let value = args.value("value")?;
    let pattern = args.string("pattern")?;

    let re = regex::Regex::new(&pattern).map_err(|e| {
        ExpressionError::invalid_invocation("matches", &format!("invalid pattern: {}", e))
    })?;

    Ok(Value::Bool(match value {
        Value::Null => false,
        Value::String(s) => re.is_match(&s),
        other => {
            return Err(ExpressionError::type_mismatch(
                "string",
                type_name(&other),
                "matches.value",
            ))
        }
    }))
}

fn execute_format_date(args: &mut Args<'_, '_, '_>) -> Result<Value, ExpressionError> {
    use chrono::format::{Item, StrftimeItems};
    use std::fmt::Write;

    let value = args.value("value")?;
    let format = args.string("format")?;

    let text = match value {
        Value::Null => return Ok(Value::Null),
        Value::String(s) => s,
        other => {
            return Err(ExpressionError::type_mismatch(
                "date string",
                type_name(&other),
                "formatDate.value",
            ))
        }
    };

    let items: Vec<Item<'_>> = StrftimeItems::new(&format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(ExpressionError::invalid_invocation(
            "formatDate",
            &format!("invalid format '{}'", format),
        ));
    }

    let mut out = String::new();
    let written = if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&text) {
        write!(out, "{}", dt.format_with_items(items.iter()))
    } else if let Ok(date) = chrono::NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        write!(out, "{}", date.format_with_items(items.iter()))
    } else {
        return Err(ExpressionError::type_mismatch(
            "ISO-8601 date",
            &format!("'{}'", text),
            "formatDate.value",
        ));
    };

    written.map_err(|_| {
        ExpressionError::invalid_invocation(
            "formatDate",
            &format!("format '{}' does not apply to '{}'", format, text),
        )
    })?;
    Ok(Value::String(out))
}
