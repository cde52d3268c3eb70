//! Static reference extraction
//!
//! Collects every path an expression can read, without evaluating it. The
//! graph builder turns these references into a node's dependency targets.

use super::ast::Expression;

/// A path an expression reads
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    /// Relative to the owning node's container
    SelfPath(Vec<String>),
    /// Absolute target path
    Target(String),
}

/// References in first-occurrence order, without duplicates
pub fn extract_references(expr: &Expression) -> Vec<Reference> {
    let mut references = Vec::new();
    collect(expr, &mut references);
    references
}

/// Whether evaluating this expression may call the query port
pub fn uses_query_port(expr: &Expression) -> bool {
    let mut found = false;
    walk(expr, &mut |e| {
        if let Expression::FunctionInvocation { function, .. } = e {
            found |= function.uses_query_port();
        }
    });
    found
}

fn push(references: &mut Vec<Reference>, reference: Reference) {
    if !references.contains(&reference) {
        references.push(reference);
    }
}

fn collect(expr: &Expression, references: &mut Vec<Reference>) {
    match expr {
        Expression::SelfOperator { paths } => push(references, Reference::SelfPath(paths.clone())),

        Expression::TargetOperator { target } => push(references, Reference::Target(target.clone())),

        // A dot over a reference reads a narrower path than the reference itself
        Expression::DotOperator { paths, source } => match source.as_ref() {
            Expression::SelfOperator { paths: base } => push(
                references,
                Reference::SelfPath(base.iter().chain(paths).cloned().collect()),
            ),
            Expression::TargetOperator { target } if !paths.is_empty() => push(
                references,
                Reference::Target(format!("{}.{}", target, paths.join("."))),
            ),
            other => collect(other, references),
        },

        Expression::Literal { .. } | Expression::SymbolOperator { .. } => {}

        Expression::LambdaOperator { body, .. } => collect(body, references),

        Expression::FunctionInvocation { parameters, .. } => {
            for parameter in parameters.values() {
                collect(parameter, references);
            }
        }

        Expression::EqualsOperator { left, right } | Expression::SumOperator { left, right } => {
            collect(left, references);
            collect(right, references);
        }

        Expression::RuleOperator { condition, then } => {
            collect(condition, references);
            collect(then, references);
        }

        Expression::RulesOperator { rules, otherwise } => {
            for rule in rules {
                collect(&rule.condition, references);
                collect(&rule.then, references);
            }
            if let Some(fallback) = otherwise {
                collect(fallback, references);
            }
        }

        Expression::ObjectOfExpressions { members } => {
            for member in members.values() {
                collect(member, references);
            }
        }

        Expression::LiteralListOfExpressions { items } => {
            for item in items {
                collect(item, references);
            }
        }
    }
}

fn walk(expr: &Expression, visit: &mut dyn FnMut(&Expression)) {
    visit(expr);
    match expr {
        Expression::DotOperator { source, .. } => walk(source, visit),
        Expression::LambdaOperator { body, .. } => walk(body, visit),
        Expression::FunctionInvocation { parameters, .. } => {
            for parameter in parameters.values() {
                walk(parameter, visit);
            }
        }
        Expression::EqualsOperator { left, right } | Expression::SumOperator { left, right } => {
            walk(left, visit);
            walk(right, visit);
        }
        Expression::RuleOperator { condition, then } => {
            walk(condition, visit);
            walk(then, visit);
        }
        Expression::RulesOperator { rules, otherwise } => {
            for rule in rules {
                walk(&rule.condition, visit);
                walk(&rule.then, visit);
            }
            if let Some(fallback) = otherwise {
                walk(fallback, visit);
            }
        }
        Expression::ObjectOfExpressions { members } => {
            for member in members.values() {
                walk(member, visit);
            }
        }
        Expression::LiteralListOfExpressions { items } => {
            for item in items {
                walk(item, visit);
            }
        }
        Expression::Literal { .. }
        | Expression::SelfOperator { .. }
        | Expression::SymbolOperator { .. }
        | Expression::TargetOperator { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::builtins::Builtin;

    fn self_ref(path: &[&str]) -> Reference {
        Reference::SelfPath(path.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_concat_references() {
        let expr = Expression::call(
            Builtin::Concat,
            vec![(
                "values",
                Expression::list(vec![
                    Expression::self_path("a"),
                    Expression::string("-"),
                    Expression::self_path("b"),
                    Expression::self_path("a"),
                ]),
            )],
        );
        assert_eq!(
            extract_references(&expr),
            vec![self_ref(&["a"]), self_ref(&["b"])]
        );
    }

    #[test]
    fn test_dot_narrows_reference() {
        let expr = Expression::dot(Expression::self_path("customer"), "address.city");
        assert_eq!(
            extract_references(&expr),
            vec![self_ref(&["customer", "address", "city"])]
        );

        let target = Expression::dot(Expression::target("fields.status"), "writable");
        assert_eq!(
            extract_references(&target),
            vec![Reference::Target("fields.status.writable".to_string())]
        );
    }

    #[test]
    fn test_lambda_body_references_and_symbols() {
        let expr = Expression::call(
            Builtin::Map,
            vec![
                ("sourceArray", Expression::self_path("rows")),
                (
                    "callback",
                    Expression::lambda(
                        &["current"],
                        Expression::sum(
                            Expression::dot(Expression::symbol("current"), "qty"),
                            Expression::self_path("bonus"),
                        ),
                    ),
                ),
            ],
        );
        let refs = extract_references(&expr);
        assert!(refs.contains(&self_ref(&["rows"])));
        assert!(refs.contains(&self_ref(&["bonus"])));
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn test_uses_query_port() {
        let plain = Expression::self_path("a");
        let query = Expression::dot(
            Expression::call(
                Builtin::ExecuteQuery,
                vec![("query", Expression::string("owners"))],
            ),
            "0",
        );
        assert!(!uses_query_port(&plain));
        assert!(uses_query_port(&query));
    }
}
