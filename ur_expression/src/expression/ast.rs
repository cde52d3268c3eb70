//! Expression AST
//!
//! The set of expression kinds is closed: the evaluator matches every variant
//! exhaustively. Expressions are authored as JSON with a `kind` tag.

use super::builtins::Builtin;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Constant values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Literal {
    Boolean(bool),
    String(String),
    Number(Number),
    List(Vec<Value>),
    Object(Map<String, Value>),
    /// A fresh identifier drawn from the scope's id generator
    UniqueId,
}

/// One `condition → then` branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleClause {
    pub condition: Expression,
    pub then: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expression {
    Literal {
        literal: Literal,
    },

    /// Path relative to the owning node's container; `..` climbs one level
    SelfOperator {
        paths: Vec<String>,
    },

    /// Path into the result of `source`
    DotOperator {
        paths: Vec<String>,
        source: Box<Expression>,
    },

    /// Reference to a name bound by an enclosing lambda
    SymbolOperator {
        name: String,
    },

    /// Only meaningful as a callback parameter of a function invocation
    LambdaOperator {
        args: Vec<String>,
        body: Box<Expression>,
    },

    FunctionInvocation {
        function: Builtin,
        #[serde(default)]
        parameters: BTreeMap<String, Expression>,
    },

    EqualsOperator {
        left: Box<Expression>,
        right: Box<Expression>,
    },

    SumOperator {
        left: Box<Expression>,
        right: Box<Expression>,
    },

    RuleOperator {
        condition: Box<Expression>,
        then: Box<Expression>,
    },

    RulesOperator {
        rules: Vec<RuleClause>,
        #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
        otherwise: Option<Box<Expression>>,
    },

    /// Members are evaluated lazily when reached through a dot path
    ObjectOfExpressions {
        members: BTreeMap<String, Expression>,
    },

    LiteralListOfExpressions {
        items: Vec<Expression>,
    },

    /// Absolute path into the data, fields or representation tree
    TargetOperator {
        target: String,
    },
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Expression {
    pub fn boolean(value: bool) -> Self {
        Self::Literal {
            literal: Literal::Boolean(value),
        }
    }

    pub fn string(value: &str) -> Self {
        Self::Literal {
            literal: Literal::String(value.to_string()),
        }
    }

    pub fn number(value: impl Into<Number>) -> Self {
        Self::Literal {
            literal: Literal::Number(value.into()),
        }
    }

    pub fn unique_id() -> Self {
        Self::Literal {
            literal: Literal::UniqueId,
        }
    }

    /// `self` reference from a dotted path
    pub fn self_path(path: &str) -> Self {
        Self::SelfOperator {
            paths: split_path(path),
        }
    }

    /// `self` reference from explicit segments, needed for `..`
    pub fn self_segments(segments: &[&str]) -> Self {
        Self::SelfOperator {
            paths: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn dot(source: Expression, path: &str) -> Self {
        Self::DotOperator {
            paths: split_path(path),
            source: Box::new(source),
        }
    }

    pub fn symbol(name: &str) -> Self {
        Self::SymbolOperator {
            name: name.to_string(),
        }
    }

    pub fn lambda(args: &[&str], body: Expression) -> Self {
        Self::LambdaOperator {
            args: args.iter().map(|a| a.to_string()).collect(),
            body: Box::new(body),
        }
    }

    pub fn call(function: Builtin, parameters: Vec<(&str, Expression)>) -> Self {
        Self::FunctionInvocation {
            function,
            parameters: parameters
                .into_iter()
                .map(|(name, expr)| (name.to_string(), expr))
                .collect(),
        }
    }

    pub fn equals(left: Expression, right: Expression) -> Self {
        Self::EqualsOperator {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn sum(left: Expression, right: Expression) -> Self {
        Self::SumOperator {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn list(items: Vec<Expression>) -> Self {
        Self::LiteralListOfExpressions { items }
    }

    pub fn object(members: Vec<(&str, Expression)>) -> Self {
        Self::ObjectOfExpressions {
            members: members
                .into_iter()
                .map(|(name, expr)| (name.to_string(), expr))
                .collect(),
        }
    }

    pub fn target(target: &str) -> Self {
        Self::TargetOperator {
            target: target.to_string(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Literal { .. } => "literal",
            Self::SelfOperator { .. } => "selfOperator",
            Self::DotOperator { .. } => "dotOperator",
            Self::SymbolOperator { .. } => "symbolOperator",
            Self::LambdaOperator { .. } => "lambdaOperator",
            Self::FunctionInvocation { .. } => "functionInvocation",
            Self::EqualsOperator { .. } => "equalsOperator",
            Self::SumOperator { .. } => "sumOperator",
            Self::RuleOperator { .. } => "ruleOperator",
            Self::RulesOperator { .. } => "rulesOperator",
            Self::ObjectOfExpressions { .. } => "objectOfExpressions",
            Self::LiteralListOfExpressions { .. } => "literalListOfExpressions",
            Self::TargetOperator { .. } => "targetOperator",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_concat_invocation() {
        let expr: Expression = serde_json::from_value(json!({
            "kind": "functionInvocation",
            "function": "concat",
            "parameters": {
                "values": {
                    "kind": "literalListOfExpressions",
                    "items": [
                        {"kind": "selfOperator", "paths": ["a"]},
                        {"kind": "literal", "literal": {"type": "string", "value": "-"}},
                        {"kind": "selfOperator", "paths": ["b"]}
                    ]
                }
            }
        }))
        .unwrap();

        let expected = Expression::call(
            Builtin::Concat,
            vec![(
                "values",
                Expression::list(vec![
                    Expression::self_path("a"),
                    Expression::string("-"),
                    Expression::self_path("b"),
                ]),
            )],
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_rules_else_keyword() {
        let expr: Expression = serde_json::from_value(json!({
            "kind": "rulesOperator",
            "rules": [{
                "condition": {"kind": "literal", "literal": {"type": "boolean", "value": false}},
                "then": {"kind": "literal", "literal": {"type": "number", "value": 1}}
            }],
            "else": {"kind": "literal", "literal": {"type": "number", "value": 2}}
        }))
        .unwrap();

        match expr {
            Expression::RulesOperator { rules, otherwise } => {
                assert_eq!(rules.len(), 1);
                assert_eq!(otherwise, Some(Box::new(Expression::number(2))));
            }
            other => panic!("unexpected expression {:?}", other),
        }
    }

    #[test]
    fn test_unique_id_literal_has_no_value() {
        let expr: Expression =
            serde_json::from_value(json!({"kind": "literal", "literal": {"type": "uniqueId"}}))
                .unwrap();
        assert_eq!(expr, Expression::unique_id());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<Expression, _> =
            serde_json::from_value(json!({"kind": "javascript", "source": "1+1"}));
        assert!(result.is_err());
    }
}
