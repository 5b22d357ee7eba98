use crate::ast::{Expr, FunctionCall, Statement};
use crate::error::{CompileError, Result};
use serde_json::{Map, Value};

const DICTIONARY_SOURCE: &str = "DICTIONARY";

pub fn parse_statements(nodes: &[Value]) -> Result<Vec<Statement>> {
    nodes.iter().map(parse_statement).collect()
}

pub fn parse_statement(node: &Value) -> Result<Statement> {
    let obj = as_object(node, "statement")?;
    match obj.get("type").and_then(Value::as_str) {
        Some("RETURN") => Ok(Statement::Return {
            expr: parse_expression(required(obj, "statement", "expression")?)?,
        }),
        Some("ASSIGN_VAR") => Ok(Statement::AssignVar {
            var_name: required_str(obj, "statement", "varName")?.to_string(),
            expr: parse_expression(required(obj, "statement", "expression")?)?,
        }),
        Some("SET_DST_VALUE") => Ok(Statement::SetDstValue {
            dst_path: required_str(obj, "statement", "dstPath")?.to_string(),
            set_modes: obj
                .get("collectionSetModes")
                .filter(|v| !v.is_null())
                .cloned(),
            expr: parse_expression(required(obj, "statement", "expression")?)?,
        }),
        _ if obj.contains_key("functionClass") => Ok(Statement::Bare {
            expr: Expr::Function(parse_function_call(obj)?),
        }),
        _ if obj.len() == 2 && obj.contains_key("value") && obj.contains_key("@bean") => {
            Ok(Statement::Bare {
                expr: parse_expression(node)?,
            })
        }
        _ => Ok(Statement::Unrecognized {
            summary: summarize(obj),
        }),
    }
}

pub fn parse_expression(node: &Value) -> Result<Expr> {
    let obj = as_object(node, "expression")?;

    if obj.get("constantSource").and_then(Value::as_str) == Some(DICTIONARY_SOURCE) {
        return Ok(Expr::DictionaryConstant {
            bean: obj
                .get("@bean")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            name: required_str(obj, "dictionary constant", "name")?.to_string(),
            value: obj.get("value").cloned().unwrap_or(Value::Null),
        });
    }

    let Some(bean) = obj.get("@bean").and_then(Value::as_str) else {
        if obj.contains_key("functionClass") {
            return Ok(Expr::Function(parse_function_call(obj)?));
        }
        return Err(CompileError::MissingField {
            node: "expression",
            field: "@bean",
        });
    };

    let expr = match short_type_name(bean) {
        "StringConstantExpressionConfigDto" => Expr::StringConstant {
            value: match required(obj, "string constant", "value")? {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        },
        "LongConstantExpressionConfigDto" => {
            let outer = required(obj, "long constant", "value")?;
            let value = match outer {
                Value::Object(inner) => inner.get("value").cloned().ok_or(
                    CompileError::MissingField {
                        node: "long constant",
                        field: "value.value",
                    },
                )?,
                plain => plain.clone(),
            };
            Expr::LongConstant { value }
        }
        "DoubleConstantExpressionConfigDto" => Expr::DoubleConstant {
            value: required(obj, "double constant", "value")?.clone(),
        },
        "BooleanConstantExpressionConfigDto" => Expr::BooleanConstant {
            value: parse_bool(required(obj, "boolean constant", "value")?)?,
        },
        "NullConstantExpressionConfigDto" => Expr::NullConstant,
        "GetVariableExpressionConfigDto" => Expr::Variable {
            name: required_str(obj, "variable read", "name")?.to_string(),
        },
        "GetSrcValueExpressionConfigDto" => Expr::SrcValue {
            path: required_str(obj, "source value read", "srcPath")?.to_string(),
        },
        "GetMetaValueExpressionConfigDto" => Expr::MetaValue {
            path: required_str(obj, "meta value read", "metaPath")?.to_string(),
        },
        "FunctionExpressionConfigDto"
        | "SimpleFunctionExpressionConfigDto"
        | "ReduceFunctionExpressionConfigDto" => Expr::Function(parse_function_call(obj)?),
        _ => Expr::Unknown {
            type_name: bean.to_string(),
        },
    };
    Ok(expr)
}

fn parse_function_call(obj: &Map<String, Value>) -> Result<FunctionCall> {
    let function_class = required_str(obj, "function call", "functionClass")?.to_string();
    let args = match obj.get("args") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(parse_expression)
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(CompileError::MalformedNode {
                node: "function arguments",
                found: json_kind(other).to_string(),
            })
        }
    };
    Ok(FunctionCall {
        function_class,
        args,
    })
}

pub fn short_type_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

fn parse_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(CompileError::MalformedNode {
            node: "boolean constant",
            found: json_kind(other).to_string(),
        }),
    }
}

fn as_object<'a>(node: &'a Value, what: &'static str) -> Result<&'a Map<String, Value>> {
    node.as_object().ok_or_else(|| CompileError::MalformedNode {
        node: what,
        found: json_kind(node).to_string(),
    })
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    node: &'static str,
    field: &'static str,
) -> Result<&'a Value> {
    obj.get(field)
        .filter(|v| !v.is_null())
        .ok_or(CompileError::MissingField { node, field })
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    node: &'static str,
    field: &'static str,
) -> Result<&'a str> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or(CompileError::MissingField { node, field })
}

fn summarize(obj: &Map<String, Value>) -> String {
    if let Some(kind) = obj.get("type").and_then(Value::as_str) {
        return format!("type '{}'", kind);
    }
    let keys = obj.keys().map(String::as_str).collect::<Vec<_>>();
    format!("object with keys [{}]", keys.join(", "))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_constant() {
        let expr = parse_expression(&json!({
            "@bean": "com.datamapper.dto.StringConstantExpressionConfigDto",
            "value": "hello"
        }))
        .unwrap();
        assert_eq!(
            expr,
            Expr::StringConstant {
                value: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_long_constant_nested_value() {
        let expr = parse_expression(&json!({
            "@bean": "LongConstantExpressionConfigDto",
            "value": {"@bean": "java.lang.Long", "value": 42}
        }))
        .unwrap();
        assert_eq!(expr, Expr::LongConstant { value: json!(42) });
    }

    #[test]
    fn test_dictionary_source_wins_over_type_name() {
        let expr = parse_expression(&json!({
            "@bean": "StringConstantExpressionConfigDto",
            "constantSource": "DICTIONARY",
            "name": "USD",
            "value": "840"
        }))
        .unwrap();
        assert!(matches!(expr, Expr::DictionaryConstant { ref name, .. } if name == "USD"));
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let expr = parse_expression(&json!({"@bean": "a.b.FancyExpressionConfigDto"})).unwrap();
        assert_eq!(
            expr,
            Expr::Unknown {
                type_name: "a.b.FancyExpressionConfigDto".to_string()
            }
        );
    }

    #[test]
    fn test_function_call_args() {
        let expr = parse_expression(&json!({
            "@bean": "SimpleFunctionExpressionConfigDto",
            "functionClass": "com.datamapper.function.simple.Concat",
            "args": [
                {"@bean": "StringConstantExpressionConfigDto", "value": "a"},
                {"@bean": "NullConstantExpressionConfigDto"}
            ]
        }))
        .unwrap();
        let Expr::Function(call) = expr else {
            panic!("expected a function call");
        };
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[1], Expr::NullConstant);
    }

    #[test]
    fn test_missing_bean() {
        assert_eq!(
            parse_expression(&json!({"value": 1})).unwrap_err(),
            CompileError::MissingField {
                node: "expression",
                field: "@bean"
            }
        );
    }

    #[test]
    fn test_statement_kinds() {
        let stmts = parse_statements(&[
            json!({"type": "ASSIGN_VAR", "varName": "x",
                   "expression": {"@bean": "BooleanConstantExpressionConfigDto", "value": true}}),
            json!({"type": "SET_DST_VALUE", "dstPath": "a.b",
                   "collectionSetModes": {"items": "APPEND"},
                   "expression": {"@bean": "GetVariableExpressionConfigDto", "name": "x"}}),
            json!({"type": "RETURN",
                   "expression": {"@bean": "GetSrcValueExpressionConfigDto", "srcPath": "in.id"}}),
        ])
        .unwrap();
        assert_eq!(
            stmts.iter().map(Statement::kind).collect::<Vec<_>>(),
            vec!["ASSIGN_VAR", "SET_DST_VALUE", "RETURN"]
        );
    }

    #[test]
    fn test_statement_fallbacks() {
        let call = parse_statement(&json!({
            "functionClass": "com.datamapper.function.simple.And",
            "args": []
        }))
        .unwrap();
        assert!(matches!(call, Statement::Bare { expr: Expr::Function(_) }));

        let constant = parse_statement(&json!({
            "@bean": "DoubleConstantExpressionConfigDto",
            "value": 1.5
        }))
        .unwrap();
        assert!(matches!(constant, Statement::Bare { expr: Expr::DoubleConstant { .. } }));

        let other = parse_statement(&json!({"type": "LOOP", "body": []})).unwrap();
        assert!(matches!(other, Statement::Unrecognized { .. }));
    }

    #[test]
    fn test_non_object_statement() {
        assert!(matches!(
            parse_statement(&json!([1, 2])).unwrap_err(),
            CompileError::MalformedNode { node: "statement", .. }
        ));
    }
}
