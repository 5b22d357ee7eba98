use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    StringConstant {
        value: String,
    },
    LongConstant {
        value: Value,
    },
    DoubleConstant {
        value: Value,
    },
    BooleanConstant {
        value: bool,
    },
    NullConstant,
    DictionaryConstant {
        bean: String,
        name: String,
        value: Value,
    },
    Variable {
        name: String,
    },
    SrcValue {
        path: String,
    },
    MetaValue {
        path: String,
    },
    Function(FunctionCall),
    /// A type name outside the known variants, kept so the compiler can
    /// decide between failing and skipping.
    Unknown {
        type_name: String,
    },
}

impl Expr {
    pub fn literal(&self) -> Option<Value> {
        match self {
            Expr::StringConstant { value } => Some(Value::String(value.clone())),
            Expr::LongConstant { value } | Expr::DoubleConstant { value } => Some(value.clone()),
            Expr::BooleanConstant { value } => Some(Value::Bool(*value)),
            Expr::NullConstant => Some(Value::Null),
            Expr::DictionaryConstant { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    pub fn as_str_literal(&self) -> Option<&str> {
        match self {
            Expr::StringConstant { value } => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub function_class: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Return {
        expr: Expr,
    },
    AssignVar {
        var_name: String,
        expr: Expr,
    },
    SetDstValue {
        dst_path: String,
        set_modes: Option<Value>,
        expr: Expr,
    },
    /// A function call or constant standing in statement position.
    Bare {
        expr: Expr,
    },
    Unrecognized {
        summary: String,
    },
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Return { .. } => "RETURN",
            Statement::AssignVar { .. } => "ASSIGN_VAR",
            Statement::SetDstValue { .. } => "SET_DST_VALUE",
            Statement::Bare { .. } => "bare expression",
            Statement::Unrecognized { .. } => "unrecognized",
        }
    }
}
