//! Block shapes for function calls: the built-in catalog, `TransformValue`
//! and registry-declared custom functions.
use crate::ast::{Expr, FunctionCall};
use crate::codegen::CompileContext;
use crate::error::{CompileError, Result};
use crate::xml::BlockXml;

const SIMPLE_PACKAGE: &str = "com.datamapper.function.simple.";
const REDUCE_PACKAGE: &str = "com.datamapper.function.reduce.";

/// Transformer blocks that also carry the transformer key as a `TYPE` field.
const PREDEFINED_TYPE_BLOCKS: &[&str] = &[
    "transformer_to_string",
    "transformer_to_long",
    "transformer_to_double",
    "transformer_to_boolean",
    "transformer_to_date",
];

const OBJECT_PARAM: &str = "object";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Concat,
    DateToString,
    JoinLists,
    Equals,
    IfElse,
    AsMap,
    And,
    Or,
    Switch,
    GetElementByIndex,
    GetElementByKey,
    TransformValue,
    SortComparableElements,
    AvgElement,
    MaxComparableElement,
    MinComparableElement,
    ConcatElements,
    ToList,
    ToMap,
    ToSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// One named value slot per argument, in order.
    Fixed(&'static [&'static str]),
    /// `ADD0..ADDn` slots plus a mutation recording `n`.
    Variadic,
    /// `VALUE` and `FORMAT`, plus an optional `TIME_ZONE`.
    DateToString,
    /// Single `VALUE` slot with the operation named in field `OP`.
    Aggregate(&'static str),
    TransformValue,
}

impl Builtin {
    pub const ALL: [Builtin; 20] = [
        Builtin::Concat,
        Builtin::DateToString,
        Builtin::JoinLists,
        Builtin::Equals,
        Builtin::IfElse,
        Builtin::AsMap,
        Builtin::And,
        Builtin::Or,
        Builtin::Switch,
        Builtin::GetElementByIndex,
        Builtin::GetElementByKey,
        Builtin::TransformValue,
        Builtin::SortComparableElements,
        Builtin::AvgElement,
        Builtin::MaxComparableElement,
        Builtin::MinComparableElement,
        Builtin::ConcatElements,
        Builtin::ToList,
        Builtin::ToMap,
        Builtin::ToSet,
    ];

    pub fn from_class(function_class: &str) -> Option<Builtin> {
        let (package, name) = if let Some(name) = function_class.strip_prefix(SIMPLE_PACKAGE) {
            (SIMPLE_PACKAGE, name)
        } else if let Some(name) = function_class.strip_prefix(REDUCE_PACKAGE) {
            (REDUCE_PACKAGE, name)
        } else {
            return None;
        };
        Self::ALL
            .into_iter()
            .find(|b| b.package() == package && b.simple_name() == name)
    }

    fn package(self) -> &'static str {
        match self {
            Builtin::SortComparableElements
            | Builtin::AvgElement
            | Builtin::MaxComparableElement
            | Builtin::MinComparableElement
            | Builtin::ConcatElements
            | Builtin::ToList
            | Builtin::ToMap
            | Builtin::ToSet => REDUCE_PACKAGE,
            _ => SIMPLE_PACKAGE,
        }
    }

    pub fn simple_name(self) -> &'static str {
        match self {
            Builtin::Concat => "Concat",
            Builtin::DateToString => "DateToString",
            Builtin::JoinLists => "JoinLists",
            Builtin::Equals => "Equals",
            Builtin::IfElse => "IfElse",
            Builtin::AsMap => "AsMap",
            Builtin::And => "And",
            Builtin::Or => "Or",
            Builtin::Switch => "Switch",
            Builtin::GetElementByIndex => "GetElementByIndex",
            Builtin::GetElementByKey => "GetElementByKey",
            Builtin::TransformValue => "TransformValue",
            Builtin::SortComparableElements => "SortComparableElements",
            Builtin::AvgElement => "AvgElement",
            Builtin::MaxComparableElement => "MaxComparableElement",
            Builtin::MinComparableElement => "MinComparableElement",
            Builtin::ConcatElements => "ConcatElements",
            Builtin::ToList => "ToList",
            Builtin::ToMap => "ToMap",
            Builtin::ToSet => "ToSet",
        }
    }

    pub fn class_name(self) -> String {
        format!("{}{}", self.package(), self.simple_name())
    }

    pub fn block_type(self) -> &'static str {
        match self {
            Builtin::Concat => "function_simple_concat",
            Builtin::DateToString => "function_simple_date_to_string",
            Builtin::JoinLists => "function_simple_join_lists",
            Builtin::Equals => "function_simple_equals",
            Builtin::IfElse => "function_simple_if_else",
            Builtin::AsMap => "function_simple_as_map",
            Builtin::And => "function_simple_and",
            Builtin::Or => "function_simple_or",
            Builtin::Switch => "function_simple_switch",
            Builtin::GetElementByIndex => "function_simple_get_element_by_index",
            Builtin::GetElementByKey => "function_simple_get_element_by_key",
            Builtin::TransformValue => "function_simple_transform_value",
            Builtin::SortComparableElements => "function_reduce_sort",
            Builtin::AvgElement | Builtin::MaxComparableElement | Builtin::MinComparableElement => {
                "function_reduce_aggregate"
            }
            Builtin::ConcatElements => "function_reduce_concat_elements",
            Builtin::ToList => "function_reduce_to_list",
            Builtin::ToMap => "function_reduce_to_map",
            Builtin::ToSet => "function_reduce_to_set",
        }
    }

    pub fn shape(self) -> Shape {
        match self {
            Builtin::Concat
            | Builtin::JoinLists
            | Builtin::AsMap
            | Builtin::And
            | Builtin::Or
            | Builtin::Switch
            | Builtin::ToList => Shape::Variadic,
            Builtin::DateToString => Shape::DateToString,
            Builtin::Equals => Shape::Fixed(&["LEFT", "RIGHT"]),
            Builtin::IfElse => Shape::Fixed(&["IF", "THEN", "ELSE"]),
            Builtin::GetElementByIndex => Shape::Fixed(&["LIST", "INDEX"]),
            Builtin::GetElementByKey => Shape::Fixed(&["MAP", "KEY"]),
            Builtin::ConcatElements => Shape::Fixed(&["VALUE", "DELIMITER"]),
            Builtin::ToMap => Shape::Fixed(&["KEY", "VALUE"]),
            Builtin::SortComparableElements | Builtin::ToSet => Shape::Fixed(&["VALUE"]),
            Builtin::AvgElement => Shape::Aggregate("AVG"),
            Builtin::MaxComparableElement => Shape::Aggregate("MAX"),
            Builtin::MinComparableElement => Shape::Aggregate("MIN"),
            Builtin::TransformValue => Shape::TransformValue,
        }
    }
}

impl CompileContext<'_> {
    pub(crate) fn compile_function(&mut self, call: &FunctionCall) -> Result<Option<String>> {
        if let Some(builtin) = Builtin::from_class(&call.function_class) {
            return self.compile_builtin(builtin, call);
        }
        let registry = self.registry;
        if let Some(known) = registry.function(&call.function_class) {
            let slots = known.args.iter().map(String::as_str).collect::<Vec<_>>();
            let block = self.block(known.block_type.as_str());
            return self.fixed_slots(block, &slots, call);
        }
        self.gap(CompileError::UnknownFunctionClass(call.function_class.clone()))
    }

    fn compile_builtin(&mut self, builtin: Builtin, call: &FunctionCall) -> Result<Option<String>> {
        match builtin.shape() {
            Shape::Fixed(slots) => {
                let block = self.block(builtin.block_type());
                self.fixed_slots(block, slots, call)
            }
            Shape::Variadic => {
                let mut block = self
                    .block(builtin.block_type())
                    .mutation(call.args.len());
                for (index, arg) in call.args.iter().enumerate() {
                    let value = self.compile_expression(arg)?;
                    block = block.value(&format!("ADD{}", index), value);
                }
                Ok(Some(block.render()))
            }
            Shape::DateToString => {
                let actual = call.args.len();
                if !(2..=3).contains(&actual) {
                    let expected = if actual < 2 { 2 } else { 3 };
                    self.arity_gap(call, expected)?;
                }
                let has_time_zone = call.args.len() >= 3;
                let block = self
                    .block(builtin.block_type())
                    .mutation(usize::from(has_time_zone));
                let slots: &[&str] = if has_time_zone {
                    &["VALUE", "FORMAT", "TIME_ZONE"]
                } else {
                    &["VALUE", "FORMAT"]
                };
                self.bind_slots(block, slots, &call.args)
            }
            Shape::Aggregate(op) => {
                let block = self
                    .block(builtin.block_type())
                    .text_field("OP", op);
                self.fixed_slots(block, &["VALUE"], call)
            }
            Shape::TransformValue => self.compile_transform_value(call),
        }
    }

    fn fixed_slots(
        &mut self,
        block: BlockXml,
        slots: &[&str],
        call: &FunctionCall,
    ) -> Result<Option<String>> {
        if call.args.len() != slots.len() {
            self.arity_gap(call, slots.len())?;
        }
        self.bind_slots(block, slots, &call.args)
    }

    /// Binds arguments to slots positionally; missing arguments leave their
    /// slot out and extra arguments are ignored.
    fn bind_slots(
        &mut self,
        mut block: BlockXml,
        slots: &[&str],
        args: &[Expr],
    ) -> Result<Option<String>> {
        for (slot, arg) in slots.iter().zip(args) {
            if let Some(value) = self.compile_expression(arg)? {
                block = block.value(slot, Some(value));
            }
        }
        Ok(Some(block.render()))
    }

    fn arity_gap(&self, call: &FunctionCall, expected: usize) -> Result<()> {
        self.gap::<()>(CompileError::ArgumentArityMismatch {
            function_class: call.function_class.clone(),
            expected,
            actual: call.args.len(),
        })?;
        Ok(())
    }

    /// `TransformValue(key, value, name1, value1, name2, value2, ...)`.
    fn compile_transform_value(&mut self, call: &FunctionCall) -> Result<Option<String>> {
        let actual = call.args.len();
        if actual < 2 || actual % 2 != 0 {
            self.arity_gap(call, if actual < 2 { 2 } else { actual + 1 })?;
        }
        let Some(key) = call.args.first() else {
            return Ok(None);
        };
        let key = key
            .as_str_literal()
            .ok_or_else(|| invalid(call, "the transformer key must be a string constant"))?;
        let registry = self.registry;
        let transformer = registry
            .transformer(key)
            .ok_or_else(|| CompileError::UnknownTransformer(key.to_string()))?;

        let mut block = self.block(transformer.block_type.as_str());
        if PREDEFINED_TYPE_BLOCKS.contains(&transformer.block_type.as_str()) {
            block = block.text_field("TYPE", key);
        }
        let value = match call.args.get(1) {
            Some(arg) => self.compile_expression(arg)?,
            None => None,
        };
        block = block.value("VALUE", value);

        let params = call.args.get(2..).unwrap_or_default();
        for pair in params.chunks_exact(2) {
            let name = pair[0]
                .as_str_literal()
                .ok_or_else(|| invalid(call, "parameter names must be string constants"))?;
            if transformer.param_kind(name) == Some(OBJECT_PARAM) {
                let value = self.compile_expression(&pair[1])?;
                block = block.value(name, value);
            } else {
                let literal = pair[1].literal().ok_or_else(|| {
                    invalid(call, &format!("parameter '{}' must be a constant", name))
                })?;
                block = block.field(name, &literal);
            }
        }
        Ok(Some(block.render()))
    }
}

fn invalid(call: &FunctionCall, reason: &str) -> CompileError {
    CompileError::InvalidArgument {
        function_class: call.function_class.clone(),
        reason: reason.to_string(),
    }
}
