use crate::ast::{Expr, Statement};
use crate::config::{FunctionalMapping, MappingConfig, Registry};
use crate::error::{CompileError, Result};
use crate::ids::{IdGenerator, UuidIds};
use crate::parser::parse_statements;
use crate::semantic::{StatementChain, VariableTable};
use crate::xml::{self, BlockXml};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::{json, Map, Value};

/// How the compiler treats constructs it has no block for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// Unknown constructs fail their functional mapping.
    #[default]
    Strict,
    /// Unknown constructs are skipped with a warning.
    Permissive,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub mode: CompileMode,
}

#[derive(Debug, Default)]
pub struct CompileReport {
    pub succeeded: IndexMap<String, String>,
    pub failed: IndexMap<String, CompileError>,
}

impl CompileReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn to_json(&self) -> Value {
        let failed = self
            .failed
            .iter()
            .map(|(key, err)| (key.clone(), Value::String(err.to_string())))
            .collect::<Map<String, Value>>();
        json!({
            "succeeded": self.succeeded,
            "failed": failed,
        })
    }
}

pub fn compile_config(
    config: &MappingConfig,
    registry: &Registry,
    options: CompileOptions,
) -> CompileReport {
    compile_config_with_ids(config, registry, options, &mut UuidIds)
}

pub fn compile_config_with_ids(
    config: &MappingConfig,
    registry: &Registry,
    options: CompileOptions,
    ids: &mut dyn IdGenerator,
) -> CompileReport {
    let mut report = CompileReport::default();
    for entity in &config.entity_mappings {
        debug!(
            "compiling entity mapping '{}' ({} functional mappings)",
            entity.name.as_deref().unwrap_or("<unnamed>"),
            entity.functional_mappings.len()
        );
        for mapping in &entity.functional_mappings {
            let key = mapping.output_key();
            if report.succeeded.shift_remove(&key).is_some() || report.failed.contains_key(&key) {
                warn!("destination key '{}' is not unique", key);
                report
                    .failed
                    .insert(key.clone(), CompileError::DuplicateDestination(key));
                continue;
            }
            match compile_functional_mapping(mapping, registry, options, ids) {
                Ok(document) => {
                    report.succeeded.insert(key, document);
                }
                Err(err) => {
                    warn!("functional mapping '{}' failed: {}", mapping.dst_path, err);
                    report.failed.insert(key, err);
                }
            }
        }
    }
    info!(
        "compiled {} of {} functional mappings",
        report.succeeded.len(),
        report.total()
    );
    report
}

pub fn compile_functional_mapping(
    mapping: &FunctionalMapping,
    registry: &Registry,
    options: CompileOptions,
    ids: &mut dyn IdGenerator,
) -> Result<String> {
    debug!("compiling functional mapping '{}'", mapping.dst_path);
    let statements = parse_statements(&mapping.statements)?;
    let variables = VariableTable::build(&statements, ids);
    let chain = StatementChain::link(&statements);
    let mut ctx = CompileContext {
        registry,
        options,
        ids,
        variables: &variables,
    };
    let body = ctx.compile_chain(&chain)?.unwrap_or_default();
    Ok(xml::document(&variables.to_xml(), &body))
}

pub(crate) struct CompileContext<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) options: CompileOptions,
    pub(crate) ids: &'a mut dyn IdGenerator,
    pub(crate) variables: &'a VariableTable,
}

impl CompileContext<'_> {
    pub(crate) fn block(&mut self, kind: impl Into<String>) -> BlockXml {
        BlockXml::new(kind, self.ids.next_id())
    }

    pub(crate) fn gap<T>(&self, err: CompileError) -> Result<Option<T>> {
        match self.options.mode {
            CompileMode::Strict => Err(err),
            CompileMode::Permissive => {
                warn!("skipping: {}", err);
                Ok(None)
            }
        }
    }

    fn compile_chain(&mut self, chain: &StatementChain<'_>) -> Result<Option<String>> {
        let mut stack = Vec::new();
        let mut tail = None;
        let mut cursor = chain.head();
        while let Some(index) = cursor {
            cursor = chain.successor(index);
            match chain.get(index) {
                Statement::Return { expr } => {
                    if cursor.is_some() {
                        debug!("statements after RETURN are not emitted");
                    }
                    let block = self.block("statement_return");
                    let value = self.compile_expression(expr)?;
                    tail = Some(block.value("EXPRESSION", value).render());
                    break;
                }
                Statement::Bare { expr } => {
                    tail = self.compile_expression(expr)?;
                    break;
                }
                Statement::SetDstValue {
                    dst_path,
                    set_modes,
                    expr,
                } => {
                    let modes = set_modes
                        .as_ref()
                        .map_or_else(|| "{}".to_string(), Value::to_string);
                    let block = self
                        .block("statement_set_dst_value")
                        .text_field("DST_PATH", dst_path)
                        .text_field("SET_MODES", &modes);
                    let value = self.compile_expression(expr)?;
                    stack.push(block.value("EXPRESSION", value));
                }
                Statement::AssignVar { var_name, expr } => {
                    let var_id = self.variables.id_of(var_name).map(str::to_string);
                    let block = self.block("statement_assign_var").variable_field(
                        "NAME",
                        var_name,
                        var_id.as_deref(),
                    );
                    let value = self.compile_expression(expr)?;
                    stack.push(block.value("EXPRESSION", value));
                }
                Statement::Unrecognized { summary } => {
                    self.gap::<()>(CompileError::InvalidStatement(summary.clone()))?;
                }
            }
        }
        Ok(xml::chain(&stack, tail))
    }

    pub(crate) fn compile_expression(&mut self, expr: &Expr) -> Result<Option<String>> {
        let block = match expr {
            Expr::DictionaryConstant { bean, name, value } => {
                let (dictionary, entry) = self
                    .registry
                    .dictionary_entry(name)
                    .ok_or_else(|| CompileError::UnresolvedDictionaryEntry(name.clone()))?;
                let kind = format!(
                    "dictionary_{}_{}",
                    block_ident(&dictionary.name),
                    block_ident(&entry.name)
                );
                let field = if bean.contains("Long") {
                    value.get("value").unwrap_or(value).clone()
                } else {
                    value.clone()
                };
                self.block(kind).field("VALUE", &field)
            }
            Expr::StringConstant { value } => {
                self.block("expression_string").text_field("NAME", value)
            }
            Expr::LongConstant { value } => self.block("expression_long").field("NAME", value),
            Expr::DoubleConstant { value } => {
                self.block("expression_double").field("NAME", value)
            }
            Expr::BooleanConstant { value } => self
                .block("expression_boolean")
                .text_field("VALUE", if *value { "TRUE" } else { "FALSE" }),
            Expr::NullConstant => self.block("expression_null"),
            Expr::Variable { name } => {
                let var_id = match self.variables.id_of(name) {
                    Some(id) => Some(id.to_string()),
                    None => {
                        self.gap::<()>(CompileError::UnresolvedVariable(name.clone()))?;
                        None
                    }
                };
                self.block("expression_get_variable")
                    .variable_field("NAME", name, var_id.as_deref())
            }
            Expr::SrcValue { path } => self
                .block("expression_get_src_value")
                .text_field("SRC_PATH", path),
            Expr::MetaValue { path } => self
                .block("expression_get_meta_value")
                .text_field("META_PATH", path),
            Expr::Function(call) => return self.compile_function(call),
            Expr::Unknown { type_name } => {
                return self.gap(CompileError::UnknownExpressionType(type_name.clone()))
            }
        };
        Ok(Some(block.render()))
    }
}

fn block_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use serde_json::json;

    fn mapping(dst_path: &str, statements: Vec<Value>) -> FunctionalMapping {
        FunctionalMapping {
            dst_path: dst_path.to_string(),
            statements,
        }
    }

    fn compile(statements: Vec<Value>) -> Result<String> {
        compile_with(statements, &Registry::default(), CompileOptions::default())
    }

    fn compile_with(
        statements: Vec<Value>,
        registry: &Registry,
        options: CompileOptions,
    ) -> Result<String> {
        let mut ids = SequentialIds::default();
        compile_functional_mapping(&mapping("out", statements), registry, options, &mut ids)
    }

    fn string_const(value: &str) -> Value {
        json!({"@bean": "com.datamapper.dto.StringConstantExpressionConfigDto", "value": value})
    }

    fn permissive() -> CompileOptions {
        CompileOptions {
            mode: CompileMode::Permissive,
        }
    }

    #[test]
    fn test_return_string_constant() {
        let xml = compile(vec![json!({"type": "RETURN", "expression": string_const("hello")})])
            .unwrap();
        insta::assert_snapshot!(xml, @r#"<xml xmlns="https://developers.google.com/blockly/xml"><block type="statement_return" id="id_1"><value name="EXPRESSION"><block type="expression_string" id="id_2"><field name="NAME">hello</field></block></value></block></xml>"#);
    }

    #[test]
    fn test_boolean_false_is_text() {
        let xml = compile(vec![json!({"type": "RETURN", "expression": {
            "@bean": "BooleanConstantExpressionConfigDto", "value": false
        }})])
        .unwrap();
        assert!(xml.contains("<field name=\"VALUE\">FALSE</field>"));
    }

    #[test]
    fn test_long_and_null_constants() {
        let xml = compile(vec![json!({"type": "SET_DST_VALUE", "dstPath": "a",
            "expression": {"@bean": "LongConstantExpressionConfigDto",
                           "value": {"@bean": "java.lang.Long", "value": 7}}})])
        .unwrap();
        assert!(xml.contains("<block type=\"expression_long\" id=\"id_2\"><field name=\"NAME\">7</field></block>"));

        let xml = compile(vec![json!({"type": "RETURN",
            "expression": {"@bean": "NullConstantExpressionConfigDto"}})])
        .unwrap();
        assert!(xml.contains("<block type=\"expression_null\" id=\"id_2\"></block>"));
    }

    #[test]
    fn test_string_values_are_encoded() {
        let xml = compile(vec![json!({"type": "RETURN", "expression": string_const("a<b&c")})])
            .unwrap();
        assert!(xml.contains("<field name=\"NAME\">a&#x3C;b&#x26;c</field>"));
    }

    #[test]
    fn test_assign_then_read_variable() {
        let xml = compile(vec![
            json!({"type": "ASSIGN_VAR", "varName": "total", "expression": {
                "@bean": "GetSrcValueExpressionConfigDto", "srcPath": "order.total"}}),
            json!({"type": "RETURN", "expression": {
                "@bean": "GetVariableExpressionConfigDto", "name": "total"}}),
        ])
        .unwrap();
        insta::assert_snapshot!(xml, @r#"<xml xmlns="https://developers.google.com/blockly/xml"><variables><variable id="id_1">total</variable></variables><block type="statement_assign_var" id="id_2"><field name="NAME" id="id_1">total</field><value name="EXPRESSION"><block type="expression_get_src_value" id="id_3"><field name="SRC_PATH">order.total</field></block></value><next><block type="statement_return" id="id_4"><value name="EXPRESSION"><block type="expression_get_variable" id="id_5"><field name="NAME" id="id_1">total</field></block></value></block></next></block></xml>"#);
    }

    #[test]
    fn test_no_assignments_no_variables() {
        let xml = compile(vec![json!({"type": "RETURN", "expression": string_const("x")})]).unwrap();
        assert!(!xml.contains("<variables>"));
    }

    #[test]
    fn test_unresolved_variable_strict() {
        let err = compile(vec![json!({"type": "RETURN", "expression": {
            "@bean": "GetVariableExpressionConfigDto", "name": "ghost"}})])
        .unwrap_err();
        assert_eq!(err, CompileError::UnresolvedVariable("ghost".to_string()));
    }

    #[test]
    fn test_unresolved_variable_permissive() {
        let xml = compile_with(
            vec![json!({"type": "RETURN", "expression": {
                "@bean": "GetVariableExpressionConfigDto", "name": "ghost"}})],
            &Registry::default(),
            permissive(),
        )
        .unwrap();
        assert!(xml.contains("<field name=\"NAME\">ghost</field>"));
    }

    #[test]
    fn test_set_dst_value_chain_and_modes() {
        let xml = compile(vec![
            json!({"type": "SET_DST_VALUE", "dstPath": "customer.tags",
                   "collectionSetModes": {"tags": "APPEND"},
                   "expression": {"@bean": "GetMetaValueExpressionConfigDto", "metaPath": "m.tags"}}),
            json!({"type": "SET_DST_VALUE", "dstPath": "customer.id",
                   "expression": string_const("1")}),
        ])
        .unwrap();
        assert!(xml.contains(
            "<field name=\"DST_PATH\">customer.tags</field>\
             <field name=\"SET_MODES\">{&#x22;tags&#x22;:&#x22;APPEND&#x22;}</field>"
        ));
        assert!(xml.contains("<field name=\"META_PATH\">m.tags</field>"));
        assert!(xml.contains("<next><block type=\"statement_set_dst_value\" id=\"id_3\">"));
        assert!(xml.contains("<field name=\"SET_MODES\">{}</field>"));
    }

    #[test]
    fn test_unknown_expression_type() {
        let stmts = vec![json!({"type": "RETURN", "expression": {"@bean": "x.WeirdExpressionConfigDto"}})];
        assert_eq!(
            compile(stmts.clone()).unwrap_err(),
            CompileError::UnknownExpressionType("x.WeirdExpressionConfigDto".to_string())
        );
        let xml = compile_with(stmts, &Registry::default(), permissive()).unwrap();
        assert!(xml.contains("<value name=\"EXPRESSION\"></value>"));
    }

    #[test]
    fn test_unrecognized_statement() {
        let stmts = vec![
            json!({"type": "ASSIGN_VAR", "varName": "x", "expression": string_const("a")}),
            json!({"type": "LOOP"}),
            json!({"type": "SET_DST_VALUE", "dstPath": "d", "expression": string_const("b")}),
        ];
        assert!(matches!(
            compile(stmts.clone()).unwrap_err(),
            CompileError::InvalidStatement(_)
        ));
        let xml = compile_with(stmts, &Registry::default(), permissive()).unwrap();
        assert!(xml.contains("<next><block type=\"statement_set_dst_value\""));
    }

    #[test]
    fn test_dictionary_constant() {
        let registry: Registry = serde_json::from_value(json!({
            "dictionaries": [{"name": "Currency code", "entries": [{"name": "USD", "value": "840"}]}]
        }))
        .unwrap();
        let xml = compile_with(
            vec![json!({"type": "RETURN", "expression": {
                "@bean": "LongConstantExpressionConfigDto", "constantSource": "DICTIONARY",
                "name": "USD", "value": {"value": 840}}})],
            &registry,
            CompileOptions::default(),
        )
        .unwrap();
        assert!(xml.contains(
            "<block type=\"dictionary_Currency_code_USD\" id=\"id_2\"><field name=\"VALUE\">840</field></block>"
        ));

        let err = compile_with(
            vec![json!({"type": "RETURN", "expression": {
                "@bean": "StringConstantExpressionConfigDto", "constantSource": "DICTIONARY",
                "name": "EUR", "value": "978"}})],
            &registry,
            permissive(),
        )
        .unwrap_err();
        assert_eq!(err, CompileError::UnresolvedDictionaryEntry("EUR".to_string()));
    }

    #[test]
    fn test_dictionary_long_with_plain_value() {
        let registry: Registry = serde_json::from_value(json!({
            "dictionaries": [{"name": "Currency", "entries": [{"name": "USD", "value": 840}]}]
        }))
        .unwrap();
        let xml = compile_with(
            vec![json!({"type": "RETURN", "expression": {
                "@bean": "LongConstantExpressionConfigDto", "constantSource": "DICTIONARY",
                "name": "USD", "value": 840}})],
            &registry,
            CompileOptions::default(),
        )
        .unwrap();
        assert!(xml.contains("<field name=\"VALUE\">840</field>"));
    }

    #[test]
    fn test_long_statement_list() {
        let count = 10_000;
        let statements = (0..count)
            .map(|i| {
                json!({"type": "SET_DST_VALUE", "dstPath": format!("out.f{}", i),
                       "expression": string_const("v")})
            })
            .collect();
        let xml = compile(statements).unwrap();
        assert_eq!(xml.matches("<next>").count(), count - 1);
        assert!(xml.contains("<field name=\"DST_PATH\">out.f9999</field>"));
        assert!(xml.ends_with("</block></next></block></xml>"));
        let summary = crate::verify::verify_document(&xml).unwrap();
        assert_eq!(summary.blocks, 2 * count);
    }

    #[test]
    fn test_bare_expression_statement() {
        let xml = compile(vec![string_const("solo")]).unwrap();
        assert!(xml.ends_with("<block type=\"expression_string\" id=\"id_1\"><field name=\"NAME\">solo</field></block></xml>"));
    }

    #[test]
    fn test_empty_mapping() {
        assert_eq!(
            compile(Vec::new()).unwrap(),
            "<xml xmlns=\"https://developers.google.com/blockly/xml\"></xml>"
        );
    }

    fn config(mappings: Vec<FunctionalMapping>) -> MappingConfig {
        serde_json::from_value(json!({
            "entityMappings": [{"name": "Customer", "functionalMappings": mappings}]
        }))
        .unwrap()
    }

    #[test]
    fn test_batch_partial_failure() {
        let config = config(vec![
            mapping("customer.name", vec![json!({"type": "RETURN", "expression": string_const("n")})]),
            mapping("customer.age", vec![json!({"type": "RETURN", "expression": {
                "@bean": "GetVariableExpressionConfigDto", "name": "age"}})]),
        ]);
        let mut ids = SequentialIds::default();
        let report = compile_config_with_ids(
            &config,
            &Registry::default(),
            CompileOptions::default(),
            &mut ids,
        );
        assert_eq!(report.succeeded.keys().collect::<Vec<_>>(), vec!["customer_name"]);
        assert_eq!(
            report.failed.get("customer_age"),
            Some(&CompileError::UnresolvedVariable("age".to_string()))
        );
        assert!(!report.is_success());
        assert_eq!(
            report.to_json()["failed"]["customer_age"],
            json!("variable 'age' is read but never assigned in this mapping")
        );
    }

    #[test]
    fn test_duplicate_destination_keys() {
        let stmt = json!({"type": "RETURN", "expression": string_const("n")});
        let config = config(vec![
            mapping("a.b", vec![stmt.clone()]),
            mapping("a_b", vec![stmt.clone()]),
            mapping("c", vec![stmt]),
        ]);
        let report = compile_config(&config, &Registry::default(), CompileOptions::default());
        assert_eq!(
            report.failed.get("a_b"),
            Some(&CompileError::DuplicateDestination("a_b".to_string()))
        );
        assert!(!report.succeeded.contains_key("a_b"));
        assert!(report.succeeded.contains_key("c"));
    }

    #[test]
    fn test_recompilation_is_identical() {
        let config = config(vec![mapping(
            "x",
            vec![
                json!({"type": "ASSIGN_VAR", "varName": "v", "expression": string_const("1")}),
                json!({"type": "RETURN", "expression": {
                    "@bean": "GetVariableExpressionConfigDto", "name": "v"}}),
            ],
        )]);
        let first = compile_config_with_ids(
            &config,
            &Registry::default(),
            CompileOptions::default(),
            &mut SequentialIds::default(),
        );
        let second = compile_config_with_ids(
            &config,
            &Registry::default(),
            CompileOptions::default(),
            &mut SequentialIds::default(),
        );
        assert_eq!(first.succeeded, second.succeeded);
    }
}
