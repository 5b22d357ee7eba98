//! Pre-passes run over one functional mapping before code generation.
use crate::ast::Statement;
use crate::ids::IdGenerator;
use crate::xml;
use indexmap::IndexMap;

/// Variable name to identifier, in order of first assignment.
///
/// Built fresh for every functional mapping and dropped with it.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    ids: IndexMap<String, String>,
}

impl VariableTable {
    pub fn build(statements: &[Statement], ids: &mut dyn IdGenerator) -> Self {
        let mut table = IndexMap::new();
        for stmt in statements {
            if let Statement::AssignVar { var_name, .. } = stmt {
                if !table.contains_key(var_name) {
                    table.insert(var_name.clone(), ids.next_id());
                }
            }
        }
        Self { ids: table }
    }

    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn to_xml(&self) -> String {
        xml::variables(self.ids.iter().map(|(name, id)| (name.as_str(), id.as_str())))
    }
}

/// Forward links over a statement list, computed once without touching the
/// statements themselves.
#[derive(Debug, Clone)]
pub struct StatementChain<'a> {
    statements: &'a [Statement],
    successors: Vec<Option<usize>>,
}

impl<'a> StatementChain<'a> {
    pub fn link(statements: &'a [Statement]) -> Self {
        let successors = (0..statements.len())
            .map(|index| Some(index + 1).filter(|next| *next < statements.len()))
            .collect();
        Self {
            statements,
            successors,
        }
    }

    pub fn head(&self) -> Option<usize> {
        if self.statements.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub fn get(&self, index: usize) -> &'a Statement {
        &self.statements[index]
    }

    pub fn successor(&self, index: usize) -> Option<usize> {
        self.successors.get(index).copied().flatten()
    }
}
