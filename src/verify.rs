//! Structural checks over a compiled workspace document.
use crate::functions::{Builtin, Shape};
use crate::xml::BLOCKLY_XMLNS;
use anyhow::{anyhow, bail, Result};
use std::collections::HashSet;
use xml::attribute::OwnedAttribute;
use xml::reader::{EventReader, XmlEvent};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSummary {
    pub blocks: usize,
    /// Declared variables as `(name, id)`, in document order.
    pub variables: Vec<(String, String)>,
}

#[derive(Debug)]
struct OpenBlock {
    kind: String,
    id: String,
    mutation_items: Option<usize>,
    variadic_slots: Vec<String>,
}

#[derive(Debug)]
enum Open {
    Root,
    Variables,
    Variable { id: String, name: String },
    Block(OpenBlock),
    Slot,
    Leaf,
}

pub fn verify_document(xml: &str) -> Result<DocumentSummary> {
    let mut summary = DocumentSummary::default();
    let mut variable_ids = HashSet::new();
    let mut block_ids = HashSet::new();
    let mut open: Vec<Open> = Vec::new();

    for event in EventReader::new(xml.as_bytes()) {
        let event = event.map_err(|e| anyhow!("Document is not well-formed XML: {}.", e))?;
        match event {
            XmlEvent::StartElement {
                name, attributes, ..
            } => {
                let tag = name.local_name.as_str();
                let entered = match open.last_mut() {
                    None => {
                        if tag != "xml" {
                            bail!("Root element is <{}>, expected <xml>.", tag);
                        }
                        if name.namespace.as_deref() != Some(BLOCKLY_XMLNS) {
                            bail!(
                                "Root element namespace is {:?}, expected '{}'.",
                                name.namespace,
                                BLOCKLY_XMLNS
                            );
                        }
                        Open::Root
                    }
                    Some(Open::Root) if tag == "variables" => Open::Variables,
                    Some(Open::Variables) if tag == "variable" => {
                        let id = attribute(&attributes, "id")
                            .ok_or_else(|| anyhow!("<variable> without an id."))?;
                        if !variable_ids.insert(id.to_string()) {
                            bail!("Variable id '{}' is declared more than once.", id);
                        }
                        Open::Variable {
                            id: id.to_string(),
                            name: String::new(),
                        }
                    }
                    Some(Open::Root) | Some(Open::Slot) => {
                        if tag != "block" {
                            bail!("Unexpected <{}> where a <block> was expected.", tag);
                        }
                        Open::Block(open_block(&attributes, &mut block_ids)?)
                    }
                    Some(Open::Block(block)) => match tag {
                        "mutation" => {
                            let items = attribute(&attributes, "items").ok_or_else(|| {
                                anyhow!("Block '{}' has a mutation without items.", block.id)
                            })?;
                            block.mutation_items = Some(items.parse().map_err(|_| {
                                anyhow!("Block '{}' has mutation items '{}'.", block.id, items)
                            })?);
                            Open::Leaf
                        }
                        "field" => {
                            if let Some(var_id) = attribute(&attributes, "id") {
                                if !variable_ids.contains(var_id) {
                                    bail!(
                                        "Block '{}' references undeclared variable id '{}'.",
                                        block.id,
                                        var_id
                                    );
                                }
                            }
                            Open::Leaf
                        }
                        "value" => {
                            let slot = attribute(&attributes, "name").unwrap_or_default();
                            if let Some(index) = slot.strip_prefix("ADD") {
                                block.variadic_slots.push(index.to_string());
                            }
                            Open::Slot
                        }
                        "next" => Open::Slot,
                        other => bail!("Block '{}' has unexpected child <{}>.", block.id, other),
                    },
                    Some(_) => bail!("Unexpected <{}>.", tag),
                };
                open.push(entered);
            }
            XmlEvent::Characters(text) => {
                if let Some(Open::Variable { name, .. }) = open.last_mut() {
                    name.push_str(&text);
                }
            }
            XmlEvent::EndElement { .. } => match open.pop() {
                Some(Open::Variable { id, name }) => summary.variables.push((name, id)),
                Some(Open::Block(block)) => {
                    check_variadic(&block)?;
                    summary.blocks += 1;
                }
                _ => {}
            },
            _ => {}
        }
    }
    Ok(summary)
}

fn attribute<'a>(attributes: &'a [OwnedAttribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name.local_name == name)
        .map(|a| a.value.as_str())
}

fn open_block(attributes: &[OwnedAttribute], block_ids: &mut HashSet<String>) -> Result<OpenBlock> {
    let kind = attribute(attributes, "type").ok_or_else(|| anyhow!("<block> without a type."))?;
    let id = attribute(attributes, "id").ok_or_else(|| anyhow!("Block '{}' has no id.", kind))?;
    if !block_ids.insert(id.to_string()) {
        bail!("Block id '{}' is used more than once.", id);
    }
    Ok(OpenBlock {
        kind: kind.to_string(),
        id: id.to_string(),
        mutation_items: None,
        variadic_slots: Vec::new(),
    })
}

fn is_variadic_block(kind: &str) -> bool {
    Builtin::ALL
        .into_iter()
        .any(|b| b.shape() == Shape::Variadic && b.block_type() == kind)
}

fn check_variadic(block: &OpenBlock) -> Result<()> {
    if block.variadic_slots.is_empty() && !is_variadic_block(&block.kind) {
        return Ok(());
    }
    let items = block
        .mutation_items
        .ok_or_else(|| anyhow!("Block '{}' has ADD slots but no mutation.", block.id))?;
    let expected = (0..items).map(|i| i.to_string()).collect::<Vec<_>>();
    if block.variadic_slots != expected {
        bail!(
            "Block '{}' declares {} item(s) but has {} ADD slot(s).",
            block.id,
            items,
            block.variadic_slots.len()
        );
    }
    Ok(())
}
