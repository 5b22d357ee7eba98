//! Mapping configuration and the lookup tables supplied alongside it.
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    #[serde(default)]
    pub entity_mappings: Vec<EntityMapping>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMapping {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dst_entity: Option<String>,
    #[serde(default)]
    pub functional_mappings: Vec<FunctionalMapping>,
}

/// One compilation unit: the statements producing a single destination value.
///
/// Statements stay as raw JSON until the mapping is compiled so that a
/// malformed node only fails its own mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionalMapping {
    pub dst_path: String,
    #[serde(default)]
    pub statements: Vec<Value>,
}

impl FunctionalMapping {
    pub fn output_key(&self) -> String {
        self.dst_path.replace('.', "_")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    #[serde(default)]
    pub functions: Vec<KnownFunction>,
    #[serde(default)]
    pub transformers: Vec<Transformer>,
    #[serde(default)]
    pub dictionaries: Vec<Dictionary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownFunction {
    pub function_class: String,
    pub block_type: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformer {
    pub key: String,
    pub block_type: String,
    #[serde(default)]
    pub required_params: Vec<TransformerParam>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Transformer {
    pub fn param_kind(&self, name: &str) -> Option<&str> {
        self.required_params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.kind.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dictionary {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<DictionaryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl Registry {
    pub fn function(&self, function_class: &str) -> Option<&KnownFunction> {
        self.functions
            .iter()
            .find(|f| f.function_class == function_class)
    }

    pub fn transformer(&self, key: &str) -> Option<&Transformer> {
        self.transformers.iter().find(|t| t.key == key)
    }

    pub fn dictionary_entry(&self, entry_name: &str) -> Option<(&Dictionary, &DictionaryEntry)> {
        self.dictionaries.iter().find_map(|dictionary| {
            dictionary
                .entries
                .iter()
                .find(|entry| entry.name == entry_name)
                .map(|entry| (dictionary, entry))
        })
    }
}
