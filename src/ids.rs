use uuid::Uuid;

/// Source of identifiers for emitted blocks and declared variables.
///
/// Identifiers only have to be unique within one document; they are never
/// used to look anything up.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// `<prefix>_<n>` counter, for reproducible output.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    counter: usize,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}_{}", self.prefix, self.counter)
    }
}
