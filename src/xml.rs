use serde_json::Value;

pub const BLOCKLY_XMLNS: &str = "https://developers.google.com/blockly/xml";

/// Markup-significant and non-ASCII characters become hex character references.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' | '<' | '>' | '"' | '\'' | '`' => out.push_str(&format!("&#x{:X};", c as u32)),
            c if c.is_ascii() => out.push(c),
            c => out.push_str(&format!("&#x{:X};", c as u32)),
        }
    }
    out
}

pub fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => encode_text(s),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    body: String,
    id: Option<String>,
}

/// A `<block>` element under construction.
///
/// Children always render in the order mutation, fields, values, next,
/// whatever order they were added in.
#[derive(Debug, Clone)]
pub struct BlockXml {
    kind: String,
    id: String,
    mutation: Option<usize>,
    fields: Vec<Field>,
    values: Vec<(String, Option<String>)>,
    next: Option<String>,
}

impl BlockXml {
    pub fn new(kind: impl Into<String>, id: String) -> Self {
        Self {
            kind: kind.into(),
            id,
            mutation: None,
            fields: Vec::new(),
            values: Vec::new(),
            next: None,
        }
    }

    pub fn mutation(mut self, items: usize) -> Self {
        self.mutation = Some(items);
        self
    }

    pub fn field(mut self, name: &str, value: &Value) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            body: field_text(value),
            id: None,
        });
        self
    }

    pub fn text_field(self, name: &str, text: &str) -> Self {
        self.field(name, &Value::String(text.to_string()))
    }

    pub fn variable_field(mut self, name: &str, var_name: &str, id: Option<&str>) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            body: encode_text(var_name),
            id: id.map(str::to_string),
        });
        self
    }

    /// A value input; `None` renders an empty socket.
    pub fn value(mut self, name: &str, block: Option<String>) -> Self {
        self.values.push((name.to_string(), block));
        self
    }

    pub fn next(mut self, block: Option<String>) -> Self {
        self.next = block;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_open(&mut out);
        if let Some(next) = &self.next {
            out.push_str("<next>");
            out.push_str(next);
            out.push_str("</next>");
        }
        out.push_str("</block>");
        out
    }

    fn render_open(&self, out: &mut String) {
        out.push_str(&format!(
            "<block type=\"{}\" id=\"{}\">",
            encode_text(&self.kind),
            encode_text(&self.id)
        ));
        if let Some(items) = self.mutation {
            out.push_str(&format!("<mutation items=\"{}\"></mutation>", items));
        }
        for field in &self.fields {
            match &field.id {
                Some(id) => out.push_str(&format!(
                    "<field name=\"{}\" id=\"{}\">{}</field>",
                    encode_text(&field.name),
                    encode_text(id),
                    field.body
                )),
                None => out.push_str(&format!(
                    "<field name=\"{}\">{}</field>",
                    encode_text(&field.name),
                    field.body
                )),
            }
        }
        for (name, block) in &self.values {
            out.push_str(&format!(
                "<value name=\"{}\">{}</value>",
                encode_text(name),
                block.as_deref().unwrap_or_default()
            ));
        }
    }
}

/// Renders `blocks` as one statement stack, each nested in the previous
/// block's `<next>`, with `tail` as the innermost successor.
pub fn chain(blocks: &[BlockXml], tail: Option<String>) -> Option<String> {
    if blocks.is_empty() {
        return tail;
    }
    let mut out = String::new();
    for (index, block) in blocks.iter().enumerate() {
        if index > 0 {
            out.push_str("<next>");
        }
        block.render_open(&mut out);
    }
    if let Some(tail) = tail {
        out.push_str("<next>");
        out.push_str(&tail);
        out.push_str("</next>");
    }
    for index in (0..blocks.len()).rev() {
        out.push_str("</block>");
        if index > 0 {
            out.push_str("</next>");
        }
    }
    Some(out)
}

pub fn variables<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let body = entries
        .into_iter()
        .map(|(name, id)| {
            format!(
                "<variable id=\"{}\">{}</variable>",
                encode_text(id),
                encode_text(name)
            )
        })
        .collect::<String>();
    if body.is_empty() {
        return body;
    }
    format!("<variables>{}</variables>", body)
}

pub fn document(variables: &str, body: &str) -> String {
    format!("<xml xmlns=\"{}\">{}{}</xml>", BLOCKLY_XMLNS, variables, body)
}
