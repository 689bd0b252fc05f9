use std::fmt;

use serde::Serialize;

/// A parsed optional field. `value` is cleaned when its sub-grammar matched,
/// raw otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpellRecord {
    pub name: String,
    pub school: String,
    pub level_string: String,
    pub fields: Vec<FieldEntry>,
    pub description: String,
}

impl SpellRecord {
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("## {}\n{}\n**Level:** {}\n", self.name, self.school, self.level_string);
        for field in &self.fields {
            out.push_str(&format!("**{}:** {}\n", field.label, field.value));
        }
        out.push_str(self.description.trim_end());
        out
    }
}

/// An optional field whose label was found but whose content did not fit
/// that field's grammar. The record keeps the raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldWarning {
    pub field: &'static str,
    pub raw: String,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value: {:?}", self.field, self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSpell {
    pub record: SpellRecord,
    pub warnings: Vec<FieldWarning>,
}
