use anyhow::{anyhow, Result};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;

/// Accepted header spellings for one logical field.
///
/// Broker exports spell accented headers three ways depending on how the file
/// was produced: the correctly accented UTF-8 form, a plain ASCII
/// transliteration, and the Latin-1-read-as-UTF-8 mojibake form. The variant
/// list is ordered; the first spelling present in the file wins.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub logical: String,
    pub variants: Vec<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ColumnSpec {
    pub fn required(logical: &str, variants: &[&str]) -> Self {
        ColumnSpec {
            logical: logical.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
            required: true,
        }
    }

    pub fn optional(logical: &str, variants: &[&str]) -> Self {
        ColumnSpec {
            logical: logical.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
            required: false,
        }
    }
}

/// Declarative logical-field to header-variant configuration for one broker
/// format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnTable {
    pub fields: Vec<ColumnSpec>,
}

impl ColumnTable {
    pub fn new(fields: Vec<ColumnSpec>) -> Self {
        ColumnTable { fields }
    }

    /// Bind every logical field to the concrete header present in this file.
    ///
    /// Column identity is file-global, so a missing required column aborts
    /// the whole file rather than individual rows.
    pub fn resolve(&self, headers: &[String]) -> Result<ColumnBindings> {
        let mut bound = HashMap::new();

        for spec in &self.fields {
            let found = spec.variants.iter().find_map(|variant| {
                headers
                    .iter()
                    .position(|h| h.trim() == variant.as_str())
                    .map(|idx| (idx, variant))
            });

            match found {
                Some((idx, variant)) => {
                    debug!("bound column '{}' for field '{}'", variant, spec.logical);
                    bound.insert(spec.logical.clone(), (idx, headers[idx].clone()));
                }
                None if spec.required => {
                    return Err(anyhow!(
                        "required column '{}' not found; accepted headers: {:?}",
                        spec.logical,
                        spec.variants
                    ));
                }
                None => {}
            }
        }

        Ok(ColumnBindings { bound })
    }
}

/// Immutable logical-name to column-index mapping, resolved once per file.
#[derive(Debug, Clone)]
pub struct ColumnBindings {
    bound: HashMap<String, (usize, String)>,
}

impl ColumnBindings {
    pub fn index(&self, logical: &str) -> Result<usize> {
        self.bound
            .get(logical)
            .map(|(idx, _)| *idx)
            .ok_or_else(|| anyhow!("field '{}' is not bound for this file", logical))
    }

    pub fn try_index(&self, logical: &str) -> Option<usize> {
        self.bound.get(logical).map(|(idx, _)| *idx)
    }

    /// The concrete header string the field resolved to.
    pub fn header(&self, logical: &str) -> Option<&str> {
        self.bound.get(logical).map(|(_, header)| header.as_str())
    }

    /// Cell content for a bound field, `None` when the field is unbound or
    /// the row is shorter than the header.
    pub fn cell<'a>(&self, row: &'a [String], logical: &str) -> Option<&'a str> {
        let idx = self.try_index(logical)?;
        row.get(idx).map(|s| s.as_str())
    }
}
