use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use super::fields::{segment, SpellField};
use super::grammar::{self, Split};
use super::record::{FieldEntry, FieldWarning, ParsedSpell, SpellRecord};
use super::tables::{CLAIM_ORDER, LEVEL_LABEL, LEVEL_STOP, LEVEL_TOKENS, SCHOOLS};

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static LEVEL_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d+)").unwrap());

/// A block that cannot be turned into a record. `raw` is the block text after
/// whitespace normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{name}: no Level label")]
    MissingLevel { name: String, raw: String },
    #[error("{name}: no class or domain levels after Level label")]
    NoLevels { name: String, raw: String },
}

impl ParseError {
    pub fn name(&self) -> &str {
        match self {
            Self::MissingLevel { name, .. }
            | Self::NoLevels { name, .. } => name,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Self::MissingLevel { raw, .. }
            | Self::NoLevels { raw, .. } => raw,
        }
    }

    /// Stable identifier stored alongside failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingLevel { .. } => "missing_level",
            Self::NoLevels { .. } => "no_levels",
        }
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Earliest school name in `text`, with its offset.
fn find_school(text: &str) -> Option<(usize, &'static str)> {
    SCHOOLS
        .iter()
        .filter_map(|&school| text.find(school).map(|pos| (pos, school)))
        .min_by_key(|&(pos, _)| pos)
}

/// Consume `{token} {number}` pairs from the front of `text`. Returns the
/// levels and the unconsumed remainder.
fn parse_levels(text: &str) -> (Vec<String>, &str) {
    let mut levels = Vec::new();
    let mut rest = text;
    loop {
        if rest.starts_with(LEVEL_STOP) {
            break;
        }
        let candidate = rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'));
        let Some(token) = LEVEL_TOKENS.iter().find(|t| candidate.starts_with(**t)) else {
            break;
        };
        let after_token = &candidate[token.len()..];
        let Some(caps) = LEVEL_NUMBER_RE.captures(after_token) else {
            break;
        };
        levels.push(format!("{} {}", token, &caps[1]));
        rest = &after_token[caps[0].len()..];
    }
    (levels, rest)
}

/// Per-field cleaning state while the claim chain runs.
struct Slot<'a> {
    field: &'a SpellField,
    value: String,
}

/// Run one field's sub-grammar. `None` from the matcher keeps the raw content
/// and records a warning.
fn apply(
    slot: &mut Slot,
    matcher: fn(&str) -> Option<Split>,
    description: &mut Option<String>,
    warnings: &mut Vec<FieldWarning>,
) {
    match matcher(&slot.field.content) {
        Some(split) => {
            slot.value = split.value;
            claim(description, split.rest);
        }
        None => warnings.push(FieldWarning {
            field: slot.field.label,
            raw: slot.field.content.clone(),
        }),
    }
}

fn claim(description: &mut Option<String>, rest: String) {
    if description.is_none() && !rest.is_empty() {
        *description = Some(rest);
    }
}

/// Parse one delimiter-bound spell block.
pub fn parse_spell_block(block: &str) -> Result<ParsedSpell, ParseError> {
    let text = normalize_whitespace(block);

    // Without a school the first token stands in for the name and parsing
    // continues; only the level anchor decides whether the block fails.
    let (name, after_name) = match find_school(&text) {
        Some((school_pos, school)) => {
            let name = text[..school_pos].trim().to_string();
            debug!("{}: school {}", name, school);
            (name, &text[school_pos..])
        }
        None => {
            let name = text.split(' ').next().unwrap_or_default().to_string();
            warn!("No school name in block starting {:?}; using first token as name", name);
            let after_name = &text[name.len()..];
            (name, after_name)
        }
    };
    let Some(level_pos) = after_name.find(LEVEL_LABEL) else {
        return Err(ParseError::MissingLevel { name, raw: text });
    };
    let school_string = after_name[..level_pos].trim().to_string();

    let (levels, remainder) = parse_levels(&after_name[level_pos + LEVEL_LABEL.len()..]);
    if levels.is_empty() {
        return Err(ParseError::NoLevels { name, raw: text });
    }

    let fields = segment(remainder);
    let mut slots: Vec<Slot> = fields
        .iter()
        .map(|field| Slot {
            field,
            value: field.content.clone(),
        })
        .collect();

    let mut description: Option<String> = None;
    let mut warnings = Vec::new();
    for &label in CLAIM_ORDER {
        let Some(slot) = slots.iter_mut().find(|s| s.field.label == label) else {
            continue;
        };
        match label {
            "Spell Resistance" => apply(slot, grammar::spell_resistance, &mut description, &mut warnings),
            "Duration" => apply(slot, grammar::duration, &mut description, &mut warnings),
            "Components" => apply(slot, grammar::components, &mut description, &mut warnings),
            "Targets" | "Target" if description.is_none() => {
                let split = grammar::split_target(&slot.field.content);
                slot.value = split.value;
                claim(&mut description, split.rest);
            }
            "Saving Throw" if description.is_none() => {
                apply(slot, grammar::saving_throw, &mut description, &mut warnings)
            }
            _ => {}
        }
    }

    let description = description.unwrap_or_else(|| remainder.trim().to_string());

    for warning in &warnings {
        warn!("{}: {}", name, warning);
    }

    let fields = slots
        .into_iter()
        .filter(|s| !s.value.is_empty())
        .map(|s| FieldEntry {
            label: s.field.label,
            value: s.value,
        })
        .collect();

    Ok(ParsedSpell {
        record: SpellRecord {
            name,
            school: school_string,
            level_string: levels.join(", "),
            fields,
            description,
        },
        warnings,
    })
}
