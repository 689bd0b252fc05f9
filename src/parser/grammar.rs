//! Per-field sub-grammars. Each matcher returns the clean field value plus
//! whatever trails it, which callers may claim as the spell description.

use std::sync::LazyLock;

use regex::Regex;

use super::tables::DESCRIPTION_OPENERS;

static SPELL_RESISTANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let yes_no = r"(?:yes|no)(?:\s*\(\s*(?:harmless\s*,\s*object|harmless|object)\s*\))?";
    Regex::new(&format!(
        r"(?i)^(?P<value>(?:{yes_no}(?:\s*(?:or|and)\s*{yes_no})*|see\s+text)(?:\s*;\s*see\s+text)?)(?:$|[\s.;]|\b)"
    ))
    .unwrap()
});

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:\d+|one)\s+\w+\.?(?:/level)?(?:\s*(?:\(D\)|\(D\b|D\)))?|\w+)(?:\s+or\s+(?:\d+|one)\s+\w+(?:\.\w+)?(?:/level)?(?:\s*\(.*?\))?)?",
    )
    .unwrap()
});

static COMPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s,.]*(F\s*[/.]?\s*DF|DF|XP|[VSMF])").unwrap()
});

static SENTENCE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.;?!](\s+)[A-Z]").unwrap());

static OPENER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:{})\b", DESCRIPTION_OPENERS.join("|"))).unwrap()
});

static SAVING_THROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    let save = r"(?:fortitude|reflex|will)\s+(?:negates|half|partial|reduces|none)(?:\s*\(.*?\))?";
    Regex::new(&format!(
        r"(?i)^(?P<value>none|{save}(?:\s*(?:or|and)\s*{save})*(?:\s*;\s*see\s+text(?:\s+for\s+\w+(?:\s+\w+)*)?)?)\s+(?:{})\b",
        DESCRIPTION_OPENERS.join("|")
    ))
    .unwrap()
});

/// A field value split into its grammatical prefix and the unparsed tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub value: String,
    pub rest: String,
}

impl Split {
    fn at(text: &str, end: usize) -> Self {
        Self {
            value: text[..end].trim().to_string(),
            rest: text[end..].trim().to_string(),
        }
    }
}

/// `Yes`/`No` with optional `(harmless)`/`(object)` qualifiers, chained with
/// `or`/`and`, or `See text`; an optional `; See text` suffix stays in the value.
pub fn spell_resistance(text: &str) -> Option<Split> {
    let caps = SPELL_RESISTANCE_RE.captures(text)?;
    let value = caps.name("value")?;
    Some(Split::at(text, value.end()))
}

/// `{n|One} {unit}[/level][ (D)]` or a single word such as `Instantaneous`,
/// optionally followed by an `or {n|One} {unit}...` alternative.
pub fn duration(text: &str) -> Option<Split> {
    let m = DURATION_RE.find(text)?;
    Some(Split::at(text, m.end()))
}

/// Component letters (`V`, `S`, `M`, `F`, `DF`, `F/DF`, `XP`), canonicalised
/// and joined with `", "`. `None` when not a single token matches.
pub fn components(text: &str) -> Option<Split> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let Some(caps) = COMPONENT_RE.captures(&text[pos..]) else {
            break;
        };
        let token: String = caps[1]
            .to_uppercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.')
            .collect();
        tokens.push(if token == "FDF" { "F/DF".to_string() } else { token });
        pos += caps[0].len();
    }
    if tokens.is_empty() {
        return None;
    }
    Some(Split {
        value: tokens.join(", "),
        rest: text[pos..].trim().to_string(),
    })
}

/// Split a target line from prose that ran into it: the first sentence break
/// followed by a typical description opener. Without one the whole text is
/// the target.
pub fn split_target(text: &str) -> Split {
    for caps in SENTENCE_BREAK_RE.captures_iter(text) {
        let Some(gap) = caps.get(1) else { continue };
        let remainder = &text[gap.end()..];
        if OPENER_RE.is_match(remainder) {
            return Split::at(text, gap.start());
        }
    }
    Split {
        value: text.trim().to_string(),
        rest: String::new(),
    }
}

/// `None` or `{Fortitude|Reflex|Will} {negates|half|...}` chains, with an
/// optional `; see text [for ...]` suffix. Only accepted when a description
/// opener follows, which anchors where the value ends.
pub fn saving_throw(text: &str) -> Option<Split> {
    let caps = SAVING_THROW_RE.captures(text)?;
    let value = caps.name("value")?;
    Some(Split::at(text, value.end()))
}
