use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// `Base`, then an optional `(Subschool)`, then any number of `[A, B]` groups.
static SCHOOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<base>[^(\[]+?)\s*(?:\((?P<sub>[^)]*)\))?\s*(?P<tags>(?:\[[^\]]*\]\s*)*)\**$").unwrap()
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").unwrap());

const SUBSCHOOLS: &[(&str, &[&str])] = &[
    ("Conjuration", &["Calling", "Creation", "Healing", "Summoning", "Teleportation"]),
    ("Divination", &["Scrying"]),
    ("Enchantment", &["Charm", "Compulsion"]),
    ("Illusion", &["Figment", "Glamer", "Pattern", "Phantasm", "Shadow"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchoolParts {
    pub base: String,
    pub subschool: Option<String>,
    pub descriptors: Vec<String>,
}

fn is_subschool(base: &str, candidate: &str) -> bool {
    SUBSCHOOLS.iter().any(|(school, subs)| {
        base.split('/').any(|b| b.trim() == *school)
            && subs.iter().any(|s| s.eq_ignore_ascii_case(candidate))
    })
}

/// Split a verbatim school string such as `Enchantment (Charm) [Mind-Affecting]`.
/// A bracketed group that names a known subschool is taken as the subschool
/// when no parenthesised one was given. Unrecognised layouts keep the whole
/// string as the base.
pub fn split_school(school: &str) -> SchoolParts {
    let school = school.trim();
    let Some(caps) = SCHOOL_RE.captures(school) else {
        return SchoolParts {
            base: school.to_string(),
            ..Default::default()
        };
    };
    let base = caps["base"].trim().to_string();
    let mut subschool = caps
        .name("sub")
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    let mut descriptors = Vec::new();
    let tags = caps.name("tags").map_or("", |m| m.as_str());
    for group in TAG_RE.captures_iter(tags) {
        let inner = group[1].trim();
        if subschool.is_none() && descriptors.is_empty() && is_subschool(&base, inner) {
            subschool = Some(inner.to_string());
            continue;
        }
        descriptors.extend(
            inner
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        );
    }

    SchoolParts {
        base,
        subschool,
        descriptors,
    }
}
