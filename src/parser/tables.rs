//! Ordered lookup tables that drive the spell grammar. Order is significant
//! wherever a table is scanned first-match-wins.

pub const SCHOOLS: &[&str] = &[
    "Abjuration",
    "Conjuration",
    "Divination",
    "Enchantment",
    "Evocation",
    "Illusion",
    "Necromancy",
    "Transmutation",
    "Universal",
];

/// Class abbreviations and cleric domains that may precede a level number.
/// Alphabetical, except that a token always comes before any shorter token it
/// starts with (`Sor/Wiz` before `Sor`).
pub const LEVEL_TOKENS: &[&str] = &[
    "Air",
    "Animal",
    "Bbn",
    "Brd",
    "Chaos",
    "Clr",
    "Death",
    "Destruction",
    "Drd",
    "Earth",
    "Evil",
    "Fire",
    "Ftr",
    "Good",
    "Healing",
    "Knowledge",
    "Law",
    "Luck",
    "Magic",
    "Mnk",
    "Pal",
    "Plant",
    "Protection",
    "Rgr",
    "Rog",
    "Sor/Wiz",
    "Sor",
    "Strength",
    "Sun",
    "Travel",
    "Trickery",
    "War",
    "Water",
    "Wiz",
];

pub const LEVEL_LABEL: &str = "Level";

/// The label expected right after the level list.
pub const LEVEL_STOP: &str = " Components";

/// Optional field labels in priority order. Order-repair compares each found
/// label against the next found one in this order.
pub const OPTIONAL_LABELS: &[&str] = &[
    "Components",
    "Casting Time",
    "Range",
    "Area",
    "Effect",
    "Target",
    "Targets",
    "Duration",
    "Saving Throw",
    "Spell Resistance",
];

/// Fields checked for trailing description text, first claim wins.
pub const CLAIM_ORDER: &[&str] = &[
    "Spell Resistance",
    "Duration",
    "Components",
    "Targets",
    "Target",
    "Saving Throw",
];

/// Words that typically open a spell's prose description.
pub const DESCRIPTION_OPENERS: &[&str] = &["Mass", "You", "This", "The", "It", "A", "An"];

/// Terms whose presence marks text as a spell entry rather than stray prose.
pub const BLOCK_KEYWORDS: &[&str] = &[
    "Level",
    "Components",
    "Casting Time",
    "Range",
    "Effect",
    "Duration",
    "Target",
    "Targets",
    "Enchantment",
    "Saving Throw",
    "Spell Resistance",
    "Divination",
    "Evocation",
    "Conjuration",
    "Necromancy",
    "Abjuration",
    "Transmutation",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_tokens_longest_prefix_first() {
        for (i, earlier) in LEVEL_TOKENS.iter().enumerate() {
            for later in &LEVEL_TOKENS[i + 1..] {
                assert!(
                    !later.starts_with(earlier),
                    "{} is shadowed by earlier token {}",
                    later,
                    earlier
                );
            }
        }
    }

    #[test]
    fn labels_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for label in OPTIONAL_LABELS {
            assert!(seen.insert(label), "duplicate label {}", label);
        }
    }

    #[test]
    fn claim_order_uses_known_labels() {
        for label in CLAIM_ORDER {
            assert!(OPTIONAL_LABELS.contains(label), "unknown label {}", label);
        }
    }
}
