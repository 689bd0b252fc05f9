pub mod boundary;
pub mod fields;
pub mod grammar;
pub mod record;
pub mod school;
pub mod spell;
pub mod tables;

use crate::db::{FailureRow, SpellRow};
use record::ParsedSpell;
use spell::ParseError;

pub const BLOCK_SEPARATOR: &str = "\n---\n";

pub enum BlockOutcome {
    Spell(SpellRow),
    Failure(FailureRow),
}

pub struct ProcessedBlock {
    pub outcome: BlockOutcome,
    pub markdown: String,
    pub warning_count: usize,
}

/// Parse one block into a storable row plus its markdown rendering.
pub fn process_block(source: &str, block_index: usize, block: &str) -> ProcessedBlock {
    match spell::parse_spell_block(block) {
        Ok(parsed) => {
            let markdown = parsed.record.to_markdown();
            let warning_count = parsed.warnings.len();
            ProcessedBlock {
                outcome: BlockOutcome::Spell(build_spell_row(source, block_index, parsed)),
                markdown,
                warning_count,
            }
        }
        Err(err) => {
            tracing::warn!("Block {} of {}: {}", block_index, source, err);
            ProcessedBlock {
                markdown: err.raw().to_string(),
                outcome: BlockOutcome::Failure(build_failure_row(source, block_index, &err)),
                warning_count: 0,
            }
        }
    }
}

fn build_spell_row(source: &str, block_index: usize, parsed: ParsedSpell) -> SpellRow {
    let ParsedSpell { record, warnings } = parsed;
    let field = |label: &str| record.field(label).map(str::to_string);
    let parts = school::split_school(&record.school);

    let warnings = if warnings.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&warnings).unwrap_or_default())
    };
    let descriptors = if parts.descriptors.is_empty() {
        None
    } else {
        Some(parts.descriptors.join(", "))
    };

    SpellRow {
        source: source.to_string(),
        block_index: block_index as i64,
        school_base: parts.base,
        subschool: parts.subschool,
        descriptors,
        components: field("Components"),
        casting_time: field("Casting Time"),
        range_text: field("Range"),
        area: field("Area"),
        effect: field("Effect"),
        target: field("Target"),
        targets: field("Targets"),
        duration: field("Duration"),
        saving_throw: field("Saving Throw"),
        spell_resistance: field("Spell Resistance"),
        warnings,
        name: record.name,
        school: record.school,
        level: record.level_string,
        description: record.description,
    }
}

fn build_failure_row(source: &str, block_index: usize, err: &ParseError) -> FailureRow {
    FailureRow {
        source: source.to_string(),
        block_index: block_index as i64,
        kind: err.kind().to_string(),
        name: Some(err.name().to_string()).filter(|n| !n.is_empty()),
        raw: err.raw().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary::{split_blocks, DEFAULT_DELIMITER};

    #[test]
    fn spell_row_fields() {
        let block = "Charm Person Enchantment (Charm) [Mind-Affecting] Level Brd 1, Sor/Wiz 1 \
            Components V, S Casting Time 1 standard action Range Close Target One humanoid creature \
            Duration 1 hour/level Saving Throw Will negates Spell Resistance Yes \
            This charm makes a humanoid creature regard you as its trusted friend.";
        let processed = process_block("phb.txt", 3, block);
        let BlockOutcome::Spell(row) = processed.outcome else {
            panic!("expected a spell row");
        };
        assert_eq!(row.name, "Charm Person");
        assert_eq!(row.block_index, 3);
        assert_eq!(row.school_base, "Enchantment");
        assert_eq!(row.subschool.as_deref(), Some("Charm"));
        assert_eq!(row.descriptors.as_deref(), Some("Mind-Affecting"));
        assert_eq!(row.level, "Brd 1, Sor/Wiz 1");
        assert_eq!(row.target.as_deref(), Some("One humanoid creature"));
        assert_eq!(row.targets, None);
        assert_eq!(row.area, None);
        assert_eq!(row.warnings, None);
        assert!(processed.markdown.starts_with("## Charm Person\n"));
    }

    #[test]
    fn warnings_serialised() {
        let block = "Fireball Evocation Level Sor/Wiz 3 Components V, S, M Spell Resistance Maybe";
        let processed = process_block("phb.txt", 0, block);
        assert_eq!(processed.warning_count, 1);
        let BlockOutcome::Spell(row) = processed.outcome else {
            panic!("expected a spell row");
        };
        let warnings: serde_json::Value = serde_json::from_str(row.warnings.as_deref().unwrap()).unwrap();
        assert_eq!(warnings[0]["field"], "Spell Resistance");
        assert_eq!(warnings[0]["raw"], "Maybe");
    }

    #[test]
    fn failure_row_keeps_raw_text() {
        let processed = process_block("phb.txt", 7, "Fireball Evocation\nComponents V, S, M");
        let BlockOutcome::Failure(row) = processed.outcome else {
            panic!("expected a failure row");
        };
        assert_eq!(row.kind, "missing_level");
        assert_eq!(row.name.as_deref(), Some("Fireball"));
        assert_eq!(row.raw, "Fireball Evocation Components V, S, M");
        assert_eq!(processed.markdown, row.raw);
    }

    #[test]
    fn spells_fixture() {
        let buffer = std::fs::read_to_string("tests/fixtures/spells.txt").unwrap();
        let processed: Vec<_> = split_blocks(&buffer, DEFAULT_DELIMITER)
            .iter()
            .enumerate()
            .map(|(i, b)| process_block("spells.txt", i, b))
            .collect();
        let names: Vec<&str> = processed
            .iter()
            .filter_map(|p| match &p.outcome {
                BlockOutcome::Spell(row) => Some(row.name.as_str()),
                BlockOutcome::Failure(_) => None,
            })
            .collect();
        assert!(names.contains(&"Fireball"));
        assert!(names.contains(&"Flaming Sphere"));
        assert!(processed
            .iter()
            .any(|p| matches!(&p.outcome, BlockOutcome::Failure(f) if f.kind == "missing_level")));
    }
}
