use super::tables::OPTIONAL_LABELS;

/// A label and the raw text between it and the next surviving label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellField {
    pub label: &'static str,
    pub offset: usize,
    pub content: String,
}

/// First occurrence of every optional label, in label-table order.
pub fn locate_labels(text: &str) -> Vec<(&'static str, usize)> {
    OPTIONAL_LABELS
        .iter()
        .filter_map(|&label| text.find(label).map(|offset| (label, offset)))
        .collect()
}

/// Drop every label that sits after the label following it in table order.
/// The comparison is pairwise against the immediate successor only, so a
/// label that is locally ordered but globally misplaced survives. The last
/// label is always kept.
pub fn repair_order(found: &[(&'static str, usize)]) -> Vec<(&'static str, usize)> {
    let Some(last) = found.last() else {
        return Vec::new();
    };
    let mut kept: Vec<(&'static str, usize)> = found
        .windows(2)
        .filter(|pair| pair[0].1 <= pair[1].1)
        .map(|pair| pair[0])
        .collect();
    kept.push(*last);
    kept
}

/// Cut `text` into label-anchored fields. A field runs from the end of its
/// label to the offset of the next surviving label, or the end of the text.
/// A colon after the label is not part of the content. Fields come back in
/// text order; labels sharing an offset keep table order.
pub fn segment(text: &str) -> Vec<SpellField> {
    let labels = repair_order(&locate_labels(text));
    let mut fields: Vec<SpellField> = labels
        .iter()
        .enumerate()
        .map(|(i, &(label, offset))| {
            let start = offset + label.len();
            let end = labels.get(i + 1).map_or(text.len(), |next| next.1);
            let content = if start < end {
                text[start..end].trim_start_matches([' ', ':']).trim_end()
            } else {
                ""
            };
            SpellField {
                label,
                offset,
                content: content.to_string(),
            }
        })
        .collect();
    fields.sort_by_key(|f| f.offset);
    fields
}
