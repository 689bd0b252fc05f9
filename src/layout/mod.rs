pub mod blocks;
pub mod columns;

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use blocks::{is_margin_number, TextBlock};
use columns::Span;

static SPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Tunables for column inference, in OCR pixel units.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Minimum distance between sorted left edges that starts a new column.
    pub gap_threshold: f64,
    /// Slack around a cluster's `x1` range during the first pass.
    pub edge_buffer: f64,
    /// Slack around a column's extent during center-based assignment.
    pub center_buffer: f64,
    /// Number blocks starting right of this are folio numbers.
    pub right_margin: f64,
    /// Number blocks ending left of this are folio numbers.
    pub left_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gap_threshold: 50.0,
            edge_buffer: 20.0,
            center_buffer: 10.0,
            right_margin: 600.0,
            left_margin: 50.0,
        }
    }
}

/// One reading column: its horizontal extent and blocks in top-to-bottom order.
#[derive(Debug, Clone)]
pub struct Column<'a> {
    pub extent: Span,
    pub blocks: Vec<&'a TextBlock>,
}

impl Column<'_> {
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Group a page's blocks into reading columns, left to right.
pub fn infer_columns<'a>(blocks: &'a [TextBlock], config: &LayoutConfig) -> Vec<Column<'a>> {
    let content: Vec<&TextBlock> = blocks
        .iter()
        .filter(|b| !is_margin_number(b, config.right_margin, config.left_margin))
        .collect();
    if content.is_empty() {
        return Vec::new();
    }

    let x1s: Vec<f64> = content.iter().map(|b| b.bbox.x1).collect();
    let clusters = columns::cluster_edges(&x1s, config.gap_threshold);
    let coarse = columns::assign_to_edges(&x1s, &clusters, config.edge_buffer);

    let edges: Vec<(f64, f64)> = content.iter().map(|b| (b.bbox.x1, b.bbox.x2)).collect();
    let mut extents = columns::column_extents(&edges, &coarse, clusters.len());
    if extents.is_empty() {
        debug!("No column extents inferred, using a single page-wide column");
        let start = x1s.iter().copied().fold(f64::INFINITY, f64::min);
        let end = edges.iter().map(|e| e.1).fold(f64::NEG_INFINITY, f64::max);
        extents.push(Span::new(start, end));
    }

    let centers: Vec<f64> = content.iter().map(|b| b.bbox.center_x()).collect();
    let fine = columns::assign_to_extents(&centers, &extents, config.center_buffer);

    let mut result: Vec<Column> = extents
        .into_iter()
        .map(|extent| Column {
            extent,
            blocks: Vec::new(),
        })
        .collect();
    for (block, idx) in content.into_iter().zip(fine) {
        result[idx].blocks.push(block);
    }

    result.retain(|c| !c.blocks.is_empty());
    for column in &mut result {
        column.blocks.sort_by(|a, b| {
            a.bbox
                .y1
                .total_cmp(&b.bbox.y1)
                .then(a.bbox.x1.total_cmp(&b.bbox.x1))
        });
    }

    debug!("Inferred {} columns from {} blocks", result.len(), blocks.len());
    result
}

/// Linear reading-order text for one page: blocks joined by newlines inside a
/// column, columns joined by a blank line. Empty pages yield an empty string.
pub fn reconstruct_page(blocks: &[TextBlock], config: &LayoutConfig) -> String {
    infer_columns(blocks, config)
        .iter()
        .map(Column::text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Cache-ready page text: collapse runs of spaces and drop whitespace-only lines.
pub fn normalize_page_text(text: &str) -> String {
    let collapsed = SPACE_RUN_RE.replace_all(text, " ");
    collapsed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::blocks::{BBox, BlockLabel};
    use super::*;

    fn text(s: &str, x1: f64, y1: f64, x2: f64) -> TextBlock {
        TextBlock::new(s, BBox::new(x1, y1, x2, y1 + 20.0), BlockLabel::Text)
    }

    fn two_column_page() -> Vec<TextBlock> {
        vec![
            text("right 2", 400.0, 300.0, 650.0),
            text("left 1", 60.0, 100.0, 320.0),
            text("right 1", 405.0, 100.0, 640.0),
            text("left 3", 62.0, 500.0, 318.0),
            text("left 2", 75.0, 300.0, 320.0),
        ]
    }

    #[test]
    fn empty_page() {
        assert_eq!(reconstruct_page(&[], &LayoutConfig::default()), "");
    }

    #[test]
    fn single_block() {
        let blocks = vec![text("Fireball", 60.0, 100.0, 300.0)];
        assert_eq!(reconstruct_page(&blocks, &LayoutConfig::default()), "Fireball");
    }

    #[test]
    fn only_folio_numbers() {
        let blocks = vec![TextBlock::new(
            "231",
            BBox::new(640.0, 900.0, 660.0, 915.0),
            BlockLabel::Number,
        )];
        assert!(infer_columns(&blocks, &LayoutConfig::default()).is_empty());
        assert_eq!(reconstruct_page(&blocks, &LayoutConfig::default()), "");
    }

    #[test]
    fn two_disjoint_columns() {
        let blocks = two_column_page();
        let cols = infer_columns(&blocks, &LayoutConfig::default());
        assert_eq!(cols.len(), 2);
        for col in &cols {
            let ys: Vec<f64> = col.blocks.iter().map(|b| b.bbox.y1).collect();
            assert!(ys.windows(2).all(|w| w[0] <= w[1]), "unsorted column: {:?}", ys);
        }
        assert_eq!(
            reconstruct_page(&blocks, &LayoutConfig::default()),
            "left 1\nleft 2\nleft 3\n\nright 1\nright 2"
        );
    }

    #[test]
    fn folio_number_dropped() {
        let mut blocks = two_column_page();
        blocks.push(TextBlock::new(
            "231",
            BBox::new(640.0, 900.0, 660.0, 915.0),
            BlockLabel::Number,
        ));
        let out = reconstruct_page(&blocks, &LayoutConfig::default());
        assert!(!out.contains("231"));
    }

    #[test]
    fn straddling_block_goes_by_center() {
        // Starts in the gutter, so it seeds its own x1 cluster; its center lands
        // in the right-hand text, and the right column folds into that extent.
        let mut blocks = two_column_page();
        blocks.push(text("wide caption", 300.0, 700.0, 660.0));
        let cols = infer_columns(&blocks, &LayoutConfig::default());
        assert_eq!(cols.len(), 2);
        assert!(cols[1].blocks.iter().any(|b| b.text == "wide caption"));
    }

    #[test]
    fn equal_height_tiebreak_on_x() {
        let blocks = vec![text("b", 90.0, 100.0, 200.0), text("a", 60.0, 100.0, 80.0)];
        assert_eq!(reconstruct_page(&blocks, &LayoutConfig::default()), "a\nb");
    }

    #[test]
    fn page_fixture() {
        let json = std::fs::read_to_string("tests/fixtures/phb_page.json").unwrap();
        let blocks = blocks::parse_page_json(&json).unwrap();
        let text = reconstruct_page(&blocks, &LayoutConfig::default());
        let fireball = text.find("Fireball").unwrap();
        let flame_arrow = text.find("Flame Arrow").unwrap();
        assert!(fireball < flame_arrow, "left column must come first:\n{}", text);
        assert!(!text.contains("231"), "folio leaked:\n{}", text);
        assert!(!text.contains("CHAPTER 11"), "aside text leaked:\n{}", text);
    }

    #[test]
    fn normalize_collapses_spaces_and_blank_lines() {
        let raw = "Fireball  Evocation\n\n   \nLevel:   Sor/Wiz 3\n\nComponents: V, S, M";
        assert_eq!(
            normalize_page_text(raw),
            "Fireball Evocation\nLevel: Sor/Wiz 3\nComponents: V, S, M"
        );
    }
}
