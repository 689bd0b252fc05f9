use serde::Deserialize;

/// Pixel-space bounding box as reported by the layout detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center_x(&self) -> f64 {
        (self.x1 + self.x2) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLabel {
    Text,
    ParagraphTitle,
    FigureTitle,
    ListItem,
    Table,
    Number,
}

impl BlockLabel {
    /// Map a layout-detector label onto the content labels we keep.
    /// Anything else (`aside_text`, `image`, `header`, ...) is not page content.
    pub fn from_ocr(label: &str) -> Option<Self> {
        match label {
            "text" => Some(Self::Text),
            "paragraph_title" => Some(Self::ParagraphTitle),
            "figure_title" => Some(Self::FigureTitle),
            "list_item" => Some(Self::ListItem),
            "table" => Some(Self::Table),
            "number" => Some(Self::Number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub text: String,
    pub bbox: BBox,
    pub label: BlockLabel,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, bbox: BBox, label: BlockLabel) -> Self {
        Self {
            text: text.into(),
            bbox,
            label,
        }
    }
}

// ── OCR page envelope (cached `prunedResult` JSON) ──

#[derive(Debug, Deserialize)]
struct OcrPage {
    #[serde(default)]
    parsing_res_list: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(default)]
    block_label: String,
    #[serde(default)]
    block_content: String,
    #[serde(default)]
    block_bbox: Vec<f64>,
}

/// Decode one cached OCR page into content blocks, dropping non-content labels
/// and entries without a four-value bbox.
pub fn parse_page_json(json: &str) -> serde_json::Result<Vec<TextBlock>> {
    let page: OcrPage = serde_json::from_str(json)?;
    let blocks = page
        .parsing_res_list
        .into_iter()
        .filter_map(|raw| {
            let label = BlockLabel::from_ocr(&raw.block_label)?;
            let [x1, y1, x2, y2] = <[f64; 4]>::try_from(raw.block_bbox).ok()?;
            Some(TextBlock::new(raw.block_content, BBox::new(x1, y1, x2, y2), label))
        })
        .collect();
    Ok(blocks)
}

/// Folio numbers sit in the outer page margins; numbers inside the text area
/// (table cells, list counters) are content.
pub fn is_margin_number(block: &TextBlock, right_margin: f64, left_margin: f64) -> bool {
    block.label == BlockLabel::Number
        && (block.bbox.x1 > right_margin || block.bbox.x2 < left_margin)
}
