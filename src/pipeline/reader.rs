//! Table reader: recover tabular regions from a PDF, page by page.
//!
//! PDFs carry no table structure, only positioned text. Each page's content
//! stream is replayed to rebuild text lines: text shown on a new baseline
//! starts a new line, and every run is laid out at the character column
//! matching its x position, so cells of one column line up across lines.
//! Lines are then split into cells on tabs or runs of two or more spaces,
//! and consecutive multi-cell lines form a region.
//!
//! Within a region the widest line defines the column bands. A shorter line
//! has its cells placed by position, so an empty cell in the middle of a
//! row stays an empty cell instead of shifting its neighbours left.
//!
//! lopdf's own plain-text extraction is kept as a second candidate per page;
//! whichever candidate yields more multi-cell lines wins.
//!
//! Parsing is CPU-bound and synchronous; the orchestrator runs it inside
//! `spawn_blocking`.

use crate::table::{Cell, RawTable};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Horizontal gap, in font-size units, above which two text runs on the
/// same baseline belong to different cells.
const CELL_GAP_EM: f32 = 1.0;

/// Rough glyph advance, in font-size units, used to estimate where a text
/// run ends. Font metrics are not consulted.
const APPROX_GLYPH_EM: f32 = 0.5;

/// Upper bound on the character column a text run is laid out at.
const MAX_LINE_COLUMNS: usize = 2000;

/// A loaded PDF ready for table detection.
pub struct TableReader {
    document: Document,
    min_columns: usize,
}

impl TableReader {
    /// Parse a PDF held in memory.
    pub fn from_bytes(bytes: &[u8], min_columns: usize) -> Result<Self, lopdf::Error> {
        let document = Document::load_mem(bytes)?;
        Ok(Self {
            document,
            min_columns: min_columns.max(1),
        })
    }

    /// Parse a PDF from disk.
    pub fn open(path: &Path, min_columns: usize) -> Result<Self, lopdf::Error> {
        let document = Document::load(path)?;
        Ok(Self {
            document,
            min_columns: min_columns.max(1),
        })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Lazily yield every region: pages in document order, regions within a
    /// page in detection order. A page whose text cannot be recovered
    /// contributes nothing.
    pub fn tables(&self) -> impl Iterator<Item = RawTable> + '_ {
        self.document
            .get_pages()
            .into_iter()
            .flat_map(move |(page_no, page_id)| self.page_tables(page_no, page_id))
    }

    fn page_tables(&self, page_no: u32, page_id: ObjectId) -> Vec<RawTable> {
        let mut candidates = Vec::new();
        if let Some(text) = content_stream_text(&self.document, page_id) {
            candidates.push(text);
        }
        match self.document.extract_text(&[page_no]) {
            Ok(text) if !text.trim().is_empty() => candidates.push(text),
            Ok(_) => {}
            Err(e) => debug!("Page {}: plain-text extraction failed: {}", page_no, e),
        }

        if candidates.is_empty() {
            warn!("Page {}: no text could be recovered", page_no);
            return Vec::new();
        }

        let text = choose_best_text(candidates, self.min_columns);
        let tables = detect_regions(page_no, &text, self.min_columns);
        debug!("Page {}: {} table region(s)", page_no, tables.len());
        tables
    }
}

/// A cell's text and the character columns it covers within its line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextSpan {
    fn overlap(&self, other: &TextSpan) -> usize {
        self.end.min(other.end).saturating_sub(self.start.max(other.start))
    }

    fn gap(&self, other: &TextSpan) -> usize {
        if self.end <= other.start {
            other.start - self.end
        } else if other.end <= self.start {
            self.start - other.end
        } else {
            0
        }
    }
}

/// Split a text line into positioned cells on tabs or runs of two or more
/// whitespace characters. Single spaces stay inside a cell. Positions are
/// character offsets into the untrimmed line.
pub fn split_line_into_spans(line: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut current: Option<TextSpan> = None;
    let mut pending_space = false;

    for (col, ch) in line.chars().enumerate() {
        if ch == '\t' || (ch.is_whitespace() && pending_space) {
            spans.extend(current.take());
            pending_space = false;
            continue;
        }
        if ch.is_whitespace() {
            pending_space = current.is_some();
            continue;
        }

        let span = current.get_or_insert_with(|| TextSpan {
            start: col,
            end: col,
            text: String::new(),
        });
        if pending_space {
            span.text.push(' ');
            pending_space = false;
        }
        span.text.push(ch);
        span.end = col + 1;
    }
    spans.extend(current);

    spans
}

/// Split a text line into cell texts. See [`split_line_into_spans`].
pub fn split_line_into_cells(line: &str) -> Vec<String> {
    split_line_into_spans(line)
        .into_iter()
        .map(|span| span.text)
        .collect()
}

/// Turn the lines of one region into rows.
///
/// The first widest line defines the column bands. A line with as many
/// cells as there are bands (or more) is taken positionally; a shorter line
/// places each cell in the band it overlaps most, or failing that the
/// nearest one, keeping left-to-right order. Bands left empty are
/// [`Cell::Missing`].
fn align_rows(lines: &[Vec<TextSpan>]) -> Vec<Vec<Cell>> {
    let width = lines.iter().map(Vec::len).max().unwrap_or(0);
    let Some(bands) = lines.iter().find(|line| line.len() == width) else {
        return Vec::new();
    };

    lines
        .iter()
        .map(|spans| {
            if spans.len() >= bands.len() {
                spans.iter().map(|span| Cell::parse(&span.text)).collect()
            } else {
                assign_to_bands(spans, bands)
            }
        })
        .collect()
}

fn assign_to_bands(spans: &[TextSpan], bands: &[TextSpan]) -> Vec<Cell> {
    let mut row = vec![Cell::Missing; bands.len()];
    let mut next = 0;
    for (i, span) in spans.iter().enumerate() {
        // Leave one band for each remaining span.
        let last = bands.len() - (spans.len() - i - 1);
        let band = (next..last)
            .min_by_key(|&b| (span.gap(&bands[b]), std::cmp::Reverse(span.overlap(&bands[b]))))
            .unwrap_or(next);
        row[band] = Cell::parse(&span.text);
        next = band + 1;
    }
    row
}

/// Group consecutive lines with at least `min_columns` cells into regions.
pub fn detect_regions(page: u32, text: &str, min_columns: usize) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<TextSpan>> = Vec::new();

    let flush = |lines: &mut Vec<Vec<TextSpan>>, tables: &mut Vec<RawTable>| {
        let rows = align_rows(&std::mem::take(lines));
        if let Some(table) = RawTable::new(page, tables.len(), rows) {
            tables.push(table);
        }
    };

    for line in text.lines() {
        let spans = split_line_into_spans(line);
        if spans.len() >= min_columns.max(1) {
            current.push(spans);
        } else {
            flush(&mut current, &mut tables);
        }
    }
    flush(&mut current, &mut tables);

    tables
}

fn multi_cell_lines(text: &str, min_columns: usize) -> usize {
    text.lines()
        .filter(|line| split_line_into_cells(line).len() >= min_columns.max(2))
        .count()
}

fn choose_best_text(candidates: Vec<String>, min_columns: usize) -> String {
    let mut best: Option<(usize, String)> = None;
    for text in candidates {
        let score = multi_cell_lines(&text, min_columns);
        // Earlier candidates win ties.
        if best.as_ref().is_none_or(|(top, _)| score > *top) {
            best = Some((score, text));
        }
    }
    best.map(|(_, text)| text).unwrap_or_default()
}

// ── Content-stream replay ────────────────────────────────────────────────

/// Rebuilds text lines from positioned text-showing operators.
#[derive(Debug)]
struct LineAssembler {
    /// Start of the current text line (line matrix translation).
    line_x: f32,
    line_y: f32,
    leading: f32,
    font_size: f32,
    /// Horizontal scale from the text matrix.
    text_scale: f32,
    /// Estimated end of the last text run on the current baseline.
    pen_x: f32,
    /// Baseline of the last shown text.
    last_y: Option<f32>,
    /// A positioning operator ran since the last text run.
    moved: bool,
    current: String,
    lines: Vec<String>,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self {
            line_x: 0.0,
            line_y: 0.0,
            leading: 0.0,
            font_size: 12.0,
            text_scale: 1.0,
            pen_x: 0.0,
            last_y: None,
            moved: false,
            current: String::new(),
            lines: Vec::new(),
        }
    }
}

impl LineAssembler {
    fn begin_text(&mut self) {
        self.line_x = 0.0;
        self.line_y = 0.0;
        self.moved = true;
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_x += tx;
        self.line_y += ty;
        self.moved = true;
    }

    fn set_matrix(&mut self, scale: f32, e: f32, f: f32) {
        self.line_x = e;
        self.line_y = f;
        if scale.abs() > f32::EPSILON {
            self.text_scale = scale.abs();
        }
        self.moved = true;
    }

    fn next_line(&mut self) {
        self.line_y -= self.leading;
        self.moved = true;
    }

    fn set_font_size(&mut self, size: f32) {
        if size.abs() > f32::EPSILON {
            self.font_size = size.abs();
        }
    }

    fn em(&self) -> f32 {
        self.font_size * self.text_scale
    }

    /// Character column of a horizontal position, at the approximate glyph
    /// width of the current font.
    fn column_of(&self, x: f32) -> usize {
        let glyph = self.em() * APPROX_GLYPH_EM;
        (x / glyph).round().clamp(0.0, MAX_LINE_COLUMNS as f32) as usize
    }

    fn pad_to(&mut self, column: usize) {
        let width = self.current.chars().count();
        if column > width {
            self.current.push_str(&" ".repeat(column - width));
        }
    }

    fn show(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let same_line = self
            .last_y
            .is_some_and(|prev| (prev - self.line_y).abs() < 1.0);
        if !same_line && self.last_y.is_some() {
            self.flush_line();
        }

        if self.moved || self.last_y.is_none() {
            if same_line {
                let gap = self.line_x - self.pen_x;
                if gap > self.em() * CELL_GAP_EM {
                    let width = self.current.chars().count();
                    self.pad_to(self.column_of(self.line_x).max(width + 2));
                } else if !self.current.ends_with(' ') && !text.starts_with(' ') {
                    self.current.push(' ');
                }
            } else {
                self.pad_to(self.column_of(self.line_x));
            }
            self.pen_x = self.line_x;
        }
        self.pen_x += text.chars().count() as f32 * self.em() * APPROX_GLYPH_EM;
        self.current.push_str(text);
        self.last_y = Some(self.line_y);
        self.moved = false;
    }

    fn flush_line(&mut self) {
        if !self.current.trim().is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }

    fn finish(mut self) -> Option<String> {
        self.flush_line();
        if self.lines.is_empty() {
            None
        } else {
            Some(self.lines.join("\n"))
        }
    }
}

fn number(operand: Option<&Object>) -> Option<f32> {
    match operand? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn decode_operands(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&Document::decode_text(encoding, bytes)),
            Object::Array(items) => decode_operands(text, encoding, items),
            // TJ adjustments are in thousandths of an em; large negative
            // values push the next glyph right.
            Object::Integer(_) | Object::Real(_) => {
                let shift = number(Some(operand)).unwrap_or(0.0);
                if shift <= -1000.0 {
                    text.push_str("  ");
                } else if shift < -100.0 {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn content_stream_text(document: &Document, page_id: ObjectId) -> Option<String> {
    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut layout = LineAssembler::default();
    let mut encoding = None;

    for operation in &content.operations {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "BT" => layout.begin_text(),
            "Tf" => {
                encoding = operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|name| encodings.get(name).copied());
                if let Some(size) = number(operands.get(1)) {
                    layout.set_font_size(size);
                }
            }
            "TL" => {
                if let Some(leading) = number(operands.first()) {
                    layout.leading = leading;
                }
            }
            "Td" | "TD" => {
                let tx = number(operands.first()).unwrap_or(0.0);
                let ty = number(operands.get(1)).unwrap_or(0.0);
                if operation.operator == "TD" {
                    layout.leading = -ty;
                }
                layout.move_line(tx, ty);
            }
            "Tm" => {
                let scale = number(operands.first()).unwrap_or(1.0);
                let e = number(operands.get(4)).unwrap_or(0.0);
                let f = number(operands.get(5)).unwrap_or(0.0);
                layout.set_matrix(scale, e, f);
            }
            "T*" => layout.next_line(),
            "Tj" | "TJ" => {
                let mut text = String::new();
                decode_operands(&mut text, encoding, operands);
                layout.show(&text);
            }
            "'" => {
                layout.next_line();
                let mut text = String::new();
                decode_operands(&mut text, encoding, operands);
                layout.show(&text);
            }
            "\"" => {
                layout.next_line();
                let mut text = String::new();
                decode_operands(&mut text, encoding, operands.get(2..).unwrap_or(&[]));
                layout.show(&text);
            }
            _ => {}
        }
    }

    layout.finish()
}
