//! Paginated document export.
//!
//! Layout is computed up front by [`plan_pages`] so pagination can be
//! reasoned about without rendering. Cell text wraps onto as many lines as
//! it needs and each row is as tall as its tallest cell; pages are filled
//! by height. Rendering then walks the plan page by page: centered title,
//! shaded header row, body rows, "Page X of Y".

use std::ops::Range;

use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};

use super::{ExportError, ExportOptions};
use crate::result::TabularResult;

const MARGIN_MM: f32 = 12.0;
const TITLE_BAND_MM: f32 = 14.0;
const FOOTER_BAND_MM: f32 = 10.0;
const LINE_HEIGHT_MM: f32 = 3.7;
/// Vertical padding inside a row, split above and below the text.
const ROW_PADDING_MM: f32 = 2.8;
const CELL_PADDING_MM: f32 = 1.5;
const TITLE_SIZE: f32 = 14.0;
const TEXT_SIZE: f32 = 8.0;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH_EM: f32 = 0.5;
const PT_TO_MM: f32 = 0.352_778;

/// Computed geometry for one export.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub column_width: f32,
    /// Characters per wrapped line inside one cell.
    pub line_chars: usize,
    /// Wrapped line count of the header row.
    pub header_lines: usize,
    /// Wrapped line count of each data row.
    pub row_lines: Vec<usize>,
    /// Data rows on each page. Always at least one page.
    pub pages: Vec<Range<usize>>,
}

impl PageLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Height available for data rows below the header on every page.
    pub fn body_height(&self) -> f32 {
        self.page_height
            - 2.0 * MARGIN_MM
            - TITLE_BAND_MM
            - FOOTER_BAND_MM
            - row_height(self.header_lines)
    }
}

pub fn row_height(lines: usize) -> f32 {
    lines.max(1) as f32 * LINE_HEIGHT_MM + ROW_PADDING_MM
}

fn line_chars(column_width: f32) -> usize {
    let usable = (column_width - 2.0 * CELL_PADDING_MM).max(0.0);
    ((usable / (TEXT_SIZE * GLYPH_WIDTH_EM * PT_TO_MM)) as usize).max(1)
}

/// Break `text` into lines of at most `width` characters.
///
/// Breaks at whitespace; a word longer than a line is split across lines.
/// Never drops characters other than the whitespace it breaks on. Always
/// returns at least one (possibly empty) line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut len = 0;
        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            let sep = usize::from(len > 0);
            if len + sep + chars.len() <= width {
                if sep == 1 {
                    line.push(' ');
                }
                line.extend(&chars);
                len += sep + chars.len();
                continue;
            }
            if len > 0 {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            for chunk in chars.chunks(width) {
                if chunk.len() == width {
                    lines.push(chunk.iter().collect());
                } else {
                    line = chunk.iter().collect();
                    len = chunk.len();
                }
            }
        }
        if len > 0 {
            lines.push(line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn cell_texts(values: &[crate::result::CellValue]) -> Vec<String> {
    values
        .iter()
        .map(|v| if v.is_null() { String::new() } else { v.to_string() })
        .collect()
}

fn line_count<S: AsRef<str>>(texts: &[S], width: usize) -> usize {
    texts
        .iter()
        .map(|t| wrap(t.as_ref(), width).len())
        .max()
        .unwrap_or(1)
}

/// Measure every row and split them over pages by height.
///
/// Rows are never split; a row taller than a whole page gets a page of its
/// own.
pub fn plan_pages(result: &TabularResult, options: &ExportOptions) -> PageLayout {
    let (page_width, page_height) = options.page_mm();
    let column_width = (page_width - 2.0 * MARGIN_MM) / result.column_count().max(1) as f32;
    let line_chars = line_chars(column_width);
    let header_lines = line_count(result.columns(), line_chars);
    let row_lines: Vec<usize> = result
        .rows()
        .iter()
        .map(|row| line_count(&cell_texts(row), line_chars))
        .collect();

    let mut layout = PageLayout {
        page_width,
        page_height,
        column_width,
        line_chars,
        header_lines,
        row_lines,
        pages: Vec::new(),
    };

    let body = layout.body_height();
    let mut start = 0;
    let mut used = 0.0;
    for (i, lines) in layout.row_lines.iter().enumerate() {
        let height = row_height(*lines);
        if i > start && used + height > body {
            layout.pages.push(start..i);
            start = i;
            used = 0.0;
        }
        used += height;
    }
    if start < layout.row_lines.len() || layout.pages.is_empty() {
        layout.pages.push(start..layout.row_lines.len());
    }
    layout
}

fn text_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH_EM * PT_TO_MM
}

fn pdf_error<E: std::fmt::Debug>(err: E) -> ExportError {
    ExportError::Pdf(format!("{:?}", err))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

pub(super) fn render(
    title: Option<&str>,
    result: &TabularResult,
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let layout = plan_pages(result, options);
    let (doc, first_page, first_layer) = PdfDocument::new(
        title.unwrap_or("Report"),
        Mm(layout.page_width),
        Mm(layout.page_height),
        "Page 1",
    );
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?,
    };

    let total = layout.page_count();
    for (number, rows) in layout.pages.iter().enumerate() {
        let layer = if number == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(
                Mm(layout.page_width),
                Mm(layout.page_height),
                format!("Page {}", number + 1),
            );
            doc.get_page(page).get_layer(layer)
        };
        draw_page(&layer, &layout, &fonts, title, result, rows.clone(), number + 1, total);
    }

    doc.save_to_bytes().map_err(pdf_error)
}

/// Draw one row of wrapped cells whose top edge is at `top`.
fn draw_row<S: AsRef<str>>(
    layer: &PdfLayerReference,
    layout: &PageLayout,
    font: &IndirectFontRef,
    texts: &[S],
    top: f32,
) {
    let first_baseline = top - ROW_PADDING_MM / 2.0 - TEXT_SIZE * PT_TO_MM;
    for (c, text) in texts.iter().enumerate() {
        let x = MARGIN_MM + layout.column_width * c as f32 + CELL_PADDING_MM;
        for (n, line) in wrap(text.as_ref(), layout.line_chars).into_iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let y = first_baseline - LINE_HEIGHT_MM * n as f32;
            layer.use_text(line, TEXT_SIZE, Mm(x), Mm(y), font);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_page(
    layer: &PdfLayerReference,
    layout: &PageLayout,
    fonts: &Fonts,
    title: Option<&str>,
    result: &TabularResult,
    rows: Range<usize>,
    number: usize,
    total: usize,
) {
    let black = Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None));
    let shade = Color::Rgb(Rgb::new(0.85, 0.85, 0.85, None));
    let top = layout.page_height - MARGIN_MM;

    if let Some(title) = title {
        let x = (layout.page_width - text_width_mm(title, TITLE_SIZE)) / 2.0;
        layer.use_text(title, TITLE_SIZE, Mm(x.max(MARGIN_MM)), Mm(top - 8.0), &fonts.bold);
    }

    let header_top = top - TITLE_BAND_MM;
    let header_height = row_height(layout.header_lines);
    let table_right = MARGIN_MM + layout.column_width * result.column_count().max(1) as f32;
    layer.set_fill_color(shade);
    layer.add_rect(
        Rect::new(
            Mm(MARGIN_MM),
            Mm(header_top - header_height),
            Mm(table_right),
            Mm(header_top),
        )
        .with_mode(PaintMode::Fill),
    );
    layer.set_fill_color(black);
    draw_row(layer, layout, &fonts.bold, result.columns(), header_top);

    let mut row_top = header_top - header_height;
    for index in rows {
        draw_row(layer, layout, &fonts.regular, &cell_texts(&result.rows()[index]), row_top);
        row_top -= row_height(layout.row_lines[index]);
    }

    let footer = format!("Page {} of {}", number, total);
    let x = (layout.page_width - text_width_mm(&footer, TEXT_SIZE)) / 2.0;
    layer.use_text(footer, TEXT_SIZE, Mm(x), Mm(MARGIN_MM), &fonts.regular);
}
