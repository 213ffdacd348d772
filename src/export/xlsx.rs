use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};

use super::{ExportError, ExportFormat};
use crate::result::TabularResult;

const SHEET_NAME: &str = "Report";
const HEADER_FILL: u32 = 0xD9D9D9;

fn index<T: TryFrom<usize>>(value: usize, what: &str) -> Result<T, ExportError> {
    T::try_from(value).map_err(|_| ExportError::TooLarge {
        format: ExportFormat::Xlsx,
        detail: format!("{} index {} out of range", what, value),
    })
}

pub(super) fn render(title: Option<&str>, result: &TabularResult) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let title_format = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center);
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin);

    let width = result.column_count();
    let mut row: u32 = 0;

    if let Some(title) = title {
        // A single-cell range cannot be merged.
        if width > 1 {
            let last: u16 = index(width - 1, "column")?;
            sheet.merge_range(0, 0, 0, last, title, &title_format)?;
        } else {
            sheet.write_string_with_format(0, 0, title, &title_format)?;
        }
        row = 2;
    }

    for (c, name) in result.columns().iter().enumerate() {
        sheet.write_string_with_format(row, index(c, "column")?, name, &header_format)?;
    }
    row += 1;

    for values in result.rows() {
        for (c, value) in values.iter().enumerate() {
            if !value.is_null() {
                sheet.write_string(row, index(c, "column")?, value.to_string())?;
            }
        }
        row = row.checked_add(1).ok_or_else(|| ExportError::TooLarge {
            format: ExportFormat::Xlsx,
            detail: "row index out of range".to_string(),
        })?;
    }

    sheet.autofit();
    Ok(workbook.save_to_buffer()?)
}
