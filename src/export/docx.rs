use std::io::Cursor;

use docx_rs::{
    AlignmentType, Docx, Paragraph, Run, Shading, ShdType, Table, TableCell, TableRow,
};

use super::ExportError;
use crate::result::TabularResult;

const HEADER_FILL: &str = "D9D9D9";
/// Title size in half-points.
const TITLE_SIZE: usize = 28;

fn cell(text: &str, bold: bool) -> TableCell {
    let mut run = Run::new().add_text(text);
    if bold {
        run = run.bold();
    }
    TableCell::new().add_paragraph(Paragraph::new().add_run(run))
}

pub(super) fn render(title: Option<&str>, result: &TabularResult) -> Result<Vec<u8>, ExportError> {
    let mut docx = Docx::new();

    if let Some(title) = title {
        docx = docx.add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(title).bold().size(TITLE_SIZE))
                .align(AlignmentType::Center),
        );
    }

    let header = TableRow::new(
        result
            .columns()
            .iter()
            .map(|name| {
                cell(name, true).shading(
                    Shading::new()
                        .shd_type(ShdType::Clear)
                        .color("auto")
                        .fill(HEADER_FILL),
                )
            })
            .collect(),
    );

    let mut rows = Vec::with_capacity(result.row_count() + 1);
    rows.push(header);
    rows.extend(result.rows().iter().map(|values| {
        TableRow::new(
            values
                .iter()
                .map(|value| cell(&value.to_string(), false))
                .collect(),
        )
    }));

    docx = docx.add_table(Table::new(rows));

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| ExportError::Docx(e.to_string()))?;
    Ok(buffer.into_inner())
}
