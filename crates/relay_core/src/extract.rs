use crate::cells::collect_cells;
use crate::{
    extract_between, ExtractedTable, ExtractionSettings, HeaderRow, ParseError, RowWidth, Table,
};

const HEADER_CELL: &str = "th";
const DATA_CELL: &str = "td";

/// Text of every `<th>` in `fragment`, in document order.
pub fn extract_headers(fragment: &str) -> Result<HeaderRow, ParseError> {
    collect_cells(fragment, HEADER_CELL).map(HeaderRow::new)
}

/// Text of every `<td>` in `fragment`, grouped into rows of `width` cells.
pub fn extract_rows(fragment: &str, width: RowWidth) -> Result<Table, ParseError> {
    collect_cells(fragment, DATA_CELL).map(|cells| Table::from_cells(cells, width))
}

/// Locate the container in `doc` and extract its headers and body rows.
pub fn extract_table(
    doc: &str,
    settings: &ExtractionSettings,
) -> Result<ExtractedTable, ParseError> {
    let fragment = extract_between(doc, &settings.container_open, &settings.container_close)?;
    let headers = extract_headers(fragment)?;
    let table = extract_rows(fragment, settings.row_width)?;

    let expected = settings.row_width.get();
    if !headers.is_empty() && headers.len() != expected {
        return Err(ParseError::ColumnCountMismatch {
            expected,
            found: headers.len(),
        });
    }
    Ok(ExtractedTable { headers, table })
}
