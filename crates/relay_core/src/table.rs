use std::num::NonZeroUsize;

use crate::ParseError;

/// Number of cells per body row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowWidth(NonZeroUsize);

impl RowWidth {
    pub fn new(width: usize) -> Result<Self, ParseError> {
        NonZeroUsize::new(width)
            .map(Self)
            .ok_or(ParseError::InvalidRowWidth)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for RowWidth {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(1))
    }
}

/// Column labels in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderRow(Vec<String>);

impl HeaderRow {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_labels(self) -> Vec<String> {
        self.0
    }
}

/// One body row. Always exactly as wide as the table it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow(Vec<String>);

impl DataRow {
    pub fn cells(&self) -> &[String] {
        &self.0
    }
}

/// Body rows in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    width: RowWidth,
    rows: Vec<DataRow>,
    dropped_cells: usize,
}

impl Table {
    /// Groups `cells` into rows of `width`; a trailing partial row is dropped.
    pub fn from_cells(cells: Vec<String>, width: RowWidth) -> Self {
        let w = width.get();
        let dropped_cells = cells.len() % w;
        let mut rows = Vec::with_capacity(cells.len() / w);
        let mut current = Vec::with_capacity(w);
        for cell in cells {
            current.push(cell);
            if current.len() == w {
                rows.push(DataRow(std::mem::replace(
                    &mut current,
                    Vec::with_capacity(w),
                )));
            }
        }
        Self {
            width,
            rows,
            dropped_cells,
        }
    }

    pub fn width(&self) -> RowWidth {
        self.width
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells left over after the last complete row.
    pub fn dropped_cells(&self) -> usize {
        self.dropped_cells
    }

    /// Rows as plain string vectors, the shape spreadsheet writes take.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| row.cells().to_vec()).collect()
    }
}

/// Where the table lives in the page and how wide its rows are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSettings {
    pub container_open: String,
    pub container_close: String,
    pub row_width: RowWidth,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            container_open: "<div class=\"table-wrap\">".to_string(),
            container_close: "</div>".to_string(),
            row_width: RowWidth::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    pub headers: HeaderRow,
    pub table: Table,
}
