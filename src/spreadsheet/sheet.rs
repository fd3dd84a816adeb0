use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::SpreadsheetError;
use std::collections::BTreeMap;

/// One row of typed cell values, positionally aligned with the header row.
pub type Row = Vec<CellValue>;

/// A worksheet read from a spreadsheet file, holding its non-empty cells.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells in the sheet
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    /// Creates an empty sheet.
    pub(crate) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell to the sheet, widening the data range.
    pub(crate) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    /// Updates the actual data range boundaries based on cell positions.
    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|lower| row < lower).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|upper| upper < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|lower| col < lower).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|upper| upper < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Materializes the sheet into a rectangular grid of typed values.
    ///
    /// The grid spans the used column range; rows without any non-empty
    /// cell are skipped, so the first returned row is the header row.
    ///
    /// # Errors
    ///
    /// Returns `EmptySheet` when the sheet has no cells, and `CellValue`
    /// when a cell cannot be interpreted.
    pub(crate) fn into_rows(self, shared_strings: &[String]) -> Result<Vec<Row>, SpreadsheetError> {
        if self.is_empty() {
            Err(SpreadsheetError::EmptySheet(self.name.to_owned()))?
        }
        let col_lower = self.col_lower_bound.unwrap_or_default();
        let col_upper = self.col_upper_bound.unwrap_or_default();
        let width = col_upper - col_lower + 1;

        let mut grid = BTreeMap::<usize, Row>::new();
        for cell in &self.cells {
            let value = cell.to_value(shared_strings).map_err(|message| SpreadsheetError::CellValue {
                file: self.file_name.to_owned(),
                sheet: self.name.to_owned(),
                reference: cell.reference(),
                message,
            })?;
            if value.is_empty() {
                continue;
            }
            let row = grid
                .entry(cell.row)
                .or_insert_with(|| vec![CellValue::Empty; width]);
            row[cell.col - col_lower] = value;
        }

        if grid.is_empty() {
            Err(SpreadsheetError::EmptySheet(self.name.to_owned()))?
        }
        Ok(grid.into_values().collect())
    }
}
