//! Tabular input and output.
//!
//! Reads the first worksheet of an `.xlsx` workbook into a cell grid, hands
//! out one ordered header→value `Row` per data row, and appends new
//! trailing columns matched by the string form of each row's first cell.

use crate::error::{Error, FormatError, IoError, Result};
use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use std::io::Cursor;

/// A single spreadsheet cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// String form used for display, prompts and id matching
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&Data> for Cell {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        }
    }
}

/// Integral values print without a fractional part, so `1.0` matches id `"1"`
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One data row keyed by header, in column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, Cell)>,
}

impl Row {
    pub fn new(fields: Vec<(String, Cell)>) -> Self {
        Self { fields }
    }

    /// Value under a header; with duplicate headers the rightmost wins
    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .rev()
            .find(|(header, _)| header == name)
            .map(|(_, cell)| cell)
    }

    /// String form of a field, empty when the header is absent
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(Cell::to_text).unwrap_or_default()
    }

    pub fn id(&self) -> String {
        self.text("id")
    }

    /// True when the header is absent or its cell is empty or whitespace
    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name).map_or(true, Cell::is_blank)
    }

    pub fn fields(&self) -> &[(String, Cell)] {
        &self.fields
    }
}

/// First worksheet of a workbook as an absolute cell grid (row 0 = headers)
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: Option<String>,
    grid: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Parse `.xlsx` bytes, failing with a format error on anything unreadable
    pub fn from_xlsx_bytes(bytes: &[u8]) -> Result<Self> {
        let mut workbook = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| FormatError::TableUnreadable(e.to_string()))?;

        let name = workbook.sheet_names().first().cloned();
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| FormatError::TableUnreadable("workbook has no worksheets".to_string()))?
            .map_err(|e| FormatError::TableUnreadable(e.to_string()))?;

        let mut grid: Vec<Vec<Cell>> = Vec::new();
        if let Some((start_row, start_col)) = range.start() {
            grid.resize(start_row as usize, Vec::new());
            for cells in range.rows() {
                let mut row = vec![Cell::Empty; start_col as usize];
                row.extend(cells.iter().map(Cell::from));
                grid.push(row);
            }
        }

        Ok(Self { name, grid })
    }

    pub fn headers(&self) -> Vec<String> {
        self.grid
            .first()
            .map(|header| header.iter().map(Cell::to_text).collect())
            .unwrap_or_default()
    }

    /// Index one past the last used column
    pub fn width(&self) -> usize {
        self.grid.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Data rows keyed by the header row; an empty data section yields no rows
    pub fn rows(&self) -> Vec<Row> {
        let headers = self.headers();
        self.grid
            .iter()
            .skip(1)
            .map(|cells| {
                let fields = headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        (header.clone(), cells.get(i).cloned().unwrap_or(Cell::Empty))
                    })
                    .collect();
                Row::new(fields)
            })
            .collect()
    }

    /// Fail unless every named header is present
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        let headers = self.headers();
        for name in names {
            if !headers.iter().any(|h| h == name) {
                return Err(FormatError::MissingColumn(name.to_string()).into());
            }
        }
        Ok(())
    }

    /// Fail if any named header is already present
    pub fn reject_existing_columns(&self, names: &[&str]) -> Result<()> {
        let headers = self.headers();
        match names.iter().find(|n| headers.iter().any(|h| h == *n)) {
            Some(existing) => Err(FormatError::ColumnExists(existing.to_string()).into()),
            None => Ok(()),
        }
    }

    /// Append trailing columns after the current last column.
    ///
    /// `values_for` receives the string form of each data row's first cell
    /// and returns that row's new values, or `None` to leave them blank.
    /// Existing cells are never touched; a name that already exists as a
    /// header is rejected.
    pub fn append_columns<F>(&mut self, names: &[&str], mut values_for: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<Vec<Cell>>,
    {
        self.reject_existing_columns(names)?;

        let width = self.width();
        if self.grid.is_empty() {
            self.grid.push(Vec::new());
        }

        let header = &mut self.grid[0];
        header.resize(width, Cell::Empty);
        header.extend(names.iter().map(|n| Cell::Text(n.to_string())));

        for row in self.grid.iter_mut().skip(1) {
            let id = row.first().map(Cell::to_text).unwrap_or_default();
            if let Some(values) = values_for(&id) {
                row.resize(width, Cell::Empty);
                row.extend(values);
            }
        }

        Ok(())
    }

    /// Encode as a single-sheet `.xlsx` workbook
    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>> {
        let encode_failed = |e: rust_xlsxwriter::XlsxError| {
            Error::Io(IoError::EncodeFailed {
                path: self.name.clone().unwrap_or_else(|| "worksheet".to_string()),
                details: e.to_string(),
            })
        };

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        if let Some(name) = &self.name {
            worksheet.set_name(name).map_err(encode_failed)?;
        }

        for (r, cells) in self.grid.iter().enumerate() {
            for (c, cell) in cells.iter().enumerate() {
                let (row, col) = (r as u32, c as u16);
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) if s.is_empty() => {}
                    Cell::Text(s) => {
                        worksheet.write_string(row, col, s).map_err(encode_failed)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(row, col, *n).map_err(encode_failed)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(row, col, *b).map_err(encode_failed)?;
                    }
                }
            }
        }

        workbook.save_to_buffer().map_err(encode_failed)
    }
}

/// Read `.xlsx` bytes into ordered header→value rows
pub fn read_rows(bytes: &[u8]) -> Result<Vec<Row>> {
    Ok(Sheet::from_xlsx_bytes(bytes)?.rows())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xlsx(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, cells) in rows.iter().enumerate() {
            for (c, value) in cells.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_read_rows_keyed_by_header() {
        let bytes = xlsx(&[
            &["id", "title", "control"],
            &["1", "Access Control", "Must enforce MFA"],
            &["2", "Logging", "Must retain logs"],
        ]);

        let rows = read_rows(&bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id(), "1");
        assert_eq!(rows[0].text("title"), "Access Control");
        assert_eq!(rows[1].text("control"), "Must retain logs");

        let order: Vec<&str> = rows[0].fields().iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(order, vec!["id", "title", "control"]);
    }

    #[test]
    fn test_header_only_yields_no_rows() {
        let bytes = xlsx(&[&["id", "title", "control"]]);
        assert!(read_rows(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_bytes_are_format_error() {
        let err = read_rows(b"a,b,c\n1,2,3").unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::TableUnreadable(_))));
    }

    #[test]
    fn test_numeric_ids_coerce_to_integers() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "id").unwrap();
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_number(2, 0, 2.5).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = read_rows(&bytes).unwrap();
        assert_eq!(rows[0].id(), "1");
        assert_eq!(rows[1].id(), "2.5");
    }

    #[test]
    fn test_short_rows_padded_with_empty() {
        let bytes = xlsx(&[&["id", "title", "control"], &["1", "", ""]]);
        let rows = read_rows(&bytes).unwrap();
        assert_eq!(rows[0].get("control"), Some(&Cell::Empty));
        assert_eq!(rows[0].text("missing"), "");
        assert!(rows[0].is_blank("title"));
        assert!(rows[0].is_blank("missing"));
        assert!(!rows[0].is_blank("id"));
    }

    #[test]
    fn test_require_columns() {
        let sheet = Sheet::from_xlsx_bytes(&xlsx(&[&["id", "title"]])).unwrap();
        assert!(sheet.require_columns(&["id", "title"]).is_ok());
        let err = sheet.require_columns(&["id", "control"]).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::MissingColumn(ref c)) if c == "control"));
    }

    #[test]
    fn test_append_columns_after_last_column() {
        let mut sheet = Sheet::from_xlsx_bytes(&xlsx(&[
            &["id", "title", "control"],
            &["1", "A", "x"],
            &["2", "B", ""],
            &["3", "C", "z"],
        ]))
        .unwrap();

        sheet
            .append_columns(&["match", "suggestions"], |id| match id {
                "1" => Some(vec![Cell::from("yes"), Cell::from("none")]),
                "3" => Some(vec![Cell::from("no"), Cell::from("add policy")]),
                _ => None,
            })
            .unwrap();

        assert_eq!(
            sheet.headers(),
            vec!["id", "title", "control", "match", "suggestions"]
        );
        let rows = sheet.rows();
        assert_eq!(rows[0].text("match"), "yes");
        assert_eq!(rows[1].text("match"), "");
        assert_eq!(rows[1].text("title"), "B");
        assert_eq!(rows[2].text("suggestions"), "add policy");
    }

    #[test]
    fn test_append_rejects_existing_column() {
        let mut sheet = Sheet::from_xlsx_bytes(&xlsx(&[&["id", "match"], &["1", "yes"]])).unwrap();
        let err = sheet
            .append_columns(&["match"], |_| Some(vec![Cell::from("no")]))
            .unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::ColumnExists(_))));
        assert_eq!(sheet.headers(), vec!["id", "match"]);
    }

    #[test]
    fn test_encoded_workbook_reads_back() {
        let mut sheet = Sheet::from_xlsx_bytes(&xlsx(&[&["id", "title"], &["1", "A"]])).unwrap();
        sheet
            .append_columns(&["rewritten_suggestions"], |_| {
                Some(vec![Cell::from("first\nsecond")])
            })
            .unwrap();

        let reread = Sheet::from_xlsx_bytes(&sheet.to_xlsx_bytes().unwrap()).unwrap();
        assert_eq!(reread.headers(), vec!["id", "title", "rewritten_suggestions"]);
        assert_eq!(reread.rows()[0].text("rewritten_suggestions"), "first\nsecond");
    }
}
