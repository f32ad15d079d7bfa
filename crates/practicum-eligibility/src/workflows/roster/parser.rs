use std::io::Cursor;

use calamine::{Data, Reader};
use tracing::{debug, warn};

use super::columns::{ColumnMap, RosterField};
use super::{RosterError, RosterRow};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Parse the roster export into candidate rows.
///
/// Spreadsheet workbooks (xlsx, xls, ods) are read from their first worksheet; anything else is
/// treated as CSV. The first physical row of the export is always blank, the next non-blank row is
/// the header, and data follows. When `program_filter` is set a row is kept if either program
/// column equals the filter, and the kept row's primary program code is rewritten to the filter.
pub fn parse_roster(
    bytes: &[u8],
    program_filter: Option<&str>,
) -> Result<Vec<RosterRow>, RosterError> {
    let filter = program_filter
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let mut collector = RowCollector::new(filter);

    if is_workbook(bytes) {
        read_workbook(bytes, &mut collector)?;
    } else {
        read_csv(bytes, &mut collector)?;
    }

    Ok(collector.rows)
}

fn is_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}

fn read_workbook(bytes: &[u8], collector: &mut RowCollector<'_>) -> Result<(), RosterError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(RosterError::NoWorksheet)??;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    debug!(first_row, rows = range.height(), "reading roster worksheet");

    for (offset, cells) in range.rows().enumerate() {
        let fields: Vec<String> = cells.iter().map(cell_text).collect();
        collector.push(first_row + offset, fields);
    }
    Ok(())
}

fn read_csv(bytes: &[u8], collector: &mut RowCollector<'_>) -> Result<(), RosterError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    for record in reader.byte_records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        let fields: Vec<String> = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        collector.push(line.saturating_sub(1) as usize, fields);
    }
    Ok(())
}

/// Numeric cells holding whole numbers render without a decimal part, so document numbers
/// typed as numbers read the same as in CSV exports.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.trim().to_string(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        other => other.to_string(),
    }
}

/// Applies the header and filter rules to rows in sheet order, whatever the source format.
struct RowCollector<'a> {
    filter: Option<&'a str>,
    header: Option<ColumnMap>,
    rows: Vec<RosterRow>,
}

impl<'a> RowCollector<'a> {
    fn new(filter: Option<&'a str>) -> Self {
        Self {
            filter,
            header: None,
            rows: Vec::new(),
        }
    }

    /// `index` is the zero-based physical row of the export.
    fn push(&mut self, index: usize, fields: Vec<String>) {
        let blank = fields.iter().all(|field| field.trim().is_empty());

        let Some(columns) = self.header.as_ref() else {
            if index == 0 || blank {
                return;
            }
            let map = ColumnMap::from_header(&fields);
            if !map.has(RosterField::Identification) {
                warn!(row = index + 1, "roster header has no identification column");
            }
            self.header = Some(map);
            return;
        };

        if blank {
            return;
        }

        let Some(mut row) = map_row(columns, &fields) else {
            warn!(row = index + 1, "dropping roster row without identification");
            return;
        };

        if let Some(filter) = self.filter {
            if !row.matches_program(filter) {
                return;
            }
            row.program_code = filter.to_string();
        }

        self.rows.push(row);
    }
}

fn map_row(columns: &ColumnMap, fields: &[String]) -> Option<RosterRow> {
    let text = |field: RosterField| columns.get(field, fields).map(str::to_string);

    Some(RosterRow {
        identification: text(RosterField::Identification)?,
        program_code: text(RosterField::ProgramCode).unwrap_or_default(),
        secondary_program_code: text(RosterField::SecondaryProgramCode),
        email: text(RosterField::Email),
        first_names: text(RosterField::FirstNames).unwrap_or_default(),
        last_names: text(RosterField::LastNames).unwrap_or_default(),
        gender: text(RosterField::Gender),
        mobile: text(RosterField::Mobile),
        campus: text(RosterField::Campus),
        period: text(RosterField::Period),
        practice_type: text(RosterField::PracticeType),
    })
}
