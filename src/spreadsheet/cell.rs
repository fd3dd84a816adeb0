use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use iso8601_duration::Duration as IsoDuration;

/// Seconds in one day, the unit of Excel serial date numbers.
const SECONDS_PER_DAY: f64 = 86_400f64;

/// Storage kind of a raw cell as found in the workbook markup.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as `1` / `0`
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// ISO 8601 duration strings
    IsoDuration,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format codes to determine cell type.
    /// Literal text, escapes and bracketed sections (colors, locales) are ignored.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_literal => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_bracket && !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    fn is_1904(&self) -> bool {
        matches!(
            self,
            Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904
        )
    }
}

/// A typed cell value handed to the ingest pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl CellValue {
    /// Returns true for cells that carry no value at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Renders the value as it is stored in a text column.
    ///
    /// Dates and date-times become a calendar date (`YYYY-MM-DD`) without time
    /// component, empty cells become `None` (SQL `NULL`).
    pub fn to_sql_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(value) => Some(value.to_owned()),
            Self::Number(value) => Some(value.to_string()),
            Self::Boolean(value) => Some(value.to_string()),
            Self::Date(value) => Some(value.format("%Y-%m-%d").to_string()),
            Self::DateTime(value) => Some(value.date().format("%Y-%m-%d").to_string()),
            Self::Time(value) => Some(value.format("%H:%M:%S").to_string()),
        }
    }
}

/// A raw cell read from the workbook markup, before typing.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell storage kind
    pub(crate) kind: CellType,
    /// Raw cell content; an index into the shared strings for `SharedString`
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts the raw content into a typed value.
    ///
    /// # Errors
    ///
    /// Returns a message describing the content when it cannot be interpreted
    /// as its declared kind, or when the cell holds a spreadsheet error.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<CellValue, String> {
        match self.kind {
            CellType::Empty => Ok(CellValue::Empty),
            CellType::Boolean => Ok(CellValue::Boolean(self.value == "1")),
            CellType::Number => self.to_double().map(CellValue::Number),
            CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => {
                self.to_serial_datetime().map(CellValue::DateTime)
            }
            CellType::NumberDate1900 | CellType::NumberDate1904 => {
                self.to_serial_datetime().map(|datetime| CellValue::Date(datetime.date()))
            }
            CellType::NumberTime1900 | CellType::NumberTime1904 => {
                self.to_serial_datetime().map(|datetime| CellValue::Time(datetime.time()))
            }
            CellType::IsoDateTime => self.to_iso_datetime(),
            CellType::IsoDuration => self.to_iso_time().map(CellValue::Time),
            CellType::InlineString => Ok(CellValue::Text(self.value.to_owned())),
            CellType::SharedString => {
                let index = self
                    .value
                    .parse::<usize>()
                    .map_err(|_| format!("invalid shared string index '{}'", self.value))?;
                shared_strings
                    .get(index)
                    .map(|text| CellValue::Text(text.to_owned()))
                    .ok_or_else(|| format!("shared string {index} out of range"))
            }
            CellType::Error => Err(format!("cell holds error value '{}'", self.value)),
        }
    }

    /// Converts cell value to double-precision floating point.
    fn to_double(&self) -> Result<f64, String> {
        self.value
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("parse '{}' to double failed", self.value))
    }

    /// Converts an Excel serial number to a date and time.
    /// Handles the 1904 epoch and the Lotus 1-2-3 leap year bug of the 1900 epoch.
    fn to_serial_datetime(&self) -> Result<NaiveDateTime, String> {
        let serial = self.to_double()?;
        if !serial.is_finite() {
            Err(format!("serial date '{}' out of range", self.value))?
        }
        let days = serial.trunc() as i64;
        let offset = if self.kind.is_1904() {
            1_462
        } else if days < 60 {
            1
        } else {
            0
        };
        let seconds = (serial.fract().abs() * SECONDS_PER_DAY).round() as i64;
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(|| "invalid serial epoch".to_owned())?;
        days.checked_add(offset)
            .and_then(Duration::try_days)
            .and_then(|days| epoch.checked_add_signed(days))
            .zip(Duration::try_seconds(seconds))
            .and_then(|(datetime, seconds)| datetime.checked_add_signed(seconds))
            .ok_or_else(|| format!("serial date '{}' out of range", self.value))
    }

    /// Parses an ISO 8601 date or date-time string.
    fn to_iso_datetime(&self) -> Result<CellValue, String> {
        let value = self.value.trim_end_matches('Z');
        if value.contains('T') {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(CellValue::DateTime)
                .map_err(|_| format!("parse '{}' to NaiveDateTime failed", self.value))
        } else {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(CellValue::Date)
                .map_err(|_| format!("parse '{}' to NaiveDate failed", self.value))
        }
    }

    /// Parses an ISO 8601 duration (`PT10H30M00S`) as a time of day.
    fn to_iso_time(&self) -> Result<NaiveTime, String> {
        let duration = self
            .value
            .parse::<IsoDuration>()
            .map_err(|_| format!("parse '{}' to iso8601 duration failed", self.value))?;
        // Components wrap to a single day
        let seconds = (duration.hour as u64 % 24) * 3_600
            + (duration.minute as u64 % 1_440) * 60
            + (duration.second as u64 % 86_400);
        NaiveTime::from_num_seconds_from_midnight_opt((seconds % 86_400) as u32, 0)
            .ok_or_else(|| format!("duration '{}' out of range", self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 0,
            col: 0,
            kind,
            value: value.to_owned(),
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[rstest]
    #[case("1", date(1900, 1, 1))]
    #[case("59", date(1900, 2, 28))]
    #[case("61", date(1900, 3, 1))]
    #[case("45296", date(2024, 1, 5))]
    fn test_serial_dates_1900(#[case] serial: &str, #[case] expected: NaiveDate) {
        let value = cell(CellType::NumberDate1900, serial).to_value(&[]).unwrap();
        assert_eq!(value, CellValue::Date(expected));
    }

    #[rstest]
    #[case(CellType::NumberDate1900, "1e20")]
    #[case(CellType::NumberDate1900, "-1e20")]
    #[case(CellType::NumberDateTime1900, "NaN")]
    #[case(CellType::NumberDate1904, "1e19")]
    #[case(CellType::NumberTime1904, "inf")]
    fn test_serial_date_out_of_range(#[case] kind: CellType, #[case] serial: &str) {
        let error = cell(kind, serial).to_value(&[]).unwrap_err();
        assert_eq!(error, format!("serial date '{}' out of range", serial));
    }

    #[test]
    fn test_serial_date_1904() {
        let value = cell(CellType::NumberDate1904, "0").to_value(&[]).unwrap();
        assert_eq!(value, CellValue::Date(date(1904, 1, 1)));
    }

    #[test]
    fn test_serial_datetime_renders_as_date() {
        let value = cell(CellType::NumberDateTime1900, "45296.75").to_value(&[]).unwrap();
        assert_eq!(
            value,
            CellValue::DateTime(date(2024, 1, 5).and_hms_opt(18, 0, 0).unwrap())
        );
        assert_eq!(value.to_sql_text().as_deref(), Some("2024-01-05"));
    }

    #[test]
    fn test_serial_time() {
        let value = cell(CellType::NumberTime1900, "0.5").to_value(&[]).unwrap();
        assert_eq!(value.to_sql_text().as_deref(), Some("12:00:00"));
    }

    #[rstest]
    #[case("2024-01-05", "2024-01-05")]
    #[case("2024-01-05T10:30:00", "2024-01-05")]
    #[case("2024-01-05T10:30:00.250Z", "2024-01-05")]
    fn test_iso_dates(#[case] raw: &str, #[case] expected: &str) {
        let value = cell(CellType::IsoDateTime, raw).to_value(&[]).unwrap();
        assert_eq!(value.to_sql_text().as_deref(), Some(expected));
    }

    #[test]
    fn test_iso_duration() {
        let value = cell(CellType::IsoDuration, "PT10H30M00S").to_value(&[]).unwrap();
        assert_eq!(value.to_sql_text().as_deref(), Some("10:30:00"));
    }

    #[rstest]
    #[case("PT48H30M", "00:30:00")]
    #[case("PT25H90M", "02:30:00")]
    #[case("PT2400000000H", "00:00:00")]
    fn test_iso_duration_wraps_to_time_of_day(#[case] raw: &str, #[case] expected: &str) {
        let value = cell(CellType::IsoDuration, raw).to_value(&[]).unwrap();
        assert_eq!(value.to_sql_text().as_deref(), Some(expected));
    }

    #[rstest]
    #[case(CellType::Number, "42", Some("42"))]
    #[case(CellType::Number, "3.5", Some("3.5"))]
    #[case(CellType::Boolean, "1", Some("true"))]
    #[case(CellType::Boolean, "0", Some("false"))]
    #[case(CellType::InlineString, "hello", Some("hello"))]
    #[case(CellType::Empty, "", None)]
    fn test_sql_text(#[case] kind: CellType, #[case] raw: &str, #[case] expected: Option<&str>) {
        let value = cell(kind, raw).to_value(&[]).unwrap();
        assert_eq!(value.to_sql_text().as_deref(), expected);
    }

    #[test]
    fn test_shared_string_lookup() {
        let strings = vec!["first".to_owned(), "second".to_owned()];
        assert_eq!(
            cell(CellType::SharedString, "1").to_value(&strings).unwrap(),
            CellValue::Text("second".to_owned())
        );
        assert!(cell(CellType::SharedString, "5").to_value(&strings).is_err());
    }

    #[test]
    fn test_error_cell_is_rejected() {
        assert!(cell(CellType::Error, "#DIV/0!").to_value(&[]).is_err());
        assert!(cell(CellType::Number, "abc").to_value(&[]).is_err());
    }

    #[rstest]
    #[case("yyyy-mm-dd", CellType::NumberDate1900)]
    #[case("yyyy-mm-dd hh:mm", CellType::NumberDateTime1900)]
    #[case("hh:mm:ss", CellType::NumberTime1900)]
    #[case("0.00", CellType::Number)]
    #[case("[Red]0.00", CellType::Number)]
    #[case("\"days\" 0", CellType::Number)]
    fn test_custom_number_formats(#[case] format: &str, #[case] expected: CellType) {
        assert_eq!(CellType::parse_custom_number_format(format, false), expected);
    }
}
