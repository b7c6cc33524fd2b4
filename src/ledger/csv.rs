// src/ledger/csv.rs

//! Tabular results format shared by the flat-file ledger, export and import.
//!
//! `Name,Category,Raw Speed,Final Speed,Mistakes,Marks,Date`, header first,
//! RFC 4180 quoting. Older files without `Raw Speed` or `Date` still import.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use super::LedgerError;
use crate::models::attempt::AttemptRecord;
use crate::scoring::marks::MarksTier;

pub const COLUMNS: [&str; 7] = [
    "Name",
    "Category",
    "Raw Speed",
    "Final Speed",
    "Mistakes",
    "Marks",
    "Date",
];

/// Leading characters that spreadsheets treat as the start of a formula.
const FORMULA_PREFIXES: [char; 4] = ['=', '+', '@', '-'];

pub fn header_line() -> String {
    let mut line = COLUMNS.join(",");
    line.push('\n');
    line
}

/// Largest gap between the stored final speed and `gross - mistakes` that
/// two-decimal rounding of both speeds can produce.
const SPEED_TOLERANCE: f64 = 0.01 + 1e-9;

/// Escapes CSV field to prevent formula injection.
/// Fields starting with a formula character get a tab prefix, which
/// [`unescape_field`] strips again on import. A field that already starts
/// with a tab gets one too, so it reads back unchanged.
fn escape_field(value: &str) -> String {
    let sanitized = if value.starts_with(FORMULA_PREFIXES) || value.starts_with('\t') {
        format!("\t{}", value)
    } else {
        value.to_string()
    };

    if sanitized.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", sanitized.replace('"', "\"\""))
    } else {
        sanitized
    }
}

fn unescape_field(value: String) -> String {
    match value.strip_prefix('\t') {
        Some(rest) if rest.starts_with(FORMULA_PREFIXES) || rest.starts_with('\t') => {
            rest.to_string()
        }
        _ => value,
    }
}

pub fn encode_row(record: &AttemptRecord) -> String {
    let date = record
        .created_at
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default();

    let fields = [
        escape_field(&record.name),
        escape_field(&record.category),
        record.gross_speed_wpm.to_string(),
        record.final_speed_wpm.to_string(),
        record.mistake_count.to_string(),
        record.marks.to_string(),
        date,
    ];
    let mut line = fields.join(",");
    line.push('\n');
    line
}

/// Header plus one row per record.
pub fn encode(records: &[AttemptRecord]) -> String {
    let mut out = header_line();
    for record in records {
        out.push_str(&encode_row(record));
    }
    out
}

/// Splits `text` into rows of fields, each tagged with its starting line.
fn parse_rows(text: &str) -> Result<Vec<(usize, Vec<String>)>, LedgerError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push((row_line, std::mem::take(&mut row)));
                line += 1;
                row_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(LedgerError::Format {
            line: row_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push((row_line, row));
    }

    // blank lines carry no record
    rows.retain(|(_, fields)| !(fields.len() == 1 && fields[0].trim().is_empty()));
    Ok(rows)
}

/// Column positions resolved from a header row.
struct Layout {
    width: usize,
    name: usize,
    category: usize,
    gross: Option<usize>,
    final_speed: usize,
    mistakes: usize,
    marks: usize,
    date: Option<usize>,
}

impl Layout {
    fn from_header(header: &[String]) -> Result<Self, LedgerError> {
        let find = |aliases: &[&str]| {
            header.iter().position(|h| {
                let h = h.trim();
                aliases.iter().any(|alias| h.eq_ignore_ascii_case(alias))
            })
        };
        let require = |column: &str, aliases: &[&str]| {
            find(aliases).ok_or_else(|| LedgerError::Format {
                line: 1,
                message: format!("missing column '{column}'"),
            })
        };

        Ok(Self {
            width: header.len(),
            name: require("Name", &["name"])?,
            category: require("Category", &["category"])?,
            gross: find(&["raw speed", "gross speed", "raw/gross speed"]),
            final_speed: require("Final Speed", &["final speed"])?,
            mistakes: require("Mistakes", &["mistakes"])?,
            marks: require("Marks", &["marks"])?,
            date: find(&["date", "timestamp"]),
        })
    }

    fn record(&self, line: usize, mut fields: Vec<String>) -> Result<AttemptRecord, LedgerError> {
        let bad = |message: String| LedgerError::Format { line, message };

        if fields.len() != self.width {
            return Err(bad(format!(
                "expected {} fields, found {}",
                self.width,
                fields.len()
            )));
        }

        let speed = |idx: usize, column: &str| -> Result<f64, LedgerError> {
            let raw = fields[idx].trim();
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
                _ => Err(bad(format!("invalid {column} '{raw}'"))),
            }
        };

        let final_speed_wpm = speed(self.final_speed, "final speed")?;
        let raw_mistakes = fields[self.mistakes].trim();
        let mistake_count = raw_mistakes
            .strip_suffix(".0")
            .unwrap_or(raw_mistakes)
            .parse::<u32>()
            .map_err(|_| bad(format!("invalid mistakes '{raw_mistakes}'")))?;
        let gross_speed_wpm = match self.gross {
            Some(idx) => {
                let gross = speed(idx, "raw speed")?;
                let expected = (gross - f64::from(mistake_count)).max(0.0);
                if (final_speed_wpm - expected).abs() > SPEED_TOLERANCE {
                    return Err(bad(format!(
                        "final speed {final_speed_wpm} does not match raw speed {gross} \
                         less {mistake_count} mistakes"
                    )));
                }
                gross
            }
            // older files only kept the final speed
            None => final_speed_wpm + f64::from(mistake_count),
        };
        let marks = fields[self.marks].parse::<MarksTier>().map_err(bad)?;
        if !marks.fits(final_speed_wpm) {
            return Err(bad(format!(
                "marks {marks} do not match final speed {final_speed_wpm}"
            )));
        }
        let created_at = match self.date {
            Some(idx) => parse_date(fields[idx].trim()).map_err(bad)?,
            None => None,
        };

        let name = unescape_field(std::mem::take(&mut fields[self.name]));
        let category = unescape_field(std::mem::take(&mut fields[self.category]));

        Ok(AttemptRecord {
            name,
            category,
            gross_speed_wpm,
            final_speed_wpm,
            mistake_count,
            marks,
            created_at,
        })
    }
}

fn parse_date(raw: &str) -> Result<Option<DateTime<Utc>>, String> {
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| format!("invalid date '{raw}'"))
}

/// Parses a results file. An empty file holds no records.
pub fn decode(text: &str) -> Result<Vec<AttemptRecord>, LedgerError> {
    let mut rows = parse_rows(text)?.into_iter();
    let Some((_, header)) = rows.next() else {
        return Ok(Vec::new());
    };
    let layout = Layout::from_header(&header)?;

    rows.map(|(line, fields)| layout.record(line, fields))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(name: &str) -> AttemptRecord {
        AttemptRecord {
            name: name.to_string(),
            category: "25 WPM".to_string(),
            gross_speed_wpm: 38.4,
            final_speed_wpm: 35.4,
            mistake_count: 3,
            marks: MarksTier::Marks(12),
            created_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let text = encode(&[record("Asha")]);
        assert_eq!(
            text,
            "Name,Category,Raw Speed,Final Speed,Mistakes,Marks,Date\n\
             Asha,25 WPM,38.4,35.4,3,12,2026-03-01T09:30:00Z\n"
        );
    }

    #[test]
    fn export_then_import_preserves_records() {
        let mut awkward = record("O\"Brien, Jr.\nII");
        awkward.gross_speed_wpm = 15.0;
        awkward.final_speed_wpm = 12.0;
        awkward.marks = MarksTier::Disqualify;
        awkward.created_at = None;
        let formula = record("=HYPERLINK(\"x\")");
        let records = vec![record("Asha"), awkward, formula];

        let text = encode(&records);
        assert!(text.contains("\"\t=HYPERLINK"));
        assert_eq!(decode(&text).unwrap(), records);
    }

    #[test]
    fn reads_legacy_files_without_raw_speed_or_date() {
        let text = "Name,Category,Final Speed,Mistakes,Marks\r\n\
                    Asha,10 WPM,31.5,2,12\r\n\
                    Ravi,40 WPM,0.0,7,Disqualify\r\n";
        let records = decode(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].gross_speed_wpm, 33.5);
        assert_eq!(records[0].created_at, None);
        assert_eq!(records[1].marks, MarksTier::Disqualify);
        assert_eq!(records[1].gross_speed_wpm, 7.0);
    }

    #[test]
    fn accepts_space_separated_dates() {
        let text = "Name,Category,Raw Speed,Final Speed,Mistakes,Marks,Date\n\
                    Asha,10 WPM,33,31,2,12,2026-03-01 09:30:00\n";
        let records = decode(text).unwrap();
        assert_eq!(records[0].created_at, record("Asha").created_at);
    }

    #[test]
    fn empty_and_header_only_files_hold_nothing() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode(&header_line()).unwrap().is_empty());
        assert!(decode(&format!("{}\n\n", header_line())).unwrap().is_empty());
    }

    #[test]
    fn reports_the_offending_line() {
        let text = "Name,Category,Raw Speed,Final Speed,Mistakes,Marks,Date\n\
                    Asha,10 WPM,33,31,2,12,\n\
                    Ravi,10 WPM,fast,31,2,12,\n";
        match decode(text) {
            Err(LedgerError::Format { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("fast"));
            }
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn names_starting_with_a_tab_survive() {
        let records = vec![record("\t=x"), record("\tAsha"), record("\t\t-1")];
        let text = encode(&records);
        assert_eq!(decode(&text).unwrap(), records);
    }

    #[test]
    fn rejects_speeds_that_disagree_with_mistakes() {
        let text = format!("{}Asha,10 WPM,50,10,3,25,\n", header_line());
        match decode(&text) {
            Err(LedgerError::Format { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("final speed"));
            }
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_marks_that_disagree_with_final_speed() {
        let text = format!("{}Asha,10 WPM,13,10,3,25,\n", header_line());
        assert!(matches!(
            decode(&text),
            Err(LedgerError::Format { line: 2, message }) if message.contains("marks")
        ));

        // legacy rows are checked too
        let legacy = "Name,Category,Final Speed,Mistakes,Marks\nAsha,10 WPM,10,3,25\n";
        assert!(matches!(
            decode(legacy),
            Err(LedgerError::Format { line: 2, .. })
        ));
    }

    #[test]
    fn tolerates_two_decimal_rounding() {
        // each speed is rounded on its own, so they may drift 0.01 apart
        let text = format!("{}Asha,25 WPM,40,38.01,2,15,\n", header_line());
        assert_eq!(decode(&text).unwrap()[0].final_speed_wpm, 38.01);
    }

    #[test]
    fn rejects_missing_columns_and_open_quotes() {
        assert!(matches!(
            decode("Name,Category\nAsha,10 WPM\n"),
            Err(LedgerError::Format { line: 1, .. })
        ));
        let open_quote = format!("{}\"Asha,10 WPM,1,1,0,Disqualify,\n", header_line());
        assert!(matches!(
            decode(&open_quote),
            Err(LedgerError::Format { line: 2, .. })
        ));
    }
}
