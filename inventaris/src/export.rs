//! CSV export helpers
//!
//! Every field is quoted and embedded quotes are doubled, so values with
//! commas, quotes or newlines survive spreadsheet import.

use crate::error::Result;
use csv::{QuoteStyle, WriterBuilder};

/// Byte-order mark some spreadsheet apps need to detect UTF-8
pub const UTF8_BOM: &str = "\u{feff}";

/// Build a CSV document from a header row and data rows
pub fn to_csv<H, R, F>(headers: &[H], rows: R) -> Result<String>
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<str>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(headers.iter().map(|h| h.as_ref()))?;
    for row in rows {
        writer.write_record(row.iter().map(|f| f.as_ref()))?;
    }

    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_is_quoted() {
        let csv = to_csv(&["No", "Nama"], vec![vec!["1", "Kamera"]]).unwrap();

        assert_eq!(csv, "\"No\",\"Nama\"\n\"1\",\"Kamera\"\n");
    }

    #[test]
    fn test_embedded_quotes_and_commas_survive() {
        let value = "Panasonic, 4K \"Pro\"";
        let csv = to_csv(&["Nama"], vec![vec![value]]).unwrap();

        assert!(csv.contains("\"Panasonic, 4K \"\"Pro\"\"\""));

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], value);
    }
}
