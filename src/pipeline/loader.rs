//! Transaction export loader.
//!
//! The export is a headerless TSV with nine positional columns:
//! `id, _, description, amountCents, _, _, _, memo, _`. A field wrapped in
//! `"` is unquoted; stray `"` inside an unquoted field is kept as text.

use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::error::LoadError;
use crate::pipeline::types::TransactionRecord;

/// Number of columns in every export row.
pub const COLUMN_COUNT: usize = 9;

const ID_COLUMN: usize = 0;
const DESCRIPTION_COLUMN: usize = 2;
const AMOUNT_COLUMN: usize = 3;
const MEMO_COLUMN: usize = 7;

/// Read and parse the transaction export at `path`.
pub async fn load_transactions(path: &Path) -> Result<Vec<TransactionRecord>, LoadError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_transactions(bytes.as_slice())?;
    info!(path = %path.display(), count = records.len(), "Loaded transactions");
    Ok(records)
}

/// Parse TSV rows into transaction records.
///
/// Any row with the wrong column count or a non-integer amount aborts the
/// whole parse.
pub fn parse_transactions<R: Read>(reader: R) -> Result<Vec<TransactionRecord>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        if row.len() != COLUMN_COUNT {
            return Err(LoadError::ColumnCount {
                line,
                expected: COLUMN_COUNT,
                found: row.len(),
            });
        }

        let raw_amount = row[AMOUNT_COLUMN].trim();
        let amount_cents = raw_amount
            .parse::<i64>()
            .map_err(|_| LoadError::InvalidAmount {
                line,
                value: raw_amount.to_string(),
            })?;

        records.push(TransactionRecord {
            id: row[ID_COLUMN].trim().to_string(),
            description: collapse_whitespace(&row[DESCRIPTION_COLUMN]),
            amount_cents,
            memo: row[MEMO_COLUMN].trim().to_string(),
        });
    }

    Ok(records)
}

/// Trim and squeeze every whitespace run to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
