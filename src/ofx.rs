//! Parsing bank statements in OFX format.
//!
//! Only the fields the importer needs are read: the bank and account ids
//! from the header, and the posted transactions. OFX tags are not
//! required to have closing tags, so values run from a tag to the next
//! `<`.

use std::path::Path;

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year][month][day]");

/// One `<STMTTRN>` block from a statement file.
#[derive(Debug, Clone, PartialEq)]
pub struct OfxTransaction {
    /// The financial institution's identifier for the transaction.
    pub fit_id: String,
    /// The date the transaction was posted.
    pub posted: Date,
    /// The signed amount: negative for money leaving the account.
    pub amount: f64,
    /// The transaction type reported by the bank (e.g. "DEBIT", "POS").
    pub kind: String,
    /// The payee or description line.
    pub name: String,
    /// The memo line, often empty.
    pub memo: String,
}

/// The parts of a statement file the importer consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct OfxStatement {
    /// The id of the bank that produced the file.
    pub bank_id: String,
    /// The bank's id for the account the statement covers.
    pub account_id: String,
    /// The account type reported by the bank (e.g. "CHECKING").
    pub account_type: String,
    /// The posted transactions, in file order.
    pub transactions: Vec<OfxTransaction>,
}

/// Parse the text of an OFX statement file.
///
/// # Errors
/// Returns [Error::InvalidOfx] naming the first missing or malformed
/// token.
pub fn parse_ofx(content: &str) -> Result<OfxStatement, Error> {
    let mut header = String::new();
    let mut raw_transactions = Vec::new();
    let mut accumulator = String::new();
    let mut in_transaction = false;

    for line in content.lines() {
        let line = line.trim();

        if line.contains("<STMTTRN>") && line.contains("</STMTTRN>") {
            raw_transactions.push(line.to_owned());
        } else if line == "</STMTTRN>" {
            accumulator.push_str(line);
            raw_transactions.push(std::mem::take(&mut accumulator));
            in_transaction = false;
        } else if line == "<STMTTRN>" {
            in_transaction = true;
            accumulator.push_str(line);
        } else if in_transaction {
            accumulator.push_str(line);
        } else {
            header.push_str(line);
        }
    }

    Ok(OfxStatement {
        bank_id: find_token(&header, "BANKID")?,
        account_id: find_token(&header, "ACCTID")?,
        account_type: find_token(&header, "ACCTTYPE")?,
        transactions: raw_transactions
            .iter()
            .map(|raw| parse_transaction(raw))
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Read and parse an OFX statement file from disk.
///
/// # Errors
/// Returns [Error::ImportIo] if the file cannot be read, or
/// [Error::InvalidOfx] if its contents do not parse.
pub fn read_ofx_file(path: &Path) -> Result<OfxStatement, Error> {
    let content = std::fs::read_to_string(path)
        .map_err(|error| Error::ImportIo(format!("could not read {}: {error}", path.display())))?;

    parse_ofx(&content)
}

fn parse_transaction(raw: &str) -> Result<OfxTransaction, Error> {
    let raw_amount = find_token(raw, "TRNAMT")?;
    let amount: f64 = raw_amount
        .parse()
        .map_err(|_| Error::InvalidOfx(format!("\"{raw_amount}\" is not a valid TRNAMT")))?;

    Ok(OfxTransaction {
        fit_id: find_token(raw, "FITID")?,
        posted: parse_ofx_date(&find_token(raw, "DTPOSTED")?)?,
        amount,
        kind: find_token(raw, "TRNTYPE")?,
        name: find_token(raw, "NAME")?,
        memo: find_token(raw, "MEMO")?,
    })
}

fn find_token(raw: &str, token: &str) -> Result<String, Error> {
    let open_tag = format!("<{token}>");

    let start = raw
        .find(&open_tag)
        .ok_or_else(|| Error::InvalidOfx(format!("could not find <{token}> token")))?
        + open_tag.len();

    let rest = &raw[start..];
    let end = rest.find('<').unwrap_or(rest.len());

    Ok(rest[..end].trim().to_owned())
}

/// Parse an OFX datetime, which is `YYYYMMDD` optionally followed by a
/// time of day. Only the date part matters here.
fn parse_ofx_date(raw: &str) -> Result<Date, Error> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();

    if digits.len() < 8 {
        return Err(Error::InvalidOfx(format!(
            "\"{raw}\" is not a valid DTPOSTED date"
        )));
    }

    Date::parse(&digits[..8], DATE_FORMAT)
        .map_err(|_| Error::InvalidOfx(format!("\"{raw}\" is not a valid DTPOSTED date")))
}
