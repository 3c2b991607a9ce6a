//! Record codec: the `" & "`-joined line format shared by the stream, the
//! persisted snapshots and the export file.
use crate::model::{RecordId, Row};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const FIELD_DELIMITER: &str = " & ";
pub const FIELD_COUNT: usize = 8;

static CSQ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"csq=(\d+)").expect("valid csq regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed record: expected {} fields, got {fields}", FIELD_COUNT)]
    MalformedRecord { fields: usize },
}

pub fn decode(raw: &str) -> Result<Row, CodecError> {
    let fields: Vec<&str> = raw.split(FIELD_DELIMITER).collect();
    let [label, review, mall, price, point, time, name, url] = fields.as_slice() else {
        return Err(CodecError::MalformedRecord {
            fields: fields.len(),
        });
    };
    Ok(Row {
        label: label.to_string(),
        review: review.to_string(),
        mall: mall.to_string(),
        price: price.to_string(),
        point: point.to_string(),
        time: time.to_string(),
        name: name.to_string(),
        url: url.to_string(),
    })
}

pub fn encode(row: &Row) -> String {
    [
        row.label.as_str(),
        row.review.as_str(),
        row.mall.as_str(),
        row.price.as_str(),
        row.point.as_str(),
        row.time.as_str(),
        row.name.as_str(),
        row.url.as_str(),
    ]
    .join(FIELD_DELIMITER)
}

/// First `csq=<digits>` token of the row's url, if any.
pub fn extract_id(row: &Row) -> Option<RecordId> {
    CSQ_RE
        .captures(&row.url)
        .and_then(|caps| caps.get(1))
        .map(|m| RecordId(m.as_str().to_string()))
}
