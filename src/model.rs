use serde::{Deserialize, Serialize};
use std::fmt;

/// Result class of a row. Decided by the channel that delivered it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Hidden,
    Public,
}

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::Hidden, Kind::Public];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Hidden => "hidden",
            Kind::Public => "public",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        match s {
            "hidden" => Some(Kind::Hidden),
            "public" => Some(Kind::Public),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric identity token embedded in a row's url (`csq=<digits>`).
///
/// Kept as the digit string so that leading zeros and very long ids survive
/// the round trip to the producer unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One scraped campaign entry, in wire field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Producer's delivery-category text (first wire field).
    pub label: String,
    pub review: String,
    pub mall: String,
    /// Display string; may contain currency suffixes or be a placeholder.
    pub price: String,
    pub point: String,
    /// Sortable timestamp surrogate, compared as a string.
    pub time: String,
    pub name: String,
    pub url: String,
}

impl Row {
    /// Price with non-digits stripped and thousands grouped (`1,000`).
    /// Returns `-` when the display string carries no digits.
    pub fn price_display(&self) -> String {
        let digits: String = self.price.chars().filter(|c| c.is_ascii_digit()).collect();
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return if self.price.chars().any(|c| c.is_ascii_digit()) {
                "0".to_string()
            } else {
                "-".to_string()
            };
        }
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(ch);
        }
        out
    }
}
