/// One side of a `K=V` query, classified by its wildcard markers.
///
/// The contained literal has its `*` markers already stripped. A `*` that is
/// not in a marker position (e.g. `a*b`) is an ordinary byte and yields
/// `Exact("a*b")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// The side is exactly `"*"`: matches everything.
    Wildcard,
    /// `*lit*` (length >= 3): matches strings containing `lit`.
    Infix(String),
    /// `*lit` (length >= 2): matches strings ending with `lit`.
    Suffix(String),
    /// `lit*` (length >= 2): matches strings starting with `lit`.
    Prefix(String),
    /// No marker: matches the literal itself. The empty string is a valid
    /// exact literal (`K=` queries).
    Exact(String),
}

impl Pattern {
    /// Classifies a raw pattern side. Marker checks happen in a fixed order
    /// (wildcard, infix, suffix, prefix, exact) so that e.g. `**` classifies
    /// as `Suffix("*")` rather than an empty infix.
    pub fn classify(side: &str) -> Pattern {
        if side == "*" {
            return Pattern::Wildcard;
        }
        if side.len() >= 3 && side.starts_with('*') && side.ends_with('*') {
            return Pattern::Infix(side[1..side.len() - 1].to_string());
        }
        if side.len() >= 2 && side.starts_with('*') {
            return Pattern::Suffix(side[1..].to_string());
        }
        if side.len() >= 2 && side.ends_with('*') {
            return Pattern::Prefix(side[..side.len() - 1].to_string());
        }
        Pattern::Exact(side.to_string())
    }

    /// The stripped literal, or `None` for the wildcard.
    pub fn literal(&self) -> Option<&str> {
        match self {
            Pattern::Wildcard => None,
            Pattern::Infix(s) | Pattern::Suffix(s) | Pattern::Prefix(s) | Pattern::Exact(s) => {
                Some(s)
            }
        }
    }

    /// Whether a concrete string satisfies this pattern. Used by tests and by
    /// nothing on the query path (the tries answer queries structurally).
    pub fn matches(&self, s: &str) -> bool {
        match self {
            Pattern::Wildcard => true,
            Pattern::Infix(lit) => s.contains(lit.as_str()),
            Pattern::Suffix(lit) => s.ends_with(lit.as_str()),
            Pattern::Prefix(lit) => s.starts_with(lit.as_str()),
            Pattern::Exact(lit) => s == lit,
        }
    }
}

/// A parsed `K=V` query: a key-side and a value-side pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCondition {
    pub key: Pattern,
    pub value: Pattern,
}

/// Splits a query at its first `=` byte and classifies both sides.
///
/// Without an `=` the whole string is the key pattern and the value side is
/// the wildcard. `K=` means an exact match on the empty value.
pub fn parse_query(query: &str) -> QueryCondition {
    match query.split_once('=') {
        Some((key_part, value_part)) => QueryCondition {
            key: Pattern::classify(key_part),
            value: Pattern::classify(value_part),
        },
        None => QueryCondition {
            key: Pattern::classify(query),
            value: Pattern::Wildcard,
        },
    }
}
