// src/data/query.rs

//! Query operations and [`QueryPredicate`] evaluation.
//!
//! A query-kind message carries, per key, a target value and a
//! [`QueryOp`]. A `QueryOp` is one comparison (`EQUAL` … `TRUE`) optionally
//! combined with modifier bits (`CASEFOLD`, `PREFIX`, `SUFFIX`,
//! `SUBSTRING`, `NUMERIC`, `REGEX`). The bit values are fixed by the
//! platform.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ::regex::{Regex, RegexBuilder};

use crate::bindings::asl_h::{
    ASL_QUERY_OP_CASEFOLD,
    ASL_QUERY_OP_EQUAL,
    ASL_QUERY_OP_GREATER,
    ASL_QUERY_OP_GREATER_EQUAL,
    ASL_QUERY_OP_LESS,
    ASL_QUERY_OP_LESS_EQUAL,
    ASL_QUERY_OP_MASK,
    ASL_QUERY_OP_MODIFIER_MASK,
    ASL_QUERY_OP_NOT_EQUAL,
    ASL_QUERY_OP_NUMERIC,
    ASL_QUERY_OP_PREFIX,
    ASL_QUERY_OP_REGEX,
    ASL_QUERY_OP_SUBSTRING,
    ASL_QUERY_OP_SUFFIX,
    ASL_QUERY_OP_TRUE,
};
use crate::common::{AslError, Result};

/// A comparison mode plus modifier bits.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct QueryOp(u32);

impl QueryOp {
    pub const EQUAL: QueryOp = QueryOp(ASL_QUERY_OP_EQUAL);
    pub const GREATER: QueryOp = QueryOp(ASL_QUERY_OP_GREATER);
    pub const GREATER_EQUAL: QueryOp = QueryOp(ASL_QUERY_OP_GREATER_EQUAL);
    pub const LESS: QueryOp = QueryOp(ASL_QUERY_OP_LESS);
    pub const LESS_EQUAL: QueryOp = QueryOp(ASL_QUERY_OP_LESS_EQUAL);
    pub const NOT_EQUAL: QueryOp = QueryOp(ASL_QUERY_OP_NOT_EQUAL);
    /// Matches whenever the key is present.
    pub const TRUE: QueryOp = QueryOp(ASL_QUERY_OP_TRUE);

    pub const CASEFOLD: QueryOp = QueryOp(ASL_QUERY_OP_CASEFOLD);
    pub const PREFIX: QueryOp = QueryOp(ASL_QUERY_OP_PREFIX);
    pub const SUFFIX: QueryOp = QueryOp(ASL_QUERY_OP_SUFFIX);
    /// `PREFIX | SUFFIX`.
    pub const SUBSTRING: QueryOp = QueryOp(ASL_QUERY_OP_SUBSTRING);
    pub const NUMERIC: QueryOp = QueryOp(ASL_QUERY_OP_NUMERIC);
    pub const REGEX: QueryOp = QueryOp(ASL_QUERY_OP_REGEX);

    /// Validate raw operation bits.
    ///
    /// Fails with `InvalidArgument` if unknown bits are set or the
    /// comparison bits are not one of `EQUAL` … `TRUE`.
    pub fn from_bits(bits: u32) -> Result<QueryOp> {
        if bits & !(ASL_QUERY_OP_MASK | ASL_QUERY_OP_MODIFIER_MASK) != 0 {
            return Err(AslError::InvalidArgument(format!("query operation {:#x} has unknown bits", bits)));
        }
        let base = bits & ASL_QUERY_OP_MASK;
        if !(ASL_QUERY_OP_EQUAL..=ASL_QUERY_OP_TRUE).contains(&base) {
            return Err(AslError::InvalidArgument(format!(
                "query operation {:#x} has no valid comparison",
                bits
            )));
        }

        Ok(QueryOp(bits))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// The comparison without modifiers.
    pub const fn comparison(self) -> QueryOp {
        QueryOp(self.0 & ASL_QUERY_OP_MASK)
    }

    pub const fn contains(
        self,
        other: QueryOp,
    ) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_casefold(self) -> bool {
        self.contains(QueryOp::CASEFOLD)
    }

    pub const fn is_numeric(self) -> bool {
        self.contains(QueryOp::NUMERIC)
    }

    pub const fn is_regex(self) -> bool {
        self.contains(QueryOp::REGEX)
    }
}

impl std::ops::BitOr for QueryOp {
    type Output = QueryOp;

    fn bitor(self, rhs: QueryOp) -> QueryOp {
        QueryOp(self.0 | rhs.0)
    }
}

impl fmt::Debug for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryOp({:#05x})", self.0)
    }
}

/// Parse the short operator names used by query front ends, e.g. `"eq"`,
/// `"Cstartswith"`, `">="`.
///
/// A leading `C` adds `CASEFOLD`. The symbolic forms compare numerically.
impl FromStr for QueryOp {
    type Err = AslError;

    fn from_str(s: &str) -> Result<QueryOp> {
        let numeric: Option<QueryOp> = match s {
            "==" => Some(QueryOp::EQUAL),
            "!=" => Some(QueryOp::NOT_EQUAL),
            ">" => Some(QueryOp::GREATER),
            ">=" => Some(QueryOp::GREATER_EQUAL),
            "<" => Some(QueryOp::LESS),
            "<=" => Some(QueryOp::LESS_EQUAL),
            _ => None,
        };
        if let Some(op) = numeric {
            return Ok(op | QueryOp::NUMERIC);
        }

        let (name, casefold) = match s.strip_prefix('C') {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        let op: QueryOp = match name {
            "eq" => QueryOp::EQUAL,
            "ne" => QueryOp::NOT_EQUAL,
            "gt" => QueryOp::GREATER,
            "ge" => QueryOp::GREATER_EQUAL,
            "lt" => QueryOp::LESS,
            "le" => QueryOp::LESS_EQUAL,
            "match" => QueryOp::REGEX | QueryOp::EQUAL,
            "startswith" => QueryOp::EQUAL | QueryOp::PREFIX,
            "endswith" => QueryOp::EQUAL | QueryOp::SUFFIX,
            "contains" => QueryOp::EQUAL | QueryOp::SUBSTRING,
            _ => {
                return Err(AslError::InvalidArgument(format!("invalid query operation {:?}", s)));
            }
        };

        if casefold {
            Ok(op | QueryOp::CASEFOLD)
        } else {
            Ok(op)
        }
    }
}

/// One compiled per-key match rule.
#[derive(Debug)]
pub struct QueryPredicate {
    key: String,
    value: String,
    op: QueryOp,
    regex: Option<Regex>,
}

impl QueryPredicate {
    /// Compile a predicate. Fails with `InvalidArgument` for a `REGEX`
    /// operation whose value is not a valid pattern.
    pub fn new(
        key: &str,
        value: &str,
        op: QueryOp,
    ) -> Result<QueryPredicate> {
        let regex: Option<Regex> = if op.is_regex() {
            match RegexBuilder::new(value)
                .case_insensitive(op.is_casefold())
                .build()
            {
                Ok(re) => Some(re),
                Err(err) => {
                    return Err(AslError::InvalidArgument(format!("invalid pattern {:?}: {}", value, err)));
                }
            }
        } else {
            None
        };

        Ok(QueryPredicate {
            key: key.to_string(),
            value: value.to_string(),
            op,
            regex,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn op(&self) -> QueryOp {
        self.op
    }

    /// Does an attribute value (`None` if the key is absent) satisfy this
    /// predicate?
    ///
    /// An absent key only satisfies `NOT_EQUAL`.
    pub fn matches(
        &self,
        found: Option<&str>,
    ) -> bool {
        let comparison = self.op.comparison();
        let found: &str = match found {
            Some(found) => found,
            None => return comparison == QueryOp::NOT_EQUAL,
        };
        if comparison == QueryOp::TRUE {
            return true;
        }

        if let Some(regex) = &self.regex {
            let hit = regex.is_match(found);
            return match comparison {
                QueryOp::NOT_EQUAL => !hit,
                _ => hit,
            };
        }

        if self.op.is_numeric() {
            return match (found.trim().parse::<i64>(), self.value.trim().parse::<i64>()) {
                (Ok(lhs), Ok(rhs)) => Self::compare(comparison, lhs.cmp(&rhs)),
                _ => false,
            };
        }

        let (lhs, rhs): (String, String) = if self.op.is_casefold() {
            (found.to_lowercase(), self.value.to_lowercase())
        } else {
            (found.to_string(), self.value.to_string())
        };

        let partial: Option<bool> = if self.op.contains(QueryOp::SUBSTRING) {
            Some(lhs.contains(rhs.as_str()))
        } else if self.op.contains(QueryOp::PREFIX) {
            Some(lhs.starts_with(rhs.as_str()))
        } else if self.op.contains(QueryOp::SUFFIX) {
            Some(lhs.ends_with(rhs.as_str()))
        } else {
            None
        };
        match partial {
            Some(hit) => match comparison {
                QueryOp::NOT_EQUAL => !hit,
                _ => hit,
            },
            None => Self::compare(comparison, lhs.as_str().cmp(rhs.as_str())),
        }
    }

    fn compare(
        comparison: QueryOp,
        ordering: Ordering,
    ) -> bool {
        match comparison {
            QueryOp::EQUAL => ordering == Ordering::Equal,
            QueryOp::NOT_EQUAL => ordering != Ordering::Equal,
            QueryOp::GREATER => ordering == Ordering::Greater,
            QueryOp::GREATER_EQUAL => ordering != Ordering::Less,
            QueryOp::LESS => ordering == Ordering::Less,
            QueryOp::LESS_EQUAL => ordering != Ordering::Greater,
            _ => false,
        }
    }
}
