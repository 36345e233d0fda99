//! Common Procurement Vocabulary codes.
//!
//! A CPV code such as `45210000-3` is an eight-digit numeric body followed by a check
//! digit. The body is hierarchical: each level refines the previous one by replacing a
//! trailing zero, so category matching reduces to a prefix test on the body once its
//! trailing zeros are removed.

use crate::error::{ProcurementError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CPV_BODY_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CpvLevel {
    Division,
    Group,
    Class,
    Category,
    Subcategory,
}

impl CpvLevel {
    pub fn from_depth(depth: u8) -> Option<Self> {
        match depth {
            1 => Some(Self::Division),
            2 => Some(Self::Group),
            3 => Some(Self::Class),
            4 => Some(Self::Category),
            5 => Some(Self::Subcategory),
            _ => None,
        }
    }

    pub fn depth(self) -> u8 {
        match self {
            Self::Division => 1,
            Self::Group => 2,
            Self::Class => 3,
            Self::Category => 4,
            Self::Subcategory => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CpvCode {
    body: String,
    check_digit: Option<u8>,
}

impl CpvCode {
    /// Parses `45210000-3`, `45210000` or `452100003`. Returns `None` when the input
    /// carries no digits at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let body = normalize_body(raw);
        if body.is_empty() {
            return None;
        }

        let check_digit = match raw.split_once('-') {
            Some((_, tail)) => tail
                .chars()
                .find(|c| c.is_ascii_digit())
                .and_then(|c| c.to_digit(10))
                .map(|d| d as u8),
            None => {
                let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();
                digits
                    .get(CPV_BODY_LEN)
                    .and_then(|c| c.to_digit(10))
                    .map(|d| d as u8)
            }
        };

        Some(Self { body, check_digit })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn check_digit(&self) -> Option<u8> {
        self.check_digit
    }

    pub fn significant_prefix(&self) -> String {
        significant_prefix(&self.body)
    }

    pub fn depth(&self) -> Result<u8> {
        cpv_depth(&self.body)
    }

    pub fn level(&self) -> Result<CpvLevel> {
        let depth = self.depth()?;
        CpvLevel::from_depth(depth)
            .ok_or_else(|| ProcurementError::InvalidCpvCode(self.body.clone()))
    }

    /// True when this code falls under the category identified by `prefix`.
    pub fn is_within(&self, prefix: &str) -> bool {
        self.body.starts_with(prefix)
    }
}

impl fmt::Display for CpvCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.check_digit {
            Some(d) => write!(f, "{}-{}", self.body, d),
            None => f.write_str(&self.body),
        }
    }
}

/// Digits of the numeric body (the part before any `-check` suffix), truncated to
/// eight characters.
pub fn normalize_body(raw: &str) -> String {
    let head = raw.split_once('-').map(|(head, _)| head).unwrap_or(raw);
    head.chars()
        .filter(|c| c.is_ascii_digit())
        .take(CPV_BODY_LEN)
        .collect()
}

/// Shortest distinguishing digit sequence of a CPV code: the normalized body with its
/// trailing zeros removed. An all-zero body keeps its full form; input with no digits
/// yields an empty prefix.
pub fn significant_prefix(raw: &str) -> String {
    let body = normalize_body(raw);
    let trimmed = body.trim_end_matches('0');
    if trimmed.is_empty() {
        body
    } else {
        trimmed.to_string()
    }
}

/// Hierarchy depth of an eight-digit body, decided purely by its trailing zeros.
pub fn cpv_depth(body: &str) -> Result<u8> {
    if body.len() != CPV_BODY_LEN || !body.chars().all(|c| c.is_ascii_digit()) {
        return Err(ProcurementError::InvalidCpvCode(body.to_string()));
    }

    let depth = if body.ends_with("000000") {
        1
    } else if body.ends_with("00000") {
        2
    } else if body.ends_with("0000") {
        3
    } else if body.ends_with("000") {
        4
    } else {
        5
    };

    Ok(depth)
}
