//! Array Shape Rules
//!
//! Secondary arrays of an array-owning node take their default shape from a
//! base shape (the primary array's, or the configured default) through a
//! [`ShapeRule`]. Rules are written in manifests as short strings:
//!
//! | rule          | result for base `(n, rows, cols)` |
//! |---------------|-----------------------------------|
//! | `trailing`    | trailing `ndim` dims of the base  |
//! | `lr`          | `(n, rows, 4)`                    |
//! | `tb`          | `(n, 4, cols)`                    |
//! | `amp33`       | `(n, rows, 128)`                  |
//! | `fixed:2x3`   | `(2, 3)`                          |
//!
//! `lr`, `tb` and `amp33` take an optional size suffix (`lr:8`,
//! `amp33:8x128`).

use crate::error::ShapeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Width of reference-pixel borders
pub const BORDER_WIDTH: usize = 4;

/// Group count used by `amp33` when the base has no leading dimension
pub const AMP33_GROUPS: usize = 8;

/// Last-dimension width of `amp33` arrays
pub const AMP33_WIDTH: usize = 128;

/// Rule deriving a secondary array shape from a base shape
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShapeRule {
    /// Trailing `ndim` dimensions of the base
    #[default]
    Trailing,
    /// Last dimension replaced by `width`
    LeftRight { width: usize },
    /// Second-to-last dimension replaced by `width`
    TopBottom { width: usize },
    /// `(n, rows, width)`; `n` is the leading dim of a 3-D base or `groups`
    Amp33 { groups: usize, width: usize },
    /// Independent of the base
    Fixed(Vec<usize>),
}

impl ShapeRule {
    /// Apply the rule to `base`, then keep the trailing `ndim` dimensions
    ///
    /// # Errors
    ///
    /// Returns `ShapeError::RankMismatch` when the base has fewer dimensions
    /// than the rule or the field requires.
    pub fn derive(&self, field: &str, base: &[usize], ndim: Option<usize>) -> Result<Vec<usize>, ShapeError> {
        let rank_error = |expected: usize| ShapeError::RankMismatch {
            field: field.to_string(),
            expected,
            actual: base.len(),
        };

        let shape = match self {
            ShapeRule::Trailing => base.to_vec(),
            ShapeRule::LeftRight { width } => {
                let mut shape = base.to_vec();
                let last = shape.last_mut().ok_or_else(|| rank_error(1))?;
                *last = *width;
                shape
            }
            ShapeRule::TopBottom { width } => {
                if base.len() < 2 {
                    return Err(rank_error(2));
                }
                let mut shape = base.to_vec();
                let position = shape.len() - 2;
                shape[position] = *width;
                shape
            }
            ShapeRule::Amp33 { groups, width } => match base {
                [n, rows, _] => vec![*n, *rows, *width],
                [rows, _] => vec![*groups, *rows, *width],
                _ => return Err(rank_error(2)),
            },
            ShapeRule::Fixed(shape) => return Ok(shape.clone()),
        };

        match ndim {
            Some(ndim) => trailing(field, &shape, ndim),
            None => Ok(shape),
        }
    }
}

/// Trailing `ndim` dimensions of `shape`
pub fn trailing(field: &str, shape: &[usize], ndim: usize) -> Result<Vec<usize>, ShapeError> {
    if shape.len() < ndim {
        return Err(ShapeError::RankMismatch {
            field: field.to_string(),
            expected: ndim,
            actual: shape.len(),
        });
    }
    Ok(shape[shape.len() - ndim..].to_vec())
}

fn parse_dims(text: &str) -> Option<Vec<usize>> {
    text.split('x').map(|dim| dim.trim().parse().ok()).collect()
}

impl FromStr for ShapeRule {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ShapeError::UnknownRule(s.to_string());
        let (name, size) = match s.split_once(':') {
            Some((name, size)) => (name.trim(), Some(size.trim())),
            None => (s.trim(), None),
        };
        let width = |default: usize| match size {
            Some(size) => size.parse::<usize>().map_err(|_| unknown()),
            None => Ok(default),
        };

        match name {
            "trailing" if size.is_none() => Ok(ShapeRule::Trailing),
            "lr" => Ok(ShapeRule::LeftRight {
                width: width(BORDER_WIDTH)?,
            }),
            "tb" => Ok(ShapeRule::TopBottom {
                width: width(BORDER_WIDTH)?,
            }),
            "amp33" => match size {
                None => Ok(ShapeRule::Amp33 {
                    groups: AMP33_GROUPS,
                    width: AMP33_WIDTH,
                }),
                Some(size) => match parse_dims(size).as_deref() {
                    Some([groups, width]) => Ok(ShapeRule::Amp33 {
                        groups: *groups,
                        width: *width,
                    }),
                    _ => Err(unknown()),
                },
            },
            "fixed" => size
                .and_then(parse_dims)
                .filter(|dims| !dims.is_empty())
                .map(ShapeRule::Fixed)
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for ShapeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeRule::Trailing => write!(f, "trailing"),
            ShapeRule::LeftRight { width } => write!(f, "lr:{}", width),
            ShapeRule::TopBottom { width } => write!(f, "tb:{}", width),
            ShapeRule::Amp33 { groups, width } => write!(f, "amp33:{}x{}", groups, width),
            ShapeRule::Fixed(shape) => {
                let dims: Vec<String> = shape.iter().map(|dim| dim.to_string()).collect();
                write!(f, "fixed:{}", dims.join("x"))
            }
        }
    }
}

impl TryFrom<String> for ShapeRule {
    type Error = ShapeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShapeRule> for String {
    fn from(rule: ShapeRule) -> Self {
        rule.to_string()
    }
}

/// Array fields of a node class: the primary field plus per-field rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayLayout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    primary: Option<String>,
    #[serde(default)]
    rules: BTreeMap<String, ShapeRule>,
}

impl ArrayLayout {
    pub fn new(primary: Option<String>) -> Self {
        Self {
            primary,
            rules: BTreeMap::new(),
        }
    }

    pub fn with_rule(mut self, field: impl Into<String>, rule: ShapeRule) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    /// Field whose shape drives the others
    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Rule for `field`, `Trailing` when none is declared
    pub fn rule(&self, field: &str) -> ShapeRule {
        self.rules.get(field).cloned().unwrap_or_default()
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &ShapeRule)> {
        self.rules.iter().map(|(field, rule)| (field.as_str(), rule))
    }
}

#[cfg(test)]
#[path = "shape_test.rs"]
mod shape_test;
