//! Target pattern library
//!
//! Chart formations expressed as short sequences centred around `1.0`.
//! Search the log of a pattern against log prices (see [`Pattern::ln`]) so
//! that a match means the same *relative* movement at any price level.
//!
//! # Example
//!
//! ```rust
//! use shapefinder::patterns::{NamedPattern, LONG_SCALES};
//!
//! let target = NamedPattern::SymTriangleBear.pattern().ln().unwrap();
//! assert_eq!(target.len(), 5);
//! assert_eq!(LONG_SCALES.len(), 5);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::{MatchError, Result, Scale};

// ============================================================
// SCALE SETS
// ============================================================

/// Short-horizon stretches of a pattern (timesteps per pattern segment)
pub const SHORT_SCALES: [usize; 5] = [2, 4, 6, 8, 10];
/// Long-horizon stretches of a pattern (timesteps per pattern segment)
pub const LONG_SCALES: [usize; 5] = [20, 30, 40, 50, 60];

/// Validate a list of raw scale values
pub fn scales(values: &[usize]) -> Result<Vec<Scale>> {
  values.iter().map(|&v| Scale::new(v)).collect()
}

// ============================================================
// GENERATORS
// ============================================================

/// Number of turning points in every generated formation
pub const FORMATION_POINTS: usize = 5;

/// Triangle wave alternating between a collapsing top and bottom edge.
///
/// - `opening`: initial height of the triangle
/// - `collapse_grad`: how fast top and bottom move towards each other
/// - `direc_grad`: overall drift of the formation
/// - `bull`: start on the top edge (bullish) rather than the bottom
pub fn triangle(opening: f64, collapse_grad: f64, direc_grad: f64, bull: bool) -> [f64; FORMATION_POINTS] {
  let mut out = [0.0; FORMATION_POINTS];
  let mut on_top = bull;
  for (n, v) in out.iter_mut().enumerate() {
    let n = n as f64;
    *v = if on_top {
      1.0 + opening + n * (direc_grad - collapse_grad)
    } else {
      1.0 + n * (direc_grad + collapse_grad)
    };
    on_top = !on_top;
  }
  out
}

/// Flat channel alternating between `1 + opening` and `1`.
pub fn rectangle(opening: f64, bull: bool) -> [f64; FORMATION_POINTS] {
  let mut out = [0.0; FORMATION_POINTS];
  let mut on_top = bull;
  for v in out.iter_mut() {
    *v = if on_top { 1.0 + opening } else { 1.0 };
    on_top = !on_top;
  }
  out
}

// ============================================================
// PATTERN VALUE
// ============================================================

/// A named, immutable target sequence (at least two finite values).
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
  name: String,
  values: Vec<f64>,
}

impl Pattern {
  pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
    if values.len() < 2 {
      return Err(MatchError::InsufficientData { need: 2, got: values.len() });
    }
    if values.iter().any(|v| !v.is_finite()) {
      return Err(MatchError::InvalidValue("Pattern values must be finite"));
    }
    Ok(Self { name: name.into(), values })
  }

  /// Natural log of every value; all values must be positive.
  pub fn ln(&self) -> Result<Self> {
    if self.values.iter().any(|&v| v <= 0.0) {
      return Err(MatchError::InvalidValue("Cannot take the log of a non-positive pattern value"));
    }
    Ok(Self { name: self.name.clone(), values: self.values.iter().map(|v| v.ln()).collect() })
  }

  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[inline]
  pub fn values(&self) -> &[f64] {
    &self.values
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.values.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

// ============================================================
// NAMED LIBRARY
// ============================================================

/// The fixed set of named formations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NamedPattern {
  SymTriangleBull,
  SymTriangleBear,
  AscTriangle,
  DesTriangle,
  FallWedge,
  RiseWedge,
  RectangleBull,
  RectangleBear,
}

impl NamedPattern {
  pub const ALL: [NamedPattern; 8] = [
    NamedPattern::SymTriangleBull,
    NamedPattern::SymTriangleBear,
    NamedPattern::AscTriangle,
    NamedPattern::DesTriangle,
    NamedPattern::FallWedge,
    NamedPattern::RiseWedge,
    NamedPattern::RectangleBull,
    NamedPattern::RectangleBear,
  ];

  pub fn name(self) -> &'static str {
    match self {
      NamedPattern::SymTriangleBull => "SYM_TRIANGLE_BULL",
      NamedPattern::SymTriangleBear => "SYM_TRIANGLE_BEAR",
      NamedPattern::AscTriangle => "ASC_TRIANGLE",
      NamedPattern::DesTriangle => "DES_TRIANGLE",
      NamedPattern::FallWedge => "FALL_WEDGE",
      NamedPattern::RiseWedge => "RISE_WEDGE",
      NamedPattern::RectangleBull => "RECTANGLE_BULL",
      NamedPattern::RectangleBear => "RECTANGLE_BEAR",
    }
  }

  pub fn values(self) -> [f64; FORMATION_POINTS] {
    match self {
      NamedPattern::SymTriangleBull => triangle(0.04, 0.004, 0.0, true),
      NamedPattern::SymTriangleBear => triangle(0.04, 0.004, 0.0, false),
      NamedPattern::AscTriangle => triangle(0.04, 0.004, 0.004, true),
      NamedPattern::DesTriangle => triangle(0.04, 0.004, -0.004, false),
      NamedPattern::FallWedge => triangle(0.03, 0.003, -0.008, true),
      NamedPattern::RiseWedge => triangle(0.03, 0.003, 0.008, false),
      NamedPattern::RectangleBull => rectangle(0.03, true),
      NamedPattern::RectangleBear => rectangle(0.03, false),
    }
  }

  pub fn pattern(self) -> Pattern {
    Pattern { name: self.name().to_string(), values: self.values().to_vec() }
  }
}

impl fmt::Display for NamedPattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for NamedPattern {
  type Err = MatchError;

  fn from_str(s: &str) -> Result<Self> {
    let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
    NamedPattern::ALL
      .into_iter()
      .find(|p| p.name() == wanted)
      .ok_or_else(|| MatchError::InvalidConfig(format!("unknown pattern '{}'", s)))
  }
}

// ============================================================
// TESTS
// ============================================================
