//! Call-duration series: five weekday points, always in canonical order.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Weekday label of a series point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
  /// Monday.
  Mon,
  /// Tuesday.
  Tue,
  /// Wednesday.
  Wed,
  /// Thursday.
  Thu,
  /// Friday.
  Fri
}

impl Weekday {
  /// All labels in canonical order.
  pub const ALL: [Self; 5] = [Self::Mon, Self::Tue, Self::Wed, Self::Thu, Self::Fri];

  /// Textual label (`"Mon"` .. `"Fri"`).
  #[must_use]
  pub const fn label(self) -> &'static str {
    match self {
      Self::Mon => "Mon",
      Self::Tue => "Tue",
      Self::Wed => "Wed",
      Self::Thu => "Thu",
      Self::Fri => "Fri"
    }
  }

  const fn index(self) -> usize {
    self as usize
  }
}

impl fmt::Display for Weekday {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Label is not one of `Mon`..`Fri`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown weekday label: {0:?}")]
pub struct UnknownLabel(pub String);

impl FromStr for Weekday {
  type Err = UnknownLabel;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|d| d.label() == s)
      .ok_or_else(|| UnknownLabel(s.to_string()))
  }
}

/// One point of the series, as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
  /// Weekday label.
  pub day: Weekday,
  /// Duration in minutes.
  pub duration: f64
}

/// Values used before anything is loaded and when no record exists.
const DEFAULT_VALUES: [f64; 5] = [22.0, 45.0, 38.0, 55.0, 42.0];

/// Call duration per weekday, in minutes.
///
/// Holds exactly one finite, non-negative value per [`Weekday`]; the label
/// set and order cannot change after construction. Serializes as a JSON
/// array of [`SeriesPoint`] in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SeriesPoint>", into = "Vec<SeriesPoint>")]
pub struct SeriesModel {
  values: [f64; 5]
}

impl Default for SeriesModel {
  fn default() -> Self {
    Self {
      values: DEFAULT_VALUES
    }
  }
}

impl SeriesModel {
  /// Build a series from values in canonical order.
  ///
  /// # Errors
  ///
  /// Returns [`SeriesError::InvalidValue`] for a negative or non-finite value.
  pub fn from_values(values: [f64; 5]) -> Result<Self, SeriesError> {
    for (day, value) in Weekday::ALL.into_iter().zip(values) {
      if !is_valid_duration(value) {
        return Err(SeriesError::InvalidValue { day, value });
      }
    }
    Ok(Self { values })
  }

  /// Value for `day`.
  #[must_use]
  pub const fn get(&self, day: Weekday) -> f64 {
    self.values[day.index()]
  }

  /// Copy of this series with `day` set to `value`.
  ///
  /// # Errors
  ///
  /// Returns [`SeriesError::InvalidValue`] for a negative or non-finite value.
  pub fn with(mut self, day: Weekday, value: f64) -> Result<Self, SeriesError> {
    if !is_valid_duration(value) {
      return Err(SeriesError::InvalidValue { day, value });
    }
    self.values[day.index()] = value;
    Ok(self)
  }

  /// Values in canonical order.
  #[must_use]
  pub const fn values(&self) -> [f64; 5] {
    self.values
  }

  /// Points in canonical order.
  pub fn points(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
    Weekday::ALL.into_iter().map(|day| SeriesPoint {
      day,
      duration: self.get(day)
    })
  }
}

/// Durations are finite and non-negative.
#[must_use]
pub fn is_valid_duration(value: f64) -> bool {
  value.is_finite() && value >= 0.0
}

/// Parse user input into a duration; `None` when it is not a usable number.
#[must_use]
pub fn parse_duration(raw: &str) -> Option<f64> {
  raw
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|v| is_valid_duration(*v))
    // "-0" passes the filter; store it as 0.
    .map(f64::abs)
}

/// Series construction/decoding error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
  /// Negative or non-finite duration.
  #[error("invalid duration for {day}: {value}")]
  InvalidValue {
    /// Label.
    day: Weekday,
    /// Rejected value.
    value: f64
  },
  /// A label occurs more than once.
  #[error("duplicate label {0}")]
  Duplicate(Weekday),
  /// A label is absent.
  #[error("missing label {0}")]
  Missing(Weekday)
}

impl TryFrom<Vec<SeriesPoint>> for SeriesModel {
  type Error = SeriesError;

  fn try_from(points: Vec<SeriesPoint>) -> Result<Self, Self::Error> {
    let mut slots: [Option<f64>; 5] = [None; 5];

    for point in points {
      let slot = &mut slots[point.day.index()];
      if slot.is_some() {
        return Err(SeriesError::Duplicate(point.day));
      }
      *slot = Some(point.duration);
    }

    let mut values = [0.0; 5];
    for (day, slot) in Weekday::ALL.into_iter().zip(slots) {
      values[day.index()] = slot.ok_or(SeriesError::Missing(day))?;
    }

    Self::from_values(values)
  }
}

impl From<SeriesModel> for Vec<SeriesPoint> {
  fn from(model: SeriesModel) -> Self {
    model.points().collect()
  }
}

impl fmt::Display for SeriesModel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, point) in self.points().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{} {}", point.day, point.duration)?;
    }
    Ok(())
  }
}
