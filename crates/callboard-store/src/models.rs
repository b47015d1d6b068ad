//! Row and error models of the table API (serde).

use callboard_core::SeriesModel;
use serde::{Deserialize, Serialize};

/// Row projection returned by `select=chart_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRow {
  /// Stored series.
  pub chart_data: SeriesModel
}

/// API error body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiError {
  /// Error code (`PGRST116`, `42P01`, ...).
  #[serde(default)]
  pub code: Option<String>,
  /// Human-readable message.
  #[serde(default)]
  pub message: Option<String>,
  /// Details, if any.
  #[serde(default)]
  pub details: Option<String>
}

/// "The result contains 0 rows" for single-object requests.
pub const NO_ROWS_CODE: &str = "PGRST116";

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
  use super::*;

  #[test]
  fn chart_row_deserialize() {
    let json = r#"[{"chart_data":[
      {"day":"Mon","duration":1},{"day":"Tue","duration":2},{"day":"Wed","duration":3},
      {"day":"Thu","duration":4},{"day":"Fri","duration":5}
    ]}]"#;
    let rows: Vec<ChartRow> = serde_json::from_str(json).expect("deserialize");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].chart_data.values(), [1.0, 2.0, 3.0, 4.0, 5.0]);
  }

  #[test]
  fn chart_row_rejects_incomplete_series() {
    let json = r#"[{"chart_data":[{"day":"Mon","duration":1}]}]"#;
    assert!(serde_json::from_str::<Vec<ChartRow>>(json).is_err());
  }

  #[test]
  fn api_error_fields_optional() {
    let e: ApiError = serde_json::from_str(r#"{"code":"PGRST116"}"#).expect("deserialize");
    assert_eq!(e.code.as_deref(), Some(NO_ROWS_CODE));
    assert!(e.message.is_none());
  }
}
