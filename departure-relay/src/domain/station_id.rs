//! Station identifier as exchanged with the watch.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A station id, keeping the JSON kind it arrived as.
///
/// The watch reads numeric ids back as 32-bit integers, so an id that came
/// in as a number has to go back out as one. Anything else is text.
///
/// # Examples
///
/// ```
/// use departure_relay::domain::StationId;
/// use serde_json::json;
///
/// assert_eq!(StationId::from_json(&json!(812)), Some(StationId::Int(812)));
/// assert_eq!(StationId::from_json(&json!(" S1 ")), Some(StationId::Text("S1".into())));
/// assert_eq!(StationId::from_json(&json!("  ")), None);
/// assert_eq!(StationId::Int(812).to_string(), "812");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum StationId {
    Int(i32),
    Text(String),
}

impl StationId {
    /// Read an id from a JSON value.
    ///
    /// Integers in `i32` range stay numeric; larger integers become text.
    /// Strings are trimmed and must not be blank. Fractions, booleans,
    /// null and containers are not ids.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| StationId::Text(trimmed.to_string()))
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(
                        i32::try_from(i)
                            .map(StationId::Int)
                            .unwrap_or_else(|_| StationId::Text(i.to_string())),
                    )
                } else {
                    n.as_u64().map(|u| StationId::Text(u.to_string()))
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationId::Int(i) => write!(f, "{i}"),
            StationId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i32> for StationId {
    fn from(id: i32) -> Self {
        StationId::Int(id)
    }
}

impl From<&str> for StationId {
    fn from(id: &str) -> Self {
        StationId::Text(id.to_string())
    }
}

impl From<String> for StationId {
    fn from(id: String) -> Self {
        StationId::Text(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_stay_numeric() {
        assert_eq!(StationId::from_json(&json!(0)), Some(StationId::Int(0)));
        assert_eq!(StationId::from_json(&json!(-7)), Some(StationId::Int(-7)));
        assert_eq!(
            StationId::from_json(&json!(i32::MAX)),
            Some(StationId::Int(i32::MAX))
        );
    }

    #[test]
    fn out_of_range_integers_become_text() {
        assert_eq!(
            StationId::from_json(&json!(4_000_000_000u64)),
            Some(StationId::Text("4000000000".into()))
        );
        assert_eq!(
            StationId::from_json(&json!(u64::MAX)),
            Some(StationId::Text(u64::MAX.to_string()))
        );
    }

    #[test]
    fn numeric_strings_stay_text() {
        assert_eq!(
            StationId::from_json(&json!("812")),
            Some(StationId::Text("812".into()))
        );
    }

    #[test]
    fn non_ids_are_rejected() {
        assert_eq!(StationId::from_json(&json!("")), None);
        assert_eq!(StationId::from_json(&json!("\t \n")), None);
        assert_eq!(StationId::from_json(&json!(1.5)), None);
        assert_eq!(StationId::from_json(&json!(true)), None);
        assert_eq!(StationId::from_json(&json!(null)), None);
        assert_eq!(StationId::from_json(&json!([1])), None);
    }

    #[test]
    fn serializes_as_its_kind() {
        assert_eq!(serde_json::to_string(&StationId::Int(812)).unwrap(), "812");
        assert_eq!(
            serde_json::to_string(&StationId::from("S1")).unwrap(),
            r#""S1""#
        );
    }
}
