//! Size-bounded JSON encoding for device messages.
//!
//! The watch reads each message into a 4096-byte inbox. Lists are sent as a
//! JSON string, so a list that would not fit is cut from the tail until it
//! does. Truncation never reorders: what survives is always the longest
//! prefix of the input that fits.

use serde::Serialize;

/// Largest payload we put in one message, leaving room for framing.
pub const MAX_PAYLOAD_BYTES: usize = 4000;

/// Errors from bounded encoding.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Even an empty list exceeds the bound.
    #[error("nothing fits in {max_bytes} bytes")]
    Unfittable { max_bytes: usize },
}

/// A serialized prefix of a record list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// JSON array text, at most the requested number of bytes long.
    pub json: String,
    /// How many leading records made it in.
    pub kept: usize,
    /// How many trailing records were dropped.
    pub dropped: usize,
}

/// Serialize `records` as a JSON array of at most `max_bytes` UTF-8 bytes.
///
/// Serializes the full list, then drops the last record and re-serializes
/// until the text fits. Lists are tens of entries long, so the repeated
/// serialization is cheap.
///
/// # Examples
///
/// ```
/// use departure_relay::encode::encode_bounded;
///
/// let rows = vec![["a", "b"], ["c", "d"], ["e", "f"]];
///
/// let all = encode_bounded(&rows, 100).unwrap();
/// assert_eq!(all.json, r#"[["a","b"],["c","d"],["e","f"]]"#);
/// assert_eq!(all.dropped, 0);
///
/// let cut = encode_bounded(&rows, 21).unwrap();
/// assert_eq!(cut.json, r#"[["a","b"],["c","d"]]"#);
/// assert_eq!(cut.kept, 2);
/// ```
pub fn encode_bounded<T: Serialize>(records: &[T], max_bytes: usize) -> Result<Encoded, EncodeError> {
    let mut kept = records.len();
    let mut json = serde_json::to_string(records)?;

    while json.len() > max_bytes {
        if kept == 0 {
            return Err(EncodeError::Unfittable { max_bytes });
        }
        kept -= 1;
        json = serde_json::to_string(&records[..kept])?;
    }

    Ok(Encoded {
        json,
        kept,
        dropped: records.len() - kept,
    })
}

/// [`encode_bounded`] at the device limit.
pub fn encode_for_device<T: Serialize>(records: &[T]) -> Result<Encoded, EncodeError> {
    encode_bounded(records, MAX_PAYLOAD_BYTES)
}

/// Accept `text` only if it is at most `max_bytes` UTF-8 bytes long.
///
/// For payloads that cannot be shortened without changing their meaning.
pub fn ensure_fits(text: String, max_bytes: usize) -> Result<String, EncodeError> {
    if text.len() > max_bytes {
        return Err(EncodeError::Unfittable { max_bytes });
    }
    Ok(text)
}

/// Serialize a single value, failing if it exceeds the device limit.
pub fn encode_value_for_device<T: Serialize>(value: &T) -> Result<String, EncodeError> {
    ensure_fits(serde_json::to_string(value)?, MAX_PAYLOAD_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<[String; 4]> {
        (0..n)
            .map(|i| {
                [
                    format!("{}", i % 20),
                    format!("Destination number {i}"),
                    format!("{}:{:02}", 8 + i / 60, i % 60),
                    format!("{}", i % 4),
                ]
            })
            .collect()
    }

    #[test]
    fn fitting_list_is_unchanged() {
        let input = rows(5);
        let encoded = encode_for_device(&input).unwrap();
        assert_eq!(encoded.json, serde_json::to_string(&input).unwrap());
        assert_eq!(encoded.kept, 5);
        assert_eq!(encoded.dropped, 0);
    }

    #[test]
    fn empty_list_encodes_as_brackets() {
        let input: Vec<[String; 4]> = Vec::new();
        let encoded = encode_for_device(&input).unwrap();
        assert_eq!(encoded.json, "[]");
        assert_eq!(encoded.kept, 0);
    }

    #[test]
    fn oversized_list_keeps_longest_fitting_prefix() {
        let input = rows(200);
        let encoded = encode_for_device(&input).unwrap();

        assert!(encoded.json.len() <= MAX_PAYLOAD_BYTES);
        assert!(encoded.kept < 200);
        assert_eq!(encoded.json, serde_json::to_string(&input[..encoded.kept]).unwrap());

        // One more would not have fitted.
        let one_more = serde_json::to_string(&input[..encoded.kept + 1]).unwrap();
        assert!(one_more.len() > MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn bound_counts_bytes_not_chars() {
        let input = vec!["ö".repeat(10)];
        // 10 two-byte chars plus quotes and brackets
        assert_eq!(encode_bounded(&input, 24).unwrap().kept, 1);
        assert_eq!(encode_bounded(&input, 23).unwrap().kept, 0);
    }

    #[test]
    fn unfittable_bound_is_an_error() {
        let input = rows(1);
        let err = encode_bounded(&input, 1).unwrap_err();
        assert!(matches!(err, EncodeError::Unfittable { max_bytes: 1 }));
    }

    #[test]
    fn ensure_fits_is_inclusive() {
        assert_eq!(ensure_fits("abcd".to_string(), 4).unwrap(), "abcd");
        assert!(matches!(
            ensure_fits("abcde".to_string(), 4),
            Err(EncodeError::Unfittable { max_bytes: 4 })
        ));
        // Bytes, not characters
        assert!(ensure_fits("üü".to_string(), 3).is_err());
    }

    #[test]
    fn single_value_is_bounded() {
        let short = ("18", "Bonn Hbf");
        assert_eq!(encode_value_for_device(&short).unwrap(), r#"["18","Bonn Hbf"]"#);

        let long = ("18", "x".repeat(MAX_PAYLOAD_BYTES));
        assert!(matches!(
            encode_value_for_device(&long),
            Err(EncodeError::Unfittable { .. })
        ));
    }
}
