//! Deserialization helpers shared by the REST and Gateway decode paths.
//!
//! The API adds fields over time, so decoding never fails on unknown keys.
//! With the `tracing` feature enabled, unknown fields are logged at `warn`
//! and decode failures are replayed through [`serde_path_to_error`] to name
//! the exact path that did not match.

use serde::de::DeserializeOwned;
use serde_json::Value;

#[cfg(feature = "tracing")]
pub(crate) fn deserialize_with_warnings<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    use std::any::type_name;

    let original = value.clone();
    let mut unknown = Vec::new();

    match serde_ignored::deserialize::<_, _, T>(value, |path| unknown.push(path.to_string())) {
        Ok(parsed) => {
            for field in unknown {
                tracing::warn!(
                    type_name = type_name::<T>(),
                    %field,
                    "unknown field in API payload"
                );
            }
            Ok(parsed)
        }
        Err(e) => {
            if let Err(path_err) = serde_path_to_error::deserialize::<_, T>(original) {
                tracing::error!(
                    type_name = type_name::<T>(),
                    path = %path_err.path(),
                    error = %path_err.inner(),
                    "payload deserialization failed"
                );
            }
            Err(e.into())
        }
    }
}

#[cfg(not(feature = "tracing"))]
pub(crate) fn deserialize_with_warnings<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::deserialize_with_warnings;

    #[derive(Debug, Deserialize)]
    struct Probe {
        id: String,
        count: u64,
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let value = json!({ "id": "abc", "count": 3, "added_in_v10": true });

        let probe: Probe = deserialize_with_warnings(value).expect("decode failed");

        assert_eq!(probe.id, "abc");
        assert_eq!(probe.count, 3);
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let value = json!({ "id": "abc", "count": "three" });

        let result: crate::Result<Probe> = deserialize_with_warnings(value);

        assert!(result.is_err(), "string should not decode as u64");
    }
}
