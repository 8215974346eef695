//! Request identifier generation.
//!
//! Identifiers are RFC 4122 version-4 UUIDs rendered as lowercase hyphenated
//! hex (`8-4-4-4-12`). The 16 random bytes come straight from the operating
//! system's CSPRNG. If that source is unavailable, [`generate_or_fallback`]
//! substitutes `fallback-<unix nanos>` so a request is never held up by id
//! assignment.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::warn;
use uuid::Builder;

use crate::error::Error;

/// The identifier carried by one request.
///
/// Either copied verbatim from an inbound header or freshly generated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str { &self.0 }
}

/// Generates a random v4 UUID string.
///
/// Fails only when the OS random source cannot be read.
pub fn generate() -> Result<String, Error> {
    generate_with(|bytes| OsRng.try_fill_bytes(bytes))
}

/// Generates an identifier, degrading to a timestamp when randomness fails.
pub fn generate_or_fallback() -> String {
    generate_or_fallback_with(|bytes| OsRng.try_fill_bytes(bytes))
}

fn generate_with(fill: impl FnOnce(&mut [u8]) -> Result<(), rand::Error>) -> Result<String, Error> {
    let mut bytes = [0u8; 16];
    fill(&mut bytes)?;
    Ok(format_uuid(bytes))
}

fn generate_or_fallback_with(fill: impl FnOnce(&mut [u8]) -> Result<(), rand::Error>) -> String {
    generate_with(fill).unwrap_or_else(|e| {
        warn!(error = %e, "falling back to timestamp request id");
        fallback()
    })
}

/// Stamps the version nibble (4) and the `10` variant bits onto `bytes`.
fn format_uuid(bytes: [u8; 16]) -> String {
    Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}

fn fallback() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("fallback-{nanos}")
}

/// True if `id` has the shape produced by [`generate`].
pub fn is_uuid_v4(id: &str) -> bool {
    let groups: Vec<&str> = id.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    if groups.len() != lengths.len() {
        return false;
    }
    let well_formed = groups.iter().zip(lengths).all(|(group, len)| {
        group.len() == len && group.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    });
    well_formed
        && groups[2].starts_with('4')
        && matches!(groups[3].as_bytes()[0], b'8' | b'9' | b'a' | b'b')
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::test_support::capture_logs;

    #[test]
    fn generated_ids_are_v4_uuids() {
        let id = generate().unwrap();
        assert_eq!(id.len(), 36);
        assert!(is_uuid_v4(&id), "{id}");
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(generate().unwrap(), generate().unwrap());
    }

    #[test]
    fn fallback_embeds_a_timestamp() {
        let id = fallback();
        let nanos = id.strip_prefix("fallback-").unwrap();
        assert!(nanos.parse::<u128>().unwrap() > 0);
    }

    #[test]
    fn unavailable_entropy_is_an_error() {
        let err = generate_with(|_| Err(rand::Error::new("entropy source unavailable"))).unwrap_err();
        assert!(matches!(err, Error::Entropy(_)), "{err:?}");
    }

    #[test]
    fn unavailable_entropy_falls_back_with_a_warning() {
        let (logs, _guard) = capture_logs();

        let id = generate_or_fallback_with(|_| Err(rand::Error::new("entropy source unavailable")));

        assert!(id.starts_with("fallback-"), "{id}");
        assert!(!is_uuid_v4(&id));
        let lines = logs.lines();
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert!(lines[0].contains("WARN"), "{lines:?}");
        assert!(lines[0].contains("entropy source unavailable"), "{lines:?}");
    }

    #[test]
    fn supplied_bytes_decide_the_id() {
        let id = generate_with(|bytes| {
            bytes.fill(0xab);
            Ok(())
        })
        .unwrap();
        assert_eq!(id, "abababab-abab-4bab-abab-abababababab");
    }

    #[test]
    fn shape_check_rejects_near_misses() {
        assert!(!is_uuid_v4("fallback-1700000000000000000"));
        assert!(!is_uuid_v4("3F2504E0-4F89-41D3-9A0C-0305E82C3301"));
        assert!(!is_uuid_v4("3f2504e0-4f89-11d3-9a0c-0305e82c3301"));
        assert!(!is_uuid_v4("3f2504e0-4f89-41d3-7a0c-0305e82c3301"));
        assert!(is_uuid_v4("3f2504e0-4f89-41d3-9a0c-0305e82c3301"));
    }

    proptest! {
        #[test]
        fn any_random_bytes_format_as_v4(bytes in any::<[u8; 16]>()) {
            let id = format_uuid(bytes);
            prop_assert!(is_uuid_v4(&id), "{}", id);
        }
    }
}
