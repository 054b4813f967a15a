//! Counter names and the stable actor ids derived from them.
//!
//! - `CounterName`: the user-facing key (`"global"` when omitted)
//! - `ActorId`: BLAKE3 digest of the name, hex encoded; names the store namespace

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Name used when a caller does not pick a counter.
pub const DEFAULT_COUNTER: &str = "global";

/// Name of a counter, cheap to clone.
///
/// Any string is a valid name, including the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterName(Arc<str>);

impl CounterName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Decode a percent-encoded path segment (e.g. `/counters/my%20counter`).
    pub fn from_segment(encoded: &str) -> Self {
        use percent_encoding::percent_decode_str;
        let decoded = percent_decode_str(encoded)
            .decode_utf8()
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| encoded.to_string());
        Self::new(decoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable actor id for this name.
    pub fn actor_id(&self) -> ActorId {
        ActorId::from_name(self.as_str())
    }
}

impl Default for CounterName {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTER)
    }
}

impl fmt::Display for CounterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CounterName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CounterName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Stable identifier derived from a counter name.
///
/// Same name, same id, on every run and every host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId([u8; 32]);

impl ActorId {
    pub fn from_name(name: &str) -> Self {
        Self(*blake3::hash(name.as_bytes()).as_bytes())
    }

    /// Parse the hex form produced by `to_hex`.
    #[cfg(test)]
    pub fn from_hex(hex_id: &str) -> Option<Self> {
        let bytes = hex::decode(hex_id).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form for log lines
        f.write_str(&self.to_hex()[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name() {
        assert_eq!(CounterName::default().as_str(), "global");
    }

    #[test]
    fn test_actor_id_is_stable() {
        let a = CounterName::new("test").actor_id();
        let b = CounterName::new("test").actor_id();
        let c = CounterName::new("other").actor_id();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_actor_id_hex_roundtrip() {
        let id = ActorId::from_name("persist");
        let hex_id = id.to_hex();
        assert_eq!(hex_id.len(), 64);
        assert_eq!(ActorId::from_hex(&hex_id), Some(id));
        assert_eq!(ActorId::from_hex("zz"), None);
        assert_eq!(ActorId::from_hex("abcd"), None);
    }

    #[test]
    fn test_display_is_short() {
        let id = ActorId::from_name("global");
        assert_eq!(id.to_string().len(), 12);
        assert!(id.to_hex().starts_with(&id.to_string()));
    }

    #[test]
    fn test_from_segment_decodes() {
        assert_eq!(CounterName::from_segment("my%20counter").as_str(), "my counter");
        assert_eq!(CounterName::from_segment("plain").as_str(), "plain");
        // Invalid UTF-8 falls back to the raw segment
        assert_eq!(CounterName::from_segment("%FF").as_str(), "%FF");
    }

    #[test]
    fn test_empty_name_is_valid() {
        let name = CounterName::new("");
        assert_eq!(name.as_str(), "");
        assert_ne!(name.actor_id(), CounterName::default().actor_id());
    }
}
