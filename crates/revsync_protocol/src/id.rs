//! Object identifiers and root sets.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Length of an object identifier in bytes.
pub const OBJECT_ID_LEN: usize = 20;

/// Length of the hexadecimal text form of an object identifier.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// Content hash naming one object in a store.
///
/// Object IDs are 160-bit hashes that are:
/// - Compared by value
/// - Immutable once computed
/// - Written on the wire as 40 lowercase hexadecimal characters
///
/// Parsing accepts either case and normalizes to lowercase.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// The all-zero identifier used by reference logs for "no object".
    pub const ZERO: ObjectId = ObjectId([0u8; OBJECT_ID_LEN]);

    /// Creates an object ID from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Parses the 40-character hexadecimal form.
    pub fn from_hex(text: &str) -> ProtocolResult<Self> {
        if text.len() != OBJECT_ID_HEX_LEN {
            return Err(ProtocolError::invalid_identifier(text));
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        hex::decode_to_slice(text, &mut bytes)
            .map_err(|_| ProtocolError::invalid_identifier(text))?;
        Ok(Self(bytes))
    }

    /// Parses the hexadecimal form from raw wire bytes.
    pub fn from_hex_bytes(raw: &[u8]) -> ProtocolResult<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| ProtocolError::invalid_identifier(String::from_utf8_lossy(raw)))?;
        Self::from_hex(text)
    }

    /// Returns the lowercase hexadecimal form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns true for the all-zero sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<ObjectId> for [u8; OBJECT_ID_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// The identifiers a requester wants to be reachable on the other side.
///
/// Order of first insertion is kept and duplicates are dropped, so the
/// initial query batch is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSet {
    ids: Vec<ObjectId>,
    index: HashSet<ObjectId>,
}

impl RootSet {
    /// Creates an empty root set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and collects textual identifiers.
    ///
    /// Fails on the first entry that is not a 40-character hex string.
    pub fn parse<I, S>(items: I) -> ProtocolResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for item in items {
            set.insert(ObjectId::from_hex(item.as_ref())?);
        }
        Ok(set)
    }

    /// Adds an identifier, returning false if it was already present.
    pub fn insert(&mut self, id: ObjectId) -> bool {
        if !self.index.insert(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Returns true if the identifier is a member.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains(id)
    }

    /// Number of roots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if there are no roots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates over roots in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ObjectId> {
        self.ids.iter()
    }

    /// Returns the roots as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ObjectId] {
        &self.ids
    }
}

impl FromIterator<ObjectId> for RootSet {
    fn from_iter<T: IntoIterator<Item = ObjectId>>(iter: T) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RootSet {
    type Item = &'a ObjectId;
    type IntoIter = std::slice::Iter<'a, ObjectId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn parse_normalizes_case() {
        let upper = SAMPLE.to_uppercase();
        let id = ObjectId::from_hex(&upper).unwrap();
        assert_eq!(id.to_hex(), SAMPLE);
        assert_eq!(id, SAMPLE.parse().unwrap());
    }

    #[test]
    fn rejects_wrong_length_and_alphabet() {
        assert!(ObjectId::from_hex("abc").is_err());
        assert!(ObjectId::from_hex(&format!("{SAMPLE}0")).is_err());
        assert!(ObjectId::from_hex("g123456789abcdef0123456789abcdef01234567").is_err());
        assert!(ObjectId::from_hex_bytes(&[0xff; 40]).is_err());
    }

    #[test]
    fn zero_sentinel() {
        let zero = ObjectId::from_hex(&"0".repeat(40)).unwrap();
        assert!(zero.is_zero());
        assert_eq!(zero, ObjectId::ZERO);
    }

    #[test]
    fn root_set_dedups_in_order() {
        let a = ObjectId::from_bytes([1; 20]);
        let b = ObjectId::from_bytes([2; 20]);
        let set: RootSet = [b, a, b].into_iter().collect();
        assert_eq!(set.as_slice(), &[b, a]);
        assert!(set.contains(&a));
    }

    #[test]
    fn root_set_with_many_roots() {
        fn id(n: u32) -> ObjectId {
            let mut bytes = [0u8; 20];
            bytes[..4].copy_from_slice(&n.to_be_bytes());
            ObjectId::from_bytes(bytes)
        }

        const COUNT: u32 = 200_000;
        // Every id twice, as refs and reflogs usually repeat each other.
        let set: RootSet = (0..COUNT).chain(0..COUNT).map(id).collect();
        assert_eq!(set.len(), COUNT as usize);
        assert_eq!(set.as_slice()[0], id(0));
        assert_eq!(set.as_slice()[COUNT as usize - 1], id(COUNT - 1));
        assert!(set.contains(&id(COUNT / 2)));
        assert!(!set.contains(&id(COUNT)));
    }

    #[test]
    fn root_set_parse_fails_on_bad_entry() {
        let err = RootSet::parse([SAMPLE, "HEAD"]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidIdentifier { .. }));
    }

    proptest! {
        #[test]
        fn display_parses_back(bytes in prop::array::uniform20(any::<u8>())) {
            let id = ObjectId::from_bytes(bytes);
            prop_assert_eq!(ObjectId::from_hex(&id.to_string()).unwrap(), id);
        }
    }
}
