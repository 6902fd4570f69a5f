//! Raw dump record schema.
//!
//! Only the fields the entity parser needs are modeled; everything else in a
//! record (aliases, sitelinks, qualifiers, references) is skipped by serde.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::data::EntityType;
use crate::types::{Datatype, EntityId, LanguageCode, PropertyId};

/// One top-level element of the dump array.
#[derive(Clone, Debug, Deserialize)]
pub struct RawRecord {
    /// Entity id.
    pub id: EntityId,
    /// `item` or `property`.
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Language code → label.
    #[serde(default, deserialize_with = "map_or_empty_seq")]
    pub labels: IndexMap<LanguageCode, RawTerm>,
    /// Language code → description.
    #[serde(default, deserialize_with = "map_or_empty_seq")]
    pub descriptions: IndexMap<LanguageCode, RawTerm>,
    /// Property id → statements, in declaration order.
    #[serde(default, deserialize_with = "map_or_empty_seq")]
    pub claims: IndexMap<PropertyId, Vec<RawClaim>>,
}

/// Language-tagged term (`{"language": "en", "value": "…"}`).
#[derive(Clone, Debug, Deserialize)]
pub struct RawTerm {
    /// Term text.
    pub value: String,
}

/// One statement under a property.
#[derive(Clone, Debug, Deserialize)]
pub struct RawClaim {
    /// Main snak carrying the statement value.
    pub mainsnak: RawSnak,
}

/// Main snak of a statement.
///
/// `datavalue` is absent for `novalue`/`somevalue` snaks.
#[derive(Clone, Debug, Deserialize)]
pub struct RawSnak {
    /// Declared value kind.
    #[serde(default)]
    pub datatype: Datatype,
    /// Concrete value, when the snak has one.
    #[serde(default)]
    pub datavalue: Option<RawDataValue>,
}

/// Concrete snak value. Its shape depends on the snak's datatype.
#[derive(Clone, Debug, Deserialize)]
pub struct RawDataValue {
    /// Datatype-specific payload.
    pub value: Value,
}

/// Accept a JSON object, or an empty array standing in for an empty object.
fn map_or_empty_seq<'de, D, K, V>(deserializer: D) -> Result<IndexMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
{
    struct MapOrEmptySeq<K, V>(PhantomData<(K, V)>);

    impl<'de, K, V> Visitor<'de> for MapOrEmptySeq<K, V>
    where
        K: Deserialize<'de> + Hash + Eq,
        V: Deserialize<'de>,
    {
        type Value = IndexMap<K, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object or an empty array")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut out = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, value)) = access.next_entry::<K, V>()? {
                out.insert(key, value);
            }
            Ok(out)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            if access.next_element::<IgnoredAny>()?.is_some() {
                return Err(de::Error::invalid_length(1, &"an empty array"));
            }
            Ok(IndexMap::new())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(IndexMap::new())
        }
    }

    deserializer.deserialize_any(MapOrEmptySeq(PhantomData))
}
