use serde::{Deserialize, Serialize};

use crate::constants::hash::ENTITY_HASH_DOMAIN;
use crate::hash::ContentHasher;
pub use crate::types::{EntityId, LanguageCode, PropertyId};

/// Kind of top-level dump record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// An item (`Q…`).
    Item,
    /// A property (`P…`).
    Property,
}

impl EntityType {
    /// Dump spelling of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Item => "item",
            EntityType::Property => "property",
        }
    }

    /// Fixed discriminant written into content hashes.
    pub(crate) fn hash_tag(self) -> u8 {
        match self {
            EntityType::Item => 1,
            EntityType::Property => 2,
        }
    }
}

/// Parsed dump record with language-selected label and description.
///
/// Entities are built per record during a search and never cached; the
/// cursor cache only remembers stream positions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Entity {
    /// Stable identifier within the dump.
    pub id: EntityId,
    /// Record kind.
    pub entity_type: EntityType,
    /// Label in the selected language, if the record has one.
    pub label: Option<String>,
    /// Description in the selected language, if the record has one.
    pub description: Option<String>,
    /// Claims in the order the record declares them.
    pub claims: Vec<Claim>,
}

impl Entity {
    /// Claim for `property_id`, if the entity declares it.
    pub fn claim(&self, property_id: &str) -> Option<&Claim> {
        self.claims
            .iter()
            .find(|claim| claim.property_id == property_id)
    }

    /// Structural hash over every field, stable across processes and builds.
    pub fn stable_hash(&self) -> u64 {
        let mut hasher = ContentHasher::new(ENTITY_HASH_DOMAIN);
        hasher.write_str(&self.id);
        hasher.write_tag(self.entity_type.hash_tag());
        hasher.write_opt_str(self.label.as_deref());
        hasher.write_opt_str(self.description.as_deref());
        hasher.write_u64(self.claims.len() as u64);
        for claim in &self.claims {
            hasher.write_str(&claim.property_id);
            hasher.write_u64(claim.values.len() as u64);
            for value in &claim.values {
                hasher.write_tag(value.hash_tag());
                hasher.write_str(value.payload());
            }
        }
        hasher.finish()
    }
}

/// A property and the typed values stated for it.
///
/// `values` may be empty when every statement used an unmodeled value kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Claim {
    /// Property identifier, e.g. `P31`.
    pub property_id: PropertyId,
    /// Values in statement order.
    pub values: Vec<ClaimPropertyValue>,
}

/// Typed claim value with a canonical string payload.
///
/// Simple kinds carry the dump text verbatim. Compound kinds carry the
/// canonical JSON produced by [`QuantityValue`], [`CoordinateValue`], or
/// [`MonolingualTextValue`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ClaimPropertyValue {
    /// Item id, e.g. `Q5`.
    Item(String),
    /// Wikibase timestamp, e.g. `+1952-03-11T00:00:00Z`.
    DateTime(String),
    /// External identifier.
    ExternalId(String),
    /// Canonical [`QuantityValue`] JSON.
    Quantity(String),
    /// Canonical [`CoordinateValue`] JSON.
    Coordinate(String),
    /// Plain string.
    String(String),
    /// Canonical [`MonolingualTextValue`] JSON.
    MonolingualText(String),
    /// URL.
    Url(String),
    /// Lexeme id, e.g. `L7`.
    Lexeme(String),
    /// Property id, e.g. `P31`.
    Property(String),
    /// TeX source.
    Math(String),
    /// LilyPond source.
    MusicNotation(String),
    /// Form id, e.g. `L7-F1`.
    Form(String),
}

impl ClaimPropertyValue {
    /// Canonical payload string.
    pub fn payload(&self) -> &str {
        match self {
            ClaimPropertyValue::Item(value)
            | ClaimPropertyValue::DateTime(value)
            | ClaimPropertyValue::ExternalId(value)
            | ClaimPropertyValue::Quantity(value)
            | ClaimPropertyValue::Coordinate(value)
            | ClaimPropertyValue::String(value)
            | ClaimPropertyValue::MonolingualText(value)
            | ClaimPropertyValue::Url(value)
            | ClaimPropertyValue::Lexeme(value)
            | ClaimPropertyValue::Property(value)
            | ClaimPropertyValue::Math(value)
            | ClaimPropertyValue::MusicNotation(value)
            | ClaimPropertyValue::Form(value) => value,
        }
    }

    fn hash_tag(&self) -> u8 {
        match self {
            ClaimPropertyValue::Item(_) => 1,
            ClaimPropertyValue::DateTime(_) => 2,
            ClaimPropertyValue::ExternalId(_) => 3,
            ClaimPropertyValue::Quantity(_) => 4,
            ClaimPropertyValue::Coordinate(_) => 5,
            ClaimPropertyValue::String(_) => 6,
            ClaimPropertyValue::MonolingualText(_) => 7,
            ClaimPropertyValue::Url(_) => 8,
            ClaimPropertyValue::Lexeme(_) => 9,
            ClaimPropertyValue::Property(_) => 10,
            ClaimPropertyValue::Math(_) => 11,
            ClaimPropertyValue::MusicNotation(_) => 12,
            ClaimPropertyValue::Form(_) => 13,
        }
    }

    /// Decode the quantity payload, if this is a quantity.
    pub fn as_quantity(&self) -> Option<QuantityValue> {
        match self {
            ClaimPropertyValue::Quantity(raw) => QuantityValue::from_canonical(raw),
            _ => None,
        }
    }

    /// Decode the coordinate payload, if this is a coordinate.
    pub fn as_coordinate(&self) -> Option<CoordinateValue> {
        match self {
            ClaimPropertyValue::Coordinate(raw) => CoordinateValue::from_canonical(raw),
            _ => None,
        }
    }

    /// Decode the monolingual text payload, if this is monolingual text.
    pub fn as_monolingual_text(&self) -> Option<MonolingualTextValue> {
        match self {
            ClaimPropertyValue::MonolingualText(raw) => MonolingualTextValue::from_canonical(raw),
            _ => None,
        }
    }
}

/// Quantity payload. `amount` keeps the dump's exact decimal text (sign and
/// trailing zeros included).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityValue {
    /// Decimal amount, e.g. `+12.500`.
    pub amount: String,
    /// Unit entity URI, or `1` for dimensionless quantities.
    pub unit: String,
}

/// Globe coordinate payload with exact decimal text for every number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateValue {
    /// Latitude in degrees.
    pub latitude: String,
    /// Longitude in degrees.
    pub longitude: String,
    /// Altitude, usually absent in dumps.
    pub altitude: Option<String>,
    /// Precision in degrees, absent when unknown.
    pub precision: Option<String>,
}

/// Monolingual text payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonolingualTextValue {
    /// Text content.
    pub text: String,
    /// Language code of `text`.
    pub language: LanguageCode,
}

macro_rules! canonical_json {
    ($ty:ty) => {
        impl $ty {
            /// Canonical compact JSON with fixed field order.
            pub fn to_canonical(&self) -> String {
                // Only string/option fields: serialization cannot fail.
                serde_json::to_string(self).unwrap_or_default()
            }

            /// Parse a canonical payload produced by `to_canonical`.
            pub fn from_canonical(raw: &str) -> Option<Self> {
                serde_json::from_str(raw).ok()
            }
        }
    };
}

canonical_json!(QuantityValue);
canonical_json!(CoordinateValue);
canonical_json!(MonolingualTextValue);
