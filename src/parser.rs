//! Raw record → [`Entity`] conversion.
//!
//! Claim values are dispatched on their declared datatype through a closed
//! [`ValueKind`] table. Kinds the model knows but does not represent are
//! dropped; datatypes outside the table are fatal, so "no value" never gets
//! confused with "value we could not read".

use std::sync::Arc;

use serde_json::Value;

use crate::config::Language;
use crate::constants::datatypes;
use crate::data::{
    Claim, ClaimPropertyValue, CoordinateValue, Entity, MonolingualTextValue, QuantityValue,
};
use crate::decimal::{CanonicalDecimal, DecimalFormatter};
use crate::errors::SearchError;
use crate::source::record::{RawRecord, RawSnak};

/// Value kinds recognized in claim mainsnaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// `wikibase-item`
    Item,
    /// `time`
    DateTime,
    /// `external-id`
    ExternalId,
    /// `quantity`
    Quantity,
    /// `globe-coordinate`
    Coordinate,
    /// `string`
    String,
    /// `monolingualtext`
    MonolingualText,
    /// `url`
    Url,
    /// `wikibase-lexeme`
    Lexeme,
    /// `wikibase-property`
    Property,
    /// `math`
    Math,
    /// `musical-notation`
    MusicNotation,
    /// `wikibase-form`
    Form,
    /// Known datatype without a model: media, geo-shape, tabular data, senses, schemas.
    Unmodeled,
}

impl ValueKind {
    /// Look up a datatype string; `None` means the datatype is unknown.
    pub fn from_datatype(datatype: &str) -> Option<Self> {
        let kind = match datatype {
            datatypes::WIKIBASE_ITEM => ValueKind::Item,
            datatypes::TIME => ValueKind::DateTime,
            datatypes::EXTERNAL_ID => ValueKind::ExternalId,
            datatypes::QUANTITY => ValueKind::Quantity,
            datatypes::GLOBE_COORDINATE => ValueKind::Coordinate,
            datatypes::STRING => ValueKind::String,
            datatypes::MONOLINGUAL_TEXT => ValueKind::MonolingualText,
            datatypes::URL => ValueKind::Url,
            datatypes::WIKIBASE_LEXEME => ValueKind::Lexeme,
            datatypes::WIKIBASE_PROPERTY => ValueKind::Property,
            datatypes::MATH => ValueKind::Math,
            datatypes::MUSICAL_NOTATION => ValueKind::MusicNotation,
            datatypes::WIKIBASE_FORM => ValueKind::Form,
            datatypes::COMMONS_MEDIA
            | datatypes::GEO_SHAPE
            | datatypes::TABULAR_DATA
            | datatypes::WIKIBASE_SENSE
            | datatypes::ENTITY_SCHEMA => ValueKind::Unmodeled,
            _ => return None,
        };
        Some(kind)
    }
}

/// Converts raw records into entities for one selected language.
#[derive(Clone)]
pub struct EntityParser {
    decimals: Arc<dyn DecimalFormatter>,
}

impl Default for EntityParser {
    fn default() -> Self {
        Self::new(Arc::new(CanonicalDecimal))
    }
}

impl EntityParser {
    /// Create a parser using `decimals` for numeric sub-fields.
    pub fn new(decimals: Arc<dyn DecimalFormatter>) -> Self {
        Self { decimals }
    }

    /// Build an entity from `raw`, selecting label and description in `language`.
    pub fn parse(&self, raw: RawRecord, language: &Language) -> Result<Entity, SearchError> {
        let RawRecord {
            id,
            entity_type,
            mut labels,
            mut descriptions,
            claims: raw_claims,
        } = raw;

        let label = labels
            .swap_remove(language.code())
            .map(|term| term.value);
        let description = descriptions
            .swap_remove(language.code())
            .map(|term| term.value);

        let mut claims = Vec::with_capacity(raw_claims.len());
        for (property_id, statements) in raw_claims {
            let mut values = Vec::with_capacity(statements.len());
            for statement in statements {
                let snak = statement.mainsnak;
                if snak.datavalue.is_none() {
                    continue;
                }
                if let Some(value) = self.parse_snak(&id, &property_id, snak)? {
                    values.push(value);
                }
            }
            claims.push(Claim {
                property_id,
                values,
            });
        }

        Ok(Entity {
            id,
            entity_type,
            label,
            description,
            claims,
        })
    }

    fn parse_snak(
        &self,
        entity_id: &str,
        property_id: &str,
        snak: RawSnak,
    ) -> Result<Option<ClaimPropertyValue>, SearchError> {
        let Some(kind) = ValueKind::from_datatype(&snak.datatype) else {
            return Err(SearchError::UnknownValueKind {
                entity_id: entity_id.to_string(),
                property_id: property_id.to_string(),
                datatype: snak.datatype,
            });
        };
        let Some(datavalue) = snak.datavalue else {
            return Ok(None);
        };
        let ctx = ValueContext {
            entity_id,
            property_id,
            datatype: &snak.datatype,
        };
        let value = datavalue.value;
        let parsed = match kind {
            ValueKind::Unmodeled => return Ok(None),
            ValueKind::Item => ClaimPropertyValue::Item(ctx.entity_ref(&value, "Q")?),
            ValueKind::Property => ClaimPropertyValue::Property(ctx.entity_ref(&value, "P")?),
            ValueKind::Lexeme => ClaimPropertyValue::Lexeme(ctx.entity_ref(&value, "L")?),
            ValueKind::Form => ClaimPropertyValue::Form(ctx.entity_ref(&value, "")?),
            ValueKind::DateTime => {
                ClaimPropertyValue::DateTime(ctx.string_field(&value, "time")?.to_string())
            }
            ValueKind::ExternalId => ClaimPropertyValue::ExternalId(ctx.plain_string(value)?),
            ValueKind::String => ClaimPropertyValue::String(ctx.plain_string(value)?),
            ValueKind::Url => ClaimPropertyValue::Url(ctx.plain_string(value)?),
            ValueKind::Math => ClaimPropertyValue::Math(ctx.plain_string(value)?),
            ValueKind::MusicNotation => {
                ClaimPropertyValue::MusicNotation(ctx.plain_string(value)?)
            }
            ValueKind::Quantity => {
                let quantity = QuantityValue {
                    amount: self.required_decimal(&ctx, &value, "amount")?,
                    unit: ctx.string_field(&value, "unit")?.to_string(),
                };
                ClaimPropertyValue::Quantity(quantity.to_canonical())
            }
            ValueKind::Coordinate => {
                let coordinate = CoordinateValue {
                    latitude: self.required_decimal(&ctx, &value, "latitude")?,
                    longitude: self.required_decimal(&ctx, &value, "longitude")?,
                    altitude: self.optional_decimal(&ctx, &value, "altitude")?,
                    precision: self.optional_decimal(&ctx, &value, "precision")?,
                };
                ClaimPropertyValue::Coordinate(coordinate.to_canonical())
            }
            ValueKind::MonolingualText => {
                let text = MonolingualTextValue {
                    text: ctx.string_field(&value, "text")?.to_string(),
                    language: ctx.string_field(&value, "language")?.to_string(),
                };
                ClaimPropertyValue::MonolingualText(text.to_canonical())
            }
        };
        Ok(Some(parsed))
    }

    fn required_decimal(
        &self,
        ctx: &ValueContext<'_>,
        value: &Value,
        field: &str,
    ) -> Result<String, SearchError> {
        self.optional_decimal(ctx, value, field)?
            .ok_or_else(|| ctx.malformed(format!("missing decimal field '{field}'")))
    }

    fn optional_decimal(
        &self,
        ctx: &ValueContext<'_>,
        value: &Value,
        field: &str,
    ) -> Result<Option<String>, SearchError> {
        match value.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => self
                .decimals
                .format_decimal(raw)
                .map(Some)
                .ok_or_else(|| ctx.malformed(format!("field '{field}' is not a decimal"))),
        }
    }
}

/// Identifies the value being parsed, for error messages.
struct ValueContext<'a> {
    entity_id: &'a str,
    property_id: &'a str,
    datatype: &'a str,
}

impl ValueContext<'_> {
    fn malformed(&self, reason: String) -> SearchError {
        SearchError::MalformedValue {
            entity_id: self.entity_id.to_string(),
            property_id: self.property_id.to_string(),
            reason: format!("{} value: {reason}", self.datatype),
        }
    }

    fn plain_string(&self, value: Value) -> Result<String, SearchError> {
        match value {
            Value::String(text) => Ok(text),
            other => Err(self.malformed(format!("expected a string, found {other}"))),
        }
    }

    fn string_field<'v>(&self, value: &'v Value, field: &str) -> Result<&'v str, SearchError> {
        value
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| self.malformed(format!("missing string field '{field}'")))
    }

    /// Entity id from `{"id": …}`, or from the legacy `numeric-id` form.
    fn entity_ref(&self, value: &Value, prefix: &str) -> Result<String, SearchError> {
        if let Some(id) = value.get("id").and_then(Value::as_str) {
            return Ok(id.to_string());
        }
        let numeric = value.get("numeric-id").and_then(Value::as_u64);
        match numeric {
            Some(numeric) if !prefix.is_empty() => Ok(format!("{prefix}{numeric}")),
            _ => Err(self.malformed("missing entity id".to_string())),
        }
    }
}
