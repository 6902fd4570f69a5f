/// Entity identifier, stable within a dump.
/// Examples: `Q42`, `P31`, `L7-F1`
pub type EntityId = String;
/// Property identifier used as a claim key.
/// Examples: `P31`, `P1082`
pub type PropertyId = String;
/// Language code used to select labels and descriptions.
/// Examples: `en`, `de`, `pt-br`
pub type LanguageCode = String;
/// Raw claim datatype string as it appears in the dump.
/// Examples: `wikibase-item`, `quantity`, `geo-shape`
pub type Datatype = String;
/// Hex-encoded cursor cache key (`criteria_hash ∥ window_hash`).
/// Example: `9f1c0de2a4b36e11c4d2e0f1aa03b7e2`
pub type CacheKey = String;
/// Dump path as given by the caller, used in error and log messages.
/// Example: `/data/latest-all.json.zst`
pub type PathString = String;
