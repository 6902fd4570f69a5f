//! Search filters and page windows.
//!
//! Both types are plain values that callers rebuild for every search call;
//! their content hashes are what ties successive calls to the same cursor.

use std::collections::BTreeSet;

use crate::config::Language;
use crate::constants::hash::{CRITERIA_HASH_DOMAIN, WINDOW_HASH_DOMAIN};
use crate::data::{Entity, EntityType};
use crate::errors::SearchError;
use crate::hash::ContentHasher;
use crate::types::EntityId;

/// How an entity-type set is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SetComplement {
    /// Entity type must be in the set.
    #[default]
    Inclusive,
    /// Entity type must not be in the set.
    Exclusive,
}

/// Side-effect-free entity filter.
///
/// Dimensions left as `None` are not checked. Entities without a label in the
/// selected language never match: a result must always be reportable by label.
/// Entities without a description are rejected only when description parts
/// are configured.
///
/// The type dimension keeps an inclusive and an exclusive set side by side.
/// When both are configured an entity must be in the first and outside the
/// second.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchCriteria {
    included_types: Option<BTreeSet<EntityType>>,
    excluded_types: Option<BTreeSet<EntityType>>,
    id: Option<EntityId>,
    label_parts: Option<Vec<String>>,
    description_parts: Option<Vec<String>>,
    language: Language,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self::any()
    }
}

impl SearchCriteria {
    /// Criteria with no dimension checked (label presence still required).
    pub fn any() -> Self {
        Self {
            included_types: None,
            excluded_types: None,
            id: None,
            label_parts: None,
            description_parts: None,
            language: Language::english(),
        }
    }

    /// Start building criteria.
    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    /// Language used to select labels and descriptions.
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Types an entity must have, if that check is configured.
    pub fn included_entity_types(&self) -> Option<&BTreeSet<EntityType>> {
        self.included_types.as_ref()
    }

    /// Types an entity must not have, if that check is configured.
    pub fn excluded_entity_types(&self) -> Option<&BTreeSet<EntityType>> {
        self.excluded_types.as_ref()
    }

    /// Exact id required, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Required label substrings, sorted.
    pub fn label_parts(&self) -> Option<&[String]> {
        self.label_parts.as_deref()
    }

    /// Required description substrings, sorted.
    pub fn description_parts(&self) -> Option<&[String]> {
        self.description_parts.as_deref()
    }

    /// True if `entity` satisfies every configured check.
    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(types) = &self.included_types
            && !types.contains(&entity.entity_type)
        {
            return false;
        }
        if let Some(types) = &self.excluded_types
            && types.contains(&entity.entity_type)
        {
            return false;
        }
        if let Some(id) = &self.id
            && entity.id != *id
        {
            return false;
        }
        let Some(label) = entity.label.as_deref() else {
            return false;
        };
        if let Some(parts) = &self.label_parts
            && !contains_all(label, parts)
        {
            return false;
        }
        if let Some(parts) = &self.description_parts {
            let Some(description) = entity.description.as_deref() else {
                return false;
            };
            if !contains_all(description, parts) {
                return false;
            }
        }
        true
    }

    /// Stable hash of the normalized criteria, used as a cursor partition key.
    ///
    /// Criteria that differ only in the order or repetition of types and
    /// substrings hash identically. The byte layout is fixed, so keys written
    /// by one build are found by the next.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = ContentHasher::new(CRITERIA_HASH_DOMAIN);
        write_type_set(&mut hasher, self.included_types.as_ref());
        write_type_set(&mut hasher, self.excluded_types.as_ref());
        hasher.write_opt_str(self.id.as_deref());
        write_parts(&mut hasher, self.label_parts.as_deref());
        write_parts(&mut hasher, self.description_parts.as_deref());
        hasher.write_str(self.language.code());
        hasher.finish()
    }
}

fn write_type_set(hasher: &mut ContentHasher, types: Option<&BTreeSet<EntityType>>) {
    match types {
        None => hasher.write_tag(0),
        Some(types) => {
            hasher.write_tag(1);
            hasher.write_u64(types.len() as u64);
            for entity_type in types {
                hasher.write_tag(entity_type.hash_tag());
            }
        }
    }
}

fn write_parts(hasher: &mut ContentHasher, parts: Option<&[String]>) {
    match parts {
        None => hasher.write_tag(0),
        Some(parts) => {
            hasher.write_tag(1);
            hasher.write_strs(parts);
        }
    }
}

fn contains_all(text: &str, parts: &[String]) -> bool {
    parts.iter().all(|part| text.contains(part.as_str()))
}

fn normalize_parts(mut parts: Vec<String>) -> Option<Vec<String>> {
    if parts.is_empty() {
        return None;
    }
    parts.sort();
    parts.dedup();
    Some(parts)
}

/// Builder for [`SearchCriteria`].
#[derive(Clone, Debug, Default)]
pub struct SearchCriteriaBuilder {
    included_types: Option<BTreeSet<EntityType>>,
    excluded_types: Option<BTreeSet<EntityType>>,
    id: Option<EntityId>,
    label_parts: Vec<String>,
    description_parts: Vec<String>,
    language: Option<Language>,
}

impl SearchCriteriaBuilder {
    /// Replace the inclusive or exclusive type set with `types`.
    ///
    /// An empty inclusive set matches nothing; an empty exclusive set
    /// matches every type.
    pub fn entity_types(
        mut self,
        complement: SetComplement,
        types: impl IntoIterator<Item = EntityType>,
    ) -> Self {
        let types: Option<BTreeSet<EntityType>> = Some(types.into_iter().collect());
        match complement {
            SetComplement::Inclusive => self.included_types = types,
            SetComplement::Exclusive => self.excluded_types = types,
        }
        self
    }

    /// Only match entities of `entity_type` (adds to the inclusive set).
    pub fn include_entity_type(mut self, entity_type: EntityType) -> Self {
        self.included_types
            .get_or_insert_with(BTreeSet::new)
            .insert(entity_type);
        self
    }

    /// Reject entities of `entity_type` (adds to the exclusive set).
    pub fn exclude_entity_type(mut self, entity_type: EntityType) -> Self {
        self.excluded_types
            .get_or_insert_with(BTreeSet::new)
            .insert(entity_type);
        self
    }

    /// Require an exact id.
    pub fn id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Require `part` to occur in the label (case-sensitive).
    pub fn label_contains(mut self, part: impl Into<String>) -> Self {
        self.label_parts.push(part.into());
        self
    }

    /// Require `part` to occur in the description (case-sensitive).
    pub fn description_contains(mut self, part: impl Into<String>) -> Self {
        self.description_parts.push(part.into());
        self
    }

    /// Select labels and descriptions in `language` (default English).
    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Finish building.
    pub fn build(self) -> SearchCriteria {
        SearchCriteria {
            included_types: self.included_types,
            excluded_types: self.excluded_types,
            id: self.id,
            label_parts: normalize_parts(self.label_parts),
            description_parts: normalize_parts(self.description_parts),
            language: self.language.unwrap_or_default(),
        }
    }
}

/// Zero-based page window over the filtered sequence.
///
/// Covers filtered indices `[page_index * page_size, page_index * page_size + page_size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageCriteria {
    page_index: u64,
    page_size: u64,
    start: u64,
    end: u64,
}

impl PageCriteria {
    /// Window for `page_index` with `page_size` entities per page.
    pub fn new(page_index: u64, page_size: u64) -> Result<Self, SearchError> {
        if page_size == 0 {
            return Err(SearchError::Configuration(
                "page_size must be at least 1".to_string(),
            ));
        }
        let start = page_index
            .checked_mul(page_size)
            .ok_or_else(|| SearchError::Configuration("page window start overflows".into()))?;
        let end = start
            .checked_add(page_size)
            .ok_or_else(|| SearchError::Configuration("page window end overflows".into()))?;
        Ok(Self {
            page_index,
            page_size,
            start,
            end,
        })
    }

    /// Page index.
    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    /// Page size.
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// First filtered index in the window.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Exclusive end of the window.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// True if filtered index `index` falls inside the window.
    pub fn contains(&self, index: u64) -> bool {
        self.start <= index && index < self.end
    }

    /// True if `index` is the window's final index.
    pub fn is_last(&self, index: u64) -> bool {
        index.checked_add(1) == Some(self.end)
    }

    /// The immediately following window of the same size.
    pub fn next(&self) -> Result<Self, SearchError> {
        let index = self
            .page_index
            .checked_add(1)
            .ok_or_else(|| SearchError::Configuration("page index overflows".into()))?;
        Self::new(index, self.page_size)
    }

    /// Hash identifying this window's boundaries.
    pub fn window_hash(&self) -> u64 {
        window_hash(self.start, self.end)
    }

    /// Hash identifying the following window's boundaries.
    pub fn next_window_hash(&self) -> u64 {
        window_hash(self.end, self.end.saturating_add(self.page_size))
    }
}

fn window_hash(start: u64, end: u64) -> u64 {
    let mut hasher = ContentHasher::new(WINDOW_HASH_DOMAIN);
    hasher.write_u64(start);
    hasher.write_u64(end);
    hasher.finish()
}
