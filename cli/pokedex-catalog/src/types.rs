//! Catalog interaction types.
//!
//! These types represent the domain model the pipeline works with,
//! converted from the wire shapes returned by the catalog API.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Offset and size of a single list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: NonZeroU32,
}

impl PageRequest {
    pub fn new(offset: u32, limit: NonZeroU32) -> Self {
        Self { offset, limit }
    }

    /// The request for the page directly following this one.
    pub fn next(self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit.get()),
            limit: self.limit,
        }
    }
}

/// One entry of the catalog list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(rename = "name")]
    pub key: String,
    #[serde(rename = "url")]
    pub ref_url: String,
}

impl CatalogItem {
    pub fn new(key: impl Into<String>, ref_url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ref_url: ref_url.into(),
        }
    }
}

/// The response of a single list call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    #[serde(rename = "count", default)]
    pub total_count: u64,
    #[serde(rename = "results", default)]
    pub items: Vec<CatalogItem>,
    /// URL of the following page, if the server reports one
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the preceding page, if the server reports one
    #[serde(default)]
    pub previous: Option<String>,
}

impl CatalogPage {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            total_count: items.len() as u64,
            items,
            next: None,
            previous: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Item details
// ---------------------------------------------------------------------------

/// The fully resolved record for one catalog item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub key: String,
    pub display_name: String,
    pub numeric_attributes: BTreeMap<String, i64>,
    pub image_url: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub moves: Vec<String>,
}

impl ItemDetail {
    pub fn attribute(&self, name: &str) -> Option<i64> {
        self.numeric_attributes.get(name).copied()
    }

    /// Weight in kilograms, the API reports hectograms.
    pub fn weight_kg(&self) -> Option<f64> {
        self.attribute("weight").map(|w| w as f64 / 10.0)
    }

    pub fn hit_points(&self) -> Option<i64> {
        self.attribute("hp")
    }
}

/// Upper-case the first character of a catalog key.
pub fn display_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Wire shapes of the detail endpoint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct NamedRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct ApiTypeSlot {
    pub slot: u32,
    #[serde(rename = "type")]
    pub type_: NamedRef,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct ApiSprites {
    #[serde(default)]
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct ApiAbility {
    pub ability: NamedRef,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct ApiStat {
    pub base_stat: i64,
    #[serde(default)]
    pub stat: NamedRef,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct ApiMove {
    #[serde(rename = "move")]
    pub move_: NamedRef,
}

/// Detail record as returned by `GET /pokemon/{name}`.
///
/// Every field defaults, the server omits fields for some entries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct ApiItemDetail {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub weight: i64,
    #[serde(default)]
    pub height: i64,
    #[serde(default)]
    pub species: NamedRef,
    #[serde(default)]
    pub types: Vec<ApiTypeSlot>,
    #[serde(default)]
    pub sprites: ApiSprites,
    #[serde(default)]
    pub abilities: Vec<ApiAbility>,
    #[serde(default)]
    pub stats: Vec<ApiStat>,
    #[serde(default)]
    pub moves: Vec<ApiMove>,
}

impl From<ApiItemDetail> for ItemDetail {
    fn from(api: ApiItemDetail) -> Self {
        let mut numeric_attributes = BTreeMap::from([
            ("weight".to_string(), api.weight),
            ("height".to_string(), api.height),
        ]);
        numeric_attributes.extend(
            api.stats
                .into_iter()
                .filter(|stat| !stat.stat.name.is_empty())
                .map(|stat| (stat.stat.name, stat.base_stat)),
        );

        let mut types = api.types;
        types.sort_by_key(|slot| slot.slot);

        ItemDetail {
            display_name: display_name(&api.name),
            key: api.name,
            numeric_attributes,
            image_url: api.sprites.front_default.unwrap_or_default(),
            tags: types.into_iter().map(|slot| slot.type_.name).collect(),
            species: api.species.name,
            abilities: api
                .abilities
                .into_iter()
                .map(|ability| ability.ability.name)
                .collect(),
            moves: api.moves.into_iter().map(|m| m.move_.name).collect(),
        }
    }
}
