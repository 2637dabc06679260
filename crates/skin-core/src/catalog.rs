//! Catalog and price field definitions.
//!
//! This module defines [`Catalog`] for the supported item universes and
//! [`PriceField`] for the marketplaces a composite quote draws from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MarketError;

/// One of the supported item universes, identified by its Steam app id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Catalog {
    /// Counter-Strike 2 (app 730).
    Cs2,
    /// Dota 2 (app 570).
    Dota2,
}

impl Catalog {
    /// All supported catalogs.
    pub const ALL: [Self; 2] = [Self::Cs2, Self::Dota2];

    /// Returns the Steam app id.
    #[must_use]
    pub const fn app_id(&self) -> u32 {
        match self {
            Self::Cs2 => 730,
            Self::Dota2 => 570,
        }
    }

    /// Looks a catalog up by app id.
    #[must_use]
    pub const fn from_app_id(app_id: u32) -> Option<Self> {
        match app_id {
            730 => Some(Self::Cs2),
            570 => Some(Self::Dota2),
            _ => None,
        }
    }

    /// Returns the secondary marketplace fields quoted for this catalog.
    #[must_use]
    pub const fn secondary_fields(&self) -> &'static [PriceField] {
        match self {
            Self::Cs2 => &[PriceField::MarketCsgo, PriceField::LisSkins],
            Self::Dota2 => &[PriceField::MarketDota2],
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.app_id())
    }
}

impl From<Catalog> for u32 {
    fn from(catalog: Catalog) -> Self {
        catalog.app_id()
    }
}

impl TryFrom<u32> for Catalog {
    type Error = MarketError;

    fn try_from(app_id: u32) -> Result<Self, Self::Error> {
        Self::from_app_id(app_id).ok_or(MarketError::UnknownCatalog(app_id))
    }
}

impl FromStr for Catalog {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let app_id = s
            .trim()
            .parse::<u32>()
            .map_err(|_| MarketError::InvalidParameter(format!("catalog id {s:?}")))?;
        Self::try_from(app_id)
    }
}

/// A quoted field of a composite price record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    /// Steam Community Market lowest/median price (primary).
    Steam,
    /// market.csgo.com bulk price.
    MarketCsgo,
    /// market.dota2.net bulk price.
    MarketDota2,
    /// lis-skins.com bulk price.
    LisSkins,
}

impl PriceField {
    /// Returns the field name used in serialized quotes.
    #[must_use]
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::Steam => "steam_price",
            Self::MarketCsgo => "market_csgo_price",
            Self::MarketDota2 => "market_dota2_price",
            Self::LisSkins => "lis_skins_price",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}
