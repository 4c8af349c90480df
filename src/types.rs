//! Shared types and enums used across SPRAWL.
//! Includes the composite `Band` set, the `LandClass` legend and raster
//! `ExportTarget`s.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Bands carried by an annual composite, in storage order.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Band {
    B2,
    B3,
    B4,
    B8,
    B11,
    #[serde(rename = "SCL")]
    Scl,
    #[serde(rename = "NDVI")]
    Ndvi,
    #[serde(rename = "NDBI")]
    Ndbi,
    #[serde(rename = "MNDWI")]
    Mndwi,
    #[serde(rename = "BUI")]
    Bui,
    #[serde(rename = "DUI")]
    Dui,
}

impl Band {
    pub const ALL: [Band; 11] = [
        Band::B2,
        Band::B3,
        Band::B4,
        Band::B8,
        Band::B11,
        Band::Scl,
        Band::Ndvi,
        Band::Ndbi,
        Band::Mndwi,
        Band::Bui,
        Band::Dui,
    ];

    /// Surface reflectance bands read from every tile (blue, green, red, NIR, SWIR1).
    pub const REFLECTANCE: [Band; 5] = [Band::B2, Band::B3, Band::B4, Band::B8, Band::B11];

    /// The six bands kept after band selection, before indices are added.
    pub const SELECTED: [Band; 6] = [Band::B2, Band::B3, Band::B4, Band::B8, Band::B11, Band::Scl];

    /// Classifier input bands.
    pub const FEATURES: [Band; 10] = [
        Band::B2,
        Band::B3,
        Band::B4,
        Band::B8,
        Band::B11,
        Band::Ndvi,
        Band::Ndbi,
        Band::Mndwi,
        Band::Bui,
        Band::Dui,
    ];

    /// Position of the band inside a composite's band axis.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::B2 => "B2",
            Band::B3 => "B3",
            Band::B4 => "B4",
            Band::B8 => "B8",
            Band::B11 => "B11",
            Band::Scl => "SCL",
            Band::Ndvi => "NDVI",
            Band::Ndbi => "NDBI",
            Band::Mndwi => "MNDWI",
            Band::Bui => "BUI",
            Band::Dui => "DUI",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Band {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Band::ALL
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .ok_or(crate::Error::InvalidArgument {
                arg: "band",
                value: s.to_string(),
            })
    }
}

/// Land-cover legend. The discriminant is the class id written to rasters.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum LandClass {
    Urban = 0,
    Vegetation = 1,
    BareSoil = 2,
    Water = 3,
}

impl LandClass {
    pub const ALL: [LandClass; 4] = [
        LandClass::Urban,
        LandClass::Vegetation,
        LandClass::BareSoil,
        LandClass::Water,
    ];

    pub const COUNT: usize = 4;

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(LandClass::Urban),
            1 => Some(LandClass::Vegetation),
            2 => Some(LandClass::BareSoil),
            3 => Some(LandClass::Water),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LandClass::Urban => "Urban",
            LandClass::Vegetation => "Vegetation",
            LandClass::BareSoil => "BareSoil",
            LandClass::Water => "Water",
        }
    }

    /// Display colour used in exported legends.
    pub fn color(self) -> &'static str {
        match self {
            LandClass::Urban => "red",
            LandClass::Vegetation => "green",
            LandClass::BareSoil => "tan",
            LandClass::Water => "blue",
        }
    }
}

impl std::fmt::Display for LandClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for LandClass {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LandClass::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(s))
            .ok_or(crate::Error::InvalidArgument {
                arg: "class",
                value: s.to_string(),
            })
    }
}

/// Where an exported raster is stored.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum ExportTarget {
    /// Long-lived analysis assets, reused by later runs.
    Asset,
    /// Figures and hand-off files, grouped in a named folder.
    Drive,
}

impl std::fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportTarget::Asset => write!(f, "Asset"),
            ExportTarget::Drive => write!(f, "Drive"),
        }
    }
}
