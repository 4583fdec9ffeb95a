//! Travel modes and their per-mode options.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// The bare travel-mode tag, without options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModeKind {
    #[serde(alias = "DRIVING")]
    Drive,
    Transit,
    #[serde(alias = "WALKING")]
    Walk,
    #[serde(alias = "BICYCLING")]
    Bicycle,
}

impl ModeKind {
    pub const ALL: [ModeKind; 4] = [
        ModeKind::Drive,
        ModeKind::Transit,
        ModeKind::Walk,
        ModeKind::Bicycle,
    ];

    /// Assumed average speed over a real route, in km/h.
    pub fn average_speed_kmh(self) -> f64 {
        match self {
            ModeKind::Drive => 40.0,
            ModeKind::Transit => 20.0,
            ModeKind::Walk => 4.0,
            ModeKind::Bicycle => 15.0,
        }
    }

    /// Inflation applied to the speed-derived radius.
    ///
    /// Straight-line distance understates route distance, and a time budget
    /// at average speed understates what a fast road or line can cover.
    pub fn radius_factor(self) -> f64 {
        match self {
            ModeKind::Drive => 5.0,
            ModeKind::Transit => 3.0,
            ModeKind::Walk => 1.3,
            ModeKind::Bicycle => 1.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModeKind::Drive => "DRIVE",
            ModeKind::Transit => "TRANSIT",
            ModeKind::Walk => "WALK",
            ModeKind::Bicycle => "BICYCLE",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRIVE" | "DRIVING" => Ok(ModeKind::Drive),
            "TRANSIT" => Ok(ModeKind::Transit),
            "WALK" | "WALKING" => Ok(ModeKind::Walk),
            "BICYCLE" | "BICYCLING" => Ok(ModeKind::Bicycle),
            _ => Err(DomainError::UnknownTravelMode(s.to_string())),
        }
    }
}

/// Which highway variants to query in DRIVE mode.
///
/// A destination qualifies if any enabled variant is within budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveOptions {
    /// Query a route that may use highways.
    pub with_highways: bool,
    /// Query a route that avoids highways.
    pub without_highways: bool,
}

impl DriveOptions {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.with_highways && !self.without_highways {
            return Err(DomainError::NoDriveVariant);
        }
        Ok(())
    }
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            with_highways: true,
            without_highways: true,
        }
    }
}

/// When a transit journey departs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Departure {
    /// Resolved to the current time when the query is sent.
    #[default]
    Now,
    At(DateTime<Utc>),
}

/// Route preference passed through to the transit provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitRoutePreference {
    LessWalking,
    FewerTransfers,
}

/// Options for TRANSIT mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitOptions {
    #[serde(default)]
    pub departure: Departure,
    #[serde(default)]
    pub preference: Option<TransitRoutePreference>,
}

/// A travel mode together with its mode-specific options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum TravelMode {
    Drive(DriveOptions),
    Transit(TransitOptions),
    Walk,
    Bicycle,
}

impl TravelMode {
    /// The mode with default options.
    pub fn from_kind(kind: ModeKind) -> Self {
        match kind {
            ModeKind::Drive => TravelMode::Drive(DriveOptions::default()),
            ModeKind::Transit => TravelMode::Transit(TransitOptions::default()),
            ModeKind::Walk => TravelMode::Walk,
            ModeKind::Bicycle => TravelMode::Bicycle,
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            TravelMode::Drive(_) => ModeKind::Drive,
            TravelMode::Transit(_) => ModeKind::Transit,
            TravelMode::Walk => ModeKind::Walk,
            TravelMode::Bicycle => ModeKind::Bicycle,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            TravelMode::Drive(opts) => opts.validate(),
            _ => Ok(()),
        }
    }
}

impl From<ModeKind> for TravelMode {
    fn from(kind: ModeKind) -> Self {
        Self::from_kind(kind)
    }
}
