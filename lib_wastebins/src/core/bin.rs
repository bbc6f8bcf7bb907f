//! # Bin Entity and Waste Classification
//!
//! A `Bin` is the unit of state tracked by the fleet registry. It carries a
//! free-text location, the kind of waste it collects, and a fill level expressed
//! as a percentage. Two groups of values are derived from the fill level:
//!
//! - **Collection need** is recomputed on every fill mutation and is `true`
//!   once the bin reaches [`COLLECTION_THRESHOLD`].
//! - **Recyclable / non-recyclable amounts** are only recomputed when
//!   [`Bin::sort_waste`] runs. Between two sorts they describe the fill level
//!   at the time of the last sort, not the current one.

use std::fmt;

use serde::Serialize;

/// Numeric identifier assigned by the registry.
pub type BinId = u64;

/// Fill level (inclusive) at which a bin is routed for pickup.
pub const COLLECTION_THRESHOLD: f64 = 80.0;
/// Lowest storable fill level.
pub const MIN_FILL_LEVEL: f64 = 0.0;
/// Highest storable fill level.
pub const MAX_FILL_LEVEL: f64 = 100.0;

/// # Waste Type
///
/// The kind of waste a bin collects. Decoding from text never fails: any
/// unrecognized label maps to [`WasteType::Mixed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WasteType {
    Plastic,
    Food,
    Metal,
    #[default]
    Mixed,
}

impl WasteType {
    /// Wire label of the waste type.
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteType::Plastic => "plastic",
            WasteType::Food => "food",
            WasteType::Metal => "metal",
            WasteType::Mixed => "mixed",
        }
    }

    /// Recyclable share of a full bin, in whole percent.
    fn recyclable_percent(&self) -> f64 {
        match self {
            WasteType::Plastic | WasteType::Metal => 70.0,
            WasteType::Food => 40.0,
            WasteType::Mixed => 50.0,
        }
    }
}

impl From<&str> for WasteType {
    fn from(label: &str) -> Self {
        match label {
            "plastic" => WasteType::Plastic,
            "food" => WasteType::Food,
            "metal" => WasteType::Metal,
            _ => WasteType::Mixed,
        }
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Classify Waste
///
/// Splits `fill_level` into `(recyclable, non_recyclable)` according to the
/// fixed policy of each waste type:
///
/// | type           | recyclable | non-recyclable |
/// |----------------|-----------:|---------------:|
/// | plastic, metal |        70% |            30% |
/// | food           |        40% |            60% |
/// | mixed          |        50% |            50% |
///
/// The larger share is computed by multiplication and the smaller one is the
/// remainder of the fill level. Subtracting a value within a factor of two of
/// the fill level is exact in floating point, so the two amounts add back up
/// to the input bit for bit.
pub fn classify_waste(waste_type: WasteType, fill_level: f64) -> (f64, f64) {
    let recyclable_percent = waste_type.recyclable_percent();
    if recyclable_percent >= 50.0 {
        let recyclable = fill_level * recyclable_percent / 100.0;
        (recyclable, fill_level - recyclable)
    } else {
        let non_recyclable = fill_level * (100.0 - recyclable_percent) / 100.0;
        (fill_level - non_recyclable, non_recyclable)
    }
}

/// Clamps a requested fill level into `[MIN_FILL_LEVEL, MAX_FILL_LEVEL]`.
/// NaN has no meaningful position in the range and is stored as empty.
pub fn clamp_fill_level(level: f64) -> f64 {
    if level.is_nan() {
        return MIN_FILL_LEVEL;
    }
    level.clamp(MIN_FILL_LEVEL, MAX_FILL_LEVEL)
}

/// # Bin
///
/// A single tracked waste bin. Fields are private so that the fill level can
/// only change through methods that clamp it and refresh `needs_collection`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    id: BinId,
    location: String,
    #[serde(rename = "type")]
    waste_type: WasteType,
    #[serde(rename = "fillLevel")]
    fill_level: f64,
    #[serde(rename = "needsCollection")]
    needs_collection: bool,
    #[serde(rename = "recyclable")]
    recyclable_amount: f64,
    #[serde(rename = "nonRecyclable")]
    non_recyclable_amount: f64,
}

impl Bin {
    /// Creates a bin with a clamped fill level. Classification has not run yet,
    /// so both derived amounts start at zero.
    pub fn new(id: BinId, location: impl Into<String>, waste_type: WasteType, fill_level: f64) -> Self {
        let mut bin = Self {
            id,
            location: location.into(),
            waste_type,
            fill_level: MIN_FILL_LEVEL,
            needs_collection: false,
            recyclable_amount: 0.0,
            non_recyclable_amount: 0.0,
        };
        bin.set_fill_level(fill_level);
        bin
    }

    pub fn id(&self) -> BinId {
        self.id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn waste_type(&self) -> WasteType {
        self.waste_type
    }

    pub fn fill_level(&self) -> f64 {
        self.fill_level
    }

    pub fn needs_collection(&self) -> bool {
        self.needs_collection
    }

    pub fn recyclable_amount(&self) -> f64 {
        self.recyclable_amount
    }

    pub fn non_recyclable_amount(&self) -> f64 {
        self.non_recyclable_amount
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    /// Changes the waste type. The derived amounts keep describing the last
    /// sort until [`Bin::sort_waste`] runs again.
    pub fn set_waste_type(&mut self, waste_type: WasteType) {
        self.waste_type = waste_type;
    }

    /// Stores `level` clamped into range and refreshes the collection flag.
    pub fn set_fill_level(&mut self, level: f64) {
        self.fill_level = clamp_fill_level(level);
        self.needs_collection = self.fill_level >= COLLECTION_THRESHOLD;
    }

    /// Adds `delta` (which may be negative) to the fill level.
    pub fn increase_fill(&mut self, delta: f64) {
        self.set_fill_level(self.fill_level + delta);
    }

    /// Runs the classification rule against the current fill level and
    /// overwrites the recyclable / non-recyclable amounts.
    pub fn sort_waste(&mut self) {
        let (recyclable, non_recyclable) = classify_waste(self.waste_type, self.fill_level);
        self.recyclable_amount = recyclable;
        self.non_recyclable_amount = non_recyclable;
    }
}
