//! Spool records and the identity used to match them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width of generated spool ids ("001", "042", ...).
pub const ID_WIDTH: usize = 3;

/// Spool identifier, conventionally a zero-padded number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpoolId(String);

impl SpoolId {
    /// Wrap an existing id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build a zero-padded id from a sequence number.
    pub fn from_number(n: u64) -> Self {
        Self(format!("{:0width$}", n, width = ID_WIDTH))
    }

    /// Numeric value of the id, if it is all digits.
    pub fn number(&self) -> Option<u64> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }

    /// True for ids that were never assigned.
    pub fn is_unassigned(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpoolId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A physical roll of filament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spool {
    /// Unique id. Empty on records that predate id assignment.
    #[serde(default)]
    pub id: SpoolId,
    /// Brand or product name.
    pub name: String,
    /// Material tag (e.g., "PLA", "PETG").
    pub material: String,
    /// Color name.
    #[serde(default)]
    pub color: String,
    /// Remaining filament in grams. May go negative.
    pub weight: f64,
    /// Purchase cost per 1000 g.
    pub cost: f64,
    /// Spool came with a benchy test print.
    #[serde(default, rename = "has_benchy")]
    pub has_benchy: bool,
    /// Abrasive filament (needs a hardened nozzle).
    #[serde(default)]
    pub abrasive: bool,
    /// AMS slot the spool is loaded into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ams_slot: Option<String>,
    /// Free-text storage location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Spool {
    /// Create an unassigned spool record.
    pub fn new(
        name: impl Into<String>,
        material: impl Into<String>,
        color: impl Into<String>,
        weight: f64,
        cost: f64,
    ) -> Self {
        Self {
            id: SpoolId::default(),
            name: name.into(),
            material: material.into(),
            color: color.into(),
            weight,
            cost,
            has_benchy: false,
            abrasive: false,
            ams_slot: None,
            location: None,
        }
    }

    /// Cost of one gram of this filament.
    pub fn cost_per_gram(&self) -> f64 {
        self.cost / 1000.0
    }

    /// Stock value of the remaining filament.
    pub fn stock_value(&self) -> f64 {
        self.weight.max(0.0) * self.cost_per_gram()
    }

    /// Identity triple for matching snapshots back to this spool.
    pub fn identity(&self) -> SpoolIdentity {
        SpoolIdentity {
            name: self.name.clone(),
            material: self.material.clone(),
            color: self.color.clone(),
        }
    }
}

/// The (name, material, color) triple that identifies a spool by value.
///
/// Matching is exact. Two spools of the same brand in different materials
/// never match each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpoolIdentity {
    /// Brand or product name.
    pub name: String,
    /// Material tag.
    pub material: String,
    /// Color name.
    #[serde(default)]
    pub color: String,
}

impl SpoolIdentity {
    /// Create an identity.
    pub fn new(
        name: impl Into<String>,
        material: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            material: material.into(),
            color: color.into(),
        }
    }

    /// True if `spool` carries exactly this identity.
    pub fn matches(&self, spool: &Spool) -> bool {
        self.name == spool.name && self.color == spool.color && self.material == spool.material
    }
}

impl fmt::Display for SpoolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.color.is_empty() {
            write!(f, "{} ({})", self.name, self.material)
        } else {
            write!(f, "{} - {} ({})", self.name, self.color, self.material)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_padding() {
        assert_eq!(SpoolId::from_number(7).as_str(), "007");
        assert_eq!(SpoolId::from_number(1234).as_str(), "1234");
        assert_eq!(SpoolId::new("012").number(), Some(12));
        assert_eq!(SpoolId::new("A12").number(), None);
        assert!(SpoolId::new("  ").is_unassigned());
    }

    #[test]
    fn test_identity_is_exact() {
        let spool = Spool::new("Bambu Basic", "PLA", "Black", 1000.0, 20.0);
        assert!(spool.identity().matches(&spool));
        assert!(!SpoolIdentity::new("Bambu Basic", "PETG", "Black").matches(&spool));
        assert!(!SpoolIdentity::new("bambu basic", "PLA", "Black").matches(&spool));
        assert!(!SpoolIdentity::new("Bambu Basic", "PLA", "").matches(&spool));
    }

    #[test]
    fn test_legacy_record_parses() {
        let json = r#"{"name": "Elegoo", "material": "PETG", "color": "Red",
                       "weight": 812.5, "cost": 18.99, "location": "Shelf 2"}"#;
        let spool: Spool = serde_json::from_str(json).unwrap();
        assert!(spool.id.is_unassigned());
        assert!(!spool.has_benchy);
        assert_eq!(spool.location.as_deref(), Some("Shelf 2"));
    }
}
