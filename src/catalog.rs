//! Named material properties shared by every pipeline stage.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Electromagnetic properties of one material, immutable after catalog load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    /// Electrical conductivity in S/m.
    pub conductivity_s_per_m: f64,
    /// Relative magnetic permeability (unitless).
    pub relative_permeability: f64,
}

impl MaterialProperties {
    pub fn new(conductivity_s_per_m: f64, relative_permeability: f64) -> Self {
        Self {
            conductivity_s_per_m,
            relative_permeability,
        }
    }
}

/// Process-wide, read-only lookup of materials by name.
///
/// Loaded once and passed by shared ownership to all pipeline stages.
/// Keys iterate in name order so model assembly stays deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialCatalog {
    materials: BTreeMap<String, MaterialProperties>,
}

impl MaterialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typical subsea cable materials with the conductivities and
    /// permeabilities used by the reference cable designs.
    pub fn subsea_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.insert("copper", MaterialProperties::new(58e6, 1.0));
        catalog.insert("xlpe", MaterialProperties::new(0.0, 1.0));
        catalog.insert("semiconductive_screen", MaterialProperties::new(1.0, 1.0));
        catalog.insert("lead_sheath", MaterialProperties::new(5e6, 1.0));
        catalog.insert("pvc", MaterialProperties::new(0.0, 1.0));
        catalog.insert("steel_armour", MaterialProperties::new(1.1e6, 300.0));
        catalog.insert("seawater", MaterialProperties::new(5.0, 1.0));
        catalog.insert("seabed_sand", MaterialProperties::new(1.0, 1.0));
        catalog
    }

    pub fn insert(&mut self, name: impl Into<String>, properties: MaterialProperties) {
        self.materials.insert(name.into(), properties);
    }

    pub fn get(&self, name: &str) -> Option<&MaterialProperties> {
        self.materials.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MaterialProperties)> {
        self.materials.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Wraps the catalog for shared, read-only use across pipeline stages.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_reference_design_materials() {
        let catalog = MaterialCatalog::subsea_defaults();
        for name in [
            "copper",
            "xlpe",
            "semiconductive_screen",
            "lead_sheath",
            "pvc",
            "steel_armour",
            "seawater",
            "seabed_sand",
        ] {
            assert!(catalog.contains(name), "missing material: {name}");
        }

        let armour = catalog.get("steel_armour").unwrap();
        assert_eq!(armour.relative_permeability, 300.0);
        assert_eq!(armour.conductivity_s_per_m, 1.1e6);
    }

    #[test]
    fn iteration_is_name_ordered() {
        let catalog = MaterialCatalog::subsea_defaults();
        let names: Vec<&str> = catalog.iter().map(|(name, _)| name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
