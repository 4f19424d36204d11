//! The fixed, ordered list of campus buildings.
//!
//! The catalog is the only source of truth for what counts as a valid
//! building. Entries are addressed by index, and the index is the building
//! identifier carried on the wire.

use serde::Serialize;

/// Building names of the reference deployment, in catalog order.
pub const BUILDING_NAMES: [&str; 12] = [
    "본관", "1호관", "2호관", "3호관", "4호관", "5호관", "6호관", "7호관", "8호관", "9호관",
    "10호관", "11호관",
];

/// A resolved catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Building {
    /// Position in the catalog
    pub id: usize,
    /// Display name
    pub name: String,
}

/// Immutable, index-addressable building catalog.
#[derive(Debug, Clone)]
pub struct BuildingCatalog {
    names: Vec<String>,
}

impl BuildingCatalog {
    /// Create a catalog from an ordered list of names.
    ///
    /// Returns `None` for an empty list; a catalog always has a first entry
    /// for the poll loop to display before any reading arrives.
    pub fn new<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return None;
        }
        Some(Self { names })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Look up an entry by index.
    pub fn get(&self, index: usize) -> Option<Building> {
        self.names.get(index).map(|name| Building {
            id: index,
            name: name.clone(),
        })
    }

    /// Look up an entry by its exact name.
    pub fn find(&self, name: &str) -> Option<Building> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|index| self.get(index))
    }

    /// The first entry, shown before anything has been resolved.
    pub fn first(&self) -> Building {
        Building {
            id: 0,
            name: self.names[0].clone(),
        }
    }

    /// Iterate over entry names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for BuildingCatalog {
    fn default() -> Self {
        Self {
            names: BUILDING_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_order() {
        let catalog = BuildingCatalog::default();
        assert_eq!(catalog.len(), 12);
        assert_eq!(catalog.first().name, "본관");
        assert_eq!(catalog.get(3).unwrap().name, "3호관");
        assert_eq!(catalog.get(11).unwrap().name, "11호관");
        assert!(catalog.get(12).is_none());
    }

    #[test]
    fn test_find_by_name() {
        let catalog = BuildingCatalog::default();
        let building = catalog.find("7호관").unwrap();
        assert_eq!(building.id, 7);
        assert!(catalog.find("12호관").is_none());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(BuildingCatalog::new(Vec::<String>::new()).is_none());
        let catalog = BuildingCatalog::new(["A", "B"]).unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["A", "B"]);
    }
}
