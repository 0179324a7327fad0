use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::map::{DefinitionDocument, MapDefinition, MapEntity, MatchType};

/// All maps of one definition document, keyed by name
///
/// Iteration follows document order.
#[derive(Debug, Clone, Default)]
pub struct MapRegistry {
    entities: Vec<MapEntity>,
    index: HashMap<String, usize>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting documents that reuse a map name
    pub fn from_definitions(definitions: &[MapDefinition]) -> Result<Self> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.insert(definition.to_entity())?;
        }
        Ok(registry)
    }

    pub fn from_document(document: &DefinitionDocument) -> Result<Self> {
        Self::from_definitions(&document.maps)
    }

    pub fn insert(&mut self, entity: MapEntity) -> Result<()> {
        if entity.name.trim().is_empty() {
            return Err(Error::InvalidDefinition(format!(
                "map at 0x{:X} has no name",
                entity.z.address
            )));
        }
        if self.index.contains_key(&entity.name) {
            return Err(Error::DuplicateMapName(entity.name));
        }
        self.index.insert(entity.name.clone(), self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MapEntity> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut MapEntity> {
        self.index.get(name).map(|&i| &mut self.entities[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MapEntity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MapEntity> {
        self.entities.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub(crate) fn entities_mut(&mut self) -> &mut [MapEntity] {
        &mut self.entities
    }

    /// Number of maps per match type
    pub fn count_by_type(&self, match_type: MatchType) -> usize {
        self.entities
            .iter()
            .filter(|e| e.match_type() == match_type)
            .count()
    }

    /// Clear all resolution state
    pub fn reset(&mut self) {
        for entity in &mut self.entities {
            entity.reset_resolution();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapKind, ZDefinition};

    fn definition(name: &str, address: &str) -> MapDefinition {
        MapDefinition {
            name: name.to_string(),
            kind: MapKind::Table,
            z: ZDefinition {
                address: address.to_string(),
                ..Default::default()
            },
            x: None,
            y: None,
        }
    }

    #[test]
    fn test_from_definitions_keeps_document_order() {
        let defs = vec![
            definition("KFZW", "0x200"),
            definition("KFMIOP", "0x100"),
            definition("KRKTE", "0x300"),
        ];
        let registry = MapRegistry::from_definitions(&defs).unwrap();
        let names: Vec<&str> = registry.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["KFZW", "KFMIOP", "KRKTE"]);
        assert_eq!(registry.get("KFMIOP").unwrap().z.address, 0x100);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_names_fail_the_load() {
        let defs = vec![definition("KFZW", "0x200"), definition("KFZW", "0x300")];
        let err = MapRegistry::from_definitions(&defs).unwrap_err();
        assert!(matches!(err, Error::DuplicateMapName(name) if name == "KFZW"));
    }

    #[test]
    fn test_unnamed_map_fails_the_load() {
        let defs = vec![definition(" ", "0x200")];
        let err = MapRegistry::from_definitions(&defs).unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition(_)));
    }

    #[test]
    fn test_get_mut_and_reset() {
        let defs = vec![definition("KFZW", "0x200")];
        let mut registry = MapRegistry::from_definitions(&defs).unwrap();
        registry
            .get_mut("KFZW")
            .unwrap()
            .resolution
            .assign(MatchType::Unique, 0x10200, 100);
        assert_eq!(registry.count_by_type(MatchType::Unique), 1);

        registry.reset();
        assert_eq!(registry.count_by_type(MatchType::Unique), 0);
        assert_eq!(registry.count_by_type(MatchType::None), 1);
    }
}
