//! FM-007: Definition store.
//!
//! Holds at most one definition and the mapping table built from it. Both
//! are replaced together, only on a successful load.

use crate::core::resolver::MappingTable;
use crate::core::types::*;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct DefinitionStore {
    definition: Option<Arc<FeatureDefinition>>,
    mappings: Arc<MappingTable>,
    revision: u64,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a definition and rebuild the mapping table. Returns the new revision.
    pub fn commit(&mut self, definition: FeatureDefinition) -> u64 {
        let table = MappingTable::build(definition.mappings.iter().cloned());
        self.definition = Some(Arc::new(definition));
        self.mappings = Arc::new(table);
        self.revision += 1;
        self.revision
    }

    /// Drop the held definition. The revision counter is kept.
    pub fn clear(&mut self) {
        self.definition = None;
        self.mappings = Arc::new(MappingTable::default());
    }

    pub fn definition(&self) -> Option<&FeatureDefinition> {
        self.definition.as_deref()
    }

    pub fn shared_definition(&self) -> Option<Arc<FeatureDefinition>> {
        self.definition.clone()
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn shared_mappings(&self) -> Arc<MappingTable> {
        Arc::clone(&self.mappings)
    }

    /// Successful loads so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn query(&self, id: &str) -> Option<&Query> {
        self.definition()?.query(id)
    }

    pub fn action_query(&self, id: &str) -> Option<&ActionQuery> {
        self.definition()?.action_query(id)
    }

    pub fn data_table(&self, id: &str) -> Option<&DataTable> {
        self.definition()?.data_table(id)
    }

    pub fn form(&self, id: &str) -> Option<&Form> {
        self.definition()?.form(id)
    }

    pub fn mapping(&self, name: &str) -> Option<&Mapping> {
        self.mappings.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_spec;

    fn definition(label: &str) -> FeatureDefinition {
        parse_spec(&format!(
            r#"<Feature name="orders">
  <Backend><Query id="Q1">SELECT 1</Query></Backend>
  <Frontend><Form id="F1"/></Frontend>
  <Mapping name="status" label="{label}"/>
</Feature>"#
        ))
        .unwrap()
    }

    #[test]
    fn test_fm007_empty_store_misses() {
        let store = DefinitionStore::new();
        assert!(store.definition().is_none());
        assert!(store.query("Q1").is_none());
        assert!(store.mapping("status").is_none());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_fm007_commit_replaces_wholesale() {
        let mut store = DefinitionStore::new();
        assert_eq!(store.commit(definition("First")), 1);
        let first = store.shared_definition().unwrap();
        assert_eq!(store.commit(definition("Second")), 2);

        assert_eq!(store.mapping("status").unwrap().label.as_deref(), Some("Second"));
        // earlier snapshot is untouched
        assert_eq!(first.mappings[0].label.as_deref(), Some("First"));
        assert!(store.query("Q1").is_some());
        assert!(store.form("F1").is_some());
        assert!(store.data_table("T1").is_none());
        assert!(store.action_query("A1").is_none());
    }

    #[test]
    fn test_fm007_clear_keeps_revision() {
        let mut store = DefinitionStore::new();
        store.commit(definition("x"));
        store.clear();
        assert!(store.definition().is_none());
        assert!(store.mappings().is_empty());
        assert_eq!(store.revision(), 1);
    }
}
