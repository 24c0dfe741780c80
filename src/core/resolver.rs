//! FM-005: Mapping table and field/column resolution.
//!
//! A mapping is joined to a field or column by name. Resolution is a pure
//! view: the inputs are never modified, and an item with no mapping is
//! handed back borrowed.

use super::types::*;
use indexmap::IndexMap;
use std::borrow::Cow;

/// Name-keyed lookup over a feature's mappings. Later duplicates win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    entries: IndexMap<String, Mapping>,
}

impl MappingTable {
    pub fn build<I: IntoIterator<Item = Mapping>>(mappings: I) -> Self {
        mappings.into_iter().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Mapping> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mappings in first-declaration order of their names.
    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.entries.values()
    }
}

impl FromIterator<Mapping> for MappingTable {
    fn from_iter<I: IntoIterator<Item = Mapping>>(iter: I) -> Self {
        let mut entries = IndexMap::new();
        for mapping in iter {
            entries.insert(mapping.name.clone(), mapping);
        }
        Self { entries }
    }
}

/// Something a mapping can be applied to.
pub trait Resolvable: Clone {
    fn mapping_key(&self) -> &str;
    fn apply(&mut self, mapping: &Mapping);
}

impl Resolvable for Field {
    fn mapping_key(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, mapping: &Mapping) {
        if let Some(ref label) = mapping.label {
            self.label = Some(label.clone());
        }
        if let Some(items) = mapping.option_items() {
            self.options = items.to_vec();
        }
    }
}

impl Resolvable for Column {
    fn mapping_key(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, mapping: &Mapping) {
        if let Some(ref label) = mapping.label {
            self.label = Some(label.clone());
        }
        if let Some(items) = mapping.option_items() {
            self.options = items.to_vec();
        }
    }
}

/// Apply the matching mapping, if any.
pub fn resolve<'a, T: Resolvable>(item: &'a T, table: &MappingTable) -> Cow<'a, T> {
    match table.get(item.mapping_key()) {
        None => Cow::Borrowed(item),
        Some(mapping) => {
            let mut owned = item.clone();
            owned.apply(mapping);
            Cow::Owned(owned)
        }
    }
}

pub fn resolve_field<'a>(field: &'a Field, table: &MappingTable) -> Cow<'a, Field> {
    resolve(field, table)
}

pub fn resolve_column<'a>(column: &'a Column, table: &MappingTable) -> Cow<'a, Column> {
    resolve(column, table)
}

/// Copy of a form with every field resolved.
pub fn resolve_form(form: &Form, table: &MappingTable) -> Form {
    let mut resolved = form.clone();
    resolved.fields = form
        .fields
        .iter()
        .map(|f| resolve_field(f, table).into_owned())
        .collect();
    resolved
}

/// Copy of a data table with every column resolved.
pub fn resolve_table(data_table: &DataTable, table: &MappingTable) -> DataTable {
    let mut resolved = data_table.clone();
    resolved.columns = data_table
        .columns
        .iter()
        .map(|c| resolve_column(c, table).into_owned())
        .collect();
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(name: &str, label: Option<&str>, items: Option<Vec<OptionItem>>) -> Mapping {
        let mut m = Mapping::new(name);
        m.label = label.map(str::to_string);
        m.options = items.map(|items| OptionList { items });
        m
    }

    fn status_field() -> Field {
        let mut f = Field::new("status");
        f.label = Some("State".into());
        f.options = vec![OptionItem::new("Field opt", "f")];
        f
    }

    #[test]
    fn test_fm005_last_duplicate_wins() {
        let table = MappingTable::build(vec![
            mapping("s", Some("A"), None),
            mapping("t", None, None),
            mapping("s", Some("B"), None),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("s").unwrap().label.as_deref(), Some("B"));
        let names: Vec<_> = table.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["s", "t"]);
    }

    #[test]
    fn test_fm005_no_mapping_is_borrowed_unchanged() {
        let field = status_field();
        let resolved = resolve_field(&field, &MappingTable::default());
        assert!(matches!(resolved, Cow::Borrowed(_)));
        assert_eq!(*resolved, field);
    }

    #[test]
    fn test_fm005_mapping_options_replace_field_options() {
        let field = status_field();
        let table = MappingTable::build(vec![mapping(
            "status",
            Some("Order status"),
            Some(vec![OptionItem::new("Open", "open"), OptionItem::new("Closed", "closed")]),
        )]);
        let resolved = resolve_field(&field, &table);
        assert_eq!(resolved.label.as_deref(), Some("Order status"));
        assert_eq!(resolved.options.len(), 2);
        assert_eq!(resolved.options[0].value, "open");
        // input untouched
        assert_eq!(field.options.len(), 1);
    }

    #[test]
    fn test_fm005_empty_mapping_options_keep_field_options() {
        let field = status_field();
        let table = MappingTable::build(vec![mapping("status", Some("Order status"), Some(vec![]))]);
        let resolved = resolve_field(&field, &table);
        assert_eq!(resolved.label.as_deref(), Some("Order status"));
        assert_eq!(resolved.options, field.options);
    }

    #[test]
    fn test_fm005_unlabelled_mapping_keeps_label() {
        let field = status_field();
        let table = MappingTable::build(vec![mapping(
            "status",
            None,
            Some(vec![OptionItem::new("Open", "open")]),
        )]);
        let resolved = resolve_field(&field, &table);
        assert_eq!(resolved.label.as_deref(), Some("State"));
        assert_eq!(resolved.options[0].label, "Open");
    }

    #[test]
    fn test_fm005_resolve_column() {
        let column = Column::new("x");
        let table = MappingTable::build(vec![mapping("x", Some("Amount"), None)]);
        let resolved = resolve_column(&column, &table);
        assert_eq!(resolved.display_label(), "Amount");
        assert!(resolved.options.is_empty());
        assert_eq!(column.display_label(), "x");
    }

    #[test]
    fn test_fm005_resolve_form_and_table() {
        let form = Form {
            id: "F1".into(),
            mode: FormMode::Edit,
            dialog: false,
            action_ref: None,
            query_ref: None,
            fields: vec![status_field(), Field::new("note")],
            buttons: vec![],
            messages: vec![],
        };
        let table = MappingTable::build(vec![
            mapping("status", Some("Order status"), None),
            mapping("y", Some("Why"), None),
        ]);
        let resolved = resolve_form(&form, &table);
        assert_eq!(resolved.fields[0].display_label(), "Order status");
        assert_eq!(resolved.fields[1].display_label(), "note");
        assert_eq!(resolved.id, "F1");

        let data_table = DataTable {
            id: "T1".into(),
            query_ref: "Q1".into(),
            title: None,
            pagination: true,
            sortable: false,
            filterable: false,
            page_size: None,
            columns: vec![Column::new("x"), Column::new("y")],
            row_actions: vec![],
        };
        let resolved = resolve_table(&data_table, &table);
        assert_eq!(resolved.columns[0].display_label(), "x");
        assert_eq!(resolved.columns[1].display_label(), "Why");
    }
}
