//! FM-004: Specification normalization and validation.
//!
//! Turns a parsed `<Feature>` element tree into a `FeatureDefinition`:
//! - Repeatable slots are read as lists, even with one instance
//! - Booleans are true only for the literal `"true"` (absent = false, except
//!   `DataTable.pagination` and `Message.visible`, which default to true)
//! - Integers that are absent or unparsable become `None`
//! - Enumerations fall back to their default when absent or unrecognized
//! - Query bodies are trimmed and scanned for `:name` parameters
//!
//! Only a missing root is fatal. Every other problem degrades to a default
//! and is reported as a warning, unless `ParseOptions::strict` is set.

use super::markup::{self, Element};
use super::params::extract_parameters;
use super::types::*;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Name of the required root element.
pub const ROOT_ELEMENT: &str = "Feature";

/// Compiler switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Promote malformed attributes and duplicate ids to `Error::Parse`
    pub strict: bool,
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Category of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Missing or unreadable attribute that was replaced by a default
    Malformed,
    /// Two entries of one list share an id
    DuplicateId,
    /// A later mapping with the same name replaces an earlier one
    ShadowedMapping,
    /// A reference names nothing; resolves to "not found" at runtime
    DanglingRef,
}

/// Validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationError {
    fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether strict mode rejects a definition carrying this issue.
    pub fn is_fatal_when_strict(&self) -> bool {
        matches!(self.kind, IssueKind::Malformed | IssueKind::DuplicateId)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A compiled definition plus everything the compiler had to paper over.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub definition: FeatureDefinition,
    pub warnings: Vec<ValidationError>,
}

/// Compile a specification file from disk.
pub fn parse_spec_file(path: &Path, options: ParseOptions) -> Result<Compiled> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read {}: {}", path.display(), e),
        ))
    })?;
    compile(&content, options)
}

/// Compile specification text leniently and return just the definition.
pub fn parse_spec(source: &str) -> Result<FeatureDefinition> {
    compile(source, ParseOptions::default()).map(|c| c.definition)
}

/// Read markup and normalize it.
pub fn compile(source: &str, options: ParseOptions) -> Result<Compiled> {
    let root = markup::parse_document(source)
        .map_err(|e| Error::Parse(format!("unreadable specification: {}", e)))?;
    normalize(&root, options)
}

/// Normalize an element tree rooted at `<Feature>`.
pub fn normalize(root: &Element, options: ParseOptions) -> Result<Compiled> {
    if root.name != ROOT_ELEMENT {
        return Err(Error::Parse(format!(
            "missing <{}> root element (found <{}>)",
            ROOT_ELEMENT, root.name
        )));
    }

    let mut normalizer = Normalizer {
        options,
        warnings: Vec::new(),
    };
    let definition = normalizer.feature(root)?;
    let mut warnings = normalizer.warnings;

    for issue in validate_definition(&definition) {
        if options.strict && issue.is_fatal_when_strict() {
            return Err(Error::Parse(issue.message));
        }
        debug!(kind = ?issue.kind, "{}", issue.message);
        warnings.push(issue);
    }

    debug!(
        feature = %definition.name,
        queries = definition.backend.queries.len(),
        actions = definition.backend.action_queries.len(),
        tables = definition.frontend.data_tables.len(),
        forms = definition.frontend.forms.len(),
        mappings = definition.mappings.len(),
        warnings = warnings.len(),
        "compiled feature definition"
    );
    Ok(Compiled {
        definition,
        warnings,
    })
}

// ============================================================================
// Attribute helpers
// ============================================================================

fn flag(el: &Element, key: &str) -> bool {
    el.attr(key) == Some("true")
}

/// Absent means true; a present value must still be the literal `"true"`.
fn flag_default_true(el: &Element, key: &str) -> bool {
    el.attr(key).map_or(true, |v| v == "true")
}

/// Optional text attribute; empty values count as absent.
fn text(el: &Element, key: &str) -> Option<String> {
    el.attr(key)
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn option_items(el: &Element) -> Vec<OptionItem> {
    let Some(list) = el.child("Options") else {
        return Vec::new();
    };
    list.children_named("Option")
        .map(|opt| {
            let value = opt.attr("value").map(str::to_string);
            let label = opt
                .attr("label")
                .map(str::to_string)
                .or_else(|| Some(opt.trimmed_text().to_string()).filter(|t| !t.is_empty()));
            match (label, value) {
                (Some(label), Some(value)) => OptionItem::new(label, value),
                (Some(label), None) => OptionItem::new(label.clone(), label),
                (None, Some(value)) => OptionItem::new(value.clone(), value),
                (None, None) => OptionItem::new("", ""),
            }
        })
        .collect()
}

struct Normalizer {
    options: ParseOptions,
    warnings: Vec<ValidationError>,
}

impl Normalizer {
    /// Record a degradation, or fail in strict mode.
    fn degrade(&mut self, message: String) -> Result<()> {
        if self.options.strict {
            return Err(Error::Parse(message));
        }
        warn!("{}", message);
        self.warnings
            .push(ValidationError::new(IssueKind::Malformed, message));
        Ok(())
    }

    fn required(&mut self, el: &Element, key: &str) -> Result<String> {
        match text(el, key) {
            Some(v) => Ok(v.trim().to_string()),
            None => {
                self.degrade(format!(
                    "<{}> is missing required attribute '{}'",
                    el.name, key
                ))?;
                Ok(String::new())
            }
        }
    }

    fn number(&mut self, el: &Element, key: &str) -> Result<Option<u32>> {
        let Some(raw) = el.attr(key) else {
            return Ok(None);
        };
        match raw.trim().parse::<u32>() {
            Ok(n) => Ok(Some(n)),
            Err(_) => {
                self.degrade(format!(
                    "<{}> attribute '{}' is not an integer: '{}'",
                    el.name, key, raw
                ))?;
                Ok(None)
            }
        }
    }

    fn keyword_opt<T: FromStr<Err = String>>(
        &mut self,
        el: &Element,
        key: &str,
    ) -> Result<Option<T>> {
        let Some(raw) = el.attr(key) else {
            return Ok(None);
        };
        match raw.parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                self.degrade(format!("<{}> attribute '{}': {}", el.name, key, e))?;
                Ok(None)
            }
        }
    }

    fn keyword<T: FromStr<Err = String> + Default>(&mut self, el: &Element, key: &str) -> Result<T> {
        Ok(self.keyword_opt(el, key)?.unwrap_or_default())
    }

    // ------------------------------------------------------------------------
    // Sections
    // ------------------------------------------------------------------------

    fn feature(&mut self, root: &Element) -> Result<FeatureDefinition> {
        let name = text(root, "name").unwrap_or_default();
        let version = text(root, "version").unwrap_or_default();

        let backend = match root.child("Backend") {
            Some(section) => self.backend(section)?,
            None => BackendInfo::default(),
        };
        let frontend = match root.child("Frontend") {
            Some(section) => self.frontend(section)?,
            None => Frontend::default(),
        };

        // Mappings live at the root; a <Mappings> wrapper is accepted too.
        // Document order is kept so later duplicates win.
        let mut mappings = Vec::new();
        for el in &root.children {
            match el.name.as_str() {
                "Mapping" => mappings.push(self.mapping(el)?),
                "Mappings" => {
                    for inner in el.children_named("Mapping") {
                        mappings.push(self.mapping(inner)?);
                    }
                }
                _ => {}
            }
        }

        Ok(FeatureDefinition {
            name,
            version,
            backend,
            frontend,
            mappings,
        })
    }

    fn backend(&mut self, section: &Element) -> Result<BackendInfo> {
        let mut backend = BackendInfo::default();
        for el in section.children_named("Query") {
            backend.queries.push(self.query(el)?);
        }
        for el in section.children_named("ActionQuery") {
            backend.action_queries.push(self.action_query(el)?);
        }
        Ok(backend)
    }

    fn query(&mut self, el: &Element) -> Result<Query> {
        let id = self.required(el, "id")?;
        let kind = self.keyword(el, "type")?;
        let sql = el.trimmed_text().to_string();
        Ok(Query {
            id,
            kind,
            description: text(el, "description"),
            parameters: extract_parameters(&sql),
            sql,
        })
    }

    fn action_query(&mut self, el: &Element) -> Result<ActionQuery> {
        let id = self.required(el, "id")?;
        let kind = self.keyword(el, "type")?;
        let sql = el.trimmed_text().to_string();
        Ok(ActionQuery {
            id,
            kind,
            description: text(el, "description"),
            parameters: extract_parameters(&sql),
            sql,
        })
    }

    fn frontend(&mut self, section: &Element) -> Result<Frontend> {
        let mut frontend = Frontend::default();
        for el in section.children_named("DataTable") {
            frontend.data_tables.push(self.data_table(el)?);
        }
        for el in section.children_named("Form") {
            frontend.forms.push(self.form(el)?);
        }
        Ok(frontend)
    }

    fn data_table(&mut self, el: &Element) -> Result<DataTable> {
        let id = self.required(el, "id")?;
        let query_ref = self.required(el, "queryRef")?;
        let page_size = self.number(el, "pageSize")?;
        let mut columns = Vec::new();
        for col in el.children_named("Column") {
            columns.push(self.column(col)?);
        }
        let row_actions = el
            .attr("rowActions")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(DataTable {
            id,
            query_ref,
            title: text(el, "title"),
            pagination: flag_default_true(el, "pagination"),
            sortable: flag(el, "sortable"),
            filterable: flag(el, "filterable"),
            page_size,
            columns,
            row_actions,
        })
    }

    fn column(&mut self, el: &Element) -> Result<Column> {
        let name = self.required(el, "name")?;
        let mut data_type: DataType = self.keyword(el, "type")?;
        if data_type.is_input_only() {
            self.degrade(format!(
                "<Column name=\"{}\"> cannot use input-only type '{}'",
                name, data_type
            ))?;
            data_type = DataType::default();
        }
        Ok(Column {
            label: text(el, "label"),
            data_type,
            sortable: flag(el, "sortable"),
            filterable: flag(el, "filterable"),
            width: self.number(el, "width")?,
            format: text(el, "format"),
            align: self.keyword(el, "align")?,
            options: option_items(el),
            name,
        })
    }

    fn form(&mut self, el: &Element) -> Result<Form> {
        let id = self.required(el, "id")?;
        let mode = self.keyword(el, "mode")?;
        let mut form = Form {
            id,
            mode,
            dialog: flag(el, "dialog"),
            action_ref: text(el, "actionRef"),
            query_ref: text(el, "queryRef"),
            fields: Vec::new(),
            buttons: Vec::new(),
            messages: Vec::new(),
        };
        for child in el.children_named("Field") {
            form.fields.push(self.field(child)?);
        }
        for child in el.children_named("Button") {
            form.buttons.push(self.button(child)?);
        }
        for child in el.children_named("Message") {
            form.messages.push(self.message(child)?);
        }
        Ok(form)
    }

    fn field(&mut self, el: &Element) -> Result<Field> {
        let name = self.required(el, "name")?;
        Ok(Field {
            name,
            label: text(el, "label"),
            data_type: self.keyword(el, "type")?,
            required: flag(el, "required"),
            readonly: flag(el, "readonly"),
            disabled: flag(el, "disabled"),
            placeholder: text(el, "placeholder"),
            helper_text: text(el, "helperText"),
            options: option_items(el),
            pattern: text(el, "pattern"),
        })
    }

    fn button(&mut self, el: &Element) -> Result<Button> {
        let kind: ButtonType = self.keyword(el, "type")?;
        let style = self
            .keyword_opt(el, "style")?
            .unwrap_or_else(|| ButtonStyle::for_type(kind));
        Ok(Button {
            kind,
            label: text(el, "label"),
            style,
            disabled: flag(el, "disabled"),
        })
    }

    fn message(&mut self, el: &Element) -> Result<Message> {
        Ok(Message {
            kind: self.keyword(el, "type")?,
            content: el.trimmed_text().to_string(),
            visible: flag_default_true(el, "visible"),
        })
    }

    fn mapping(&mut self, el: &Element) -> Result<Mapping> {
        let name = self.required(el, "name")?;
        let options = el.child("Options").map(|_| OptionList {
            items: option_items(el),
        });
        let list_query = match el.child("ListQuery") {
            Some(lq) => Some(ListQuery {
                query_ref: self.required(lq, "ref")?,
                label_field: text(lq, "labelField"),
                value_field: text(lq, "valueField"),
            }),
            None => None,
        };
        if options.is_some() && list_query.is_some() {
            self.degrade(format!(
                "<Mapping name=\"{}\"> declares both Options and ListQuery; inline options take precedence",
                name
            ))?;
        }
        Ok(Mapping {
            data_type: self.keyword(el, "type")?,
            label: text(el, "label"),
            options,
            list_query,
            placeholder: text(el, "placeholder"),
            helper_text: text(el, "helperText"),
            required: flag(el, "required"),
            readonly: flag(el, "readonly"),
            disabled: flag(el, "disabled"),
            pattern: text(el, "pattern"),
            name,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

fn duplicates<'a>(
    errors: &mut Vec<ValidationError>,
    kind: IssueKind,
    what: &str,
    ids: impl Iterator<Item = &'a str>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                kind,
                format!("duplicate {} '{}'", what, id),
            ));
        }
    }
}

/// Structural checks on a definition. Returns a list of issues (empty = clean).
///
/// References are only reported; at runtime an unknown reference is a lookup
/// miss, not a failure.
pub fn validate_definition(def: &FeatureDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if def.name.is_empty() {
        errors.push(ValidationError::new(
            IssueKind::Malformed,
            "feature name must not be empty",
        ));
    }

    let backend = &def.backend;
    let frontend = &def.frontend;
    duplicates(
        &mut errors,
        IssueKind::DuplicateId,
        "query",
        backend.queries.iter().map(|q| q.id.as_str()),
    );
    duplicates(
        &mut errors,
        IssueKind::DuplicateId,
        "action query",
        backend.action_queries.iter().map(|a| a.id.as_str()),
    );
    duplicates(
        &mut errors,
        IssueKind::DuplicateId,
        "data table",
        frontend.data_tables.iter().map(|t| t.id.as_str()),
    );
    duplicates(
        &mut errors,
        IssueKind::DuplicateId,
        "form",
        frontend.forms.iter().map(|f| f.id.as_str()),
    );
    duplicates(
        &mut errors,
        IssueKind::ShadowedMapping,
        "mapping",
        def.mappings.iter().map(|m| m.name.as_str()),
    );

    for table in &frontend.data_tables {
        if !table.query_ref.is_empty() && def.query(&table.query_ref).is_none() {
            errors.push(ValidationError::new(
                IssueKind::DanglingRef,
                format!(
                    "data table '{}' references unknown query '{}'",
                    table.id, table.query_ref
                ),
            ));
        }
        for form_id in &table.row_actions {
            if def.form(form_id).is_none() {
                errors.push(ValidationError::new(
                    IssueKind::DanglingRef,
                    format!(
                        "data table '{}' row action references unknown form '{}'",
                        table.id, form_id
                    ),
                ));
            }
        }
    }

    for form in &frontend.forms {
        duplicates(
            &mut errors,
            IssueKind::DuplicateId,
            &format!("field in form '{}':", form.id),
            form.fields.iter().map(|f| f.name.as_str()),
        );
        if let Some(ref action) = form.action_ref {
            if def.action_query(action).is_none() {
                errors.push(ValidationError::new(
                    IssueKind::DanglingRef,
                    format!("form '{}' references unknown action '{}'", form.id, action),
                ));
            }
        }
        if let Some(ref query) = form.query_ref {
            if def.query(query).is_none() {
                errors.push(ValidationError::new(
                    IssueKind::DanglingRef,
                    format!("form '{}' references unknown query '{}'", form.id, query),
                ));
            }
        }
    }

    for mapping in &def.mappings {
        if let Some(ref lq) = mapping.list_query {
            if def.query(&lq.query_ref).is_none() {
                errors.push(ValidationError::new(
                    IssueKind::DanglingRef,
                    format!(
                        "mapping '{}' list query references unknown query '{}'",
                        mapping.name, lq.query_ref
                    ),
                ));
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::MappingTable;

    const ORDERS: &str = r#"<?xml version="1.0"?>
<Feature name="orders" version="1.2">
  <Backend>
    <Query id="Q1" type="Select" description="orders by customer">
      SELECT id, x, y FROM orders WHERE x=:x AND y=:y
    </Query>
    <Query id="Statuses"><![CDATA[SELECT code, label FROM status WHERE rank < :max]]></Query>
    <ActionQuery id="A1" type="Update">UPDATE orders SET status=:status WHERE id=:id</ActionQuery>
    <ActionQuery id="A2">INSERT INTO orders (x) VALUES (:x)</ActionQuery>
  </Backend>
  <Frontend>
    <DataTable id="T1" queryRef="Q1" title="Orders" pageSize="25" sortable="true" rowActions="F1, F2">
      <Column name="x" label="X value" type="Number" sortable="true" width="120" align="right"/>
      <Column name="status" type="Badge">
        <Options><Option label="Open" value="open"/></Options>
      </Column>
    </DataTable>
    <Form id="F1" mode="Edit" dialog="true" actionRef="A1" queryRef="Q1">
      <Field name="status" label="Status" type="Select" required="true">
        <Options>
          <Option label="Open" value="open"/>
          <Option label="Closed" value="closed"/>
        </Options>
      </Field>
      <Field name="email" type="Email" placeholder="you@example.com" pattern="^.+@.+$"/>
      <Button type="Submit"/>
      <Button type="Cancel" label="Back" style="Danger"/>
      <Message type="Warning">Edits are audited</Message>
    </Form>
    <Form id="F2" mode="Delete" actionRef="A2"/>
  </Frontend>
  <Mapping name="status" type="Select" label="Order status">
    <ListQuery ref="Statuses" labelField="label" valueField="code"/>
  </Mapping>
  <Mapping name="x" label="Amount"><Options/></Mapping>
</Feature>
"#;

    #[test]
    fn test_fm004_compile_query_table_column() {
        let def = parse_spec(
            r#"<Feature name="f" version="1">
  <Backend><Query id="Q1" type="Select">SELECT * FROM t WHERE x=:x AND y=:y</Query></Backend>
  <Frontend><DataTable id="T1" queryRef="Q1"><Column name="x" type="Number"/></DataTable></Frontend>
</Feature>"#,
        )
        .unwrap();
        assert_eq!(def.backend.queries[0].id, "Q1");
        let names: Vec<_> = def.backend.queries[0]
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(def.frontend.data_tables[0].columns[0].data_type, DataType::Number);
        assert_eq!(def.frontend.data_tables[0].columns[0].data_type.to_string(), "Number");
    }

    #[test]
    fn test_fm004_full_document() {
        let compiled = compile(ORDERS, ParseOptions::default()).unwrap();
        let def = &compiled.definition;
        assert_eq!(def.name, "orders");
        assert_eq!(def.version, "1.2");

        let q1 = def.query("Q1").unwrap();
        assert!(q1.sql.starts_with("SELECT id"));
        assert_eq!(q1.description.as_deref(), Some("orders by customer"));
        assert_eq!(def.query("Statuses").unwrap().parameters, vec![Parameter::new("max")]);

        let a1 = def.action_query("A1").unwrap();
        assert_eq!(a1.kind, ActionKind::Update);
        assert_eq!(a1.parameters.len(), 2);
        assert_eq!(def.action_query("A2").unwrap().kind, ActionKind::Insert);

        let t1 = def.data_table("T1").unwrap();
        assert!(t1.pagination);
        assert!(t1.sortable);
        assert!(!t1.filterable);
        assert_eq!(t1.page_size, Some(25));
        assert_eq!(t1.row_actions, vec!["F1", "F2"]);
        assert_eq!(t1.columns[0].align, Alignment::Right);
        assert_eq!(t1.columns[0].width, Some(120));
        assert_eq!(t1.columns[1].options.len(), 1);

        let f1 = def.form("F1").unwrap();
        assert_eq!(f1.mode, FormMode::Edit);
        assert!(f1.dialog);
        assert_eq!(f1.fields.len(), 2);
        assert_eq!(f1.fields[0].options.len(), 2);
        assert!(f1.fields[0].required);
        assert_eq!(f1.fields[1].pattern.as_deref(), Some("^.+@.+$"));
        assert_eq!(f1.buttons[0].style, ButtonStyle::Primary);
        assert_eq!(f1.buttons[1].style, ButtonStyle::Danger);
        assert_eq!(f1.buttons[1].display_label(), "Back");
        assert_eq!(f1.messages[0].kind, MessageType::Warning);
        assert!(f1.messages[0].visible);
        assert_eq!(f1.messages[0].content, "Edits are audited");

        let status = &def.mappings[0];
        assert_eq!(status.list_query.as_ref().unwrap().query_ref, "Statuses");
        assert!(status.options.is_none());
        assert_eq!(def.mappings[1].options, Some(OptionList::default()));

        assert!(compiled.warnings.is_empty(), "{:?}", compiled.warnings);
    }

    #[test]
    fn test_fm004_missing_root_is_fatal() {
        let err = parse_spec("<Spec name='x'/>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("<Feature>"));

        assert!(matches!(parse_spec("").unwrap_err(), Error::Parse(_)));
        assert!(matches!(parse_spec("<Feature>").unwrap_err(), Error::Parse(_)));
    }

    #[test]
    fn test_fm004_single_child_is_a_list() {
        let def = parse_spec(
            r#"<Feature name="f"><Frontend><Form id="only"><Field name="a"/></Form></Frontend></Feature>"#,
        )
        .unwrap();
        assert_eq!(def.frontend.forms.len(), 1);
        assert_eq!(def.frontend.forms[0].fields.len(), 1);
    }

    #[test]
    fn test_fm004_boolean_literal_only() {
        let def = parse_spec(
            r#"<Feature name="f"><Frontend><Form id="F">
  <Field name="a" required="TRUE" readonly="yes" disabled="true"/>
  <Message visible="false">hidden</Message>
  <Message>shown</Message>
  <Message visible="1">not literal</Message>
</Form></Frontend></Feature>"#,
        )
        .unwrap();
        let form = &def.frontend.forms[0];
        assert!(!form.fields[0].required);
        assert!(!form.fields[0].readonly);
        assert!(form.fields[0].disabled);
        assert!(!form.messages[0].visible);
        assert!(form.messages[1].visible);
        assert!(!form.messages[2].visible);
    }

    #[test]
    fn test_fm004_pagination_defaults_true() {
        let def = parse_spec(
            r#"<Feature name="f"><Frontend>
  <DataTable id="A" queryRef="Q"/>
  <DataTable id="B" queryRef="Q" pagination="false"/>
</Frontend></Feature>"#,
        )
        .unwrap();
        assert!(def.frontend.data_tables[0].pagination);
        assert!(!def.frontend.data_tables[1].pagination);
    }

    #[test]
    fn test_fm004_lenient_defaults_and_warnings() {
        let compiled = compile(
            r#"<Feature name="f"><Frontend>
  <DataTable id="T" queryRef="Q" pageSize="lots">
    <Column name="c" type="Hologram" align="diagonal"/>
    <Column name="p" type="Password"/>
  </DataTable>
  <Form id="F" mode="Teleport"><Button type="Launch"/></Form>
</Frontend></Feature>"#,
            ParseOptions::default(),
        )
        .unwrap();
        let table = &compiled.definition.frontend.data_tables[0];
        assert_eq!(table.page_size, None);
        assert_eq!(table.columns[0].data_type, DataType::Text);
        assert_eq!(table.columns[0].align, Alignment::Left);
        assert_eq!(table.columns[1].data_type, DataType::Text);
        let form = &compiled.definition.frontend.forms[0];
        assert_eq!(form.mode, FormMode::Create);
        assert_eq!(form.buttons[0].kind, ButtonType::Submit);

        let malformed = compiled
            .warnings
            .iter()
            .filter(|w| w.kind == IssueKind::Malformed)
            .count();
        assert_eq!(malformed, 6);
        // queryRef "Q" names nothing
        assert!(compiled
            .warnings
            .iter()
            .any(|w| w.kind == IssueKind::DanglingRef));
    }

    #[test]
    fn test_fm004_missing_ids_degrade() {
        let compiled = compile(
            r#"<Feature name="f"><Backend><Query>SELECT 1</Query></Backend></Feature>"#,
            ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(compiled.definition.backend.queries[0].id, "");
        assert!(compiled.warnings[0].message.contains("'id'"));
    }

    #[test]
    fn test_fm004_strict_rejects_malformed() {
        let err = compile(
            r#"<Feature name="f"><Frontend><Form id="F" mode="Teleport"/></Frontend></Feature>"#,
            ParseOptions::strict(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Teleport"));

        let err = compile(
            r#"<Feature name="f"><Backend><Query id="Q">a</Query><Query id="Q">b</Query></Backend></Feature>"#,
            ParseOptions::strict(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate query 'Q'"));
    }

    #[test]
    fn test_fm004_strict_accepts_clean_document() {
        let compiled = compile(ORDERS, ParseOptions::strict()).unwrap();
        assert_eq!(compiled.definition.frontend.forms.len(), 2);
    }

    #[test]
    fn test_fm004_strict_allows_dangling_refs() {
        let compiled = compile(
            r#"<Feature name="f"><Frontend><DataTable id="T" queryRef="Nope"/></Frontend></Feature>"#,
            ParseOptions::strict(),
        )
        .unwrap();
        assert_eq!(compiled.warnings.len(), 1);
        assert_eq!(compiled.warnings[0].kind, IssueKind::DanglingRef);
    }

    #[test]
    fn test_fm004_mapping_both_sources_warns() {
        let compiled = compile(
            r#"<Feature name="f">
  <Backend><Query id="L">SELECT 1</Query></Backend>
  <Mapping name="m"><Options><Option label="A" value="a"/></Options><ListQuery ref="L"/></Mapping>
</Feature>"#,
            ParseOptions::default(),
        )
        .unwrap();
        let m = &compiled.definition.mappings[0];
        assert!(m.options.is_some());
        assert!(m.list_query.is_some());
        assert!(compiled.warnings[0].message.contains("both Options and ListQuery"));
    }

    #[test]
    fn test_fm004_mappings_wrapper_and_order() {
        let def = parse_spec(
            r#"<Feature name="f">
  <Mapping name="a" label="1"/>
  <Mappings><Mapping name="b"/></Mappings>
  <Mapping name="a" label="2"/>
</Feature>"#,
        )
        .unwrap();
        let names: Vec<_> = def.mappings.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_fm004_later_bare_mapping_beats_wrapped_one() {
        let def = parse_spec(
            r#"<Feature name="f">
  <Mappings><Mapping name="a" label="first"/></Mappings>
  <Mapping name="a" label="second"/>
</Feature>"#,
        )
        .unwrap();
        let labels: Vec<_> = def.mappings.iter().map(|m| m.label.as_deref()).collect();
        assert_eq!(labels, vec![Some("first"), Some("second")]);
        let table = MappingTable::build(def.mappings.iter().cloned());
        assert_eq!(table.get("a").unwrap().label.as_deref(), Some("second"));
    }

    #[test]
    fn test_fm004_option_fallbacks() {
        let def = parse_spec(
            r#"<Feature name="f"><Frontend><Form id="F"><Field name="s">
  <Options><Option value="v"/><Option label="L"/><Option>Text</Option></Options>
</Field></Form></Frontend></Feature>"#,
        )
        .unwrap();
        let opts = &def.frontend.forms[0].fields[0].options;
        assert_eq!(opts[0], OptionItem::new("v", "v"));
        assert_eq!(opts[1], OptionItem::new("L", "L"));
        assert_eq!(opts[2], OptionItem::new("Text", "Text"));
    }

    #[test]
    fn test_fm004_validate_reports() {
        let mut def = parse_spec(ORDERS).unwrap();
        assert!(validate_definition(&def).is_empty());

        def.frontend.forms[0].action_ref = Some("Ghost".into());
        def.frontend.forms[1].id = "F1".into();
        def.mappings.push(Mapping::new("status"));
        let issues = validate_definition(&def);
        assert!(issues
            .iter()
            .any(|e| e.message.contains("unknown action 'Ghost'")));
        assert!(issues
            .iter()
            .any(|e| e.kind == IssueKind::DuplicateId && e.message.contains("form 'F1'")));
        assert!(issues
            .iter()
            .any(|e| e.kind == IssueKind::ShadowedMapping));
        // F2 vanished, so the row action now dangles
        assert!(issues
            .iter()
            .any(|e| e.message.contains("unknown form 'F2'")));
    }

    #[test]
    fn test_fm004_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.xml");
        std::fs::write(&path, ORDERS).unwrap();
        let compiled = parse_spec_file(&path, ParseOptions::default()).unwrap();
        assert_eq!(compiled.definition.name, "orders");

        let missing = parse_spec_file(&dir.path().join("nope.xml"), ParseOptions::default());
        assert!(matches!(missing.unwrap_err(), Error::Io(_)));
    }
}
