//! FM-001: Feature definition model and backend contract types.
//!
//! Everything the compiler produces and the runtime consumes. Field names
//! serialize as camelCase so the same types double as the JSON backend
//! contract (BackendInfo, FrontendElements, MappingsResponse, QueryResponse,
//! ActionResponse). Enumerations are closed; string decoding happens once,
//! in the compiler, via `FromStr`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Generates a closed keyword enum with a default arm, case-insensitive
/// `FromStr`, `Display`, and string-valued serde.
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $name:ident default $default:ident {
            $($variant:ident => $keyword:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $keyword),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($keyword) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("unrecognized {} '{}'", stringify!($name), s))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// ============================================================================
// Enumerations
// ============================================================================

keyword_enum! {
    /// Presentation/input type shared by columns, fields and mappings.
    DataType default Text {
        Text => "Text",
        Number => "Number",
        Date => "Date",
        DateTime => "DateTime",
        Boolean => "Boolean",
        Currency => "Currency",
        Percentage => "Percentage",
        Link => "Link",
        Badge => "Badge",
        Image => "Image",
        Email => "Email",
        Phone => "Phone",
        Url => "URL",
        Password => "Password",
        Select => "Select",
        MultiSelect => "MultiSelect",
        Checkbox => "Checkbox",
        Radio => "Radio",
        Textarea => "Textarea",
        Hidden => "Hidden",
        File => "File",
    }
}

impl DataType {
    /// Kinds that only make sense on an input field, never on a column.
    pub fn is_input_only(&self) -> bool {
        matches!(
            self,
            Self::Password
                | Self::Select
                | Self::MultiSelect
                | Self::Checkbox
                | Self::Radio
                | Self::Textarea
                | Self::Hidden
                | Self::File
        )
    }
}

keyword_enum! {
    /// Column alignment.
    Alignment default Left {
        Left => "left",
        Center => "center",
        Right => "right",
    }
}

keyword_enum! {
    /// Kind of a read query.
    QueryKind default Select {
        Select => "Select",
    }
}

keyword_enum! {
    /// Kind of a mutation.
    ActionKind default Insert {
        Insert => "Insert",
        Update => "Update",
        Delete => "Delete",
    }
}

keyword_enum! {
    FormMode default Create {
        Create => "Create",
        Edit => "Edit",
        View => "View",
        Delete => "Delete",
        Search => "Search",
    }
}

keyword_enum! {
    ButtonType default Submit {
        Submit => "Submit",
        Cancel => "Cancel",
        Reset => "Reset",
        Close => "Close",
        Custom => "Custom",
    }
}

keyword_enum! {
    ButtonStyle default Secondary {
        Primary => "Primary",
        Secondary => "Secondary",
        Danger => "Danger",
        Success => "Success",
        Warning => "Warning",
        Info => "Info",
    }
}

impl ButtonStyle {
    /// Style used when the author did not pick one.
    pub fn for_type(kind: ButtonType) -> Self {
        match kind {
            ButtonType::Submit => Self::Primary,
            _ => Self::Secondary,
        }
    }
}

keyword_enum! {
    MessageType default Info {
        Info => "Info",
        Warning => "Warning",
        Error => "Error",
        Success => "Success",
    }
}

// ============================================================================
// Feature definition
// ============================================================================

/// The compiled, typed model of one specification document.
///
/// Replaced wholesale on reload and shared behind an `Arc`; never mutated
/// in place once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDefinition {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub backend: BackendInfo,

    #[serde(default)]
    pub frontend: Frontend,

    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

impl FeatureDefinition {
    /// Rebuild a definition from the three load responses.
    pub fn assemble(
        backend: BackendInfo,
        frontend: FrontendElements,
        mappings: MappingsResponse,
    ) -> Self {
        Self {
            name: frontend.feature,
            version: frontend.version,
            backend,
            frontend: Frontend {
                data_tables: frontend.data_tables,
                forms: frontend.forms,
            },
            mappings: mappings.mappings,
        }
    }

    pub fn frontend_elements(&self) -> FrontendElements {
        FrontendElements {
            feature: self.name.clone(),
            version: self.version.clone(),
            data_tables: self.frontend.data_tables.clone(),
            forms: self.frontend.forms.clone(),
        }
    }

    pub fn mappings_response(&self) -> MappingsResponse {
        MappingsResponse {
            feature: self.name.clone(),
            version: self.version.clone(),
            resolved_count: self.mappings.len(),
            mappings: self.mappings.clone(),
        }
    }

    /// `blake3:{hex}` digest of the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        format!("blake3:{}", blake3::hash(&canonical).to_hex())
    }

    pub fn query(&self, id: &str) -> Option<&Query> {
        self.backend.queries.iter().find(|q| q.id == id)
    }

    pub fn action_query(&self, id: &str) -> Option<&ActionQuery> {
        self.backend.action_queries.iter().find(|a| a.id == id)
    }

    pub fn data_table(&self, id: &str) -> Option<&DataTable> {
        self.frontend.data_tables.iter().find(|t| t.id == id)
    }

    pub fn form(&self, id: &str) -> Option<&Form> {
        self.frontend.forms.iter().find(|f| f.id == id)
    }
}

// ============================================================================
// Backend section
// ============================================================================

/// Declared queries and mutations. Also the BackendInfo wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInfo {
    #[serde(default)]
    pub queries: Vec<Query>,

    #[serde(default)]
    pub action_queries: Vec<ActionQuery>,
}

/// A named placeholder found in query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A named read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub id: String,

    #[serde(rename = "type", default)]
    pub kind: QueryKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Raw query body, trimmed
    #[serde(default)]
    pub sql: String,

    /// Placeholders in first-appearance order, deduplicated
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// A named mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionQuery {
    pub id: String,

    #[serde(rename = "type", default)]
    pub kind: ActionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub sql: String,

    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

// ============================================================================
// Frontend section
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontend {
    #[serde(default)]
    pub data_tables: Vec<DataTable>,

    #[serde(default)]
    pub forms: Vec<Form>,
}

/// A label/value pair offered by a select-like field or badge column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub label: String,
    pub value: String,
}

impl OptionItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTable {
    pub id: String,

    /// Query id; resolved lazily
    #[serde(default)]
    pub query_ref: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default = "default_true")]
    pub pagination: bool,

    #[serde(default)]
    pub sortable: bool,

    #[serde(default)]
    pub filterable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    #[serde(default)]
    pub columns: Vec<Column>,

    /// Form ids offered as row actions
    #[serde(default)]
    pub row_actions: Vec<String>,
}

impl DataTable {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(rename = "type", default)]
    pub data_type: DataType,

    #[serde(default)]
    pub sortable: bool,

    #[serde(default)]
    pub filterable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default)]
    pub align: Alignment,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionItem>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            data_type: DataType::default(),
            sortable: false,
            filterable: false,
            width: None,
            format: None,
            align: Alignment::default(),
            options: Vec::new(),
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: String,

    #[serde(default)]
    pub mode: FormMode,

    #[serde(default)]
    pub dialog: bool,

    /// Mutation target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_ref: Option<String>,

    /// Pre-population source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_ref: Option<String>,

    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default)]
    pub buttons: Vec<Button>,

    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Form {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(rename = "type", default)]
    pub data_type: DataType,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub readonly: bool,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,

    #[serde(default)]
    pub options: Vec<OptionItem>,

    /// Validation pattern, passed through uninterpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            data_type: DataType::default(),
            required: false,
            readonly: false,
            disabled: false,
            placeholder: None,
            helper_text: None,
            options: Vec::new(),
            pattern: None,
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// A form button. A missing `style` on the wire takes the type's default,
/// the same as in compiled markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ButtonWire")]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: ButtonType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub style: ButtonStyle,

    pub disabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ButtonWire {
    #[serde(rename = "type", default)]
    kind: ButtonType,

    #[serde(default)]
    label: Option<String>,

    #[serde(default)]
    style: Option<ButtonStyle>,

    #[serde(default)]
    disabled: bool,
}

impl From<ButtonWire> for Button {
    fn from(wire: ButtonWire) -> Self {
        Self {
            kind: wire.kind,
            label: wire.label,
            style: wire
                .style
                .unwrap_or_else(|| ButtonStyle::for_type(wire.kind)),
            disabled: wire.disabled,
        }
    }
}

impl Button {
    /// Author label, or a default derived from the button type.
    pub fn display_label(&self) -> &str {
        if let Some(ref label) = self.label {
            return label;
        }
        match self.kind {
            ButtonType::Submit => "Submit",
            ButtonType::Cancel => "Cancel",
            ButtonType::Reset => "Reset",
            ButtonType::Close => "Close",
            ButtonType::Custom => "Action",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type", default)]
    pub kind: MessageType,

    #[serde(default)]
    pub content: String,

    #[serde(default = "default_true")]
    pub visible: bool,
}

// ============================================================================
// Mappings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionList {
    #[serde(default)]
    pub items: Vec<OptionItem>,
}

/// Reference to a query whose rows populate a mapping's options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(rename = "ref")]
    pub query_ref: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
}

/// Feature-wide presentation override, joined to fields and columns by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub name: String,

    #[serde(rename = "type", default)]
    pub data_type: DataType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionList>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_query: Option<ListQuery>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub readonly: bool,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Mapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::default(),
            label: None,
            options: None,
            list_query: None,
            placeholder: None,
            helper_text: None,
            required: false,
            readonly: false,
            disabled: false,
            pattern: None,
        }
    }

    /// Inline option items, if any were declared and the list is non-empty.
    pub fn option_items(&self) -> Option<&[OptionItem]> {
        self.options
            .as_ref()
            .map(|o| o.items.as_slice())
            .filter(|items| !items.is_empty())
    }
}

// ============================================================================
// Backend contract responses
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendElements {
    #[serde(default)]
    pub feature: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub data_tables: Vec<DataTable>,

    #[serde(default)]
    pub forms: Vec<Form>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingsResponse {
    #[serde(default)]
    pub feature: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub resolved_count: usize,

    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,

    #[serde(default)]
    pub total: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}
