//! Element descriptions and the inspection seam.
//!
//! [`ElementDescription`] is an owned, COM-free snapshot of the UI element
//! under a screen point.  It is built fresh on every query and compared
//! structurally to decide whether the hovered element changed, so *every*
//! field (including the volatile `value`) participates in equality.

use serde::Serialize;

use crate::errors::SpyglassError;
use crate::geometry::Rectangle;

/// Semantic types that the tracker colors as interactive.
pub const INTERACTIVE_TYPES: &[&str] = &[
    "button", "edit", "checkbox", "combobox", "link", "menuitem", "listitem", "tabitem",
];

/// Map a UIA control type name (e.g. `"Button"`) to its semantic type.
///
/// Unmapped control types are `"unknown"`.
pub fn semantic_type(control_type: &str) -> &'static str {
    match control_type {
        "Button" => "button",
        "Edit" => "edit",
        "CheckBox" => "checkbox",
        "ComboBox" => "combobox",
        "List" => "list",
        "ListItem" => "listitem",
        "Hyperlink" => "link",
        "Text" => "text",
        "Image" => "image",
        "Menu" => "menu",
        "MenuItem" => "menuitem",
        "Tab" => "tab",
        "TabItem" => "tabitem",
        "Tree" => "tree",
        "TreeItem" => "treeitem",
        "Document" => "document",
        "Pane" => "pane",
        "Window" => "window",
        _ => "unknown",
    }
}

pub fn is_interactive_type(element_type: &str) -> bool {
    INTERACTIVE_TYPES.contains(&element_type)
}

/// Raw properties read from the accessibility layer, before classification.
#[derive(Debug, Clone, Default)]
pub struct ElementProperties {
    pub name: String,
    /// UIA control type name without the `Control` suffix (`"Button"`).
    pub control_type: String,
    pub class_name: String,
    pub automation_id: String,
    pub value: Option<String>,
    pub is_enabled: bool,
    pub is_offscreen: bool,
    pub bounds: Rectangle,
    pub parent_name: Option<String>,
}

/// Structured description of one UI element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub element_type: String,
    pub control_type: String,
    pub class_name: String,
    pub automation_id: String,
    pub value: Option<String>,
    pub is_enabled: bool,
    pub is_visible: bool,
    pub is_interactive: bool,
    pub bounds: Rectangle,
    pub parent_name: Option<String>,
}

impl From<ElementProperties> for ElementDescription {
    fn from(props: ElementProperties) -> Self {
        let element_type = semantic_type(&props.control_type);
        Self {
            name: props.name,
            element_type: element_type.to_owned(),
            control_type: format!("{}Control", props.control_type),
            class_name: props.class_name,
            automation_id: props.automation_id,
            value: props.value,
            is_enabled: props.is_enabled,
            is_visible: !props.is_offscreen,
            is_interactive: is_interactive_type(element_type),
            bounds: props.bounds,
            parent_name: props.parent_name,
        }
    }
}

/// Query seam over the accessibility layer.
///
/// `Ok(None)` means "nothing there"; `Err` means the layer itself failed.
/// Callers in the engines treat both as "no element".
pub trait ElementInspector: Send + Sync {
    fn describe_element_at(&self, x: i32, y: i32)
        -> Result<Option<ElementDescription>, SpyglassError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
