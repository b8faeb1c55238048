//! UI Automation backend for [`ElementInspector`].
//!
//! [`UiaInspector`] resolves the element under a screen point with
//! `ElementFromPoint` and reads its *current* (uncached) properties.
//!
//! # COM apartment model
//!
//! Every query enters its own [`ComScope`] on the calling thread and creates
//! a fresh `CUIAutomation` instance.  No COM interface outlives the query,
//! so the inspector itself is freely shared across the hover and input
//! threads.

use crate::element::{ElementDescription, ElementInspector};
use crate::errors::SpyglassError;

#[cfg(windows)]
use windows::core::Interface;
#[cfg(windows)]
use windows::Win32::Foundation::POINT;
#[cfg(windows)]
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER};
#[cfg(windows)]
use windows::Win32::UI::Accessibility::{
    CUIAutomation, IUIAutomation, IUIAutomationElement, IUIAutomationValuePattern,
    UIA_ValuePatternId, UIA_CONTROLTYPE_ID,
};

#[cfg(windows)]
use crate::com::ComScope;
#[cfg(windows)]
use crate::element::ElementProperties;
#[cfg(windows)]
use crate::geometry::Rectangle;

// ---------------------------------------------------------------------------
// Control-type ID -> name mapping
// ---------------------------------------------------------------------------

#[cfg(windows)]
fn control_type_name(id: UIA_CONTROLTYPE_ID) -> &'static str {
    use windows::Win32::UI::Accessibility::*;
    match id {
        x if x == UIA_ButtonControlTypeId => "Button",
        x if x == UIA_CalendarControlTypeId => "Calendar",
        x if x == UIA_CheckBoxControlTypeId => "CheckBox",
        x if x == UIA_ComboBoxControlTypeId => "ComboBox",
        x if x == UIA_CustomControlTypeId => "Custom",
        x if x == UIA_DataGridControlTypeId => "DataGrid",
        x if x == UIA_DataItemControlTypeId => "DataItem",
        x if x == UIA_DocumentControlTypeId => "Document",
        x if x == UIA_EditControlTypeId => "Edit",
        x if x == UIA_GroupControlTypeId => "Group",
        x if x == UIA_HeaderControlTypeId => "Header",
        x if x == UIA_HeaderItemControlTypeId => "HeaderItem",
        x if x == UIA_HyperlinkControlTypeId => "Hyperlink",
        x if x == UIA_ImageControlTypeId => "Image",
        x if x == UIA_ListControlTypeId => "List",
        x if x == UIA_ListItemControlTypeId => "ListItem",
        x if x == UIA_MenuBarControlTypeId => "MenuBar",
        x if x == UIA_MenuControlTypeId => "Menu",
        x if x == UIA_MenuItemControlTypeId => "MenuItem",
        x if x == UIA_PaneControlTypeId => "Pane",
        x if x == UIA_ProgressBarControlTypeId => "ProgressBar",
        x if x == UIA_RadioButtonControlTypeId => "RadioButton",
        x if x == UIA_ScrollBarControlTypeId => "ScrollBar",
        x if x == UIA_SeparatorControlTypeId => "Separator",
        x if x == UIA_SliderControlTypeId => "Slider",
        x if x == UIA_SpinnerControlTypeId => "Spinner",
        x if x == UIA_SplitButtonControlTypeId => "SplitButton",
        x if x == UIA_StatusBarControlTypeId => "StatusBar",
        x if x == UIA_TabControlTypeId => "Tab",
        x if x == UIA_TabItemControlTypeId => "TabItem",
        x if x == UIA_TableControlTypeId => "Table",
        x if x == UIA_TextControlTypeId => "Text",
        x if x == UIA_ThumbControlTypeId => "Thumb",
        x if x == UIA_TitleBarControlTypeId => "TitleBar",
        x if x == UIA_ToolBarControlTypeId => "ToolBar",
        x if x == UIA_ToolTipControlTypeId => "ToolTip",
        x if x == UIA_TreeControlTypeId => "Tree",
        x if x == UIA_TreeItemControlTypeId => "TreeItem",
        x if x == UIA_WindowControlTypeId => "Window",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// Property readers
// ---------------------------------------------------------------------------

#[cfg(windows)]
macro_rules! bstr_or_empty {
    ($expr:expr) => {
        unsafe { $expr }
            .map(|b: windows::core::BSTR| b.to_string())
            .unwrap_or_default()
    };
}

#[cfg(windows)]
macro_rules! bool_or {
    ($expr:expr, $fallback:expr) => {
        unsafe { $expr }
            .map(|b: windows::Win32::Foundation::BOOL| b.as_bool())
            .unwrap_or($fallback)
    };
}

/// `ValuePattern` value, when the element exposes one.
#[cfg(windows)]
unsafe fn read_value(element: &IUIAutomationElement) -> Option<String> {
    let pattern = element
        .GetCurrentPattern(UIA_ValuePatternId)
        .ok()?
        .cast::<IUIAutomationValuePattern>()
        .ok()?;
    pattern.CurrentValue().ok().map(|b| b.to_string())
}

/// Name of the element's parent in the control view.
#[cfg(windows)]
unsafe fn read_parent_name(uia: &IUIAutomation, element: &IUIAutomationElement) -> Option<String> {
    let walker = uia.ControlViewWalker().ok()?;
    let parent = walker.GetParentElement(element).ok()?;
    parent.CurrentName().ok().map(|b| b.to_string())
}

#[cfg(windows)]
unsafe fn read_properties(uia: &IUIAutomation, element: &IUIAutomationElement) -> ElementProperties {
    let control_type = element
        .CurrentControlType()
        .map(|id| control_type_name(id).to_owned())
        .unwrap_or_else(|_| "Unknown".to_owned());

    let bounds = element
        .CurrentBoundingRectangle()
        .map(|r| Rectangle::from_edges(r.left, r.top, r.right, r.bottom))
        .unwrap_or_default();

    ElementProperties {
        name: bstr_or_empty!(element.CurrentName()),
        control_type,
        class_name: bstr_or_empty!(element.CurrentClassName()),
        automation_id: bstr_or_empty!(element.CurrentAutomationId()),
        value: read_value(element),
        is_enabled: bool_or!(element.CurrentIsEnabled(), false),
        is_offscreen: bool_or!(element.CurrentIsOffscreen(), false),
        bounds,
        parent_name: read_parent_name(uia, element),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// [`ElementInspector`] backed by Windows UI Automation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UiaInspector;

impl UiaInspector {
    pub fn new() -> Self {
        Self
    }

    /// Whether this build has a UI Automation backend at all.
    pub fn is_available() -> bool {
        cfg!(windows)
    }
}

impl ElementInspector for UiaInspector {
    #[cfg(windows)]
    fn describe_element_at(
        &self,
        x: i32,
        y: i32,
    ) -> Result<Option<ElementDescription>, SpyglassError> {
        let _com = ComScope::enter()?;

        let uia: IUIAutomation =
            unsafe { CoCreateInstance(&CUIAutomation, None, CLSCTX_INPROC_SERVER)? };

        let element: IUIAutomationElement = unsafe {
            uia.ElementFromPoint(POINT { x, y })
                .map_err(|e| SpyglassError::InspectError(format!("ElementFromPoint({x},{y}): {e}")))?
        };

        let props = unsafe { read_properties(&uia, &element) };
        Ok(Some(ElementDescription::from(props)))
    }

    #[cfg(not(windows))]
    fn describe_element_at(
        &self,
        _x: i32,
        _y: i32,
    ) -> Result<Option<ElementDescription>, SpyglassError> {
        Err(SpyglassError::Unsupported("UI Automation"))
    }
}
