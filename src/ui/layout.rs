//! Declarative layout of the UI.
//!
//! The layout is a pure function of session state: [`BINDINGS`] maps each
//! `(control, event)` pair to a [`Transition`] and the controls it re-renders,
//! and [`render_control`] derives labels, visibility and enablement from a
//! [`UiSession`]. Rendering the same state twice yields the same views.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::mode::Mode;
use super::session::{ChatTurn, IngestedFile, UiSession};

/// Every control on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    SidebarToggle,
    Sidebar,
    ModeRadio,
    Explanation,
    UploadButton,
    FileList,
    DeselectButton,
    SelectedText,
    DeleteButton,
    DeleteAllButton,
    SystemPrompt,
    Chat,
}

impl Control {
    /// Page order.
    pub const ALL: [Self; 12] = [
        Self::SidebarToggle,
        Self::Sidebar,
        Self::ModeRadio,
        Self::Explanation,
        Self::UploadButton,
        Self::FileList,
        Self::DeselectButton,
        Self::SelectedText,
        Self::DeleteButton,
        Self::DeleteAllButton,
        Self::SystemPrompt,
        Self::Chat,
    ];

    /// DOM id and wire name.
    pub fn id(self) -> &'static str {
        match self {
            Self::SidebarToggle => "sidebar_toggle",
            Self::Sidebar => "sidebar",
            Self::ModeRadio => "mode_radio",
            Self::Explanation => "explanation",
            Self::UploadButton => "upload_button",
            Self::FileList => "file_list",
            Self::DeselectButton => "deselect_button",
            Self::SelectedText => "selected_text",
            Self::DeleteButton => "delete_button",
            Self::DeleteAllButton => "delete_all_button",
            Self::SystemPrompt => "system_prompt",
            Self::Chat => "chat",
        }
    }

    /// Controls drawn inside the collapsible sidebar.
    pub fn in_sidebar(self) -> bool {
        !matches!(self, Self::SidebarToggle | Self::Sidebar | Self::Chat)
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// User interactions a control can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiEventKind {
    Click,
    Upload,
    Select,
    Change,
    Blur,
    Submit,
}

impl fmt::Display for UiEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Click => "click",
            Self::Upload => "upload",
            Self::Select => "select",
            Self::Change => "change",
            Self::Blur => "blur",
            Self::Submit => "submit",
        })
    }
}

/// Session controller transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    UploadFiles,
    FilesListChanged,
    SelectFile,
    DeselectFile,
    DeleteSelected,
    DeleteAll,
    ChangeMode,
    EditSystemPrompt,
    ToggleSidebar,
    SendMessage,
}

impl Transition {
    pub fn name(self) -> &'static str {
        match self {
            Self::UploadFiles => "upload_files",
            Self::FilesListChanged => "files_list_changed",
            Self::SelectFile => "select_file",
            Self::DeselectFile => "deselect_file",
            Self::DeleteSelected => "delete_selected",
            Self::DeleteAll => "delete_all",
            Self::ChangeMode => "change_mode",
            Self::EditSystemPrompt => "edit_system_prompt",
            Self::ToggleSidebar => "toggle_sidebar",
            Self::SendMessage => "send_message",
        }
    }

    /// Whether a successful run changes the file list.
    pub fn mutates_files(self) -> bool {
        matches!(
            self,
            Self::UploadFiles | Self::DeleteSelected | Self::DeleteAll
        )
    }
}

/// One row of the binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub control: Control,
    pub event: UiEventKind,
    pub transition: Transition,
    /// Controls re-rendered after the transition.
    pub outputs: &'static [Control],
}

pub(crate) const SELECTION_OUTPUTS: &[Control] = &[
    Control::DeleteButton,
    Control::DeselectButton,
    Control::SelectedText,
];

const DELETION_OUTPUTS: &[Control] = &[
    Control::FileList,
    Control::DeleteButton,
    Control::DeselectButton,
    Control::SelectedText,
];

pub const BINDINGS: &[Binding] = &[
    Binding {
        control: Control::UploadButton,
        event: UiEventKind::Upload,
        transition: Transition::UploadFiles,
        outputs: &[Control::FileList],
    },
    Binding {
        control: Control::FileList,
        event: UiEventKind::Change,
        transition: Transition::FilesListChanged,
        outputs: &[Control::FileList],
    },
    Binding {
        control: Control::FileList,
        event: UiEventKind::Select,
        transition: Transition::SelectFile,
        outputs: SELECTION_OUTPUTS,
    },
    Binding {
        control: Control::DeselectButton,
        event: UiEventKind::Click,
        transition: Transition::DeselectFile,
        outputs: SELECTION_OUTPUTS,
    },
    Binding {
        control: Control::DeleteButton,
        event: UiEventKind::Click,
        transition: Transition::DeleteSelected,
        outputs: DELETION_OUTPUTS,
    },
    Binding {
        control: Control::DeleteAllButton,
        event: UiEventKind::Click,
        transition: Transition::DeleteAll,
        outputs: DELETION_OUTPUTS,
    },
    Binding {
        control: Control::ModeRadio,
        event: UiEventKind::Change,
        transition: Transition::ChangeMode,
        outputs: &[Control::SystemPrompt, Control::Explanation, Control::Chat],
    },
    Binding {
        control: Control::SystemPrompt,
        event: UiEventKind::Blur,
        transition: Transition::EditSystemPrompt,
        outputs: &[],
    },
    Binding {
        control: Control::SidebarToggle,
        event: UiEventKind::Click,
        transition: Transition::ToggleSidebar,
        outputs: &[Control::SidebarToggle, Control::Sidebar],
    },
    Binding {
        control: Control::Chat,
        event: UiEventKind::Submit,
        transition: Transition::SendMessage,
        outputs: &[Control::Chat],
    },
];

pub fn binding(control: Control, event: UiEventKind) -> Option<&'static Binding> {
    BINDINGS
        .iter()
        .find(|b| b.control == control && b.event == event)
}

/// The binding whose transition is `transition`.
pub fn binding_for(transition: Transition) -> Option<&'static Binding> {
    BINDINGS.iter().find(|b| b.transition == transition)
}

/// Visual weight of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Primary,
    Secondary,
    /// Destructive, single item.
    Warning,
    /// Destructive, everything.
    Danger,
}

impl Emphasis {
    #[must_use]
    pub fn classes(self) -> &'static str {
        match self {
            Self::Primary => "bg-slate-800 text-white hover:bg-slate-700",
            Self::Secondary => "bg-white text-slate-800 border border-slate-300 hover:bg-slate-100",
            Self::Warning => "bg-amber-500 text-white hover:bg-amber-600",
            Self::Danger => "bg-red-600 text-white font-semibold ring-2 ring-red-300 hover:bg-red-700",
        }
    }
}

/// Content carried by a control.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ControlValue {
    Empty,
    Flag(bool),
    Text(String),
    Choice {
        options: Vec<&'static str>,
        selected: Option<&'static str>,
    },
    Files(Vec<IngestedFile>),
    Transcript(Vec<ChatTurn>),
}

/// Render-time description of one control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlView {
    pub control: Control,
    pub label: String,
    pub visible: bool,
    pub interactive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emphasis: Option<Emphasis>,
    pub value: ControlValue,
}

/// All controls of a session, in page order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutView {
    pub session_id: String,
    pub controls: Vec<ControlView>,
}

impl LayoutView {
    pub fn control(&self, control: Control) -> Option<&ControlView> {
        self.controls.iter().find(|v| v.control == control)
    }
}

pub fn is_visible(control: Control, session: &UiSession) -> bool {
    match control {
        Control::SidebarToggle | Control::Chat => true,
        _ => session.sidebar_visible(),
    }
}

/// Enablement rules. Delete-one and deselect follow the selection.
pub fn is_enabled(control: Control, session: &UiSession) -> bool {
    match control {
        Control::DeselectButton | Control::DeleteButton => session.file_selected(),
        Control::Explanation | Control::SelectedText => false,
        Control::SystemPrompt => session.mode().is_none_or(Mode::accepts_system_prompt),
        Control::Chat => session.mode().is_some(),
        Control::SidebarToggle
        | Control::Sidebar
        | Control::ModeRadio
        | Control::UploadButton
        | Control::FileList
        | Control::DeleteAllButton => true,
    }
}

/// Whether an event from `control` may be dispatched right now.
pub fn accepts_events(control: Control, session: &UiSession) -> bool {
    is_visible(control, session) && is_enabled(control, session)
}

pub fn render_control(control: Control, session: &UiSession, model: &str) -> ControlView {
    let (label, emphasis, value) = match control {
        Control::SidebarToggle => (
            "Sidebar".to_string(),
            Some(Emphasis::Secondary),
            ControlValue::Flag(session.sidebar_visible()),
        ),
        Control::Sidebar => (String::new(), None, ControlValue::Empty),
        Control::ModeRadio => (
            "Mode".to_string(),
            None,
            ControlValue::Choice {
                options: Mode::ALL.iter().map(|m| m.label()).collect(),
                selected: session.mode().map(Mode::label),
            },
        ),
        Control::Explanation => (
            String::new(),
            None,
            ControlValue::Text(session.explanation().to_string()),
        ),
        Control::UploadButton => (
            "Upload File(s)".to_string(),
            Some(Emphasis::Primary),
            ControlValue::Empty,
        ),
        Control::FileList => (
            "Ingested Files".to_string(),
            None,
            ControlValue::Files(session.files().to_vec()),
        ),
        Control::DeselectButton => (
            "De-select selected file".to_string(),
            Some(Emphasis::Secondary),
            ControlValue::Empty,
        ),
        Control::SelectedText => (
            "Selected for Query or Deletion".to_string(),
            None,
            ControlValue::Text(session.selected_text().to_string()),
        ),
        Control::DeleteButton => (
            "🗑️ Delete selected file".to_string(),
            Some(Emphasis::Warning),
            ControlValue::Empty,
        ),
        Control::DeleteAllButton => (
            "⚠️ Delete ALL files".to_string(),
            Some(Emphasis::Danger),
            ControlValue::Empty,
        ),
        Control::SystemPrompt => (
            "System Prompt".to_string(),
            None,
            ControlValue::Text(session.system_prompt().to_string()),
        ),
        Control::Chat => (
            format!(
                "LLM Mode: {} | Model: {model}",
                session.mode().map_or("-", Mode::label)
            ),
            None,
            ControlValue::Transcript(session.history().to_vec()),
        ),
    };

    ControlView {
        control,
        label,
        visible: is_visible(control, session),
        interactive: is_enabled(control, session),
        emphasis,
        value,
    }
}

pub fn render(session: &UiSession, model: &str) -> LayoutView {
    LayoutView {
        session_id: session.id().to_string(),
        controls: Control::ALL
            .iter()
            .map(|&c| render_control(c, session, model))
            .collect(),
    }
}
