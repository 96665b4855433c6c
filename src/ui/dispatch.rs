//! Single entry point applying UI events to a session.

use serde::Serialize;
use tracing::{info, warn};

use super::layout::{self, Control, ControlView, Transition, UiEventKind};
use super::mode::Mode;
use super::session::{FileBackend, UiSession, Upload};
use crate::app::context::RequestContext;
use crate::error::UiError;

/// Data attached to an event.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    Text(String),
    Uploads(Vec<Upload>),
}

#[derive(Debug, Clone)]
pub struct UiEvent {
    pub control: Control,
    pub event: UiEventKind,
    pub payload: Payload,
}

/// What the caller needs to refresh after an event.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub transition: Transition,
    /// Re-rendered controls; empty when the transition failed.
    pub updates: Vec<ControlView>,
    /// Collaborator failure shown to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

fn text(payload: Payload, what: &str) -> Result<String, UiError> {
    match payload {
        Payload::Text(text) => Ok(text),
        _ => Err(UiError::InvalidPayload(format!("expected {what}"))),
    }
}

async fn apply(
    transition: Transition,
    payload: Payload,
    session: &mut UiSession,
    files: &dyn FileBackend,
    ctx: &RequestContext,
) -> Result<(), UiError> {
    match transition {
        Transition::UploadFiles => match payload {
            Payload::Uploads(uploads) => session.upload_files(files, &uploads).await,
            _ => Err(UiError::InvalidPayload("expected uploaded files".to_string())),
        },
        Transition::FilesListChanged => session.refresh_files(files).await,
        Transition::SelectFile => session.select_file(&text(payload, "a file reference")?),
        Transition::DeselectFile => {
            session.deselect_file();
            Ok(())
        }
        Transition::DeleteSelected => session.delete_selected(files).await,
        Transition::DeleteAll => session.delete_all(files).await,
        Transition::ChangeMode => {
            let label = text(payload, "a mode label")?;
            let mode = Mode::from_label(&label)
                .ok_or_else(|| UiError::InvalidPayload(format!("unknown mode `{label}`")))?;
            session.change_mode(mode, &ctx.settings().ui);
            Ok(())
        }
        Transition::EditSystemPrompt => {
            session.edit_system_prompt(text(payload, "prompt text")?);
            Ok(())
        }
        Transition::ToggleSidebar => {
            session.toggle_sidebar();
            Ok(())
        }
        Transition::SendMessage => session.send_message(ctx, text(payload, "a message")?).await,
    }
}

/// Look up the binding for `event`, run its transition and re-render its outputs.
///
/// Collaborator failures are not errors here: the session is unchanged and the
/// failure comes back as [`DispatchOutcome::notice`].
pub async fn dispatch(
    session: &mut UiSession,
    event: UiEvent,
    files: &dyn FileBackend,
    ctx: &RequestContext,
) -> Result<DispatchOutcome, UiError> {
    let binding = layout::binding(event.control, event.event).ok_or(UiError::UnboundEvent {
        control: event.control,
        event: event.event,
    })?;
    if !layout::accepts_events(event.control, session) {
        return Err(UiError::ControlDisabled(event.control));
    }

    let transition = binding.transition;
    session.touch();
    let selection_before = session.selection().clone();
    match apply(transition, event.payload, session, files, ctx).await {
        Ok(()) => {}
        Err(UiError::Collaborator(err)) => {
            warn!(
                name: "ui.transition_failed",
                session = session.id(),
                transition = transition.name(),
                error = %err,
                "Backend call failed, session unchanged"
            );
            return Ok(DispatchOutcome {
                transition,
                updates: Vec::new(),
                notice: Some(err.to_string()),
            });
        }
        Err(err) => return Err(err),
    }

    let mut outputs: Vec<Control> = binding.outputs.to_vec();
    let mut also = |controls: &[Control]| {
        for control in controls {
            if !outputs.contains(control) {
                outputs.push(*control);
            }
        }
    };
    if transition.mutates_files() {
        if let Some(changed) = layout::binding_for(Transition::FilesListChanged) {
            also(changed.outputs);
        }
    }
    // A refresh can drop a selection deleted elsewhere.
    if session.selection() != &selection_before {
        also(layout::SELECTION_OUTPUTS);
    }

    info!(
        name: "ui.transition",
        session = session.id(),
        request_id = %ctx.request_id(),
        transition = transition.name(),
        outputs = outputs.len(),
        "UI transition applied"
    );

    let model = ctx.llm().model();
    Ok(DispatchOutcome {
        transition,
        updates: outputs
            .into_iter()
            .map(|control| layout::render_control(control, session, model))
            .collect(),
        notice: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::ContextBinder;
    use crate::observability::CallbackManager;
    use crate::services::testing::fake_services;
    use crate::ui::session::testing::{FakeFiles, uploads};
    use crate::ui::session::Selection;
    use std::sync::Arc;

    fn ctx() -> RequestContext {
        ContextBinder::new(fake_services(), Arc::new(CallbackManager::disabled())).bind()
    }

    fn event(control: Control, event: UiEventKind, payload: Payload) -> UiEvent {
        UiEvent {
            control,
            event,
            payload,
        }
    }

    fn opened() -> UiSession {
        let mut session = UiSession::new("s");
        session.toggle_sidebar();
        session
    }

    fn updated(outcome: &DispatchOutcome) -> Vec<Control> {
        outcome.updates.iter().map(|v| v.control).collect()
    }

    #[tokio::test]
    async fn unbound_pair_is_rejected() {
        let mut session = opened();
        let err = dispatch(
            &mut session,
            event(Control::SelectedText, UiEventKind::Click, Payload::None),
            &FakeFiles::default(),
            &ctx(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UiError::UnboundEvent { .. }));
    }

    #[tokio::test]
    async fn hidden_sidebar_controls_do_not_dispatch() {
        let mut session = UiSession::new("s");
        let err = dispatch(
            &mut session,
            event(Control::DeleteAllButton, UiEventKind::Click, Payload::None),
            &FakeFiles::default(),
            &ctx(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UiError::ControlDisabled(Control::DeleteAllButton)));
    }

    #[tokio::test]
    async fn delete_without_selection_is_disabled() {
        let mut session = opened();
        let err = dispatch(
            &mut session,
            event(Control::DeleteButton, UiEventKind::Click, Payload::None),
            &FakeFiles::default(),
            &ctx(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UiError::ControlDisabled(Control::DeleteButton)));
    }

    #[tokio::test]
    async fn upload_re_renders_only_the_file_list() {
        let mut session = opened();
        let outcome = dispatch(
            &mut session,
            event(
                Control::UploadButton,
                UiEventKind::Upload,
                Payload::Uploads(uploads(&["a.pdf", "b.pdf"])),
            ),
            &FakeFiles::default(),
            &ctx(),
        )
        .await
        .unwrap();
        assert_eq!(updated(&outcome), [Control::FileList]);
        assert_eq!(session.files().len(), 2);
    }

    #[tokio::test]
    async fn select_then_delete_updates_the_bound_outputs() {
        let files = FakeFiles::default();
        let ctx = ctx();
        let mut session = opened();
        session.upload_files(&files, &uploads(&["a.pdf", "b.pdf"])).await.unwrap();

        let outcome = dispatch(
            &mut session,
            event(
                Control::FileList,
                UiEventKind::Select,
                Payload::Text("ref-b.pdf".into()),
            ),
            &files,
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(
            updated(&outcome),
            [Control::DeleteButton, Control::DeselectButton, Control::SelectedText]
        );
        assert!(outcome.updates.iter().take(2).all(|v| v.interactive));

        let outcome = dispatch(
            &mut session,
            event(Control::DeleteButton, UiEventKind::Click, Payload::None),
            &files,
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(
            updated(&outcome),
            [
                Control::FileList,
                Control::DeleteButton,
                Control::DeselectButton,
                Control::SelectedText
            ]
        );
        assert_eq!(session.selection(), &Selection::All);
        assert_eq!(session.files().len(), 1);
    }

    #[tokio::test]
    async fn collaborator_failure_becomes_a_notice() {
        let mut session = opened();
        let outcome = dispatch(
            &mut session,
            event(
                Control::UploadButton,
                UiEventKind::Upload,
                Payload::Uploads(uploads(&["a.pdf"])),
            ),
            &FakeFiles::failing(),
            &ctx(),
        )
        .await
        .unwrap();
        assert!(outcome.updates.is_empty());
        assert!(outcome.notice.unwrap().contains("disk full"));
        assert!(session.files().is_empty());
    }

    #[tokio::test]
    async fn unknown_mode_label_is_invalid_payload() {
        let mut session = opened();
        let err = dispatch(
            &mut session,
            event(
                Control::ModeRadio,
                UiEventKind::Change,
                Payload::Text("Turbo".into()),
            ),
            &FakeFiles::default(),
            &ctx(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UiError::InvalidPayload(_)));
        assert_eq!(session.mode(), None);
    }

    #[tokio::test]
    async fn file_list_change_re_reads_the_backend() {
        let files = FakeFiles::default();
        let ctx = ctx();
        let mut session = opened();
        session.upload_files(&files, &uploads(&["a.pdf", "b.pdf"])).await.unwrap();
        session.select_file("ref-a.pdf").unwrap();
        files.delete_file("ref-a.pdf").await.unwrap();

        let outcome = dispatch(
            &mut session,
            event(Control::FileList, UiEventKind::Change, Payload::None),
            &files,
            &ctx,
        )
        .await
        .unwrap();

        assert!(outcome.notice.is_none());
        assert_eq!(session.files().len(), 1);
        assert_eq!(session.selection(), &Selection::All);
        let outputs = updated(&outcome);
        assert!(outputs.contains(&Control::FileList));
        assert!(outputs.contains(&Control::DeleteButton));
        assert!(outputs.contains(&Control::SelectedText));
    }

    #[tokio::test]
    async fn unchanged_list_re_renders_only_the_file_list() {
        let files = FakeFiles::default();
        let mut session = opened();
        session.upload_files(&files, &uploads(&["a.pdf"])).await.unwrap();

        let outcome = dispatch(
            &mut session,
            event(Control::FileList, UiEventKind::Change, Payload::None),
            &files,
            &ctx(),
        )
        .await
        .unwrap();
        assert_eq!(updated(&outcome), [Control::FileList]);
    }

    #[tokio::test]
    async fn mode_change_enables_chat() {
        let mut session = opened();
        let outcome = dispatch(
            &mut session,
            event(
                Control::ModeRadio,
                UiEventKind::Change,
                Payload::Text("Basic".into()),
            ),
            &FakeFiles::default(),
            &ctx(),
        )
        .await
        .unwrap();
        let chat = outcome
            .updates
            .iter()
            .find(|v| v.control == Control::Chat)
            .unwrap();
        assert!(chat.interactive);
        assert_eq!(session.mode(), Some(Mode::Basic));
    }
}
