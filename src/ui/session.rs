//! Per-session UI state and the transitions that mutate it.
//!
//! Transitions that call a backend are atomic: the backend is called first
//! and the session is only touched once it reports success. The selection
//! always names a file in `files` or is [`Selection::All`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::mode::Mode;
use super::source::Source;
use crate::app::context::RequestContext;
use crate::config::UiSettings;
use crate::error::{ServiceError, UiError};
use crate::services::pipeline::{self, ContextFilter, SummarizeInput};
use crate::services::{ChatMessage, IngestedDoc};

/// Text shown when no single file is selected.
pub const ALL_FILES: &str = "All files";

/// Chunks listed by a Search-mode reply.
const SEARCH_LIMIT: usize = 4;

/// A file listed in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestedFile {
    pub display_name: String,
    /// Backend identifier used for deletion and retrieval filters.
    pub reference: String,
}

impl From<IngestedDoc> for IngestedFile {
    fn from(doc: IngestedDoc) -> Self {
        Self {
            display_name: doc.file_name,
            reference: doc.doc_id,
        }
    }
}

/// Target of single-file operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reference", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    File(String),
}

/// One uploaded file, before ingestion.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// A question and its reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub mode: Mode,
    pub message: String,
    pub reply: String,
    pub sources: Vec<Source>,
}

/// File operations the UI needs from the backend.
#[async_trait]
pub trait FileBackend: Send + Sync {
    /// Ingest every upload. On failure nothing stays ingested.
    async fn upload_files(&self, uploads: &[Upload]) -> Result<Vec<IngestedFile>, ServiceError>;

    async fn delete_file(&self, reference: &str) -> Result<(), ServiceError>;

    async fn delete_all_files(&self) -> Result<(), ServiceError>;

    async fn list_files(&self) -> Result<Vec<IngestedFile>, ServiceError>;
}

/// [`FileBackend`] over the request's document store.
#[derive(Debug, Clone)]
pub struct DocumentFileBackend {
    ctx: RequestContext,
}

impl DocumentFileBackend {
    pub fn new(ctx: RequestContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FileBackend for DocumentFileBackend {
    async fn upload_files(&self, uploads: &[Upload]) -> Result<Vec<IngestedFile>, ServiceError> {
        let mut ingested: Vec<IngestedDoc> = Vec::new();
        for upload in uploads {
            match pipeline::ingest(&self.ctx, &upload.file_name, &upload.content).await {
                Ok(docs) => ingested.extend(docs),
                Err(err) => {
                    for doc in &ingested {
                        if let Err(rollback) = self.ctx.documents().delete(&doc.doc_id).await {
                            tracing::warn!(
                                doc_id = %doc.doc_id,
                                error = %rollback,
                                "Failed to roll back partial upload"
                            );
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(ingested.into_iter().map(IngestedFile::from).collect())
    }

    async fn delete_file(&self, reference: &str) -> Result<(), ServiceError> {
        self.ctx.documents().delete(reference).await
    }

    async fn delete_all_files(&self) -> Result<(), ServiceError> {
        self.ctx.documents().delete_all().await.map(|_| ())
    }

    async fn list_files(&self) -> Result<Vec<IngestedFile>, ServiceError> {
        Ok(self
            .ctx
            .documents()
            .list()
            .await?
            .into_iter()
            .map(IngestedFile::from)
            .collect())
    }
}

/// State of one browser session.
#[derive(Debug, Clone, Serialize)]
pub struct UiSession {
    id: String,
    mode: Option<Mode>,
    files: Vec<IngestedFile>,
    selection: Selection,
    sidebar_visible: bool,
    system_prompt: String,
    explanation: String,
    history: Vec<ChatTurn>,
    last_activity: DateTime<Utc>,
}

impl UiSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mode: None,
            files: Vec::new(),
            selection: Selection::All,
            sidebar_visible: false,
            system_prompt: String::new(),
            explanation: String::new(),
            history: Vec::new(),
            last_activity: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn files(&self) -> &[IngestedFile] {
        &self.files
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Whether a single file is targeted.
    pub fn file_selected(&self) -> bool {
        matches!(self.selection, Selection::File(_))
    }

    /// Display name of the selected file, or [`ALL_FILES`].
    pub fn selected_text(&self) -> &str {
        match &self.selection {
            Selection::All => ALL_FILES,
            Selection::File(reference) => self
                .file(reference)
                .map_or(ALL_FILES, |f| f.display_name.as_str()),
        }
    }

    fn file(&self, reference: &str) -> Option<&IngestedFile> {
        self.files.iter().find(|f| f.reference == reference)
    }

    fn context_filter(&self) -> Option<ContextFilter> {
        match &self.selection {
            Selection::All => None,
            Selection::File(reference) => Some(ContextFilter::docs(vec![reference.clone()])),
        }
    }

    /// Append the ingested uploads in order. The selection is kept.
    pub async fn upload_files(
        &mut self,
        backend: &dyn FileBackend,
        uploads: &[Upload],
    ) -> Result<(), UiError> {
        if uploads.is_empty() {
            return Err(UiError::InvalidPayload("no files to upload".to_string()));
        }
        let ingested = backend.upload_files(uploads).await?;
        self.files.extend(ingested);
        Ok(())
    }

    /// Replace the file list with the backend's, dropping a stale selection.
    pub async fn refresh_files(&mut self, backend: &dyn FileBackend) -> Result<(), UiError> {
        self.files = backend.list_files().await?;
        let stale = match &self.selection {
            Selection::File(reference) => self.file(reference).is_none(),
            Selection::All => false,
        };
        if stale {
            self.selection = Selection::All;
        }
        Ok(())
    }

    pub fn select_file(&mut self, reference: &str) -> Result<(), UiError> {
        if self.file(reference).is_none() {
            return Err(UiError::UnknownFile(reference.to_string()));
        }
        self.selection = Selection::File(reference.to_string());
        Ok(())
    }

    pub fn deselect_file(&mut self) {
        self.selection = Selection::All;
    }

    /// Delete the selected file. Requires a selection.
    ///
    /// A file the backend no longer knows was removed elsewhere; it is
    /// dropped from the list like a successful delete.
    pub async fn delete_selected(&mut self, backend: &dyn FileBackend) -> Result<(), UiError> {
        let Selection::File(reference) = &self.selection else {
            return Err(UiError::ControlDisabled(
                super::layout::Control::DeleteButton,
            ));
        };
        match backend.delete_file(reference).await {
            Ok(()) | Err(ServiceError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let reference = reference.clone();
        self.files.retain(|f| f.reference != reference);
        self.selection = Selection::All;
        Ok(())
    }

    pub async fn delete_all(&mut self, backend: &dyn FileBackend) -> Result<(), UiError> {
        backend.delete_all_files().await?;
        self.files.clear();
        self.selection = Selection::All;
        Ok(())
    }

    /// Switch mode and reset the prompt and explanation to its defaults.
    pub fn change_mode(&mut self, mode: Mode, settings: &UiSettings) {
        self.mode = Some(mode);
        self.system_prompt = mode.default_system_prompt(settings).to_string();
        self.explanation = mode.explanation().to_string();
    }

    pub fn edit_system_prompt(&mut self, text: String) {
        self.system_prompt = text;
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_visible = !self.sidebar_visible;
    }

    /// Answer `message` according to the active mode.
    pub async fn send_message(&mut self, ctx: &RequestContext, message: String) -> Result<(), UiError> {
        let Some(mode) = self.mode else {
            return Err(UiError::ControlDisabled(super::layout::Control::Chat));
        };
        if message.trim().is_empty() {
            return Err(UiError::InvalidPayload("message is empty".to_string()));
        }

        let filter = self.context_filter();
        let (reply, sources) = match mode {
            Mode::Rag | Mode::Basic => {
                let use_context = mode == Mode::Rag;
                let completion = pipeline::chat(
                    ctx,
                    self.conversation(mode, &message),
                    use_context,
                    filter.as_ref(),
                )
                .await?;
                (completion.response, Source::curate(&completion.sources))
            }
            Mode::Search => {
                let chunks = pipeline::retrieve(ctx, &message, filter.as_ref(), SEARCH_LIMIT, 0).await?;
                let sources = Source::curate(&chunks);
                (search_reply(&sources), sources)
            }
            Mode::Summarize => {
                let summary = pipeline::summarize(
                    ctx,
                    SummarizeInput {
                        text: None,
                        use_context: true,
                        filter,
                        prompt: Some(self.system_prompt.clone()),
                        instructions: Some(message.clone()),
                    },
                )
                .await?;
                (summary, Vec::new())
            }
        };

        self.history.push(ChatTurn {
            mode,
            message,
            reply,
            sources,
        });
        Ok(())
    }

    /// Prior turns of `mode` plus the new message, led by the system prompt.
    fn conversation(&self, mode: Mode, message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() * 2 + 2);
        if !self.system_prompt.trim().is_empty() {
            messages.push(ChatMessage::system(self.system_prompt.clone()));
        }
        for turn in self.history.iter().filter(|t| t.mode == mode) {
            messages.push(ChatMessage::user(turn.message.clone()));
            messages.push(ChatMessage::assistant(turn.reply.clone()));
        }
        messages.push(ChatMessage::user(message));
        messages
    }
}

fn search_reply(sources: &[Source]) -> String {
    if sources.is_empty() {
        return "No relevant chunks found.".to_string();
    }
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {} (page {})\n{}", i + 1, s.file(), s.page(), s.text()))
        .collect::<Vec<_>>()
        .join("\n\n")
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeFiles, uploads};
    use super::*;
    use crate::app::context::ContextBinder;
    use crate::observability::CallbackManager;
    use crate::services::llm::testing::EchoLlm;
    use crate::services::testing::{fake_services, fake_services_with};
    use std::sync::Arc;

    fn names(session: &UiSession) -> Vec<&str> {
        session.files().iter().map(|f| f.display_name.as_str()).collect()
    }

    fn assert_selection_valid(session: &UiSession) {
        if let Selection::File(reference) = session.selection() {
            assert!(session.files().iter().any(|f| &f.reference == reference));
        }
    }

    #[test]
    fn initial_state() {
        let session = UiSession::new("s");
        assert_eq!(session.mode(), None);
        assert!(session.files().is_empty());
        assert_eq!(session.selection(), &Selection::All);
        assert!(!session.sidebar_visible());
        assert_eq!(session.selected_text(), ALL_FILES);
    }

    #[tokio::test]
    async fn upload_select_delete_scenario() {
        let backend = FakeFiles::default();
        let mut session = UiSession::new("s");

        session
            .upload_files(&backend, &uploads(&["a.pdf", "b.pdf"]))
            .await
            .unwrap();
        assert_eq!(names(&session), ["a.pdf", "b.pdf"]);
        assert_eq!(session.selection(), &Selection::All);
        assert!(!session.file_selected());

        session.select_file("ref-b.pdf").unwrap();
        assert!(session.file_selected());
        assert_eq!(session.selected_text(), "b.pdf");
        assert_selection_valid(&session);

        session.delete_selected(&backend).await.unwrap();
        assert_eq!(names(&session), ["a.pdf"]);
        assert_eq!(session.selection(), &Selection::All);
        assert_eq!(session.selected_text(), ALL_FILES);
        assert_selection_valid(&session);
    }

    #[tokio::test]
    async fn upload_keeps_existing_selection() {
        let backend = FakeFiles::default();
        let mut session = UiSession::new("s");
        session.upload_files(&backend, &uploads(&["a.pdf"])).await.unwrap();
        session.select_file("ref-a.pdf").unwrap();

        session.upload_files(&backend, &uploads(&["c.pdf"])).await.unwrap();
        assert_eq!(session.selection(), &Selection::File("ref-a.pdf".into()));
    }

    #[tokio::test]
    async fn failed_collaborator_leaves_state_untouched() {
        let ok = FakeFiles::default();
        let failing = FakeFiles::failing();
        let mut session = UiSession::new("s");
        session.upload_files(&ok, &uploads(&["a.pdf"])).await.unwrap();
        session.select_file("ref-a.pdf").unwrap();

        let err = session.delete_selected(&failing).await.unwrap_err();
        assert!(matches!(err, UiError::Collaborator(_)));
        assert_eq!(names(&session), ["a.pdf"]);
        assert!(session.file_selected());

        assert!(session.delete_all(&failing).await.is_err());
        assert_eq!(names(&session), ["a.pdf"]);

        assert!(session.upload_files(&failing, &uploads(&["b.pdf"])).await.is_err());
        assert_eq!(names(&session), ["a.pdf"]);
    }

    #[tokio::test]
    async fn delete_all_clears_files_and_selection() {
        let backend = FakeFiles::default();
        let mut session = UiSession::new("s");
        session
            .upload_files(&backend, &uploads(&["a.pdf", "b.pdf"]))
            .await
            .unwrap();
        session.select_file("ref-a.pdf").unwrap();

        session.delete_all(&backend).await.unwrap();
        assert!(session.files().is_empty());
        assert_eq!(session.selection(), &Selection::All);
    }

    #[tokio::test]
    async fn delete_selected_without_selection_is_rejected() {
        let mut session = UiSession::new("s");
        let err = session
            .delete_selected(&FakeFiles::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UiError::ControlDisabled(_)));
    }

    #[test]
    fn selecting_an_unknown_file_fails() {
        let mut session = UiSession::new("s");
        assert!(matches!(
            session.select_file("ghost"),
            Err(UiError::UnknownFile(_))
        ));
        assert_eq!(session.selection(), &Selection::All);
    }

    #[tokio::test]
    async fn deselect_select_deselect_returns_to_all() {
        let backend = FakeFiles::default();
        let mut session = UiSession::new("s");
        session.upload_files(&backend, &uploads(&["a.pdf"])).await.unwrap();

        session.deselect_file();
        session.select_file("ref-a.pdf").unwrap();
        session.deselect_file();
        assert_eq!(session.selection(), &Selection::All);
    }

    #[tokio::test]
    async fn refresh_drops_a_selection_deleted_elsewhere() {
        let backend = FakeFiles::default();
        let mut session = UiSession::new("s");
        session
            .upload_files(&backend, &uploads(&["a.pdf", "b.pdf"]))
            .await
            .unwrap();
        session.select_file("ref-a.pdf").unwrap();
        backend.delete_file("ref-a.pdf").await.unwrap();

        session.refresh_files(&backend).await.unwrap();
        assert_eq!(names(&session), ["b.pdf"]);
        assert_eq!(session.selection(), &Selection::All);
    }

    #[tokio::test]
    async fn file_deleted_by_another_session_is_dropped_on_delete() {
        let backend = FakeFiles::default();
        let mut first = UiSession::new("a");
        let mut second = UiSession::new("b");
        first
            .upload_files(&backend, &uploads(&["a.pdf", "b.pdf"]))
            .await
            .unwrap();
        second.refresh_files(&backend).await.unwrap();
        second.select_file("ref-a.pdf").unwrap();
        second.delete_selected(&backend).await.unwrap();

        first.select_file("ref-a.pdf").unwrap();
        first.delete_selected(&backend).await.unwrap();
        assert_eq!(names(&first), ["b.pdf"]);
        assert_eq!(first.selection(), &Selection::All);
        assert_selection_valid(&first);
    }

    #[tokio::test]
    async fn change_mode_is_idempotent_on_files_and_selection() {
        let backend = FakeFiles::default();
        let settings = UiSettings::default();
        let mut session = UiSession::new("s");
        session.upload_files(&backend, &uploads(&["a.pdf"])).await.unwrap();
        session.select_file("ref-a.pdf").unwrap();

        session.change_mode(Mode::Search, &settings);
        let (files, selection) = (session.files().to_vec(), session.selection().clone());
        session.change_mode(Mode::Search, &settings);
        assert_eq!(session.files(), files.as_slice());
        assert_eq!(session.selection(), &selection);
    }

    #[test]
    fn change_mode_resets_prompt_and_explanation() {
        let settings = UiSettings::default();
        let mut session = UiSession::new("s");
        session.change_mode(Mode::Rag, &settings);
        session.edit_system_prompt("custom".into());
        assert_eq!(session.system_prompt(), "custom");

        session.change_mode(Mode::Basic, &settings);
        assert_eq!(session.system_prompt(), settings.default_chat_system_prompt);
        assert_eq!(session.explanation(), Mode::Basic.explanation());
    }

    #[test]
    fn toggle_sidebar_flips_visibility() {
        let mut session = UiSession::new("s");
        session.toggle_sidebar();
        assert!(session.sidebar_visible());
        session.toggle_sidebar();
        assert!(!session.sidebar_visible());
    }

    fn ctx_with(llm: Arc<EchoLlm>) -> RequestContext {
        ContextBinder::new(fake_services_with(llm), Arc::new(CallbackManager::disabled())).bind()
    }

    #[tokio::test]
    async fn send_message_requires_a_mode() {
        let ctx = ContextBinder::new(fake_services(), Arc::new(CallbackManager::disabled())).bind();
        let mut session = UiSession::new("s");
        let err = session.send_message(&ctx, "hi".into()).await.unwrap_err();
        assert!(matches!(err, UiError::ControlDisabled(_)));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn basic_mode_sends_system_prompt_and_history() {
        let llm = Arc::new(EchoLlm::default());
        let ctx = ctx_with(Arc::clone(&llm));
        let mut session = UiSession::new("s");
        session.change_mode(Mode::Basic, &UiSettings::default());

        session.send_message(&ctx, "first".into()).await.unwrap();
        session.send_message(&ctx, "second".into()).await.unwrap();

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].reply, "echo: second");
        let calls = llm.calls.lock().unwrap();
        // system, user, assistant, user
        assert_eq!(calls[1].len(), 4);
    }

    #[tokio::test]
    async fn search_mode_lists_sources_from_the_selected_file() {
        let ctx = ctx_with(Arc::new(EchoLlm::default()));
        let backend = DocumentFileBackend::new(ctx.clone());
        let mut session = UiSession::new("s");
        session
            .upload_files(
                &backend,
                &[
                    Upload {
                        file_name: "cats.txt".into(),
                        content: b"cats purr".to_vec(),
                    },
                    Upload {
                        file_name: "dogs.txt".into(),
                        content: b"dogs purr too".to_vec(),
                    },
                ],
            )
            .await
            .unwrap();
        let dogs = session.files()[1].reference.clone();
        session.select_file(&dogs).unwrap();
        session.change_mode(Mode::Search, &UiSettings::default());

        session.send_message(&ctx, "purr".into()).await.unwrap();
        let turn = &session.history()[0];
        assert_eq!(turn.sources.len(), 1);
        assert_eq!(turn.sources[0].file(), "dogs.txt");
    }

    #[tokio::test]
    async fn failed_reply_is_not_recorded() {
        let llm = Arc::new(EchoLlm {
            fail: true,
            ..EchoLlm::default()
        });
        let ctx = ctx_with(llm);
        let mut session = UiSession::new("s");
        session.change_mode(Mode::Basic, &UiSettings::default());

        assert!(session.send_message(&ctx, "hi".into()).await.is_err());
        assert!(session.history().is_empty());
    }
}

#[cfg(test)]
mod sequence_tests {
    use super::testing::{FakeFiles, uploads};
    use super::*;
    use crate::ui::layout::{self, Control};
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Step {
        Upload(Vec<u8>, bool),
        Select(usize),
        SelectUnknown,
        Deselect,
        DeleteSelected(bool),
        DeleteAll(bool),
        DeletedElsewhere(usize),
        Refresh(bool),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (prop::collection::vec(0u8..5, 1..3), any::<bool>())
                .prop_map(|(ids, fail)| Step::Upload(ids, fail)),
            (0usize..8).prop_map(Step::Select),
            Just(Step::SelectUnknown),
            Just(Step::Deselect),
            any::<bool>().prop_map(Step::DeleteSelected),
            any::<bool>().prop_map(Step::DeleteAll),
            (0usize..8).prop_map(Step::DeletedElsewhere),
            any::<bool>().prop_map(Step::Refresh),
        ]
    }

    fn snapshot(session: &UiSession) -> (Vec<IngestedFile>, Selection) {
        (session.files().to_vec(), session.selection().clone())
    }

    /// Apply `step`. A step against the failing backend must leave files and
    /// selection as they were.
    async fn apply(session: &mut UiSession, step: Step, shared: &FakeFiles, failing: &FakeFiles) {
        let backend = |fail: bool| if fail { failing } else { shared };
        let before = snapshot(session);

        let fail = match step {
            Step::Upload(ids, fail) => {
                let names: Vec<String> = ids.iter().map(|i| format!("f{i}.txt")).collect();
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                let _ = session.upload_files(backend(fail), &uploads(&names)).await;
                fail
            }
            Step::Select(index) => {
                let reference = session
                    .files()
                    .get(index % session.files().len().max(1))
                    .map(|f| f.reference.clone());
                if let Some(reference) = reference {
                    session.select_file(&reference).unwrap();
                }
                false
            }
            Step::SelectUnknown => {
                assert!(session.select_file("ghost").is_err());
                assert_eq!(snapshot(session), before);
                false
            }
            Step::Deselect => {
                session.deselect_file();
                false
            }
            Step::DeleteSelected(fail) => {
                let _ = session.delete_selected(backend(fail)).await;
                fail
            }
            Step::DeleteAll(fail) => {
                let _ = session.delete_all(backend(fail)).await;
                fail
            }
            Step::DeletedElsewhere(index) => {
                let reference = {
                    let stored = shared.stored.lock().unwrap();
                    stored
                        .get(index % stored.len().max(1))
                        .map(|f| f.reference.clone())
                };
                if let Some(reference) = reference {
                    shared.delete_file(&reference).await.unwrap();
                }
                false
            }
            Step::Refresh(fail) => {
                let _ = session.refresh_files(backend(fail)).await;
                fail
            }
        };

        if fail {
            assert_eq!(snapshot(session), before);
        }
    }

    fn assert_invariants(session: &UiSession) {
        if let Selection::File(reference) = session.selection() {
            assert!(session.files().iter().any(|f| &f.reference == reference));
        } else {
            assert_eq!(session.selected_text(), ALL_FILES);
        }
        let selected = session.selection() != &Selection::All;
        assert_eq!(layout::is_enabled(Control::DeleteButton, session), selected);
        assert_eq!(layout::is_enabled(Control::DeselectButton, session), selected);
    }

    proptest! {
        #[test]
        fn selection_always_names_a_listed_file(steps in prop::collection::vec(step(), 1..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let shared = FakeFiles::default();
                let failing = FakeFiles::failing();
                let mut session = UiSession::new("s");
                assert_invariants(&session);
                for step in steps {
                    apply(&mut session, step, &shared, &failing).await;
                    assert_invariants(&session);
                }
            });
        }
    }
}
