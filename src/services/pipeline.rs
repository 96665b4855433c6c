//! Chat, retrieval and summarization flows shared by the routers and the UI.
//!
//! Every step reports to the global callback sink through the request context.

use std::time::Instant;

use serde::Deserialize;

use crate::app::context::RequestContext;
use crate::error::ServiceError;
use crate::observability::CallbackEventKind;
use crate::services::{ChatMessage, Chunk, IngestedDoc, Role};

/// Chunks injected into the prompt when answering with context.
pub const CONTEXT_CHUNKS: usize = 2;

/// Restricts retrieval to the listed documents.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ContextFilter {
    #[serde(default)]
    pub docs_ids: Option<Vec<String>>,
}

impl ContextFilter {
    pub fn docs(docs_ids: Vec<String>) -> Self {
        Self {
            docs_ids: Some(docs_ids),
        }
    }

    pub fn as_slice(&self) -> Option<&[String]> {
        self.docs_ids.as_deref()
    }
}

/// Model answer plus the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Completion {
    pub response: String,
    pub sources: Vec<Chunk>,
}

#[derive(Debug, Clone, Default)]
pub struct SummarizeInput {
    pub text: Option<String>,
    pub use_context: bool,
    pub filter: Option<ContextFilter>,
    /// Replaces the default summarization system prompt.
    pub prompt: Option<String>,
    /// Extra user instructions appended to the request.
    pub instructions: Option<String>,
}

pub async fn retrieve(
    ctx: &RequestContext,
    query: &str,
    filter: Option<&ContextFilter>,
    limit: usize,
    prev_next_chunks: usize,
) -> Result<Vec<Chunk>, ServiceError> {
    let started = Instant::now();
    let chunks = ctx
        .documents()
        .retrieve(
            query,
            filter.and_then(ContextFilter::as_slice),
            limit,
            prev_next_chunks,
        )
        .await?;
    ctx.emit(
        CallbackEventKind::Retrieve,
        started,
        serde_json::json!({ "limit": limit, "hits": chunks.len() }),
    );
    Ok(chunks)
}

/// Ingest one file and report it to the callback sink.
pub async fn ingest(
    ctx: &RequestContext,
    file_name: &str,
    content: &[u8],
) -> Result<Vec<IngestedDoc>, ServiceError> {
    let started = Instant::now();
    let docs = ctx.documents().ingest(file_name, content).await?;
    ctx.emit(
        CallbackEventKind::Ingest,
        started,
        serde_json::json!({ "file_name": file_name, "bytes": content.len(), "documents": docs.len() }),
    );
    Ok(docs)
}

fn context_block(chunks: &[Chunk]) -> String {
    let body = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Context information is below.\n--------------------\n{body}\n--------------------\n")
}

/// Fold `context` into the leading system message, creating one if needed.
fn with_context(mut messages: Vec<ChatMessage>, context: &str) -> Vec<ChatMessage> {
    match messages.first_mut() {
        Some(first) if first.role == Role::System => {
            first.content = format!("{context}\n{}", first.content);
        }
        _ => messages.insert(0, ChatMessage::system(context)),
    }
    messages
}

async fn complete(ctx: &RequestContext, messages: &[ChatMessage]) -> Result<String, ServiceError> {
    let started = Instant::now();
    let response = ctx.llm().chat(messages).await?;
    ctx.emit(
        CallbackEventKind::Llm,
        started,
        serde_json::json!({ "model": ctx.llm().model(), "messages": messages.len() }),
    );
    Ok(response)
}

/// Answer the conversation, optionally grounded on retrieved chunks.
pub async fn chat(
    ctx: &RequestContext,
    messages: Vec<ChatMessage>,
    use_context: bool,
    filter: Option<&ContextFilter>,
) -> Result<Completion, ServiceError> {
    let Some(query) = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
    else {
        return Err(ServiceError::InvalidInput(
            "conversation has no user message".to_string(),
        ));
    };

    let (messages, sources) = if use_context {
        let sources = retrieve(ctx, &query, filter, CONTEXT_CHUNKS, 0).await?;
        (with_context(messages, &context_block(&sources)), sources)
    } else {
        (messages, Vec::new())
    };

    let response = complete(ctx, &messages).await?;
    Ok(Completion { response, sources })
}

pub async fn summarize(ctx: &RequestContext, input: SummarizeInput) -> Result<String, ServiceError> {
    let started = Instant::now();
    let text = if input.use_context {
        ctx.documents()
            .documents_text(input.filter.as_ref().and_then(ContextFilter::as_slice))
            .await?
    } else {
        input.text.unwrap_or_default()
    };

    if text.trim().is_empty() {
        return Err(ServiceError::InvalidInput("nothing to summarize".to_string()));
    }

    let system = input
        .prompt
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| ctx.settings().ui.default_summarization_system_prompt.clone());

    let request = match input.instructions.filter(|i| !i.trim().is_empty()) {
        Some(instructions) => format!("{instructions}\n\nText:\n{text}"),
        None => format!("Summarize the following text.\n\nText:\n{text}"),
    };

    let summary = complete(
        ctx,
        &[ChatMessage::system(system), ChatMessage::user(request)],
    )
    .await?;
    ctx.emit(
        CallbackEventKind::Summarize,
        started,
        serde_json::json!({ "input_chars": text.len(), "summary_chars": summary.len() }),
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::ContextBinder;
    use crate::observability::CallbackManager;
    use crate::services::llm::testing::EchoLlm;
    use crate::services::testing::fake_services_with;
    use std::sync::Arc;

    fn context_with(llm: Arc<EchoLlm>) -> RequestContext {
        ContextBinder::new(fake_services_with(llm), Arc::new(CallbackManager::disabled())).bind()
    }

    #[tokio::test]
    async fn chat_with_context_prepends_retrieved_text() {
        let llm = Arc::new(EchoLlm::default());
        let ctx = context_with(Arc::clone(&llm));
        ctx.documents()
            .ingest("notes.txt", b"The launch code is tangerine.")
            .await
            .unwrap();

        let completion = chat(
            &ctx,
            vec![ChatMessage::user("what is the launch code")],
            true,
            None,
        )
        .await
        .unwrap();

        assert_eq!(completion.sources.len(), 1);
        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0][0].role, Role::System);
        assert!(calls[0][0].content.contains("tangerine"));
    }

    #[tokio::test]
    async fn chat_without_user_message_is_rejected() {
        let ctx = context_with(Arc::new(EchoLlm::default()));
        let err = chat(&ctx, vec![ChatMessage::system("hi")], false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn summarize_empty_text_is_rejected() {
        let ctx = context_with(Arc::new(EchoLlm::default()));
        let err = summarize(&ctx, SummarizeInput::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn summarize_uses_default_prompt_when_none_given() {
        let llm = Arc::new(EchoLlm::default());
        let ctx = context_with(Arc::clone(&llm));
        summarize(
            &ctx,
            SummarizeInput {
                text: Some("a long text".to_string()),
                ..SummarizeInput::default()
            },
        )
        .await
        .unwrap();

        let calls = llm.calls.lock().unwrap();
        assert_eq!(
            calls[0][0].content,
            crate::config::DEFAULT_SUMMARIZATION_SYSTEM_PROMPT
        );
    }
}
