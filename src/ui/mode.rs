//! Interaction modes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::UiSettings;

/// How a chat message is handled. Closed set; every mode has defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "RAG")]
    Rag,
    Search,
    Basic,
    Summarize,
}

impl Mode {
    /// Display order of the mode radio.
    pub const ALL: [Self; 4] = [Self::Rag, Self::Search, Self::Basic, Self::Summarize];

    pub fn label(self) -> &'static str {
        match self {
            Self::Rag => "RAG",
            Self::Search => "Search",
            Self::Basic => "Basic",
            Self::Summarize => "Summarize",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.label() == label)
    }

    pub fn explanation(self) -> &'static str {
        match self {
            Self::Rag => "Get contextualized answers from selected files.",
            Self::Search => "Find relevant chunks of text in selected files.",
            Self::Basic => "Chat with the LLM using its training data. Files are ignored.",
            Self::Summarize => {
                "Generate a summary of the selected files. Prompt to customize the result."
            }
        }
    }

    /// System prompt installed when the mode is chosen. Search never calls the model.
    pub fn default_system_prompt(self, settings: &UiSettings) -> &str {
        match self {
            Self::Rag => &settings.default_query_system_prompt,
            Self::Basic => &settings.default_chat_system_prompt,
            Self::Summarize => &settings.default_summarization_system_prompt,
            Self::Search => "",
        }
    }

    /// Whether the system prompt field is editable in this mode.
    pub fn accepts_system_prompt(self) -> bool {
        !matches!(self, Self::Search)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
