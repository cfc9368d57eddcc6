/// User actions that can be triggered by slash commands or key bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Show help message
    Help,
    /// Clear chat history
    ClearHistory,
    /// Upload local documents
    Upload {
        paths: Vec<String>,
    },
    /// Retrieve a stored document by CID (may be blank; the panel rejects it)
    Retrieve {
        cid: String,
    },
    /// Back up the vector database
    Backup,
    /// Run a web search
    Search {
        query: String,
    },
    /// Forward the current search result as chat context
    SendToChat,
    /// Open the attestation modal
    Attestation,
    /// Print the current generation settings
    ShowConfig,
    /// Apply a template by name
    Template {
        name: String,
    },
    /// Check backend health
    Health,
    /// Quit application
    Quit,
}
