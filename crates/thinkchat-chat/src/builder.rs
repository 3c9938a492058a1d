use std::sync::Arc;

use thinkchat_llm::ChatClient;
use thinkchat_persist::ChatStore;
use thinkchat_types::ConversationConfig;

use crate::conversation::ConversationView;
use crate::error::ChatError;

/// Builder for constructing a ConversationView
pub struct ConversationViewBuilder {
    store: Option<Arc<dyn ChatStore>>,
    client: Option<Arc<dyn ChatClient>>,
    config: ConversationConfig,
}

impl ConversationViewBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            client: None,
            config: ConversationConfig::default(),
        }
    }

    /// Set the store that receives user and assistant messages
    pub fn store(mut self, store: Arc<dyn ChatStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the completion client
    pub fn client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(mut self, config: ConversationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ConversationView, ChatError> {
        let store = self.store.ok_or(ChatError::MissingComponent("store"))?;
        let client = self.client.ok_or(ChatError::MissingComponent("chat client"))?;

        Ok(ConversationView::new(store, client, self.config))
    }
}

impl Default for ConversationViewBuilder {
    fn default() -> Self {
        Self::new()
    }
}
