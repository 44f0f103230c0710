//! A single chat session and its three lifecycle hooks.
//!
//! - `start`: validates settings, builds the provider client, empty buffer
//! - `update_settings`: validates, rebuilds the provider client, keeps history
//! - `send_message` / `complete_message`: runs one exchange and records it
//!   in the buffer once the model has answered in full

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use gardenchat_types::attachment::Attachment;
use gardenchat_types::chat::{ChatProfile, ChatReply, ChatSettings, SessionInfo, SettingsPatch};
use gardenchat_types::config::AppConfig;
use gardenchat_types::error::{ChatError, SettingsError};
use gardenchat_types::llm::{
    CompletionRequest, ContentPart, LlmError, Message, MessageRole, StreamEvent, Usage,
};

use crate::attachment::AttachmentPolicy;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::factory::ProviderFactory;
use crate::llm::span::StreamInSpan;
use crate::storage::box_store::BoxObjectStore;

use super::buffer::ConversationBuffer;
use super::settings::{apply_patch, default_settings, effective_max_tokens, find_profile};

/// Everything sessions share: profiles, provider factory, optional object
/// store, attachment policy, and the system prompt.
pub struct SessionContext {
    pub profiles: Vec<ChatProfile>,
    pub factory: Arc<dyn ProviderFactory>,
    pub store: Option<Arc<BoxObjectStore>>,
    pub policy: AttachmentPolicy,
    pub system_prompt: String,
}

impl SessionContext {
    pub fn new(
        config: &AppConfig,
        factory: Arc<dyn ProviderFactory>,
        store: Option<Arc<BoxObjectStore>>,
    ) -> Self {
        Self {
            profiles: config.profiles.clone(),
            factory,
            store,
            policy: AttachmentPolicy::from_config(config),
            system_prompt: config.system_prompt.clone(),
        }
    }
}

/// One user turn: free text plus attached files.
#[derive(Debug, Clone, Default)]
pub struct UserTurn {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl UserTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// A live conversation with one model profile at a time.
pub struct ChatSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    context: Arc<SessionContext>,
    profile: ChatProfile,
    settings: ChatSettings,
    provider: BoxLlmProvider,
    buffer: ConversationBuffer,
    usage: Usage,
}

impl ChatSession {
    /// Session-start hook.
    ///
    /// `patch` overrides the default settings; pass an empty patch to take
    /// the defaults as-is.
    pub fn start(context: Arc<SessionContext>, patch: &SettingsPatch) -> Result<Self, ChatError> {
        let defaults = default_settings(&context.profiles)?;
        let settings = apply_patch(&defaults, patch, &context.profiles)?;
        let profile = resolve_profile(&context, &settings)?;
        let provider = context.factory.create(&profile)?;

        let id = Uuid::now_v7();
        info!(
            session_id = %id,
            profile = %profile.id,
            model = %profile.model,
            provider = provider.name(),
            temperature = settings.temperature,
            max_output_tokens = settings.max_output_tokens,
            "Chat session started"
        );

        Ok(Self {
            id,
            started_at: Utc::now(),
            context,
            profile,
            settings,
            provider,
            buffer: ConversationBuffer::new(),
            usage: Usage::default(),
        })
    }

    /// Settings-update hook.
    ///
    /// Every successful update rebuilds the provider client. History is kept.
    /// On error the session is left unchanged.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<&ChatSettings, ChatError> {
        let settings = apply_patch(&self.settings, patch, &self.context.profiles)?;
        let profile = resolve_profile(&self.context, &settings)?;
        let provider = self.context.factory.create(&profile)?;

        info!(
            session_id = %self.id,
            profile = %profile.id,
            model = %profile.model,
            temperature = settings.temperature,
            max_output_tokens = settings.max_output_tokens,
            "Chat settings updated"
        );

        self.profile = profile;
        self.settings = settings;
        self.provider = provider;
        Ok(&self.settings)
    }

    /// Message-received hook (streaming).
    ///
    /// `on_token` sees each text delta as it arrives. The exchange is added
    /// to the buffer only after the stream finishes without error.
    pub async fn send_message<F>(&mut self, turn: UserTurn, mut on_token: F) -> Result<ChatReply, ChatError>
    where
        F: FnMut(&str) + Send,
    {
        let user_message = self.build_user_message(&turn).await?;
        let mut request = self.build_request(user_message);
        request.stream = true;

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = true,
            session_id = %self.id,
        );

        let started = Instant::now();
        let mut stream = StreamInSpan::new(self.provider.stream(request), span);

        let mut content = String::new();
        let mut stop_reason = None;
        let mut usage = Usage::default();
        let mut done = false;

        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::Connected) => {}
                Ok(StreamEvent::TextDelta { text }) => {
                    on_token(&text);
                    content.push_str(&text);
                }
                Ok(StreamEvent::MessageDelta { stop_reason: reason }) => stop_reason = Some(reason),
                Ok(StreamEvent::Usage(u)) => usage = u,
                Ok(StreamEvent::Done) => {
                    done = true;
                    break;
                }
                Err(e) => {
                    warn!(session_id = %self.id, error = %e, "Chat stream failed");
                    return Err(e.into());
                }
            }
        }

        if !done {
            warn!(session_id = %self.id, received = content.len(), "Chat stream ended without completing");
            return Err(LlmError::Stream("stream ended before completion".to_string()).into());
        }

        let response_ms = started.elapsed().as_millis() as u64;
        self.finish_exchange(&turn.text, &content, usage);

        Ok(ChatReply {
            session_id: self.id,
            author: self.author(),
            content,
            model: self.profile.model.clone(),
            stop_reason: stop_reason.map(|r| r.to_string()),
            usage,
            response_ms,
        })
    }

    /// Message-received hook (non-streaming).
    pub async fn complete_message(&mut self, turn: UserTurn) -> Result<ChatReply, ChatError> {
        let user_message = self.build_user_message(&turn).await?;
        let request = self.build_request(user_message);

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = false,
            session_id = %self.id,
        );

        let started = Instant::now();
        let response = self.provider.complete(&request).instrument(span).await?;
        let response_ms = started.elapsed().as_millis() as u64;

        self.finish_exchange(&turn.text, &response.content, response.usage);

        Ok(ChatReply {
            session_id: self.id,
            author: self.author(),
            content: response.content,
            model: response.model,
            stop_reason: Some(response.stop_reason.to_string()),
            usage: response.usage,
            response_ms,
        })
    }

    /// Drop the conversation history, keeping settings and provider.
    pub fn reset(&mut self) {
        info!(session_id = %self.id, turns = self.buffer.turn_count(), "Conversation reset");
        self.buffer.clear();
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn profile(&self) -> &ChatProfile {
        &self.profile
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn history(&self) -> &[Message] {
        self.buffer.messages()
    }

    pub fn turn_count(&self) -> usize {
        self.buffer.turn_count()
    }

    /// Token usage summed over all completed exchanges.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Author label for assistant messages.
    pub fn author(&self) -> String {
        format!("Chatbot: {}", self.profile.name)
    }

    /// Snapshot for front-ends. History is included when asked for.
    pub fn info(&self, include_history: bool) -> SessionInfo {
        SessionInfo {
            id: self.id,
            profile: self.profile.clone(),
            settings: self.settings.clone(),
            started_at: self.started_at,
            turn_count: self.buffer.turn_count(),
            usage: self.usage,
            history: if include_history {
                self.buffer.messages().to_vec()
            } else {
                Vec::new()
            },
        }
    }

    /// Image parts (in attachment order) followed by the text part.
    async fn build_user_message(&self, turn: &UserTurn) -> Result<Message, ChatError> {
        let mut content = self
            .context
            .policy
            .prepare(
                self.id,
                &turn.attachments,
                self.context.store.as_deref(),
                self.provider.capabilities().storage_image_refs,
            )
            .await?;

        let text = turn.text.trim();
        if !text.is_empty() {
            content.push(ContentPart::text(text));
        }
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        debug!(
            session_id = %self.id,
            parts = content.len(),
            images = content.iter().filter(|p| p.is_image()).count(),
            "Assembled user turn"
        );

        Ok(Message {
            role: MessageRole::User,
            content,
        })
    }

    /// History plus the current turn, with the session's generation settings.
    fn build_request(&self, user_message: Message) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.buffer.messages().len() + 1);
        messages.extend_from_slice(self.buffer.messages());
        messages.push(user_message);

        CompletionRequest {
            model: self.profile.model.clone(),
            messages,
            system: Some(self.context.system_prompt.clone()).filter(|s| !s.is_empty()),
            max_tokens: effective_max_tokens(&self.settings, self.provider.capabilities()),
            temperature: Some(self.settings.temperature),
            stream: false,
            stop_sequences: None,
        }
    }

    fn finish_exchange(&mut self, user_text: &str, assistant_text: &str, usage: Usage) {
        self.usage.input_tokens += usage.input_tokens;
        self.usage.output_tokens += usage.output_tokens;

        let user_text = user_text.trim();
        if user_text.is_empty() || assistant_text.is_empty() {
            // Empty text blocks are rejected by the publishers on replay.
            debug!(session_id = %self.id, "Exchange has no text on one side; not recorded");
            return;
        }
        self.buffer.record_exchange(user_text, assistant_text);
    }
}

fn resolve_profile(context: &SessionContext, settings: &ChatSettings) -> Result<ChatProfile, SettingsError> {
    find_profile(&context.profiles, &settings.profile)
        .cloned()
        .ok_or_else(|| SettingsError::UnknownProfile(settings.profile.clone()))
}
