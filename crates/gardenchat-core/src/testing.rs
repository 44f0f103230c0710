//! In-crate test doubles: a scripted provider and an in-memory object store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::stream;

use gardenchat_types::attachment::ObjectRef;
use gardenchat_types::chat::ChatProfile;
use gardenchat_types::error::StorageError;
use gardenchat_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, ProviderType,
    StopReason, StreamEvent, Usage,
};

use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::factory::ProviderFactory;
use crate::llm::provider::{LlmEventStream, LlmProvider};
use crate::storage::object_store::ObjectStore;

/// Shared state between a factory and the providers it creates.
#[derive(Default)]
struct Shared {
    requests: Mutex<Vec<CompletionRequest>>,
    failing: AtomicBool,
    truncated: AtomicBool,
}

/// Builds [`FakeProvider`]s that answer with a fixed reply.
pub struct FakeFactory {
    reply: String,
    output_limit: u32,
    created: AtomicUsize,
    shared: Arc<Shared>,
}

impl FakeFactory {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            output_limit: 8192,
            created: AtomicUsize::new(0),
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn with_output_limit(mut self, limit: u32) -> Self {
        self.output_limit = limit;
        self
    }

    /// Make every provider (existing and future) fail mid-stream.
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::SeqCst);
    }

    /// Make streams stop after the first chunk without finishing.
    pub fn set_truncated(&self, truncated: bool) {
        self.shared.truncated.store(truncated, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.shared.requests.lock().unwrap().last().cloned()
    }
}

impl ProviderFactory for FakeFactory {
    fn create(&self, profile: &ChatProfile) -> Result<BoxLlmProvider, LlmError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let name = format!("fake-{}", profile.provider);
        Ok(BoxLlmProvider::new(FakeProvider {
            name,
            reply: self.reply.clone(),
            capabilities: ProviderCapabilities {
                streaming: true,
                vision: true,
                storage_image_refs: profile.provider == ProviderType::Gemini,
                max_context_tokens: 200_000,
                max_output_tokens: self.output_limit,
            },
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Provider that streams its reply word by word.
pub struct FakeProvider {
    name: String,
    reply: String,
    capabilities: ProviderCapabilities,
    shared: Arc<Shared>,
}

impl FakeProvider {
    fn usage(&self) -> Usage {
        Usage {
            input_tokens: 10,
            output_tokens: self.reply.split_whitespace().count() as u32,
        }
    }

    fn chunks(&self) -> Vec<String> {
        let mut chunks = Vec::new();
        for (i, word) in self.reply.split(' ').enumerate() {
            if i == 0 {
                chunks.push(word.to_string());
            } else {
                chunks.push(format!(" {word}"));
            }
        }
        chunks
    }
}

impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.shared.requests.lock().unwrap().push(request.clone());
        if self.shared.failing.load(Ordering::SeqCst) {
            return Err(LlmError::Provider {
                message: "scripted failure".to_string(),
            });
        }
        Ok(CompletionResponse {
            id: "fake-1".to_string(),
            content: self.reply.clone(),
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: self.usage(),
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        self.shared.requests.lock().unwrap().push(request);

        let mut events: Vec<Result<StreamEvent, LlmError>> = vec![Ok(StreamEvent::Connected)];
        let chunks = self.chunks();
        if self.shared.failing.load(Ordering::SeqCst) {
            events.push(Ok(StreamEvent::TextDelta {
                text: chunks[0].clone(),
            }));
            events.push(Err(LlmError::Stream("connection reset".to_string())));
        } else if self.shared.truncated.load(Ordering::SeqCst) {
            events.push(Ok(StreamEvent::TextDelta {
                text: chunks[0].clone(),
            }));
        } else {
            events.extend(chunks.into_iter().map(|text| Ok(StreamEvent::TextDelta { text })));
            events.push(Ok(StreamEvent::MessageDelta {
                stop_reason: StopReason::EndTurn,
            }));
            events.push(Ok(StreamEvent::Usage(self.usage())));
            events.push(Ok(StreamEvent::Done));
        }
        Box::pin(stream::iter(events))
    }
}

/// Object store keeping uploads in a map. URIs look like `mem://bucket/name`.
pub struct MemoryStore {
    bucket: String,
    fail: bool,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            fail: false,
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// A store whose uploads are always rejected.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("broken")
        }
    }
}

impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(&self, name: &str, media_type: &str, data: &[u8]) -> Result<ObjectRef, StorageError> {
        if self.fail {
            return Err(StorageError::Rejected {
                status: 403,
                message: "forbidden".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
        Ok(ObjectRef {
            uri: format!("mem://{}/{name}", self.bucket),
            media_type: media_type.to_string(),
            size_bytes: data.len() as u64,
        })
    }
}
