use std::fmt::Display;
use std::pin::pin;
use std::time::Instant;

use agent_wire::StreamReconstructor;
use futures_util::{Stream, StreamExt};
use transcript_store::TranscriptStore;

use crate::error::ControllerError;

/// Parameters of one chunked stream turn.
#[derive(Debug, Clone)]
pub struct StreamTurnParams {
    pub message: String,
    pub cwd: Option<String>,
    pub session_id: Option<String>,
    pub project_id: Option<String>,
    pub model_id: Option<String>,
}

impl StreamTurnParams {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cwd: None,
            session_id: None,
            project_id: None,
            model_id: None,
        }
    }

    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Query pairs for the stream request.
    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("message", self.message.clone())];
        if let Some(cwd) = &self.cwd {
            query.push(("cwd", cwd.clone()));
        }
        if let Some(id) = &self.session_id {
            query.push(("sessionId", id.clone()));
        }
        if let Some(id) = &self.project_id {
            query.push(("projectId", id.clone()));
        }
        if let Some(id) = &self.model_id {
            query.push(("modelId", id.clone()));
        }
        query
    }
}

/// Drives a chunked byte stream through the reconstructor into the store.
///
/// Written against any fallible chunk stream so tests feed canned chunks
/// without a network. End of stream without an explicit terminal event still
/// closes the open streaming entry, via the reconstructor's synthesized
/// completion. A mid-stream failure keeps everything decoded before it.
pub async fn drive_stream<S, B, E>(
    store: &mut TranscriptStore,
    stream: S,
) -> Result<(), ControllerError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = pin!(stream);
    let mut reconstructor = StreamReconstructor::default();
    let mut failure: Option<String> = None;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                for event in reconstructor.feed(bytes.as_ref()) {
                    store.apply(&event, Instant::now());
                }
            }
            Err(error) => {
                failure = Some(error.to_string());
                break;
            }
        }
    }

    if let Some(event) = reconstructor.finish() {
        store.apply(&event, Instant::now());
    }

    match failure {
        Some(message) => Err(ControllerError::Stream(message)),
        None => Ok(()),
    }
}
