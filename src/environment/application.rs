//! The embedded application.

use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::pipeline::{compose, Payload, ProcessingPipeline, Stage};

/// The application running inside the environment.
///
/// Owns its own [`ProcessingPipeline`]. Application modules contribute stages
/// with [`intercept_receive`](Self::intercept_receive) and
/// [`intercept_send`](Self::intercept_send); the adapter merges its defaults in
/// with [`compose`](Self::compose) when the application starts.
#[derive(Debug)]
pub struct Application {
    id: String,
    pipeline: Mutex<ProcessingPipeline>,
    context: CancellationToken,
}

impl Application {
    pub fn new(id: impl Into<String>, context: CancellationToken) -> Self {
        Self {
            id: id.into(),
            pipeline: Mutex::new(ProcessingPipeline::new()),
            context,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cancelled when the application stops or any parent context is cancelled.
    pub fn context(&self) -> &CancellationToken {
        &self.context
    }

    pub fn intercept_receive(&self, stage: Stage) -> bool {
        self.lock().receive_mut().push(stage)
    }

    pub fn intercept_send(&self, stage: Stage) -> bool {
        self.lock().send_mut().push(stage)
    }

    /// A snapshot of the current pipeline.
    pub fn pipeline(&self) -> ProcessingPipeline {
        self.lock().clone()
    }

    /// Merges `engine` into this application's pipeline.
    pub fn compose(&self, engine: &ProcessingPipeline) {
        let mut pipeline = self.lock();
        compose(&mut pipeline, engine);
        debug!(
            application = %self.id,
            receive = ?pipeline.receive().names(),
            send = ?pipeline.send().names(),
            "Pipeline composed"
        );
    }

    /// Runs `payload` through the receive phase.
    pub fn receive(&self, payload: Payload) -> Payload {
        self.pipeline().receive().run(payload)
    }

    /// Runs `payload` through the send phase.
    pub fn send(&self, payload: Payload) -> Payload {
        self.pipeline().send().run(payload)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProcessingPipeline> {
        self.pipeline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
