//! # Pipeline Composer
//!
//! Builds the adapter's default engine pipeline and merges it into the
//! embedded application's own pipeline when the application starts.
//!
//! ## Committed Order
//!
//! Application stages come first, adapter defaults are appended after them,
//! and the default transformations stage is always last:
//!
//! ```text
//! application receive [x, y] + engine receive [a, b]
//!     => [x, y, a, b, default-transformations]
//! ```

use std::sync::Arc;

use tracing::{debug, trace};

use super::processing::{Payload, Phase, ProcessingPipeline, Stage};
use crate::attributes::{AttributeError, AttributeStore, PIPELINE_ATTRIBUTE_KEY};
use crate::environment::RunningEnvironment;

/// Marker stage guarding default transformation installation.
pub const DEFAULT_TRANSFORMATIONS_STAGE: &str = "default-transformations";

pub const ENGINE_BEFORE_STAGE: &str = "engine:before";
pub const ENGINE_CALL_STAGE: &str = "engine:call";
pub const ENGINE_RESPOND_STAGE: &str = "engine:respond";

/// The adapter's default pipeline, before response wiring.
pub fn default_engine_pipeline(environment: &RunningEnvironment) -> ProcessingPipeline {
    let span = environment.log().span().clone();
    let mut pipeline = ProcessingPipeline::new();

    pipeline
        .receive_mut()
        .push(Stage::with_transform(ENGINE_BEFORE_STAGE, move |payload| {
            span.in_scope(|| trace!(kind = payload.kind(), "Receiving payload"));
            payload
        }));
    pipeline.receive_mut().push(Stage::named(ENGINE_CALL_STAGE));
    pipeline.send_mut().push(Stage::named(ENGINE_BEFORE_STAGE));

    pipeline
}

/// Wires the response-sending stage onto the send phase.
pub fn setup_send_pipeline(pipeline: &mut ProcessingPipeline) {
    pipeline.send_mut().push(Stage::named(ENGINE_RESPOND_STAGE));
}

/// Returns the engine pipeline shared through `store`, building it if absent.
pub fn engine_pipeline(
    store: &AttributeStore,
    environment: &RunningEnvironment,
) -> Result<Arc<ProcessingPipeline>, AttributeError> {
    store.get_or_create(PIPELINE_ATTRIBUTE_KEY, || {
        let mut pipeline = default_engine_pipeline(environment);
        setup_send_pipeline(&mut pipeline);
        debug!(
            receive = ?pipeline.receive().names(),
            send = ?pipeline.send().names(),
            "Engine pipeline built"
        );
        pipeline
    })
}

/// Receive side: UTF-8 bytes become text.
pub fn install_receive_transformations(phase: &mut Phase) -> bool {
    phase.push(Stage::with_transform(
        DEFAULT_TRANSFORMATIONS_STAGE,
        |payload| match payload {
            Payload::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Payload::Text(text),
                Err(err) => Payload::Bytes(err.into_bytes()),
            },
            text => text,
        },
    ))
}

/// Send side: text becomes bytes.
pub fn install_send_transformations(phase: &mut Phase) -> bool {
    phase.push(Stage::with_transform(
        DEFAULT_TRANSFORMATIONS_STAGE,
        |payload| match payload {
            Payload::Text(text) => Payload::Bytes(text.into_bytes()),
            bytes => bytes,
        },
    ))
}

pub fn install_default_transformations(pipeline: &mut ProcessingPipeline) {
    install_receive_transformations(pipeline.receive_mut());
    install_send_transformations(pipeline.send_mut());
}

/// Merges `engine` into `application` and installs default transformations.
///
/// Safe to call repeatedly; nothing is duplicated.
pub fn compose(application: &mut ProcessingPipeline, engine: &ProcessingPipeline) {
    application.merge(engine);
    install_default_transformations(application);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(receive: &[&str], send: &[&str]) -> ProcessingPipeline {
        let mut pipeline = ProcessingPipeline::new();
        for name in receive {
            pipeline.receive_mut().push(Stage::named(*name));
        }
        for name in send {
            pipeline.send_mut().push(Stage::named(*name));
        }
        pipeline
    }

    #[test]
    fn test_compose_order() {
        let mut application = pipeline(&["x", "y"], &["out"]);
        let engine = pipeline(&["a", "b"], &["c"]);

        compose(&mut application, &engine);

        assert_eq!(
            application.receive().names(),
            vec!["x", "y", "a", "b", DEFAULT_TRANSFORMATIONS_STAGE]
        );
        assert_eq!(
            application.send().names(),
            vec!["out", "c", DEFAULT_TRANSFORMATIONS_STAGE]
        );
    }

    #[test]
    fn test_compose_twice_does_not_duplicate() {
        let mut application = pipeline(&["x", "y"], &[]);
        let engine = pipeline(&["a", "b"], &[]);

        compose(&mut application, &engine);
        compose(&mut application, &engine);

        assert_eq!(
            application.receive().names(),
            vec!["x", "y", "a", "b", DEFAULT_TRANSFORMATIONS_STAGE]
        );
    }

    #[test]
    fn test_default_transformations() {
        let mut pipeline = ProcessingPipeline::new();
        install_default_transformations(&mut pipeline);
        assert!(!install_receive_transformations(pipeline.receive_mut()));

        assert_eq!(
            pipeline.receive().run(Payload::Bytes(b"hello".to_vec())),
            Payload::Text("hello".into())
        );
        assert_eq!(
            pipeline.receive().run(Payload::Bytes(vec![0xff, 0xfe])),
            Payload::Bytes(vec![0xff, 0xfe])
        );
        assert_eq!(
            pipeline.send().run(Payload::Text("bye".into())),
            Payload::Bytes(b"bye".to_vec())
        );
    }
}
