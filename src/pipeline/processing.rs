//! # Processing Pipelines
//!
//! A [`ProcessingPipeline`] has two ordered phases: `receive` for inbound data
//! and `send` for outbound data. Each [`Phase`] is a sequence of named
//! [`Stage`]s.
//!
//! ## Merge Rule
//!
//! [`ProcessingPipeline::merge`] appends the other pipeline's stages after this
//! pipeline's stages, phase by phase, preserving the relative order of both
//! sources. Stage names are unique within a phase: a stage whose name is already
//! present is skipped, so merging the same pipeline twice is a no-op.

use std::fmt;
use std::sync::Arc;

/// Data flowing through a phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "bytes",
            Payload::Text(_) => "text",
        }
    }
}

pub type Transform = Arc<dyn Fn(Payload) -> Payload + Send + Sync>;

/// A named step in a phase, optionally transforming the payload.
#[derive(Clone)]
pub struct Stage {
    name: String,
    transform: Option<Transform>,
}

impl Stage {
    /// A stage that passes payloads through untouched.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: None,
        }
    }

    pub fn with_transform<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Payload) -> Payload + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            transform: Some(Arc::new(transform)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, payload: Payload) -> Payload {
        match &self.transform {
            Some(transform) => transform(payload),
            None => payload,
        }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("transforms", &self.transform.is_some())
            .finish()
    }
}

/// An ordered sequence of uniquely named stages.
#[derive(Clone, Debug, Default)]
pub struct Phase {
    stages: Vec<Stage>,
}

impl Phase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `stage` unless a stage with the same name exists.
    ///
    /// Returns whether the stage was added.
    pub fn push(&mut self, stage: Stage) -> bool {
        if self.contains(stage.name()) {
            return false;
        }
        self.stages.push(stage);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Appends the stages of `other` that are not present yet, in order.
    ///
    /// Returns the number of stages appended.
    pub fn merge(&mut self, other: &Phase) -> usize {
        other
            .stages
            .iter()
            .filter(|stage| self.push((*stage).clone()))
            .count()
    }

    /// Folds `payload` through every stage in order.
    pub fn run(&self, payload: Payload) -> Payload {
        self.stages
            .iter()
            .fold(payload, |payload, stage| stage.apply(payload))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProcessingPipeline {
    receive: Phase,
    send: Phase,
}

impl ProcessingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receive(&self) -> &Phase {
        &self.receive
    }

    pub fn send(&self) -> &Phase {
        &self.send
    }

    pub fn receive_mut(&mut self) -> &mut Phase {
        &mut self.receive
    }

    pub fn send_mut(&mut self) -> &mut Phase {
        &mut self.send
    }

    /// Merges `other` receive into receive and send into send.
    pub fn merge(&mut self, other: &ProcessingPipeline) {
        self.receive.merge(&other.receive);
        self.send.merge(&other.send);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(names: &[&str]) -> Phase {
        let mut phase = Phase::new();
        for name in names {
            phase.push(Stage::named(*name));
        }
        phase
    }

    #[test]
    fn test_merge_appends_without_interleaving() {
        let mut application = phase(&["x", "y"]);
        let engine = phase(&["a", "b"]);

        assert_eq!(application.merge(&engine), 2);
        assert_eq!(application.names(), vec!["x", "y", "a", "b"]);

        // Merging again adds nothing.
        assert_eq!(application.merge(&engine), 0);
        assert_eq!(application.names(), vec!["x", "y", "a", "b"]);
    }

    #[test]
    fn test_push_rejects_duplicate_names() {
        let mut phase = phase(&["x"]);
        assert!(!phase.push(Stage::named("x")));
        assert_eq!(phase.len(), 1);
    }

    #[test]
    fn test_pipeline_merge_is_per_phase() {
        let mut application = ProcessingPipeline::new();
        application.receive_mut().push(Stage::named("x"));
        application.send_mut().push(Stage::named("s"));

        let mut engine = ProcessingPipeline::new();
        engine.receive_mut().push(Stage::named("a"));
        engine.send_mut().push(Stage::named("t"));

        application.merge(&engine);

        assert_eq!(application.receive().names(), vec!["x", "a"]);
        assert_eq!(application.send().names(), vec!["s", "t"]);
    }

    #[test]
    fn test_run_applies_stages_in_order() {
        let mut phase = Phase::new();
        phase.push(Stage::with_transform("upper", |p| match p {
            Payload::Text(t) => Payload::Text(t.to_uppercase()),
            other => other,
        }));
        phase.push(Stage::named("noop"));
        phase.push(Stage::with_transform("suffix", |p| match p {
            Payload::Text(t) => Payload::Text(format!("{t}!")),
            other => other,
        }));

        assert_eq!(
            phase.run(Payload::Text("hi".into())),
            Payload::Text("HI!".into())
        );
    }
}
