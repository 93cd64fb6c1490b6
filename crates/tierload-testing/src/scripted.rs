//! Scripted extensions
//!
//! A [`ScriptedExtension`] installs according to a fixed [`Behavior`] and
//! writes start/end marks into a shared [`Timeline`], so tests can assert
//! on ordering and on how often the host actually invoked it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tierload_core::error::{InstallError, MissingConfiguration};
use tierload_core::extension::{Extension, InstallContext};

/// How a scripted extension responds to install.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Install successfully.
    Succeed,
    /// Sleep, then install successfully.
    Delay(Duration),
    /// Decline with `InstallError::Configuration`.
    MissingConfig(String),
    /// Fail with a generic error whose source chain holds a
    /// `MissingConfiguration` marker `depth` links below the top.
    NestedMissingConfig { reason: String, depth: usize },
    /// Fail with a generic error.
    Fail(String),
    /// Sleep, then fail with a generic error.
    DelayThenFail(Duration, String),
}

/// Start or end mark for one install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    Start(String),
    End(String),
}

/// Ordered record of install start/end marks.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Arc<Mutex<Vec<TimelineEvent>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: TimelineEvent) {
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<TimelineEvent> {
        self.events.lock().clone()
    }

    fn position(&self, wanted: &TimelineEvent) -> Option<usize> {
        self.events.lock().iter().position(|e| e == wanted)
    }

    pub fn start_of(&self, name: &str) -> Option<usize> {
        self.position(&TimelineEvent::Start(name.to_string()))
    }

    pub fn end_of(&self, name: &str) -> Option<usize> {
        self.position(&TimelineEvent::End(name.to_string()))
    }

    /// Names that started, in order.
    pub fn started(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                TimelineEvent::Start(name) => Some(name.clone()),
                TimelineEvent::End(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct ScriptedFailure {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

fn nested_marker(reason: &str, depth: usize) -> ScriptedFailure {
    let mut error = ScriptedFailure {
        message: "wrapped failure level 1".to_string(),
        source: Some(Box::new(MissingConfiguration::new(reason))),
    };
    for level in 2..=depth.max(1) {
        error = ScriptedFailure {
            message: format!("wrapped failure level {}", level),
            source: Some(Box::new(error)),
        };
    }
    error
}

/// Extension with scripted install behavior.
pub struct ScriptedExtension {
    name: String,
    behavior: Behavior,
    timeline: Timeline,
    installs: AtomicUsize,
}

impl ScriptedExtension {
    pub fn new(name: impl Into<String>, behavior: Behavior, timeline: Timeline) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            behavior,
            timeline,
            installs: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of times `install` was called.
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extension for ScriptedExtension {
    async fn install(&self, _ctx: &InstallContext) -> Result<(), InstallError> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        self.timeline.push(TimelineEvent::Start(self.name.clone()));

        let result = match &self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            Behavior::MissingConfig(reason) => Err(InstallError::Configuration(reason.clone())),
            Behavior::NestedMissingConfig { reason, depth } => {
                Err(InstallError::other(nested_marker(reason, *depth)))
            }
            Behavior::Fail(message) => Err(InstallError::other(ScriptedFailure {
                message: message.clone(),
                source: None,
            })),
            Behavior::DelayThenFail(delay, message) => {
                tokio::time::sleep(*delay).await;
                Err(InstallError::other(ScriptedFailure {
                    message: message.clone(),
                    source: None,
                }))
            }
        };

        self.timeline.push(TimelineEvent::End(self.name.clone()));
        result
    }
}
