//! Scripted capability used by the unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use parley_ai::{ChatCapability, ChatOptions, Fragment, FragmentStream};

/// One scripted stream item
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Text(&'static str),
    NoText,
    Fail(&'static str),
}

/// A capability that replays a fixed script and records what it was asked.
pub struct ScriptedCapability {
    steps: Vec<Step>,
    fail_open: bool,
    calls: Mutex<Vec<(String, ChatOptions)>>,
}

impl ScriptedCapability {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            fail_open: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn text(chunks: &[&'static str]) -> Self {
        Self::new(chunks.iter().copied().map(Step::Text).collect())
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new(vec![])
        }
    }

    pub fn calls(&self) -> Vec<(String, ChatOptions)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ChatCapability for ScriptedCapability {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, text: &str, options: &ChatOptions) -> parley_ai::Result<FragmentStream> {
        self.calls.lock().push((text.to_string(), options.clone()));

        if self.fail_open {
            return Err(parley_ai::Error::api("overloaded_error", "Overloaded"));
        }

        let steps = self.steps.clone();
        Ok(Box::pin(async_stream::stream! {
            for step in steps {
                match step {
                    Step::Text(text) => yield Ok(Fragment::text(text)),
                    Step::NoText => yield Ok(Fragment::empty()),
                    Step::Fail(message) => {
                        yield Err(parley_ai::Error::Sse(message.to_string()));
                        return;
                    }
                }
            }
        }))
    }
}
