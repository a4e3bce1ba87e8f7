//! Scripted fake steps.
//!
//! A [`FakeStep`] records `start:<name>` and `end:<name>` into a shared
//! [`Journal`] and can be told to sleep, fail, panic or reject validation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use stagerun_core::{Context, Step, StepError, StepInstance};

/// Execution order shared by every fake step of a test.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Names of the fake steps that started, in order.
    pub fn started(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("start:").map(str::to_owned))
            .collect()
    }

    pub fn ran(&self, name: &str) -> bool {
        self.entries().iter().any(|e| e == &format!("start:{name}"))
    }

    pub fn validated(&self, name: &str) -> bool {
        self.entries().iter().any(|e| e == &format!("validate:{name}"))
    }
}

enum Outcome {
    Pass,
    Fail,
    Panic,
}

/// Scripted step.
pub struct FakeStep {
    name: String,
    journal: Journal,
    sleep: Duration,
    outcome: Outcome,
    invalid: bool,
    context_key: Option<String>,
}

#[allow(dead_code)]
impl FakeStep {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_owned(),
            journal: journal.clone(),
            sleep: Duration::ZERO,
            outcome: Outcome::Pass,
            invalid: false,
            context_key: None,
        }
    }

    pub fn sleep_ms(mut self, millis: u64) -> Self {
        self.sleep = Duration::from_millis(millis);
        self
    }

    pub fn failing(mut self) -> Self {
        self.outcome = Outcome::Fail;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.outcome = Outcome::Panic;
        self
    }

    pub fn invalid(mut self) -> Self {
        self.invalid = true;
        self
    }

    /// Stores `true` under `key` in the context when the step passes.
    pub fn sets(mut self, key: &str) -> Self {
        self.context_key = Some(key.to_owned());
        self
    }

    /// Wraps the step as a synchronous step instance named after it.
    pub fn instance(self) -> StepInstance {
        let name = self.name.clone();
        StepInstance::new(name, Box::new(self))
    }
}

impl Step for FakeStep {
    fn validate(&self, _ctx: &Context) -> Result<(), StepError> {
        self.journal.record(format!("validate:{}", self.name));
        if self.invalid {
            return Err(StepError::validation(format!("{} is misconfigured", self.name)));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &Context) -> Result<(), StepError> {
        self.journal.record(format!("start:{}", self.name));
        ctx.log_info(&format!("{} working", self.name));
        if !self.sleep.is_zero() {
            tokio::time::sleep(self.sleep).await;
        }
        self.journal.record(format!("end:{}", self.name));
        match self.outcome {
            Outcome::Pass => {
                if let Some(key) = &self.context_key {
                    ctx.add(key.clone(), true, true)?;
                }
                Ok(())
            }
            Outcome::Fail => Err(StepError::with_source(
                format!("{} failed", self.name),
                std::io::Error::other(format!("{} root cause", self.name)),
            )),
            Outcome::Panic => panic!("{} panicked", self.name),
        }
    }
}
