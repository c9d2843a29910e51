//! Scripted oracle for integration testing.
//!
//! Replays canned replies in order and records every request it
//! receives, all in-memory with no network access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sentiment_advisor::llm::{OracleRequest, RecommendationOracle};

/// One scripted outcome.
pub enum Scripted {
    Reply(String),
    Fail(String),
}

/// Deterministic `RecommendationOracle`.
///
/// Cloning shares the script and request log, so a test can keep a handle
/// after boxing one copy into the engine.
#[derive(Clone, Default)]
pub struct StubOracle {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<OracleRequest>>>,
}

impl StubOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Reply(text.into()));
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, msg: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Fail(msg.into()));
        self
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RecommendationOracle for StubOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("stub oracle script exhausted")),
        }
    }

    fn provider(&self) -> &'static str {
        "stub"
    }
}
