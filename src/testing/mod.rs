//! Test doubles shared by unit and integration tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::{CompletionClient, CompletionRequest, LlmError};

enum Step {
    Reply(String),
    Fail(String),
    Panic(String),
}

/// A [`CompletionClient`] that replays queued replies and records every request.
///
/// Once the queue is empty it either echoes the document between the `---`
/// fences of the prompt (see [`ScriptedLlm::echo`]) or fails.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<CompletionRequest>>,
    echo: bool,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return redaction documents unchanged once the script runs out.
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Step::Reply(text.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()));
        self
    }

    /// Panic inside `complete`, for exercising task failure handling.
    pub fn panic(self, message: impl Into<String>) -> Self {
        self.push(Step::Panic(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn push(&self, entry: Step) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(entry);
        }
    }

    fn next(&self) -> Option<Step> {
        self.replies.lock().ok().and_then(|mut r| r.pop_front())
    }
}

fn fenced_document(prompt: &str) -> Option<&str> {
    let start = prompt.find("---\n")? + 4;
    let end = start + prompt[start..].find("\n---")?;
    Some(&prompt[start..end])
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let next = self.next();
        let prompt = request.prompt.clone();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }

        match next {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(body)) => Err(LlmError::Status { status: 502, body }),
            Some(Step::Panic(message)) => panic!("{}", message),
            None if self.echo => fenced_document(&prompt)
                .map(str::to_string)
                .ok_or_else(|| LlmError::MalformedResponse("prompt has no document".into())),
            None => Err(LlmError::MalformedResponse("script exhausted".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_then_fails() {
        let llm = ScriptedLlm::new().reply("one").fail("boom");
        assert_eq!(llm.complete(CompletionRequest::new("s", "p")).await.unwrap(), "one");
        assert!(matches!(
            llm.complete(CompletionRequest::new("s", "p")).await,
            Err(LlmError::Status { status: 502, .. })
        ));
        assert!(llm.complete(CompletionRequest::new("s", "p")).await.is_err());
        assert_eq!(llm.calls().len(), 3);
    }

    #[tokio::test]
    async fn echo_returns_fenced_document() {
        let llm = ScriptedLlm::echo();
        let prompt = "Redact this:\n---\n{\"a\": 1}\n---\nDone";
        let out = llm.complete(CompletionRequest::new("s", prompt)).await.unwrap();
        assert_eq!(out, "{\"a\": 1}");
    }
}
