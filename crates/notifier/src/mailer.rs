//! Mail transport trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{NotifierError, Result};

/// Trait for sending a single email.
///
/// Implementations own nothing but the transport; retry and persistence
/// live in the dispatcher.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one email. A returned error is treated as a failed delivery
    /// attempt, not a terminal fault.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// A message captured by the in-memory mailer.
#[derive(Debug, Clone, PartialEq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct InMemoryMailerState {
    sent: Vec<SentEmail>,
    fail_next: u32,
    fail_always: bool,
}

/// In-memory mailer for testing.
///
/// Captures every successful send and can be told to fail the next N
/// attempts (or all of them) to drive the retry state machine in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    state: Arc<RwLock<InMemoryMailerState>>,
}

impl InMemoryMailer {
    /// Creates a new in-memory mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` send attempts fail.
    pub fn fail_next(&self, n: u32) {
        self.state.write().unwrap().fail_next = n;
    }

    /// Makes every send attempt fail until turned off.
    pub fn set_fail_always(&self, fail: bool) {
        self.state.write().unwrap().fail_always = fail;
    }

    /// Returns the captured sends, in order.
    pub fn sent(&self) -> Vec<SentEmail> {
        self.state.read().unwrap().sent.clone()
    }

    /// Returns the number of successful sends.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();

        if state.fail_always {
            return Err(NotifierError::Transport("SMTP unavailable".to_string()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(NotifierError::Transport("SMTP unavailable".to_string()));
        }

        state.sent.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
