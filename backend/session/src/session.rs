//! The chat loop.
//!
//! A session primes the model once, then alternates between waiting for a
//! line and processing it until the user enters an empty line or input ends.
//! Exactly one completion request is in flight at a time and history is only
//! touched after a completion succeeds.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use chatloom_core::{ChatError, CompletionBackend, CompletionRequest, GenerationParams, LineSource};
use chatloom_logging::{ChatEvent, ChatEventLogger};
use chatloom_prompt::{ConversationState, PromptTemplate, BOT_PREFIX, USER_PREFIX};

/// Printed once after the priming completion.
pub const EXIT_HINT: &str = "To finish the chat session, press only <Enter>.";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Priming,
    AwaitingInput,
    Processing(String),
    Terminated,
}

/// Counters reported when the session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// User turns that received a completion.
    pub turns: usize,
    pub backend_calls: usize,
    pub failed_calls: usize,
}

enum Exchange {
    Completed { content: String, latency_ms: u64 },
    Failed(ChatError),
}

pub struct ChatSession {
    id: Uuid,
    backend: Arc<dyn CompletionBackend>,
    template: PromptTemplate,
    params: GenerationParams,
    state: ConversationState,
    phase: SessionPhase,
    summary: SessionSummary,
    ended: bool,
}

impl ChatSession {
    /// Create a session in the `Priming` phase.
    ///
    /// Fails with `UnboundVariable` if the template needs anything beyond the
    /// conversation bindings, before any request is sent.
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        template: PromptTemplate,
        params: GenerationParams,
        state: ConversationState,
    ) -> Result<Self, ChatError> {
        template.check(&state.current_bindings())?;
        Ok(Self {
            id: Uuid::new_v4(),
            backend,
            template,
            params,
            state,
            phase: SessionPhase::Priming,
            summary: SessionSummary::default(),
            ended: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Run until the session terminates.
    pub async fn run<W: Write>(
        &mut self,
        lines: &mut dyn LineSource,
        out: &mut W,
    ) -> Result<SessionSummary, ChatError> {
        info!(
            session_id = %self.id,
            provider = %self.backend.name(),
            context = self.state.context_enabled(),
            "Chat session started"
        );

        while self.phase != SessionPhase::Terminated {
            if let Err(e) = self.step(lines, out).await {
                self.end();
                return Err(e);
            }
        }

        Ok(self.summary)
    }

    /// Run until the session terminates or `shutdown` resolves, whichever
    /// comes first.
    ///
    /// On shutdown the pending read or completion request is dropped and the
    /// turn it belonged to is never committed to history.
    pub async fn run_until<W, F>(
        &mut self,
        lines: &mut dyn LineSource,
        out: &mut W,
        shutdown: F,
    ) -> Result<SessionSummary, ChatError>
    where
        W: Write,
        F: Future,
    {
        tokio::select! {
            biased;
            result = self.run(lines, out) => return result,
            _ = shutdown => {}
        }

        info!(session_id = %self.id, "Chat session interrupted");
        writeln!(out)?;
        self.terminate();
        Ok(self.summary)
    }

    /// Perform one state transition.
    ///
    /// Fatal errors leave the session `Terminated`.
    pub async fn step<W: Write>(
        &mut self,
        lines: &mut dyn LineSource,
        out: &mut W,
    ) -> Result<(), ChatError> {
        match std::mem::replace(&mut self.phase, SessionPhase::Terminated) {
            SessionPhase::Priming => {
                let exchange = self.exchange().await?;
                writeln!(out, "{EXIT_HINT}\n")?;
                if let Exchange::Completed { content, latency_ms } = &exchange {
                    ChatEventLogger::log_event(
                        &self.id.to_string(),
                        ChatEvent::Priming {
                            completion_len: content.len(),
                            latency_ms: *latency_ms,
                        },
                    );
                }
                self.finish(exchange, out)?;
                self.phase = SessionPhase::AwaitingInput;
            }
            SessionPhase::AwaitingInput => {
                self.phase = match lines.read_line().await? {
                    Some(line) if !line.is_empty() => SessionPhase::Processing(line),
                    _ => {
                        self.end();
                        SessionPhase::Terminated
                    }
                };
            }
            SessionPhase::Processing(line) => {
                self.state.record_input(line);
                let exchange = self.exchange().await?;
                let completed = match &exchange {
                    Exchange::Completed { content, latency_ms } => Some((content.clone(), *latency_ms)),
                    Exchange::Failed(_) => None,
                };
                self.finish(exchange, out)?;
                if let Some((completion, latency_ms)) = completed {
                    self.summary.turns += 1;
                    ChatEventLogger::log_event(
                        &self.id.to_string(),
                        ChatEvent::Turn {
                            user_input: self.state.last_user_input().to_string(),
                            completion,
                            history_len: self.state.history().len(),
                            latency_ms,
                        },
                    );
                }
                self.phase = SessionPhase::AwaitingInput;
            }
            SessionPhase::Terminated => {}
        }
        Ok(())
    }

    /// End the session from outside the loop (e.g. on Ctrl-C).
    pub fn terminate(&mut self) {
        self.phase = SessionPhase::Terminated;
        self.end();
    }

    /// Render the prompt from the current bindings and await one completion.
    async fn exchange(&mut self) -> Result<Exchange, ChatError> {
        let prompt = self.template.render(&self.state.current_bindings())?;
        let request = CompletionRequest::new(prompt, self.params);

        debug!(
            session_id = %self.id,
            prompt_len = request.prompt.len(),
            "Requesting completion"
        );

        self.summary.backend_calls += 1;
        match self.backend.complete(&request).await {
            Ok(response) => Ok(Exchange::Completed {
                content: response.content,
                latency_ms: response.latency_ms,
            }),
            Err(e) => {
                self.summary.failed_calls += 1;
                let provider = self.backend.name().to_string();
                let message = format!("{e:#}");
                warn!(session_id = %self.id, provider = %provider, error = %message, "Completion failed");
                ChatEventLogger::log_event(
                    &self.id.to_string(),
                    ChatEvent::BackendFailure {
                        provider: provider.clone(),
                        error_msg: message.clone(),
                    },
                );
                Ok(Exchange::Failed(ChatError::Backend { provider, message }))
            }
        }
    }

    /// Show the outcome, commit a successful turn, and prompt for the next line.
    fn finish<W: Write>(&mut self, exchange: Exchange, out: &mut W) -> Result<(), ChatError> {
        match exchange {
            Exchange::Completed { content, .. } => {
                writeln!(out, "{BOT_PREFIX}{content}")?;
                self.state.record_completion(content);
                self.state.append_turn_to_history();
            }
            Exchange::Failed(err) => {
                writeln!(out, "[completion failed: {err}]")?;
            }
        }
        write!(out, "{USER_PREFIX}")?;
        out.flush()?;
        Ok(())
    }

    fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        info!(
            session_id = %self.id,
            turns = self.summary.turns,
            backend_calls = self.summary.backend_calls,
            failed_calls = self.summary.failed_calls,
            "Chat session ended"
        );
        ChatEventLogger::log_event(
            &self.id.to_string(),
            ChatEvent::SessionEnded {
                turns: self.summary.turns,
                backend_calls: self.summary.backend_calls,
                failed_calls: self.summary.failed_calls,
            },
        );
    }
}
