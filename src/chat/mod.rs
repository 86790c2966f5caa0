//! The interaction loop
//!
//! Sends the initial prompt, prints the answer and, in chat mode, keeps
//! forwarding follow-up lines into the same session until the user quits,
//! input ends or the session is interrupted.
//!
//! The loop only sees three seams, so it can run against a fake session:
//! - [`RoundExecutor`]: runs one request/response round
//! - [`LineSource`]: yields follow-up lines
//! - [`ResponseSink`]: shows answers and the follow-up prompt

mod io;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::session::{AgentSession, RoundOutput};
use crate::types::Result;

pub use io::{ConsoleSink, ReaderLines};

/// Words that end the conversation, matched case-insensitively after trimming
const EXIT_SENTINELS: [&str; 3] = ["quit", "exit", "q"];

/// Whether a line asks to leave the conversation
///
/// Only whole-line matches count: `" Quit "` does, `"quitting"` does not.
pub fn is_exit_sentinel(line: &str) -> bool {
    let line = line.trim();
    EXIT_SENTINELS
        .iter()
        .any(|sentinel| line.eq_ignore_ascii_case(sentinel))
}

/// Runs one round against the model
#[async_trait]
pub trait RoundExecutor: Send {
    async fn run_round(&mut self, input: &str) -> Result<RoundOutput>;
}

#[async_trait]
impl RoundExecutor for AgentSession {
    async fn run_round(&mut self, input: &str) -> Result<RoundOutput> {
        AgentSession::run_round(self, input).await
    }
}

/// Source of follow-up lines
#[async_trait]
pub trait LineSource: Send {
    /// Next line, or `None` at end of input
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

/// Where answers go
pub trait ResponseSink: Send {
    /// Show the answer of a round
    fn response(&mut self, output: &RoundOutput);

    /// Invite the user to type a follow-up
    fn follow_up_prompt(&mut self);
}

/// Position in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInitialPrompt,
    AwaitingResponse,
    AwaitingFollowUp,
    Done,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Chat mode was off and the single round finished
    Completed,
    /// The user typed an exit word
    Sentinel,
    /// Input ended
    EndOfInput,
    /// Ctrl-C or SIGTERM
    Interrupted,
}

/// Result of a finished loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Rounds that completed
    pub rounds: usize,
    pub exit: ExitReason,
}

/// The request/response loop
#[derive(Debug, Clone)]
pub struct ChatLoop {
    chat: bool,
    cancel: CancellationToken,
    state: LoopState,
}

impl ChatLoop {
    /// Create a loop; `chat` enables follow-ups
    pub fn new(chat: bool, cancel: CancellationToken) -> Self {
        Self {
            chat,
            cancel,
            state: LoopState::AwaitingInitialPrompt,
        }
    }

    /// Current state
    pub fn state(&self) -> LoopState {
        self.state
    }

    fn transition(&mut self, next: LoopState) {
        tracing::trace!(from = ?self.state, to = ?next, "Chat loop transition");
        self.state = next;
    }

    fn finish(&mut self, rounds: usize, exit: ExitReason) -> LoopOutcome {
        self.transition(LoopState::Done);
        tracing::debug!(rounds, exit = ?exit, "Chat loop finished");
        LoopOutcome { rounds, exit }
    }

    /// Run the conversation starting with `prompt`
    ///
    /// A failed round ends the loop with its error; nothing is retried.
    pub async fn run(
        &mut self,
        executor: &mut dyn RoundExecutor,
        lines: &mut dyn LineSource,
        sink: &mut dyn ResponseSink,
        prompt: &str,
    ) -> Result<LoopOutcome> {
        let cancel = self.cancel.clone();
        let mut rounds = 0;
        let mut pending = prompt.trim().to_string();

        loop {
            self.transition(LoopState::AwaitingResponse);
            let output = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Ok(self.finish(rounds, ExitReason::Interrupted));
                }
                result = executor.run_round(&pending) => result?,
            };
            rounds += 1;
            sink.response(&output);

            if !self.chat {
                return Ok(self.finish(rounds, ExitReason::Completed));
            }

            self.transition(LoopState::AwaitingFollowUp);
            pending = loop {
                sink.follow_up_prompt();
                let line = tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        return Ok(self.finish(rounds, ExitReason::Interrupted));
                    }
                    line = lines.next_line() => line?,
                };

                match line {
                    None => return Ok(self.finish(rounds, ExitReason::EndOfInput)),
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) if is_exit_sentinel(&line) => {
                        return Ok(self.finish(rounds, ExitReason::Sentinel));
                    }
                    Some(line) => break line.trim().to_string(),
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppError, TokenUsage};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    /// Echoes each input back and records it
    #[derive(Default)]
    struct EchoExecutor {
        inputs: Vec<String>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl RoundExecutor for EchoExecutor {
        async fn run_round(&mut self, input: &str) -> Result<RoundOutput> {
            self.inputs.push(input.to_string());
            if self.fail_on.as_deref() == Some(input) {
                return Err(AppError::internal("connection reset"));
            }
            Ok(RoundOutput {
                text: format!("echo: {input}"),
                usage: TokenUsage::default(),
            })
        }
    }

    /// Never finishes a round
    struct StuckExecutor;

    #[async_trait]
    impl RoundExecutor for StuckExecutor {
        async fn run_round(&mut self, _input: &str) -> Result<RoundOutput> {
            std::future::pending().await
        }
    }

    struct ScriptedLines(VecDeque<&'static str>);

    #[async_trait]
    impl LineSource for ScriptedLines {
        async fn next_line(&mut self) -> std::io::Result<Option<String>> {
            Ok(self.0.pop_front().map(String::from))
        }
    }

    fn lines(script: &[&'static str]) -> ScriptedLines {
        ScriptedLines(script.iter().copied().collect())
    }

    #[derive(Default)]
    struct RecordingSink {
        responses: Vec<String>,
        prompts: usize,
    }

    impl ResponseSink for RecordingSink {
        fn response(&mut self, output: &RoundOutput) {
            self.responses.push(output.text.clone());
        }

        fn follow_up_prompt(&mut self) {
            self.prompts += 1;
        }
    }

    #[test]
    fn test_exit_sentinels() {
        for line in ["quit", "Quit", " q ", "EXIT", "\tq\n"] {
            assert!(is_exit_sentinel(line), "{line:?} should exit");
        }
        for line in ["quitting", "q!", "exit now", "", "qq"] {
            assert!(!is_exit_sentinel(line), "{line:?} should not exit");
        }
    }

    #[tokio::test]
    async fn test_single_round_without_chat() {
        let mut executor = EchoExecutor::default();
        let mut sink = RecordingSink::default();
        let mut chat = ChatLoop::new(false, CancellationToken::new());

        let outcome = chat
            .run(&mut executor, &mut lines(&["ignored"]), &mut sink, "hello")
            .await
            .unwrap();

        assert_eq!(outcome, LoopOutcome { rounds: 1, exit: ExitReason::Completed });
        assert_eq!(executor.inputs, vec!["hello"]);
        assert_eq!(sink.prompts, 0);
        assert_eq!(chat.state(), LoopState::Done);
    }

    #[tokio::test]
    async fn test_chat_skips_blank_lines_and_stops_on_sentinel() {
        let mut executor = EchoExecutor::default();
        let mut sink = RecordingSink::default();
        let mut chat = ChatLoop::new(true, CancellationToken::new());

        let outcome = chat
            .run(
                &mut executor,
                &mut lines(&["  ", "second", "", " q ", "never sent"]),
                &mut sink,
                "first",
            )
            .await
            .unwrap();

        assert_eq!(outcome, LoopOutcome { rounds: 2, exit: ExitReason::Sentinel });
        assert_eq!(executor.inputs, vec!["first", "second"]);
        assert_eq!(sink.responses, vec!["echo: first", "echo: second"]);
    }

    #[tokio::test]
    async fn test_chat_ends_at_end_of_input() {
        let mut executor = EchoExecutor::default();
        let mut sink = RecordingSink::default();
        let mut chat = ChatLoop::new(true, CancellationToken::new());

        let outcome = chat
            .run(&mut executor, &mut lines(&["quitting"]), &mut sink, "first")
            .await
            .unwrap();

        assert_eq!(outcome, LoopOutcome { rounds: 2, exit: ExitReason::EndOfInput });
        assert_eq!(executor.inputs, vec!["first", "quitting"]);
    }

    #[tokio::test]
    async fn test_failed_round_ends_loop() {
        let mut executor = EchoExecutor {
            fail_on: Some("boom".to_string()),
            ..Default::default()
        };
        let mut sink = RecordingSink::default();
        let mut chat = ChatLoop::new(true, CancellationToken::new());

        let err = chat
            .run(&mut executor, &mut lines(&["boom", "after"]), &mut sink, "first")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(executor.inputs, vec!["first", "boom"]);
        assert_eq!(sink.responses.len(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_during_round() {
        let cancel = CancellationToken::new();
        let mut sink = RecordingSink::default();
        let mut chat = ChatLoop::new(true, cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = chat
            .run(&mut StuckExecutor, &mut lines(&[]), &mut sink, "hello")
            .await
            .unwrap();
        assert_eq!(outcome, LoopOutcome { rounds: 0, exit: ExitReason::Interrupted });
    }

    #[tokio::test]
    async fn test_already_cancelled_loop_runs_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut executor = EchoExecutor::default();
        let mut sink = RecordingSink::default();

        let outcome = ChatLoop::new(false, cancel)
            .run(&mut executor, &mut lines(&[]), &mut sink, "hello")
            .await
            .unwrap();
        assert_eq!(outcome.exit, ExitReason::Interrupted);
        assert!(executor.inputs.is_empty());
    }
}
