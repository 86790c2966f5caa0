//! Terminal implementations of the loop seams

use std::io::Write;

use async_trait::async_trait;
use console::style;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use super::{LineSource, ResponseSink};
use crate::session::RoundOutput;

/// Line source over any async reader
#[derive(Debug)]
pub struct ReaderLines<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }
}

impl ReaderLines<tokio::io::Stdin> {
    /// Follow-ups typed on standard input
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineSource for ReaderLines<R> {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Prints answers and usage to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink {
    /// Hide the per-round usage line
    pub quiet: bool,
}

impl ResponseSink for ConsoleSink {
    fn response(&mut self, output: &RoundOutput) {
        println!("\n{}", output.text.trim_end());
        if !self.quiet {
            println!("\n{}", style(&output.usage).dim());
        }
    }

    fn follow_up_prompt(&mut self) {
        print!(
            "\n{} {} ",
            style("Follow-up (quit/exit/q to stop)").cyan(),
            style(">").bold()
        );
        std::io::stdout().flush().ok();
    }
}
