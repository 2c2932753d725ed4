use std::io::BufRead;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

use chatloom_core::LineSource;

/// Line source fed by a blocking reader on its own OS thread.
///
/// A blocking read cannot be cancelled, so it never runs on the runtime:
/// dropping the source detaches the reader thread, and nothing waits for the
/// read it may be stuck in. `\n` and `\r\n` terminators are stripped.
pub struct ThreadedLines {
    rx: mpsc::Receiver<std::io::Result<String>>,
}

impl ThreadedLines {
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Result<Self> {
        let (tx, rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name("chatloom-input".into())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
            })
            .context("Failed to start input thread")?;
        Ok(Self { rx })
    }

    pub fn stdin() -> Result<Self> {
        Self::spawn(std::io::BufReader::new(std::io::stdin()))
    }
}

#[async_trait]
impl LineSource for ThreadedLines {
    async fn read_line(&mut self) -> Result<Option<String>> {
        match self.rx.recv().await {
            Some(line) => line.map(Some).context("Failed to read user input"),
            // Reader thread finished: end of input.
            None => Ok(None),
        }
    }
}
