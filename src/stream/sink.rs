//! Downstream frame sink
//!
//! Serializes `ClientFrame`s as newline-delimited JSON onto an async
//! writer. A write failure means the client is gone; draining stops and
//! dropping the frame receiver stops upstream consumption in turn.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{Result, SavoraError};

use super::event::ClientFrame;

/// NDJSON frame writer.
pub struct FrameSink<W: AsyncWrite + Unpin> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one frame as a single JSON line and flush it.
    pub async fn write_frame(&mut self, frame: &ClientFrame) -> Result<()> {
        let mut line = serde_json::to_vec(frame)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(|e| SavoraError::Stream(format!("sink write error: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| SavoraError::Stream(format!("sink flush error: {}", e)))?;
        Ok(())
    }

    /// Forward frames from the transformer until the channel closes.
    ///
    /// Returns the first error observed, whether a terminal upstream error
    /// delivered on the channel or a local write failure. On error the
    /// receiver is dropped, which stops the upstream task.
    pub async fn drain(&mut self, mut rx: mpsc::Receiver<Result<ClientFrame>>) -> Result<()> {
        while let Some(frame) = rx.recv().await {
            let frame = frame?;
            self.write_frame(&frame).await?;
        }
        Ok(())
    }
}
