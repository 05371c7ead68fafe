//! Streaming transformation layer
//!
//! Consumes the upstream newline-delimited `RawEvent` byte stream and
//! re-emits it as ordered `ClientFrame`s. Token fragments pass through
//! immediately; tool-completion records have their embedded payload
//! blocks extracted first. Frame order always matches raw-event order.

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{Result, SavoraError};

use super::event::{ClientFrame, RawEvent};
use super::payload;

/// Upstream byte stream of newline-delimited raw-event records.
pub type RawByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Frame channel depth. Bounded so a stalled client applies backpressure
/// to upstream consumption.
const FRAME_CHANNEL_CAPACITY: usize = 32;

/// Turns a decoded raw event into its client frame.
///
/// Token events map one-to-one; tool completions map one-to-one after
/// payload extraction. Also used on the non-streaming path, where the
/// final message is delivered as a single token-shaped event.
pub fn frame_for_event(event: RawEvent) -> ClientFrame {
    match event {
        RawEvent::Token { text } => ClientFrame::text(&text),
        RawEvent::ToolComplete { tool: _, output } => {
            let (content, payloads) = payload::extract(&output);
            ClientFrame::with_payloads(content, payloads)
        }
    }
}

/// The streaming transformation layer.
///
/// `spawn` consumes the upstream byte stream on a background task and
/// returns the ordered frame channel. A clean upstream end closes the
/// channel; an upstream read error delivers one terminal `Err` and then
/// closes it. Dropping the receiver stops upstream consumption.
pub struct StreamTransformer;

impl StreamTransformer {
    pub fn spawn(mut upstream: RawByteStream) -> mpsc::Receiver<Result<ClientFrame>> {
        let (tx, rx) = mpsc::channel::<Result<ClientFrame>>(FRAME_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            // Raw bytes, not a String: a read boundary can land inside a
            // multi-byte character, so only complete lines get decoded.
            let mut line_buffer = BytesMut::new();

            while let Some(chunk_result) = upstream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(Err(SavoraError::Stream(format!(
                                "upstream read error: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                };

                line_buffer.extend_from_slice(&chunk);

                // Everything before the last newline is complete; the tail
                // stays buffered until the next read.
                while let Some(newline_pos) = line_buffer.iter().position(|&b| b == b'\n') {
                    let line = line_buffer.split_to(newline_pos + 1);
                    let line = String::from_utf8_lossy(&line[..newline_pos]);

                    if !Self::emit_line(&line, &tx).await {
                        return;
                    }
                }
            }

            // Clean end of input. A producer that omitted the final newline
            // still gets its last record decoded.
            let trailing = line_buffer.split();
            Self::emit_line(&String::from_utf8_lossy(&trailing), &tx).await;
        });

        rx
    }

    /// Decode one record line and forward its frame.
    ///
    /// Returns false when the receiver is gone and consumption should stop.
    async fn emit_line(line: &str, tx: &mpsc::Sender<Result<ClientFrame>>) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }
        let event: RawEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "skipping undecodable raw-event record");
                return true;
            }
        };
        tx.send(Ok(frame_for_event(event))).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn byte_stream(chunks: Vec<std::io::Result<Bytes>>) -> RawByteStream {
        stream::iter(chunks).boxed()
    }

    async fn collect_frames(upstream: RawByteStream) -> Vec<Result<ClientFrame>> {
        let mut rx = StreamTransformer::spawn(upstream);
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_tokens_pass_through_in_order() {
        let upstream = byte_stream(vec![Ok(Bytes::from(
            "{\"type\":\"token\",\"text\":\"Hel\"}\n{\"type\":\"token\",\"text\":\"lo\"}\n",
        ))]);
        let frames = collect_frames(upstream).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref().unwrap().content, "Hel");
        assert_eq!(frames[1].as_ref().unwrap().content, "lo");
    }

    #[tokio::test]
    async fn test_record_split_across_reads() {
        let upstream = byte_stream(vec![
            Ok(Bytes::from("{\"type\":\"token\",")),
            Ok(Bytes::from("\"text\":\"split\"}\n")),
        ]);
        let frames = collect_frames(upstream).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap().content, "split");
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_reads() {
        // Read boundary lands between the two bytes of the 'é'
        let record = "{\"type\":\"token\",\"text\":\"caf\u{e9}\"}\n".as_bytes();
        let split = record.len() - 4;
        let upstream = byte_stream(vec![
            Ok(Bytes::copy_from_slice(&record[..split])),
            Ok(Bytes::copy_from_slice(&record[split..])),
        ]);
        let frames = collect_frames(upstream).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap().content, "caf\u{e9}");
    }

    #[tokio::test]
    async fn test_tool_complete_payload_extracted() {
        let record = serde_json::to_string(&RawEvent::tool_complete(
            "generate_image",
            "Recipe found.\n---\n**META_IMAGE:** {\"url\":\"http://x/a.png\"}",
        ))
        .unwrap();
        let upstream = byte_stream(vec![Ok(Bytes::from(format!("{}\n", record)))]);
        let frames = collect_frames(upstream).await;
        assert_eq!(frames.len(), 1);
        let frame = frames[0].as_ref().unwrap();
        assert_eq!(frame.content, "Recipe found.\n---");
        assert_eq!(frame.images.len(), 1);
        assert_eq!(frame.images[0].url, "http://x/a.png");
    }

    #[tokio::test]
    async fn test_event_order_preserved_across_kinds() {
        let records = [
            "{\"type\":\"token\",\"text\":\"Looking...\"}".to_string(),
            serde_json::to_string(&RawEvent::tool_complete("quote_pricing", "About 12 EUR."))
                .unwrap(),
            "{\"type\":\"token\",\"text\":\"Done.\"}".to_string(),
        ];
        let upstream = byte_stream(vec![Ok(Bytes::from(records.join("\n") + "\n"))]);
        let frames = collect_frames(upstream).await;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].as_ref().unwrap().content, "Looking...");
        assert_eq!(frames[1].as_ref().unwrap().content, "About 12 EUR.");
        assert_eq!(frames[2].as_ref().unwrap().content, "Done.");
    }

    #[tokio::test]
    async fn test_read_error_terminates_with_error() {
        let upstream = byte_stream(vec![
            Ok(Bytes::from("{\"type\":\"token\",\"text\":\"ok\"}\n")),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone")),
            Ok(Bytes::from("{\"type\":\"token\",\"text\":\"never\"}\n")),
        ]);
        let frames = collect_frames(upstream).await;
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_ok());
        assert!(matches!(frames[1], Err(SavoraError::Stream(_))));
    }

    #[tokio::test]
    async fn test_undecodable_record_skipped() {
        let upstream = byte_stream(vec![Ok(Bytes::from(
            "not json\n{\"type\":\"token\",\"text\":\"fine\"}\n",
        ))]);
        let frames = collect_frames(upstream).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap().content, "fine");
    }

    #[tokio::test]
    async fn test_trailing_record_without_newline() {
        let upstream = byte_stream(vec![Ok(Bytes::from("{\"type\":\"token\",\"text\":\"tail\"}"))]);
        let frames = collect_frames(upstream).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap().content, "tail");
    }

    #[tokio::test]
    async fn test_clean_eof_closes_channel() {
        let upstream = byte_stream(vec![]);
        let frames = collect_frames(upstream).await;
        assert!(frames.is_empty());
    }
}
