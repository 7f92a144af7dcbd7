//! Console channel — stdin/stdout session for local testing.
//!
//! Each stdin line becomes an inbound message from a fixed local contact;
//! outbound sends are printed. Useful for exercising the router and the
//! dispatcher without a real messaging session.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::channels::{ChannelAdapter, ChannelEvent, ChannelEventStream};
use crate::error::ChannelError;

/// Recipient id assigned to the local console contact.
const CONSOLE_CONTACT_ID: &str = "console-local";

pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelAdapter for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn start(&self) -> Result<ChannelEventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        // The console session is ready as soon as it starts.
        let _ = tx.send(ChannelEvent::SessionReady);

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let event = ChannelEvent::Inbound {
                            sender_id: CONSOLE_CONTACT_ID.to_string(),
                            text: line,
                            display_name: "Console".to_string(),
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        // EOF ends the session.
                        let _ = tx.send(ChannelEvent::SessionLost {
                            reason: "stdin closed".to_string(),
                        });
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), ChannelError> {
        println!("\n[-> {recipient_id}]\n{text}\n");
        eprint!("> ");
        Ok(())
    }
}
