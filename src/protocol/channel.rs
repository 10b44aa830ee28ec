//! Message channel halves between the adapter and the transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::events::{InboundEvent, OutboundEvent};
use crate::core::{Error, Result};

/// Source of inbound protocol messages.
#[async_trait]
pub trait Inbound: Send {
    /// Wait for the next message.
    async fn receive(&mut self) -> InboundEvent;
}

/// Sink for outbound protocol messages.
#[async_trait]
pub trait Outbound: Send {
    /// Deliver one message.
    async fn send(&mut self, event: OutboundEvent) -> Result<()>;
}

#[async_trait]
impl Inbound for mpsc::Receiver<InboundEvent> {
    /// A closed channel reads as a disconnect.
    async fn receive(&mut self) -> InboundEvent {
        self.recv().await.unwrap_or(InboundEvent::Disconnect)
    }
}

#[async_trait]
impl Inbound for mpsc::UnboundedReceiver<InboundEvent> {
    async fn receive(&mut self) -> InboundEvent {
        self.recv().await.unwrap_or(InboundEvent::Disconnect)
    }
}

#[async_trait]
impl Outbound for mpsc::Sender<OutboundEvent> {
    async fn send(&mut self, event: OutboundEvent) -> Result<()> {
        mpsc::Sender::send(self, event)
            .await
            .map_err(|_| Error::TransportClosed)
    }
}

#[async_trait]
impl Outbound for mpsc::UnboundedSender<OutboundEvent> {
    async fn send(&mut self, event: OutboundEvent) -> Result<()> {
        mpsc::UnboundedSender::send(self, event).map_err(|_| Error::TransportClosed)
    }
}

/// Recording sink.
#[async_trait]
impl Outbound for Vec<OutboundEvent> {
    async fn send(&mut self, event: OutboundEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }
}
