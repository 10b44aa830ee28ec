//! Protocol messages exchanged with the transport.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Message received from the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    /// A fragment of the request body.
    #[serde(rename = "http.request")]
    Request {
        #[serde(default)]
        body: Bytes,
        #[serde(default)]
        more_body: bool,
    },
    /// The client went away.
    #[serde(rename = "http.disconnect")]
    Disconnect,
}

impl InboundEvent {
    /// A body fragment with more to follow.
    pub fn chunk(body: impl Into<Bytes>) -> Self {
        InboundEvent::Request {
            body: body.into(),
            more_body: true,
        }
    }

    /// The final body fragment.
    pub fn last(body: impl Into<Bytes>) -> Self {
        InboundEvent::Request {
            body: body.into(),
            more_body: false,
        }
    }
}

/// Message sent to the transport.
///
/// For every request exactly one `ResponseStart` is sent, followed by
/// exactly one `ResponseBody`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    /// Status line and headers.
    #[serde(rename = "http.response.start")]
    ResponseStart {
        status: u16,
        headers: Vec<(Bytes, Bytes)>,
    },
    /// Response body.
    #[serde(rename = "http.response.body")]
    ResponseBody {
        body: Bytes,
        #[serde(default)]
        more_body: bool,
    },
}
