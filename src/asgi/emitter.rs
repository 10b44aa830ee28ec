//! Response emission.

use crate::core::{Response, Result};
use crate::protocol::{Outbound, OutboundEvent};

/// Send a finalized response as exactly one start and one body message.
///
/// Fails with [`crate::core::Error::ContentNotRendered`] before sending
/// anything if the response was never rendered.
pub async fn emit<S>(response: Response, send: &mut S) -> Result<()>
where
    S: Outbound + ?Sized,
{
    let (status, headers, body) = response.into_parts()?;

    send.send(OutboundEvent::ResponseStart { status, headers })
        .await?;
    send.send(OutboundEvent::ResponseBody {
        body,
        more_body: false,
    })
    .await
}
