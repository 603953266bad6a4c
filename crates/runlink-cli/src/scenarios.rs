//! Consumers used by the scenario runner

use runlink_core::{CallbackContext, CallbackResult, Consumer};
use runlink_types::{CallbackFault, ExternalId, Selector};

/// Rejects every response
pub struct Reverting;

impl Consumer for Reverting {
    fn on_callback(
        &self,
        _ctx: &mut CallbackContext<'_>,
        _selector: &Selector,
        _external_id: &ExternalId,
        _response: &[u8],
    ) -> CallbackResult<()> {
        Err(CallbackFault::revert("consumer rejected the response"))
    }
}

/// Fails an assertion mid-callback
pub struct Panicking;

impl Consumer for Panicking {
    fn on_callback(
        &self,
        _ctx: &mut CallbackContext<'_>,
        _selector: &Selector,
        _external_id: &ExternalId,
        response: &[u8],
    ) -> CallbackResult<()> {
        assert!(response.is_empty(), "consumer expected no response");
        Ok(())
    }
}

/// Tries to cancel the request being fulfilled to claw back the payment
pub struct ReentrantCancel;

impl Consumer for ReentrantCancel {
    fn on_callback(
        &self,
        ctx: &mut CallbackContext<'_>,
        _selector: &Selector,
        external_id: &ExternalId,
        _response: &[u8],
    ) -> CallbackResult<()> {
        ctx.cancel_by_external_id(external_id)?;
        Ok(())
    }
}
