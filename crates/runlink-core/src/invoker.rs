//! Isolated callback invocation
//!
//! Runs a consumer callback after the broker has finished its own
//! bookkeeping. Whatever the consumer does (return an error, panic, exhaust
//! its budget, destroy itself) ends up as a [`CallbackOutcome`]; nothing the
//! consumer does can fail the fulfillment that triggered it.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use runlink_types::{Address, CallbackFault, CallbackOutcome, ExternalId, Selector};

use crate::config::CallbackBudget;
use crate::consumer::CallbackContext;
use crate::oracle::Oracle;

/// Invokes consumer callbacks under a fixed budget
#[derive(Debug, Clone, Copy)]
pub struct CallbackInvoker {
    budget: CallbackBudget,
}

impl CallbackInvoker {
    pub fn new(budget: CallbackBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> &CallbackBudget {
        &self.budget
    }

    /// Call the consumer deployed at `target`
    pub fn invoke(
        self,
        oracle: &mut Oracle,
        target: &Address,
        selector: &Selector,
        external_id: &ExternalId,
        response: &[u8],
    ) -> CallbackOutcome {
        let Some(consumer) = oracle.consumers.get(target) else {
            debug!("No consumer code at {}", target);
            return CallbackOutcome::NoCode;
        };

        let limit = self.budget.max_call_depth;
        if oracle.call_depth >= limit {
            warn!("Callback to {} refused at depth {}", target, oracle.call_depth);
            return CallbackOutcome::Faulted {
                fault: CallbackFault::DepthExceeded { limit },
            };
        }

        oracle.call_depth += 1;
        let mut ctx = CallbackContext::new(oracle, *target, self.budget.max_nested_calls);
        let result = catch_unwind(AssertUnwindSafe(|| {
            consumer.on_callback(&mut ctx, selector, external_id, response)
        }));
        let destroyed = ctx.is_destroyed();
        drop(ctx);
        oracle.call_depth -= 1;

        if destroyed {
            oracle.consumers.remove(target);
            debug!("Consumer at {} self-destructed", target);
        }

        match result {
            Ok(Ok(())) => CallbackOutcome::Delivered,
            Ok(Err(fault)) => {
                warn!("Callback to {} failed: {}", target, fault);
                CallbackOutcome::Faulted { fault }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Callback to {} panicked: {}", target, message);
                CallbackOutcome::Faulted {
                    fault: CallbackFault::Panicked { message },
                }
            }
        }
    }
}

impl Default for CallbackInvoker {
    fn default() -> Self {
        Self::new(CallbackBudget::default())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
