//! Per-call execution context.
//!
//! A [`CallContext`] is what a registry sees of the world while handling one
//! call: who is calling, the ledger clock, the governance parameters, the
//! signature checker, and the event log to emit into. Cross-registry calls
//! reborrow the context with a different caller via [`CallContext::as_caller`]
//! so that the callee's authorization checks see the calling registry's
//! address, never the original external caller.

use ers_core::{Address, Chain};
use ers_crypto::SignatureChecker;

use crate::event::{EventLog, ProtocolEvent};
use crate::governance::ProtocolParams;

/// The caller and environment of one registry call.
pub struct CallContext<'a> {
    /// The immediate caller.
    pub caller: Address,
    /// Ledger clock.
    pub chain: &'a Chain,
    /// Governance parameters.
    pub params: &'a ProtocolParams,
    /// Signature verification.
    pub signatures: &'a SignatureChecker,
    events: &'a mut EventLog,
}

impl<'a> CallContext<'a> {
    /// Build a context for an external call.
    pub fn new(
        caller: Address,
        chain: &'a Chain,
        params: &'a ProtocolParams,
        signatures: &'a SignatureChecker,
        events: &'a mut EventLog,
    ) -> Self {
        Self {
            caller,
            chain,
            params,
            signatures,
            events,
        }
    }

    /// A context for a nested call made by `caller`.
    pub fn as_caller(&mut self, caller: Address) -> CallContext<'_> {
        CallContext {
            caller,
            chain: self.chain,
            params: self.params,
            signatures: self.signatures,
            events: &mut *self.events,
        }
    }

    /// Current block timestamp.
    pub fn now(&self) -> u64 {
        self.chain.timestamp()
    }

    /// Emit an event stamped with the current block.
    pub fn emit(&mut self, event: ProtocolEvent) {
        self.events
            .push(self.chain.block_number(), self.chain.timestamp(), event);
    }
}

#[cfg(test)]
pub(crate) mod test_env {
    use super::*;
    use crate::config::ProtocolConfig;

    /// Owned environment for driving a single registry in unit tests.
    pub(crate) struct TestEnv {
        pub chain: Chain,
        pub params: ProtocolParams,
        pub signatures: SignatureChecker,
        pub events: EventLog,
    }

    impl TestEnv {
        pub(crate) fn new(governance: Address) -> Self {
            let config = ProtocolConfig::default();
            Self {
                chain: Chain::new(config.chain_id, config.genesis_timestamp),
                params: ProtocolParams::from_config(&config, governance),
                signatures: SignatureChecker::new(),
                events: EventLog::new(),
            }
        }

        pub(crate) fn ctx(&mut self, caller: Address) -> CallContext<'_> {
            CallContext::new(
                caller,
                &self.chain,
                &self.params,
                &self.signatures,
                &mut self.events,
            )
        }
    }
}
