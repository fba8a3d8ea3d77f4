use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use alloy_primitives::B256;

use crate::errors::DriverError;

/// Tracks the publications of a single send at a fixed nonce.
#[derive(Debug)]
pub(crate) struct SendState {
    inner: Mutex<Inner>,
    nonce_too_low_message: String,
    safe_abort_nonce_too_low_count: u64,
}

#[derive(Debug, Default)]
struct Inner {
    mined: HashSet<B256>,
    nonce_too_low_count: u64,
}

impl SendState {
    pub(crate) fn new(nonce_too_low_message: &str, safe_abort_nonce_too_low_count: u64) -> Self {
        Self {
            inner: Mutex::default(),
            nonce_too_low_message: nonce_too_low_message.to_lowercase(),
            safe_abort_nonce_too_low_count,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if `err` reports that the nonce was already used.
    pub(crate) fn is_nonce_too_low(&self, err: &DriverError) -> bool {
        err.message_contains(&self.nonce_too_low_message)
    }

    /// Records a failed publication.
    pub(crate) fn process_send_error(&self, err: &DriverError) {
        if self.is_nonce_too_low(err) {
            self.inner().nonce_too_low_count += 1;
        }
    }

    /// Records that `hash` was found in a block.
    pub(crate) fn tx_mined(&self, hash: B256) {
        self.inner().mined.insert(hash);
    }

    /// Records that `hash` is no longer in a block, e.g. after a reorg.
    pub(crate) fn tx_not_mined(&self, hash: B256) {
        self.inner().mined.remove(&hash);
    }

    /// Returns `true` when no publication is mined and the nonce was reported as used more
    /// often than tolerated. Some earlier replacement is then assumed to be confirmed.
    pub(crate) fn should_abort_immediately(&self) -> bool {
        let inner = self.inner();
        inner.mined.is_empty() && inner.nonce_too_low_count > self.safe_abort_nonce_too_low_count
    }

    /// Returns `true` while a publication is mined but not yet confirmed.
    pub(crate) fn is_waiting_for_confirmation(&self) -> bool {
        !self.inner().mined.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use alloy::transports::TransportErrorKind;

    use super::*;

    fn nonce_too_low() -> DriverError {
        TransportErrorKind::custom_str("Nonce too low").into()
    }

    #[test]
    fn aborts_past_threshold() {
        let state = SendState::new("nonce too low", 2);

        for _ in 0..2 {
            state.process_send_error(&nonce_too_low());
            assert!(!state.should_abort_immediately());
        }

        state.process_send_error(&nonce_too_low());
        assert!(state.should_abort_immediately());
    }

    #[test]
    fn other_errors_are_not_counted() {
        let state = SendState::new("nonce too low", 0);
        state.process_send_error(&TransportErrorKind::custom_str("underpriced").into());
        assert!(!state.should_abort_immediately());
    }

    #[test]
    fn mined_tx_prevents_abort() {
        let state = SendState::new("nonce too low", 0);
        let hash = B256::repeat_byte(1);

        state.tx_mined(hash);
        state.process_send_error(&nonce_too_low());
        assert!(state.is_waiting_for_confirmation());
        assert!(!state.should_abort_immediately());

        state.tx_not_mined(hash);
        assert!(!state.is_waiting_for_confirmation());
        assert!(state.should_abort_immediately());
    }

    #[test]
    fn custom_message() {
        let state = SendState::new("Transaction Nonce Is Too Low", 0);
        let err = TransportErrorKind::custom_str("transaction nonce is too low: have 3").into();
        assert!(state.is_nonce_too_low(&err));
    }
}
