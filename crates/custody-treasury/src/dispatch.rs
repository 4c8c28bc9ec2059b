use custody_types::{Amount, Principal};
use thiserror::Error;

/// An outbound call carried by a transfer transaction with a payload.
#[derive(Clone, Copy, Debug)]
pub struct OutboundCall<'a> {
    pub target: &'a Principal,
    pub value: Amount,
    pub payload: &'a [u8],
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("call reverted: {0}")]
pub struct DispatchError(pub String);

/// Executes the non-transfer part of a transaction.
///
/// `estimate` must be side-effect free; the treasury compares it with its
/// resource ceiling before moving any value.
pub trait CallDispatcher: Send + Sync {
    fn estimate(&self, call: &OutboundCall<'_>) -> u64;

    fn dispatch(&self, call: &OutboundCall<'_>) -> Result<(), DispatchError>;
}

/// Dispatcher that accepts every call, charging a flat base cost plus a
/// per-byte cost for the payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDispatcher;

impl NoopDispatcher {
    pub const BASE_COST: u64 = 21_000;
    pub const PER_BYTE_COST: u64 = 16;
}

impl CallDispatcher for NoopDispatcher {
    fn estimate(&self, call: &OutboundCall<'_>) -> u64 {
        Self::BASE_COST.saturating_add(Self::PER_BYTE_COST.saturating_mul(call.payload.len() as u64))
    }

    fn dispatch(&self, _call: &OutboundCall<'_>) -> Result<(), DispatchError> {
        Ok(())
    }
}
