//! Key encoding utilities for `RocksDB`.

use stockpass_core::{AccountId, OrderNo, PlanId};

/// Create an account key from an account id (8 big-endian bytes).
#[must_use]
pub fn account_key(account_id: AccountId) -> Vec<u8> {
    account_id.to_be_bytes().to_vec()
}

/// Create a name-index key from a display name.
#[must_use]
pub fn account_name_key(name: &str) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Create an invite-code key from the code token.
#[must_use]
pub fn invite_code_key(code: &str) -> Vec<u8> {
    code.as_bytes().to_vec()
}

/// Create a plan key from a plan id (8 big-endian bytes).
#[must_use]
pub fn plan_key(plan_id: PlanId) -> Vec<u8> {
    plan_id.to_be_bytes().to_vec()
}

/// Create an order key from an order number.
#[must_use]
pub fn order_key(out_trade_no: &OrderNo) -> Vec<u8> {
    out_trade_no.as_bytes().to_vec()
}
