// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for hub daemon communication.
//!
//! Wire format: newline-delimited JSON, one object per line.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod reply;
mod request;

pub use frame::{encode, encode_value, LineParser, WireError, MAX_RECORD_SIZE, MAX_STREAM_CHUNK};
pub use reply::{ErrorDetail, Reply};
pub use request::{Envelope, Request};
