// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    unauthorized = { 401, ProviderErrorKind::Auth, false },
    forbidden = { 403, ProviderErrorKind::Auth, false },
    rate_limited = { 429, ProviderErrorKind::RateLimit, true },
    overloaded = { 529, ProviderErrorKind::Overloaded, true },
    server_error = { 500, ProviderErrorKind::Network, true },
    bad_gateway = { 502, ProviderErrorKind::Network, true },
    teapot = { 418, ProviderErrorKind::Unknown, false },
)]
fn http_status_mapping(status: u16, kind: ProviderErrorKind, retryable: bool) {
    let err = classify_http_status(status, None);
    assert_eq!(err.kind, kind);
    assert_eq!(err.retryable, retryable);
}

#[test]
fn rate_limit_honors_retry_after() {
    let err = classify_http_status(429, Some(1_500));
    assert_eq!(err.retry_after_ms, Some(1_500));
    assert_eq!(retry_delay(0, &err), Duration::from_millis(1_500));
}

#[test]
fn backoff_doubles_and_caps() {
    let err = ProviderError::new(ProviderErrorKind::Network, "boom");
    assert_eq!(retry_delay(0, &err), Duration::from_secs(2));
    assert_eq!(retry_delay(1, &err), Duration::from_secs(4));
    assert_eq!(retry_delay(2, &err), Duration::from_secs(8));
    assert_eq!(retry_delay(10, &err), Duration::from_secs(30));
}

#[test]
fn abort_is_not_retryable() {
    let err = ProviderError::aborted();
    assert_eq!(err.kind, ProviderErrorKind::Abort);
    assert!(!err.retryable);
}
