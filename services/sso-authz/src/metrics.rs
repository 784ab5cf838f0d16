//! Prometheus metrics for the SSO authorization core.

use crate::jose::KeyOperation;
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec};

/// Dispatch outcomes per protocol.
pub static DISPATCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sso_authz_dispatch_total",
        "Total number of authorization dispatches",
        &["protocol", "outcome"]
    )
    .expect("Failed to register dispatch_total metric")
});

/// Tokens issued per protocol and signing algorithm.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sso_authz_tokens_issued_total",
        "Total number of tokens issued",
        &["protocol", "algorithm"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Keyed JOSE operations.
pub static JOSE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sso_authz_jose_operations_total",
        "Total number of JOSE operations",
        &["operation", "status"]
    )
    .expect("Failed to register jose_operations metric")
});

/// Record a dispatch outcome.
pub fn record_dispatch(protocol: &str, outcome: &str) {
    DISPATCH_TOTAL.with_label_values(&[protocol, outcome]).inc();
}

/// Record an issued token.
pub fn record_token_issued(protocol: &str, algorithm: &str) {
    TOKENS_ISSUED.with_label_values(&[protocol, algorithm]).inc();
}

/// Record a JOSE operation.
pub fn record_jose_operation(operation: KeyOperation, status: &str) {
    JOSE_OPERATIONS
        .with_label_values(&[operation.as_str(), status])
        .inc();
}
