//! Venue business return codes and their handling classes.

/// Success.
pub const RET_OK: i64 = 0;
/// Invalid parameter.
pub const RET_INVALID_PARAM: i64 = 10001;
/// Request timestamp outside the venue's recv window.
pub const RET_TIMESTAMP_DRIFT: i64 = 10002;
/// Invalid API key.
pub const RET_INVALID_API_KEY: i64 = 10003;
/// Signature mismatch.
pub const RET_SIGNATURE_ERROR: i64 = 10004;
/// Rate limited.
pub const RET_RATE_LIMITED: i64 = 10006;
/// Leverage already set to the requested value.
pub const RET_LEVERAGE_NOT_MODIFIED: i64 = 110043;
/// Order value below the instrument's minimum notional.
pub const RET_MIN_NOTIONAL: i64 = 110094;
/// Order not allowed in the current position state.
pub const RET_ORDER_NOT_ALLOWED: i64 = 110241;

/// Codes that are worth retrying with backoff.
pub fn is_transient(code: i64) -> bool {
    code == RET_RATE_LIMITED
}

/// Codes that report "nothing to do" and are treated as success.
pub fn is_benign(code: i64) -> bool {
    code == RET_LEVERAGE_NOT_MODIFIED
}

/// Human-readable description for logs.
pub fn describe(code: i64) -> &'static str {
    match code {
        RET_OK => "ok",
        RET_INVALID_PARAM => "invalid parameter",
        RET_TIMESTAMP_DRIFT => "timestamp outside recv window",
        RET_INVALID_API_KEY => "invalid api key",
        RET_SIGNATURE_ERROR => "signature error",
        RET_RATE_LIMITED => "rate limited",
        RET_LEVERAGE_NOT_MODIFIED => "leverage unchanged",
        RET_MIN_NOTIONAL => "below minimum notional",
        RET_ORDER_NOT_ALLOWED => "order not allowed in current state",
        _ => "unknown venue code",
    }
}
