/// Current wall-clock time as unix seconds.
pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// A fresh application transaction UID.
///
/// Sent to the aggregator as `app_transaction_uid`, which it treats as the
/// idempotency key for a collection request.
pub fn new_transaction_uid() -> String {
    format!("bgp-{}", uuid::Uuid::now_v7().simple())
}
