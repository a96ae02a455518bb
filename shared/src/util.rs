/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 当天 UTC 零点的时间戳（毫秒）
pub fn start_of_utc_day(millis: i64) -> i64 {
    const DAY_MS: i64 = 86_400_000;
    millis - millis.rem_euclid(DAY_MS)
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms)
///
/// Ids are strictly increasing within a process: a candidate that does not
/// exceed the last issued id is bumped to `last + 1`.
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    use std::sync::atomic::{AtomicI64, Ordering};

    static LAST_ID: AtomicI64 = AtomicI64::new(0);

    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    let candidate = (ts << 12) | rand_bits;

    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let next = if candidate > last { candidate } else { last + 1 };
        match LAST_ID.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}
