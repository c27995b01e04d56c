//! Record identifiers

use chrono::Utc;
use uuid::Uuid;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random part of a generated id
const SUFFIX_LEN: usize = 7;

/// New id: base-36 millisecond timestamp followed by a short random suffix.
///
/// Collisions are only probabilistically avoided; the timestamp prefix gives
/// rough recency and nothing stronger.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let mut id = to_base36(millis);

    let mut random = Uuid::new_v4().as_u128();
    for _ in 0..SUFFIX_LEN {
        id.push(BASE36[(random % 36) as usize] as char);
        random /= 36;
    }
    id
}

fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
