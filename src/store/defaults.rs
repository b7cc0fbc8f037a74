//! Algorithms seeded into a fresh store.

use super::AlgorithmDefinition;

/// Name of the legacy ABA signing algorithm.
pub const ABA_HMAC_SHA256: &str = "ABA HMAC SHA256";

/// Name of the sorted-key reference algorithm.
pub const SORTED_HMAC_SHA256: &str = "Sorted HMAC SHA256";

/// Passcode layout: key bytes followed by a 16-character IV. The message is
/// IV + API key + payload values, in `key_order` when given, otherwise in
/// payload order skipping `hash` and `__keys_order__`. Values are rendered
/// with `pystr` so signatures match the Python tooling that issues them.
const ABA_SOURCE: &str = r#"# ABA HMAC-SHA256 request signature.
fn generate(payload, passcode, api_key = "", key_order = none) {
    if len(passcode) < 16 {
        fail("PassCode must be at least 16 characters long.");
    }
    let iv = passcode[-16:];
    let key = passcode[:-16];

    let names = key_order;
    if not names {
        names = [];
        for k in payload {
            if k != "hash" and k != "__keys_order__" {
                names = push(names, k);
            }
        }
    }

    let message = api_key;
    for k in names {
        let v = get(payload, k);
        if v == none {
            v = "";
        }
        message = message + pystr(v);
    }

    return hex(keyedHash("sha256", key, iv + message));
}
"#;

const SORTED_SOURCE: &str = r#"# HMAC-SHA256 over payload values in sorted key order.
fn generate(payload, passcode, api_key = "", key_order = none) {
    let names = key_order;
    if names == none {
        names = sorted(keys(payload));
    }
    let message = "";
    for k in names {
        let v = get(payload, k);
        if v == none {
            v = "";
        }
        message = message + str(v);
    }
    return hex(keyedHash("sha256", passcode, message));
}
"#;

/// The built-in algorithms, in seeding order.
pub fn default_algorithms() -> Vec<AlgorithmDefinition> {
    vec![
        AlgorithmDefinition::new(ABA_HMAC_SHA256, ABA_SOURCE)
            .with_description("Original ABA HMAC-SHA256 Implementation"),
        AlgorithmDefinition::new(SORTED_HMAC_SHA256, SORTED_SOURCE)
            .with_description("HMAC-SHA256 of values concatenated in sorted key order"),
    ]
}
