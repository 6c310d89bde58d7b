//! Hash helpers sobre blake3.

use blake3::Hasher;
use serde_json::Value;

use super::to_canonical_json;

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    hash_bytes(input.as_bytes())
}

pub fn hash_bytes(input: &[u8]) -> String {
    let mut h = Hasher::new();
    h.update(input);
    h.finalize().to_hex().to_string()
}

/// Hash del JSON canonicalizado: dos `Value` iguales salvo orden de claves
/// producen el mismo hash.
pub fn hash_value(value: &Value) -> String {
    hash_str(&to_canonical_json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_value_produces_hex_64() {
        let h = hash_value(&json!({"a": 1}));
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_value_ignores_key_order() {
        assert_eq!(hash_value(&json!({"a": 1, "b": 2})), hash_value(&json!({"b": 2, "a": 1})));
    }
}
