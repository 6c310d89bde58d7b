use serde::Serialize;
use serde_json::Value;

use crate::constants::ENGINE_VERSION;
use crate::hashing::hash_value;

/// Insumos para calcular el fingerprint de un stage.
/// NO es el fingerprint final (string hash) sino el modelo previo a canonicalizar.
#[derive(Serialize)]
pub struct StageFingerprintInput<'a> {
    pub engine_version: &'a str,
    pub stage_id: &'a str,
    pub input_fingerprints: &'a [String], // en el orden declarado de inputs
    pub params: &'a Value,
}

impl<'a> StageFingerprintInput<'a> {
    pub fn new(stage_id: &'a str, input_fingerprints: &'a [String], params: &'a Value) -> Self {
        Self { engine_version: ENGINE_VERSION,
               stage_id,
               input_fingerprints,
               params }
    }

    pub fn compute(&self) -> String {
        // Serialize de un struct con campos String/Value no puede fallar.
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        hash_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fingerprint_changes_with_params_and_inputs() {
        let inputs = vec!["abc".to_string()];
        let p1 = json!({"apply_markers": true});
        let p2 = json!({"apply_markers": false});
        let a = StageFingerprintInput::new("deobf", &inputs, &p1).compute();
        let b = StageFingerprintInput::new("deobf", &inputs, &p2).compute();
        assert_ne!(a, b);

        let other_inputs = vec!["abd".to_string()];
        let c = StageFingerprintInput::new("deobf", &other_inputs, &p1).compute();
        assert_ne!(a, c);
        assert_eq!(a, StageFingerprintInput::new("deobf", &inputs, &p1).compute());
    }
}
