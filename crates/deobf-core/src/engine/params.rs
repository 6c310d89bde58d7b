//! Parámetros efectivos de un stage: `base_params` más los diferidos que se
//! resuelven en `finalize`.

use serde_json::{Map, Value};

/// Añade los parámetros diferidos sobre los base. Una clave diferida pisa a
/// la base homónima. Un base `null` equivale a objeto vacío; cualquier otro
/// base que no sea objeto queda bajo la clave `"base"`.
pub fn with_deferred(base: Value, deferred: Map<String, Value>) -> Value {
    if deferred.is_empty() {
        return base;
    }
    let mut out = match base {
        Value::Object(m) => m,
        Value::Null => Map::new(),
        other => Map::from_iter([("base".to_string(), other)]),
    };
    out.extend(deferred);
    Value::Object(out)
}
