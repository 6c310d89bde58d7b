//! Utilidades sobre descriptores JVM (`(ILjava/lang/String;)V`, `[La/b;`).

/// Reescribe cada referencia `L<clase>;` del descriptor con `map`.
/// Las clases para las que `map` devuelve `None` se dejan igual.
pub fn remap_descriptor<F>(desc: &str, map: F) -> String
    where F: Fn(&str) -> Option<String>
{
    let mut out = String::with_capacity(desc.len());
    let mut rest = desc;
    while let Some(start) = rest.find('L') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(';') {
            Some(end) => {
                let class = &after[..end];
                out.push('L');
                match map(class) {
                    Some(mapped) => out.push_str(&mapped),
                    None => out.push_str(class),
                }
                out.push(';');
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Número de parámetros de un descriptor de método, o `None` si no es válido.
pub fn method_arity(desc: &str) -> Option<usize> {
    let body = desc.strip_prefix('(')?;
    let end = body.find(')')?;
    let params = &body[..end];
    let mut count = 0;
    let mut chars = params.chars();
    while let Some(c) = chars.next() {
        match c {
            '[' => continue,
            'L' => {
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                }
                count += 1;
            }
            'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => count += 1,
            _ => return None,
        }
    }
    Some(count)
}

/// Validación superficial de un descriptor de método.
pub fn is_method_descriptor(desc: &str) -> bool {
    method_arity(desc).is_some() && desc.rfind(')').is_some_and(|i| i + 1 < desc.len())
}
