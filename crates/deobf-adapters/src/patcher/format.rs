use serde_json::{json, Value};

/// Pase de formato sobre un fichero fuente ya parcheado.
pub trait SourceFormatter: Send + Sync {
    fn format(&self, path: &str, source: &str) -> String;

    fn describe(&self) -> Value;
}

/// Normaliza finales de línea, tabs (4 espacios), espacios finales y la
/// línea final.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFormatter;

impl SourceFormatter for BasicFormatter {
    fn format(&self, _path: &str, source: &str) -> String {
        let mut out = String::with_capacity(source.len());
        for line in source.lines() {
            out.push_str(line.replace('\t', "    ").trim_end());
            out.push('\n');
        }
        while out.ends_with("\n\n") {
            out.pop();
        }
        out
    }

    fn describe(&self) -> Value {
        json!({"formatter": "basic", "indent": 4})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_whitespace() {
        let src = "class A {\r\n\tint a;   \r\n}";
        assert_eq!(BasicFormatter.format("A.java", src), "class A {\n    int a;\n}\n");
    }

    #[test]
    fn formatting_is_idempotent() {
        let once = BasicFormatter.format("A.java", "a\t\nb\n\n\n");
        assert_eq!(BasicFormatter.format("A.java", &once), once);
    }
}
