//! Reescritura de nombres de clase dentro de firmas genéricas (atributo
//! `Signature`), p.ej. `<T:La;>Ljava/util/List<La$1;>;`.
//!
//! Las firmas mal formadas se devuelven sin cambios.

pub fn remap_signature<F>(sig: &str, map: &F) -> String
    where F: Fn(&str) -> String
{
    let mut p = SigParser { src: sig.as_bytes(),
                            pos: 0,
                            out: String::with_capacity(sig.len()),
                            map };
    match p.signature() {
        Some(()) if p.pos == p.src.len() => p.out,
        _ => sig.to_string(),
    }
}

struct SigParser<'a, F> {
    src: &'a [u8],
    pos: usize,
    out: String,
    map: &'a F,
}

impl<F> SigParser<'_, F> where F: Fn(&str) -> String
{
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn copy(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.out.push(c as char);
        self.pos += 1;
        Some(c)
    }

    fn ident(&mut self, stops: &[u8]) -> Option<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if stops.contains(&c) {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.src[start..self.pos]).ok().map(str::to_string)
    }

    fn signature(&mut self) -> Option<()> {
        if self.peek() == Some(b'<') {
            self.type_params()?;
        }
        if self.peek() == Some(b'(') {
            self.copy();
            while self.peek() != Some(b')') {
                self.field_type()?;
            }
            self.copy();
            if self.peek() == Some(b'V') {
                self.copy();
            } else {
                self.field_type()?;
            }
            while self.peek() == Some(b'^') {
                self.copy();
                self.field_type()?;
            }
        } else {
            while self.pos < self.src.len() {
                self.field_type()?;
            }
        }
        Some(())
    }

    fn type_params(&mut self) -> Option<()> {
        self.copy();
        while self.peek() != Some(b'>') {
            let name = self.ident(b":")?;
            self.out.push_str(&name);
            while self.peek() == Some(b':') {
                self.copy();
                if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                    self.field_type()?;
                }
            }
        }
        self.copy();
        Some(())
    }

    fn field_type(&mut self) -> Option<()> {
        match self.peek()? {
            b'L' => self.class_type(),
            b'T' => {
                let var = self.ident(b";")?;
                self.out.push_str(&var);
                self.copy().map(|_| ())
            }
            b'[' => {
                self.copy();
                self.field_type()
            }
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => self.copy().map(|_| ()),
            _ => None,
        }
    }

    fn class_type(&mut self) -> Option<()> {
        self.copy();
        let outer = self.ident(b"<;.")?;
        let mut full = outer.clone();
        let mapped = (self.map)(&outer);
        self.out.push_str(&mapped);
        self.type_args()?;
        while self.peek() == Some(b'.') {
            self.copy();
            let inner = self.ident(b"<;.")?;
            full = format!("{full}${inner}");
            let mapped_full = (self.map)(&full);
            // sólo se escribe el segmento interno del nombre mapeado
            let segment = mapped_full.rsplit_once('$').map(|(_, s)| s).unwrap_or(&inner);
            self.out.push_str(segment);
            self.type_args()?;
        }
        if self.peek() != Some(b';') {
            return None;
        }
        self.copy().map(|_| ())
    }

    fn type_args(&mut self) -> Option<()> {
        if self.peek() != Some(b'<') {
            return Some(());
        }
        self.copy();
        while self.peek() != Some(b'>') {
            match self.peek()? {
                b'*' => {
                    self.copy();
                }
                b'+' | b'-' => {
                    self.copy();
                    self.field_type()?;
                }
                _ => self.field_type()?,
            }
        }
        self.copy().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(name: &str) -> String {
        match name {
            "a" => "net/minecraft/Foo".to_string(),
            "a$b" => "net/minecraft/Foo$Inner".to_string(),
            other => other.to_string(),
        }
    }

    #[test]
    fn remaps_nested_generic_arguments() {
        assert_eq!(remap_signature("Ljava/util/List<La;>;", &map),
                   "Ljava/util/List<Lnet/minecraft/Foo;>;");
        assert_eq!(remap_signature("<T:La;>(TT;[La;)Ljava/util/Map<+La;*>;^La;", &map),
                   "<T:Lnet/minecraft/Foo;>(TT;[Lnet/minecraft/Foo;)Ljava/util/Map<+Lnet/minecraft/Foo;*>;^Lnet/minecraft/Foo;");
    }

    #[test]
    fn inner_class_segments_use_mapped_suffix() {
        assert_eq!(remap_signature("La<TT;>.b;", &map), "Lnet/minecraft/Foo<TT;>.Inner;");
    }

    #[test]
    fn class_signature_with_interfaces() {
        assert_eq!(remap_signature("<K::Ljava/lang/Comparable<TK;>;>Ljava/lang/Object;La;", &map),
                   "<K::Ljava/lang/Comparable<TK;>;>Ljava/lang/Object;Lnet/minecraft/Foo;");
    }

    #[test]
    fn malformed_signature_is_left_alone() {
        assert_eq!(remap_signature("Ljava/util/List<La;", &map), "Ljava/util/List<La;");
    }
}
