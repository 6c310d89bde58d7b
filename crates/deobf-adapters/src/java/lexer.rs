//! Tokenizador: identificadores y símbolos con su posición. Comentarios,
//! literales de texto / char / text blocks y números no producen tokens de
//! identificador, de modo que su contenido nunca se reescribe.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Symbol(char),
    /// Literal (texto, char, número).
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Rango de bytes `[start, end)`.
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn text<'s>(&self, src: &'s str) -> &'s str {
        &src[self.start..self.end]
    }

    pub fn is_symbol(&self, c: char) -> bool {
        self.kind == TokenKind::Symbol(c)
    }
}

struct Cursor<'s> {
    chars: std::iter::Peekable<std::str::CharIndices<'s>>,
    src: &'s str,
    line: u32,
    column: u32,
}

impl<'s> Cursor<'s> {
    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[offset..].chars().next()
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next()?;
        if next.1 == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(next)
    }

    fn offset(&mut self) -> usize {
        self.peek().map(|(i, _)| i).unwrap_or(self.src.len())
    }

    fn eat_while<F: Fn(char) -> bool>(&mut self, f: F) {
        while let Some((_, c)) = self.peek() {
            if !f(c) {
                break;
            }
            self.bump();
        }
    }

    /// Consume un literal delimitado por `quote` (ya consumido) con escapes.
    fn eat_quoted(&mut self, quote: char) {
        while let Some((_, c)) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '\n' => break,
                c if c == quote => break,
                _ => {}
            }
        }
    }

    fn eat_text_block(&mut self) {
        // ya consumidas las tres comillas de apertura
        let mut quotes = 0;
        while let Some((_, c)) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                    quotes = 0;
                }
                '"' => {
                    quotes += 1;
                    if quotes == 3 {
                        break;
                    }
                }
                _ => quotes = 0,
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub fn tokenize(src: &str) -> Vec<Token> {
    let mut cur = Cursor { chars: src.char_indices().peekable(),
                           src,
                           line: 1,
                           column: 1 };
    let mut tokens = Vec::new();
    while let Some((start, c)) = cur.peek() {
        let (line, column) = (cur.line, cur.column);
        if c.is_whitespace() {
            cur.bump();
            continue;
        }
        if c == '/' {
            match cur.peek_at(start + 1) {
                Some('/') => {
                    cur.eat_while(|c| c != '\n');
                    continue;
                }
                Some('*') => {
                    cur.bump();
                    cur.bump();
                    let mut prev = '\0';
                    while let Some((_, c)) = cur.bump() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                    continue;
                }
                _ => {}
            }
        }
        let kind = if is_ident_start(c) {
            cur.eat_while(is_ident_part);
            TokenKind::Ident
        } else if c.is_ascii_digit() || (c == '.' && cur.peek_at(start + 1).is_some_and(|n| n.is_ascii_digit())) {
            cur.bump();
            let mut prev = c;
            while let Some((_, n)) = cur.peek() {
                let exponent_sign = (n == '+' || n == '-') && matches!(prev, 'e' | 'E' | 'p' | 'P');
                if !(n.is_ascii_alphanumeric() || n == '_' || n == '.' || exponent_sign) {
                    break;
                }
                prev = n;
                cur.bump();
            }
            TokenKind::Literal
        } else if c == '"' {
            cur.bump();
            if src[start..].starts_with("\"\"\"") {
                cur.bump();
                cur.bump();
                cur.eat_text_block();
            } else {
                cur.eat_quoted('"');
            }
            TokenKind::Literal
        } else if c == '\'' {
            cur.bump();
            cur.eat_quoted('\'');
            TokenKind::Literal
        } else {
            cur.bump();
            TokenKind::Symbol(c)
        };
        let end = cur.offset();
        tokens.push(Token { kind,
                            start,
                            end,
                            line,
                            column });
    }
    tokens
}
