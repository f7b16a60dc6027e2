//! Type-String Codec
//!
//! Tokenizer and recursive-descent parser for the canonical encoded form
//! produced by [`TypeDescriptor::encode`]:
//!
//! ```text
//! descriptor := tag | reference | compound
//! compound   := Array<d> | Set<d> | Tuple<[d,...]> | Union<[d,...]>
//!             | Record<d,d> | Map<d,d> | Literal<json>
//! reference  := identifier | "json string"
//! ```
//!
//! Names that are not plain identifiers are JSON-quoted by the encoder,
//! so punctuation inside a registered name never reads as grammar.
//! Compound nesting is bounded; deeper input is rejected as an error.

use serde_json::Value;

use super::builder::DEFAULT_MAX_DEPTH;
use super::descriptor::{is_ident_char, TypeDescriptor};
use crate::error::{FlowError, Result};
use crate::schema::SchemaTag;

/// Encode a descriptor into the canonical grammar
pub fn encode(ty: &TypeDescriptor) -> String {
    ty.encode()
}

/// Parse an encoded string back into a descriptor
pub fn parse(input: &str) -> Result<TypeDescriptor> {
    parse_with_limit(input, DEFAULT_MAX_DEPTH)
}

/// Parse with an explicit bound on compound nesting
pub fn parse_with_limit(input: &str, max_depth: usize) -> Result<TypeDescriptor> {
    let mut parser = Parser {
        lexer: Lexer::new(input),
        depth: 0,
        max_depth,
    };
    let ty = parser.descriptor()?;
    match parser.lexer.next_token()? {
        Token::End => Ok(ty),
        other => Err(parser.lexer.error(format!("trailing input starting at {:?}", other))),
    }
}

/// Fully expand an encoded string into its display form
pub fn render(input: &str) -> Result<String> {
    Ok(parse(input)?.display())
}

// =============================================================================
// Tokenizer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Ident(&'a str),
    Quoted(String),
    LAngle,
    RAngle,
    LBracket,
    RBracket,
    Comma,
    End,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> FlowError {
        FlowError::TypeString {
            input: self.input.to_string(),
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek_token(&mut self) -> Result<Token<'a>> {
        let saved = self.pos;
        let token = self.next_token();
        self.pos = saved;
        token
    }

    fn next_token(&mut self) -> Result<Token<'a>> {
        self.skip_whitespace();
        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return Ok(Token::End);
        };

        let punct = match c {
            '<' => Some(Token::LAngle),
            '>' => Some(Token::RAngle),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = punct {
            self.pos += 1;
            return Ok(token);
        }

        if c == '"' {
            let len = scan_json_string(rest).ok_or_else(|| self.error("unterminated string"))?;
            let text: String = serde_json::from_str(&rest[..len])
                .map_err(|e| self.error(format!("bad string escape: {}", e)))?;
            self.pos += len;
            return Ok(Token::Quoted(text));
        }

        if is_ident_char(c) {
            let len = rest.find(|ch: char| !is_ident_char(ch)).unwrap_or(rest.len());
            self.pos += len;
            return Ok(Token::Ident(&rest[..len]));
        }

        Err(self.error(format!("unexpected character {:?}", c)))
    }

    /// Raw JSON payload of a `Literal<...>`, up to the closing angle bracket
    fn json_value(&mut self) -> Result<Value> {
        let rest = self.rest();
        let mut depth = 0usize;
        let mut i = 0;
        let bytes = rest.as_bytes();

        while i < bytes.len() {
            match bytes[i] {
                b'"' => {
                    let len = scan_json_string(&rest[i..])
                        .ok_or_else(|| self.error("unterminated string in literal"))?;
                    i += len;
                    continue;
                }
                b'[' | b'{' => depth += 1,
                b']' | b'}' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => break,
                _ => {}
            }
            i += 1;
        }

        let value = serde_json::from_str(rest[..i].trim())
            .map_err(|e| self.error(format!("invalid literal: {}", e)))?;
        self.pos += i;
        Ok(value)
    }
}

/// Byte length of the JSON string literal at the start of `text`, quotes included
fn scan_json_string(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(1) {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'"' {
            return Some(i + 1);
        }
    }
    None
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Compounds currently open
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn expect(&mut self, expected: Token<'a>) -> Result<()> {
        let token = self.lexer.next_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(self.lexer.error(format!("expected {:?}, found {:?}", expected, token)))
        }
    }

    fn descriptor(&mut self) -> Result<TypeDescriptor> {
        match self.lexer.next_token()? {
            Token::Quoted(name) => Ok(TypeDescriptor::Ref(name)),
            Token::Ident(word) => {
                if self.lexer.peek_token()? == Token::LAngle {
                    self.compound(word)
                } else if let Some(tag) = SchemaTag::from_name(word) {
                    Ok(TypeDescriptor::Kind(tag))
                } else {
                    Ok(TypeDescriptor::Ref(word.to_string()))
                }
            }
            other => Err(self.lexer.error(format!("expected a type, found {:?}", other))),
        }
    }

    fn compound(&mut self, keyword: &str) -> Result<TypeDescriptor> {
        if self.depth >= self.max_depth {
            return Err(self.lexer.error("nesting too deep"));
        }
        self.depth += 1;
        let ty = self.compound_body(keyword);
        self.depth -= 1;
        ty
    }

    fn compound_body(&mut self, keyword: &str) -> Result<TypeDescriptor> {
        self.expect(Token::LAngle)?;
        let ty = match keyword {
            "Array" => TypeDescriptor::Array(Box::new(self.descriptor()?)),
            "Set" => TypeDescriptor::Set(Box::new(self.descriptor()?)),
            "Tuple" => TypeDescriptor::Tuple(self.list()?),
            "Union" => TypeDescriptor::Union(self.list()?),
            "Record" => {
                let (key, value) = self.pair()?;
                TypeDescriptor::Record(key, value)
            }
            "Map" => {
                let (key, value) = self.pair()?;
                TypeDescriptor::Map(key, value)
            }
            "Literal" => TypeDescriptor::Literal(self.lexer.json_value()?),
            other => return Err(self.lexer.error(format!("unknown compound {:?}", other))),
        };
        self.expect(Token::RAngle)?;
        Ok(ty)
    }

    fn list(&mut self) -> Result<Vec<TypeDescriptor>> {
        self.expect(Token::LBracket)?;
        let mut items = Vec::new();
        if self.lexer.peek_token()? == Token::RBracket {
            self.lexer.next_token()?;
            return Ok(items);
        }
        loop {
            items.push(self.descriptor()?);
            match self.lexer.next_token()? {
                Token::Comma => continue,
                Token::RBracket => return Ok(items),
                other => {
                    return Err(self.lexer.error(format!("expected ',' or ']', found {:?}", other)))
                }
            }
        }
    }

    fn pair(&mut self) -> Result<(Box<TypeDescriptor>, Box<TypeDescriptor>)> {
        let key = self.descriptor()?;
        self.expect(Token::Comma)?;
        let value = self.descriptor()?;
        Ok((Box::new(key), Box::new(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_nested_compounds() {
        assert_eq!(render("Array<Product>").unwrap(), "Product[]");
        assert_eq!(
            render("Record<SchemaString,Array<Union<[Product,SchemaNull]>>>").unwrap(),
            "{ [key: string]: (Product | null)[] }"
        );
        assert_eq!(
            render("Map<SchemaString,Set<Tuple<[SchemaNumber,SchemaBoolean]>>>").unwrap(),
            "Map<string, Set<[number, boolean]>>"
        );
        assert_eq!(render("SchemaNativeEnum").unwrap(), "nativeenum");
    }

    #[test]
    fn test_quoted_names_may_contain_grammar_punctuation() {
        let ty = TypeDescriptor::Array(Box::new(TypeDescriptor::Ref("Weird<Name>, [x]".into())));
        let encoded = encode(&ty);
        assert_eq!(parse(&encoded).unwrap(), ty);
        assert_eq!(render(&encoded).unwrap(), "Weird<Name>, [x][]");
    }

    #[test]
    fn test_literals_with_brackets_inside() {
        let ty = TypeDescriptor::Union(vec![
            TypeDescriptor::Literal(json!("a>b")),
            TypeDescriptor::Literal(json!({"k": [1, 2]})),
            TypeDescriptor::Literal(json!(7)),
        ]);
        let encoded = encode(&ty);
        assert_eq!(parse(&encoded).unwrap(), ty);
        assert_eq!(render(&encoded).unwrap(), r#""a>b" | {"k":[1,2]} | 7"#);
    }

    #[test]
    fn test_empty_tuple() {
        assert_eq!(render("Tuple<[]>").unwrap(), "[]");
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}SchemaString{}", "Array<".repeat(depth), ">".repeat(depth));

        assert!(parse(&nested(DEFAULT_MAX_DEPTH)).is_ok());
        match render(&nested(200_000)) {
            Err(FlowError::TypeString { message, offset, .. }) => {
                assert_eq!(message, "nesting too deep");
                assert_eq!(offset, DEFAULT_MAX_DEPTH * "Array<".len() + "Array".len());
            }
            other => panic!("Expected TypeString error, got {:?}", other.map(|s| s.len())),
        }
        assert!(parse_with_limit(&nested(3), 2).is_err());
        assert!(parse_with_limit(&nested(3), 3).is_ok());
    }

    #[test]
    fn test_parse_errors_carry_offset() {
        match parse("Array<Product") {
            Err(FlowError::TypeString { offset, .. }) => assert_eq!(offset, 13),
            other => panic!("Expected TypeString error, got {:?}", other),
        }
        assert!(parse("Array<Product>>").is_err());
        assert!(parse("Bogus<X>").is_err());
        assert!(parse("Record<A>").is_err());
    }
}
