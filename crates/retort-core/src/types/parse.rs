//! Textual form of type expressions
//!
//! Accepts the usual annotation syntax: `int`, `list[Book]`,
//! `Optional[dict[str, int]]`, `tuple[int, ...]`, `Literal["a", 1, Color.RED]`,
//! `int | None`, `Annotated[int, "meta"]`, `Final[str]`. A leading `typing.`
//! is ignored. Unknown names stay forward references unless a namespace is
//! supplied, in which case classes and aliases are resolved immediately.

use crate::types::{Namespace, Prim, TypeExpr, TypeTag};
use crate::value::Value;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Pipe,
    Ellipsis,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '.' if chars[i..].starts_with(&['.', '.', '.']) => {
                tokens.push(Token::Ellipsis);
                i += 3;
            }
            '"' | '\'' => {
                let quote = c;
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(parse_error(input, "unterminated string literal")),
                        Some('\\') => {
                            if let Some(next) = chars.get(i + 1) {
                                text.push(*next);
                            }
                            i += 2;
                        }
                        Some(ch) if *ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
                if text.contains('.') {
                    let value = text
                        .parse::<f64>()
                        .map_err(|_| parse_error(input, &format!("bad number {:?}", text)))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value = text
                        .parse::<i64>()
                        .map_err(|_| parse_error(input, &format!("bad number {:?}", text)))?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    if chars[i] == '.' && chars[i..].starts_with(&['.', '.', '.']) {
                        break;
                    }
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            other => return Err(parse_error(input, &format!("unexpected character {:?}", other))),
        }
    }
    Ok(tokens)
}

fn parse_error(input: &str, reason: &str) -> Error {
    Error::normalisation(format!("cannot parse type expression {:?}: {}", input, reason))
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    namespace: Option<&'a Namespace>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            other => Err(self.error(&format!("expected {:?}, found {:?}", expected, other))),
        }
    }

    fn error(&self, reason: &str) -> Error {
        parse_error(self.input, reason)
    }

    fn parse_type(&mut self) -> Result<TypeExpr> {
        let first = self.parse_term()?;
        if self.peek() != Some(&Token::Pipe) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.peek() == Some(&Token::Pipe) {
            self.next();
            members.push(self.parse_term()?);
        }
        Ok(TypeExpr::Union(members))
    }

    fn parse_args(&mut self) -> Result<Vec<TypeExpr>> {
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBracket) => return Ok(args),
                other => return Err(self.error(&format!("expected ',' or ']', found {:?}", other))),
            }
        }
    }

    fn parse_literal_value(&mut self) -> Result<Value> {
        match self.next() {
            Some(Token::Int(i)) => Ok(Value::Int(i)),
            Some(Token::Float(f)) => Ok(Value::Float(f)),
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::Name(name)) => match name.as_str() {
                "True" => Ok(Value::Bool(true)),
                "False" => Ok(Value::Bool(false)),
                "None" => Ok(Value::None),
                dotted => self.enum_member(dotted),
            },
            other => Err(self.error(&format!("expected a literal value, found {:?}", other))),
        }
    }

    fn enum_member(&self, dotted: &str) -> Result<Value> {
        let (class_name, member) = dotted
            .rsplit_once('.')
            .ok_or_else(|| self.error(&format!("{:?} is not a literal value", dotted)))?;
        let namespace = self
            .namespace
            .ok_or_else(|| self.error(&format!("enum literal {:?} requires a namespace", dotted)))?;
        let class = namespace
            .class(class_name)
            .ok_or_else(|| self.error(&format!("unknown enum {:?}", class_name)))?;
        class
            .member(member)
            .ok_or_else(|| self.error(&format!("{} has no member {:?}", class_name, member)))
    }

    fn parse_literal_values(&mut self) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        loop {
            values.push(self.parse_literal_value()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBracket) => return Ok(values),
                other => return Err(self.error(&format!("expected ',' or ']', found {:?}", other))),
            }
        }
    }

    fn one(&self, name: &str, mut args: Vec<TypeExpr>) -> Result<Box<TypeExpr>> {
        if args.len() != 1 {
            return Err(self.error(&format!("{} takes exactly one argument", name)));
        }
        Ok(Box::new(args.remove(0)))
    }

    fn two(&self, name: &str, mut args: Vec<TypeExpr>) -> Result<(Box<TypeExpr>, Box<TypeExpr>)> {
        if args.len() != 2 {
            return Err(self.error(&format!("{} takes exactly two arguments", name)));
        }
        let value = args.remove(1);
        let key = args.remove(0);
        Ok((Box::new(key), Box::new(value)))
    }

    fn parse_term(&mut self) -> Result<TypeExpr> {
        let raw = match self.next() {
            Some(Token::Name(name)) => name,
            other => return Err(self.error(&format!("expected a type name, found {:?}", other))),
        };
        let name = raw.strip_prefix("typing.").unwrap_or(&raw).to_string();
        let has_args = self.peek() == Some(&Token::LBracket);

        if !has_args {
            return Ok(match name.as_str() {
                "Any" => TypeExpr::Any,
                "None" | "NoneType" => TypeExpr::None,
                "Self" => TypeExpr::SelfType,
                "list" | "List" => TypeExpr::list(TypeExpr::Any),
                "set" | "Set" => TypeExpr::set(TypeExpr::Any),
                "frozenset" | "FrozenSet" => TypeExpr::FrozenSet(Box::new(TypeExpr::Any)),
                "Sequence" => TypeExpr::Sequence(Box::new(TypeExpr::Any)),
                "dict" | "Dict" => TypeExpr::dict(TypeExpr::Any, TypeExpr::Any),
                "Mapping" => TypeExpr::Mapping(Box::new(TypeExpr::Any), Box::new(TypeExpr::Any)),
                "tuple" | "Tuple" => TypeExpr::var_tuple(TypeExpr::Any),
                other => match Prim::from_name(other) {
                    Some(prim) => TypeExpr::Prim(prim),
                    None => self.resolve_name(other),
                },
            });
        }

        self.expect(Token::LBracket)?;
        match name.as_str() {
            "Literal" => return Ok(TypeExpr::Literal(self.parse_literal_values()?)),
            "Annotated" => {
                let inner = self.parse_type()?;
                let mut metadata = Vec::new();
                loop {
                    match self.next() {
                        Some(Token::Comma) => metadata.push(self.parse_literal_value()?),
                        Some(Token::RBracket) => break,
                        other => return Err(self.error(&format!("expected ',' or ']', found {:?}", other))),
                    }
                }
                return Ok(TypeExpr::Annotated(Box::new(inner), metadata));
            }
            "tuple" | "Tuple" => return self.parse_tuple(),
            _ => {}
        }

        let args = self.parse_args()?;
        Ok(match name.as_str() {
            "list" | "List" => TypeExpr::List(self.one(&name, args)?),
            "set" | "Set" => TypeExpr::Set(self.one(&name, args)?),
            "frozenset" | "FrozenSet" => TypeExpr::FrozenSet(self.one(&name, args)?),
            "Sequence" => TypeExpr::Sequence(self.one(&name, args)?),
            "Optional" => TypeExpr::Optional(self.one(&name, args)?),
            "Union" => TypeExpr::Union(args),
            "dict" | "Dict" => {
                let (k, v) = self.two(&name, args)?;
                TypeExpr::Dict(k, v)
            }
            "Mapping" => {
                let (k, v) = self.two(&name, args)?;
                TypeExpr::Mapping(k, v)
            }
            other => match TypeTag::from_name(other) {
                Some(tag) => TypeExpr::Tagged(tag, self.one(other, args)?),
                None => TypeExpr::Generic(Box::new(self.resolve_name(other)), args),
            },
        })
    }

    fn parse_tuple(&mut self) -> Result<TypeExpr> {
        if self.peek() == Some(&Token::LParen) {
            self.next();
            self.expect(Token::RParen)?;
            self.expect(Token::RBracket)?;
            return Ok(TypeExpr::Tuple(Vec::new()));
        }
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(&Token::Ellipsis) {
                self.next();
                self.expect(Token::RBracket)?;
                if items.len() != 1 {
                    return Err(self.error("'...' is only allowed as tuple[T, ...]"));
                }
                return Ok(TypeExpr::VarTuple(Box::new(items.remove(0))));
            }
            items.push(self.parse_type()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBracket) => return Ok(TypeExpr::Tuple(items)),
                other => return Err(self.error(&format!("expected ',' or ']', found {:?}", other))),
            }
        }
    }

    fn resolve_name(&self, name: &str) -> TypeExpr {
        if let Some(namespace) = self.namespace {
            if let Some(class) = namespace.class(name) {
                return TypeExpr::Class(class.clone());
            }
        }
        TypeExpr::Named(name.to_string())
    }
}

fn parse_with(input: &str, namespace: Option<&Namespace>) -> Result<TypeExpr> {
    let mut parser = Parser {
        input,
        tokens: tokenize(input)?,
        pos: 0,
        namespace,
    };
    let expr = parser.parse_type()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("trailing input"));
    }
    Ok(expr)
}

impl TypeExpr {
    /// Parse the textual form, leaving unknown names as forward references
    pub fn parse(input: &str) -> Result<TypeExpr> {
        parse_with(input, None)
    }

    /// Parse the textual form, resolving class names through `namespace`
    pub fn parse_in(input: &str, namespace: &Namespace) -> Result<TypeExpr> {
        parse_with(input, Some(namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassDef;

    #[test]
    fn test_parse_containers() {
        let ty = TypeExpr::parse("Optional[dict[str, list[int]]]").unwrap();
        assert_eq!(
            ty,
            TypeExpr::optional(TypeExpr::dict(TypeExpr::str(), TypeExpr::list(TypeExpr::int())))
        );
    }

    #[test]
    fn test_parse_tuples() {
        assert_eq!(TypeExpr::parse("tuple[int, ...]").unwrap(), TypeExpr::var_tuple(TypeExpr::int()));
        assert_eq!(TypeExpr::parse("tuple[()]").unwrap(), TypeExpr::tuple(vec![]));
        assert_eq!(
            TypeExpr::parse("Tuple[int, str]").unwrap(),
            TypeExpr::tuple(vec![TypeExpr::int(), TypeExpr::str()])
        );
    }

    #[test]
    fn test_parse_pipe_union_and_literal() {
        assert_eq!(
            TypeExpr::parse("int | None").unwrap(),
            TypeExpr::union(vec![TypeExpr::int(), TypeExpr::None])
        );
        assert_eq!(
            TypeExpr::parse("Literal['a', 1, -2, True]").unwrap(),
            TypeExpr::literal(vec![Value::from("a"), Value::Int(1), Value::Int(-2), Value::Bool(true)])
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(TypeExpr::parse("Book").unwrap(), TypeExpr::named("Book"));
        let book = ClassDef::record("Book").build();
        let ns = Namespace::new().with(&book);
        assert_eq!(TypeExpr::parse_in("list[Book]", &ns).unwrap(), TypeExpr::list(TypeExpr::Class(book)));
    }

    #[test]
    fn test_parse_enum_literal() {
        let color = ClassDef::enumeration("Color").member("RED", 1).build();
        let ns = Namespace::new().with(&color);
        let ty = TypeExpr::parse_in("Literal[Color.RED]", &ns).unwrap();
        assert_eq!(ty, TypeExpr::literal(vec![color.member("RED").unwrap()]));
        assert!(TypeExpr::parse("Literal[Color.RED]").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(TypeExpr::parse("list[int").is_err());
        assert!(TypeExpr::parse("dict[int]").is_err());
        assert!(TypeExpr::parse("int]").is_err());
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            TypeExpr::parse("typing.Final[str]").unwrap(),
            TypeExpr::tagged(TypeTag::Final, TypeExpr::str())
        );
    }
}
