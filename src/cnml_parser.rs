use std::collections::HashMap;
use std::fs;
use std::path::Path;
use color_eyre::eyre::{eyre, Result, WrapErr};

/// A parsed CNML element: tag name, attributes, and nested elements.
///
/// CNML carries all of its data in attributes; text content between tags is
/// not meaningful and is discarded during lexing.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<Element>,
}

impl Element {
    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Collect all descendant elements with the given tag name, in document
    /// order. CNML nests `device`/`radio` elements between nodes and their
    /// interfaces, so lookups search the whole subtree rather than direct
    /// children only.
    pub fn descendants(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }
}

/// Token types for CNML parsing
#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// `<name`, leaving the lexer in tag mode until `>` or `/>`
    OpenTag(String),
    /// `</name>`, fully consumed
    CloseTag(String),
    /// `>` ending an opening tag
    TagEnd,
    /// `/>` ending a childless element
    TagSelfClose,
    /// Attribute name inside a tag
    Identifier(String),
    Equals,
    /// Quoted attribute value with entities decoded
    Value(String),
    Eof,
}

/// Simple lexer for the XML subset CNML documents use
struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
    in_tag: bool,
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':')
}

impl Lexer {
    fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();
        Self {
            input: chars,
            position: 0,
            current_char,
            in_tag: false,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_name(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char {
            if is_name_char(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Read a quoted attribute value, decoding entity references
    fn read_quoted(&mut self) -> Result<String> {
        let quote = match self.current_char {
            Some(ch @ ('"' | '\'')) => ch,
            _ => return Err(eyre!("Expected a quoted attribute value")),
        };
        self.advance(); // Skip opening quote

        let mut result = String::new();
        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance(); // Skip closing quote
                return Ok(result);
            }
            if ch == '&' {
                result.push_str(&self.read_entity()?);
            } else {
                result.push(ch);
                self.advance();
            }
        }

        Err(eyre!("Unterminated attribute value"))
    }

    /// Decode an entity reference. The five predefined entities and numeric
    /// character references are decoded; unknown names are kept literally.
    fn read_entity(&mut self) -> Result<String> {
        self.advance(); // Skip '&'
        let mut name = String::new();
        let mut terminated = false;
        while let Some(ch) = self.current_char {
            if ch == ';' {
                self.advance();
                terminated = true;
                break;
            }
            if !ch.is_ascii_alphanumeric() && ch != '#' {
                break;
            }
            name.push(ch);
            self.advance();
        }
        if !terminated {
            return Err(eyre!("Unterminated entity reference '&{}'", name));
        }

        let decoded = if let Some(num) = name.strip_prefix('#') {
            let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
                u32::from_str_radix(hex, 16).ok()
            } else {
                num.parse::<u32>().ok()
            };
            match code.and_then(char::from_u32) {
                Some(ch) => ch.to_string(),
                None => format!("&{};", name),
            }
        } else {
            match name.as_str() {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => format!("&{};", name),
            }
        };
        Ok(decoded)
    }

    /// Skip a `<?...?>` processing instruction (the XML prolog)
    fn skip_processing_instruction(&mut self) -> Result<()> {
        self.advance(); // Skip '?'
        while self.current_char.is_some() {
            if self.current_char == Some('?') && self.peek() == Some('>') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }
        Err(eyre!("Unterminated processing instruction"))
    }

    /// Skip a `<!...>` markup declaration: comments and DOCTYPE
    fn skip_declaration(&mut self) -> Result<()> {
        self.advance(); // Skip '!'
        if self.current_char == Some('-') && self.peek() == Some('-') {
            self.advance();
            self.advance();
            while self.current_char.is_some() {
                if self.current_char == Some('-') && self.peek() == Some('-') {
                    self.advance();
                    self.advance();
                    if self.current_char == Some('>') {
                        self.advance();
                        return Ok(());
                    }
                } else {
                    self.advance();
                }
            }
            Err(eyre!("Unterminated comment"))
        } else {
            while let Some(ch) = self.current_char {
                self.advance();
                if ch == '>' {
                    return Ok(());
                }
            }
            Err(eyre!("Unterminated markup declaration"))
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        loop {
            if self.in_tag {
                self.skip_whitespace();
                match self.current_char {
                    None => return Err(eyre!("Unexpected end of input inside a tag")),
                    Some('>') => {
                        self.advance();
                        self.in_tag = false;
                        return Ok(Token::TagEnd);
                    }
                    Some('/') => {
                        self.advance();
                        if self.current_char == Some('>') {
                            self.advance();
                            self.in_tag = false;
                            return Ok(Token::TagSelfClose);
                        }
                        return Err(eyre!("Expected '>' after '/' in tag"));
                    }
                    Some('=') => {
                        self.advance();
                        return Ok(Token::Equals);
                    }
                    Some('"') | Some('\'') => {
                        let value = self.read_quoted()?;
                        return Ok(Token::Value(value));
                    }
                    Some(ch) if is_name_char(ch) => {
                        return Ok(Token::Identifier(self.read_name()));
                    }
                    Some(ch) => return Err(eyre!("Unexpected character '{}' inside a tag", ch)),
                }
            }

            // Between tags: text content carries no CNML data, skip to markup
            while let Some(ch) = self.current_char {
                if ch == '<' {
                    break;
                }
                self.advance();
            }
            if self.current_char.is_none() {
                return Ok(Token::Eof);
            }
            self.advance(); // Skip '<'
            match self.current_char {
                Some('?') => self.skip_processing_instruction()?,
                Some('!') => self.skip_declaration()?,
                Some('/') => {
                    self.advance();
                    let name = self.read_name();
                    if name.is_empty() {
                        return Err(eyre!("Missing element name in closing tag"));
                    }
                    self.skip_whitespace();
                    if self.current_char != Some('>') {
                        return Err(eyre!("Expected '>' to end closing tag </{}>", name));
                    }
                    self.advance();
                    return Ok(Token::CloseTag(name));
                }
                Some(ch) if is_name_char(ch) => {
                    let name = self.read_name();
                    self.in_tag = true;
                    return Ok(Token::OpenTag(name));
                }
                _ => return Err(eyre!("Malformed markup after '<'")),
            }
        }
    }
}

/// Parser for CNML documents
struct Parser {
    lexer: Lexer,
    current_token: Token,
}

impl Parser {
    fn new(mut lexer: Lexer) -> Result<Self> {
        let current_token = lexer.next_token()?;
        Ok(Self {
            lexer,
            current_token,
        })
    }

    fn advance(&mut self) -> Result<()> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn parse_document(&mut self) -> Result<Element> {
        let root = match &self.current_token {
            Token::OpenTag(_) => self.parse_element()?,
            Token::Eof => return Err(eyre!("Document contains no elements")),
            other => {
                return Err(eyre!(
                    "Expected an opening tag at document start, found {:?}",
                    other
                ))
            }
        };
        match &self.current_token {
            Token::Eof => Ok(root),
            other => Err(eyre!("Trailing content after document element: {:?}", other)),
        }
    }

    fn parse_element(&mut self) -> Result<Element> {
        let name = match &self.current_token {
            Token::OpenTag(name) => name.clone(),
            other => return Err(eyre!("Expected an opening tag, found {:?}", other)),
        };
        self.advance()?;

        let mut attributes = HashMap::new();
        loop {
            match &self.current_token {
                Token::Identifier(key) => {
                    let key = key.clone();
                    self.advance()?;
                    match &self.current_token {
                        Token::Equals => self.advance()?,
                        other => {
                            return Err(eyre!(
                                "Expected '=' after attribute '{}' in <{}>, found {:?}",
                                key,
                                name,
                                other
                            ))
                        }
                    }
                    match &self.current_token {
                        Token::Value(value) => {
                            attributes.insert(key, value.clone());
                            self.advance()?;
                        }
                        other => {
                            return Err(eyre!(
                                "Expected quoted value for attribute '{}' in <{}>, found {:?}",
                                key,
                                name,
                                other
                            ))
                        }
                    }
                }
                Token::TagSelfClose => {
                    self.advance()?;
                    return Ok(Element {
                        name,
                        attributes,
                        children: Vec::new(),
                    });
                }
                Token::TagEnd => {
                    self.advance()?;
                    break;
                }
                other => return Err(eyre!("Unexpected {:?} inside <{}>", other, name)),
            }
        }

        let mut children = Vec::new();
        loop {
            match &self.current_token {
                Token::OpenTag(_) => children.push(self.parse_element()?),
                Token::CloseTag(close) => {
                    if *close != name {
                        return Err(eyre!(
                            "Mismatched closing tag: expected </{}>, found </{}>",
                            name,
                            close
                        ));
                    }
                    self.advance()?;
                    return Ok(Element {
                        name,
                        attributes,
                        children,
                    });
                }
                Token::Eof => return Err(eyre!("Unexpected end of input inside <{}>", name)),
                other => return Err(eyre!("Unexpected {:?} inside <{}>", other, name)),
            }
        }
    }
}

/// Parse a CNML document from a string and return its root element
pub fn parse_str(content: &str) -> Result<Element> {
    let lexer = Lexer::new(content);
    let mut parser = Parser::new(lexer)?;
    parser.parse_document()
}

/// Parse a CNML file and return its root element
pub fn parse_file(path: &Path) -> Result<Element> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read CNML file '{}'", path.display()))?;
    parse_str(&content)
}
