//! Line tokenizer.
//!
//! A line is cut on spaces, commas and quotes, but only outside of
//! `[]`, `()` and `<>`. Each top-level encloser becomes a single token whose
//! inside is tokenized again, so parsers can walk nested operand lists
//! without re-scanning text. Braces are not enclosers (function bodies
//! open a `{` that closes many lines later); a `}` instead folds the tokens
//! since its `{` into one brace group.

use crate::error::{FrontendError, Result};
use crate::types;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encloser {
    Bracket,
    Paren,
    Angle,
    Brace,
}

impl Encloser {
    fn opened_by(ch: char) -> Option<Encloser> {
        match ch {
            '[' => Some(Encloser::Bracket),
            '(' => Some(Encloser::Paren),
            '<' => Some(Encloser::Angle),
            _ => None,
        }
    }

    fn closed_by(ch: char) -> Option<Encloser> {
        match ch {
            ']' => Some(Encloser::Bracket),
            ')' => Some(Encloser::Paren),
            '>' => Some(Encloser::Angle),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            Encloser::Bracket => 0,
            Encloser::Paren => 1,
            Encloser::Angle | Encloser::Brace => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub encloser: Encloser,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

impl Token {
    pub fn atom(text: impl Into<String>) -> Token {
        Token {
            text: text.into(),
            group: None,
        }
    }

    pub fn separator() -> Token {
        Token::atom(",")
    }

    fn brace(tokens: Vec<Token>, suffix: &str) -> Token {
        let text = if tokens.is_empty() {
            format!("{{ }}{}", suffix)
        } else {
            format!("{{ {} }}{}", render(&tokens), suffix)
        };
        Token {
            text,
            group: Some(Group {
                encloser: Encloser::Brace,
                tokens,
            }),
        }
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_separator(&self) -> bool {
        self.group.is_none() && self.text == ","
    }

    pub fn encloser(&self) -> Option<Encloser> {
        self.group.as_ref().map(|g| g.encloser)
    }

    pub fn inner(&self) -> Option<&[Token]> {
        self.group.as_ref().map(|g| g.tokens.as_slice())
    }
}

/// Joins token texts back into source-like text (`a b, c`).
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if token.is_separator() {
            out.push(',');
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&token.text);
    }
    out
}

/// Splits on separator tokens only. An empty list yields no segments.
pub fn split_commas(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    tokens.split(|t| t.is_separator()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indent {
    TopLevel,
    Statement,
    /// Right-hand side of an assignment; never produced from source text.
    Continuation,
    Other(usize),
}

impl Indent {
    pub fn from_spaces(spaces: usize) -> Indent {
        match spaces {
            0 => Indent::TopLevel,
            2 => Indent::Statement,
            n => Indent::Other(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedLine {
    pub text: String,
    pub line_num: usize,
    pub indent: Indent,
    pub tokens: Vec<Token>,
}

pub fn tokenize_line(text: &str, line_num: usize) -> Result<TokenizedLine> {
    let tokens = tokenize(text, line_num)?;
    let spaces = text.len() - text.trim_start_matches(' ').len();
    Ok(TokenizedLine {
        text: text.trim().to_string(),
        line_num,
        indent: Indent::from_spaces(spaces),
        tokens,
    })
}

pub fn tokenize(text: &str, line_num: usize) -> Result<Vec<Token>> {
    match tokenize_strict(text, line_num) {
        Ok(tokens) => Ok(tokens),
        // free text after `;` may hold stray brackets or quotes
        Err(err) => match comment_offset(text) {
            Some(at) => {
                let mut tokens = tokenize_strict(&text[..at], line_num)?;
                tokens.push(Token::atom(";"));
                tokens.extend(text[at + 1..].split_whitespace().map(Token::atom));
                Ok(tokens)
            }
            None => Err(err),
        },
    }
}

fn tokenize_strict(text: &str, line_num: usize) -> Result<Vec<Token>> {
    let mut tokenizer = Tokenizer {
        line_num,
        tokens: Vec::new(),
        current: String::new(),
        quoted: false,
        depth: [0; 3],
        total: 0,
    };
    tokenizer.run(text)?;
    Ok(tokenizer.tokens)
}

/// Byte offset of the first `;` outside quotes and enclosers.
fn comment_offset(text: &str) -> Option<usize> {
    let mut quoted = false;
    let mut depth = 0usize;
    for (at, ch) in text.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            _ if quoted => {}
            ';' if depth == 0 => return Some(at),
            _ if Encloser::opened_by(ch).is_some() => depth += 1,
            _ if Encloser::closed_by(ch).is_some() => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

struct Tokenizer {
    line_num: usize,
    tokens: Vec<Token>,
    current: String,
    quoted: bool,
    depth: [usize; 3],
    total: usize,
}

impl Tokenizer {
    fn run(&mut self, text: &str) -> Result<()> {
        for ch in text.chars() {
            match ch {
                ' ' | '\t' => {
                    if self.total == 0 && !self.quoted {
                        self.flush()?;
                    } else {
                        self.current.push(ch);
                    }
                }
                '"' => {
                    if self.total == 0 {
                        if !self.quoted {
                            if self.current != "@" && self.current != "%" {
                                self.flush()?;
                            }
                            self.current.push('"');
                        } else {
                            self.current.push('"');
                            self.flush()?;
                        }
                    } else {
                        self.current.push('"');
                    }
                    self.quoted = !self.quoted;
                }
                ',' => {
                    if self.total == 0 && !self.quoted {
                        self.flush()?;
                        self.tokens.push(Token::separator());
                    } else {
                        self.current.push(',');
                    }
                }
                _ if self.quoted => self.current.push(ch),
                _ => {
                    if let Some(encloser) = Encloser::opened_by(ch) {
                        if self.total == 0 {
                            self.flush()?;
                        }
                        self.current.push(ch);
                        self.depth[encloser.slot()] += 1;
                        self.total += 1;
                    } else if let Some(encloser) = Encloser::closed_by(ch) {
                        let slot = encloser.slot();
                        if self.depth[slot] == 0 {
                            return Err(FrontendError::invariant(
                                self.line_num,
                                format!("unbalanced '{}' in: {}", ch, text.trim()),
                            ));
                        }
                        self.depth[slot] -= 1;
                        self.total -= 1;
                        self.current.push(ch);
                        if self.total == 0 {
                            self.flush()?;
                        }
                    } else {
                        self.current.push(ch);
                    }
                }
            }
        }
        if self.total != 0 {
            return Err(FrontendError::invariant(
                self.line_num,
                format!("unclosed encloser in: {}", text.trim()),
            ));
        }
        if self.quoted {
            return Err(FrontendError::invariant(
                self.line_num,
                format!("unterminated string in: {}", text.trim()),
            ));
        }
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        let text = std::mem::take(&mut self.current);
        self.make_token(text)
    }

    fn last_mergeable(&mut self) -> Option<&mut Token> {
        self.tokens.last_mut().filter(|t| !t.is_separator())
    }

    fn make_token(&mut self, text: String) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        if let Some(last) = self.last_mergeable() {
            let quoted_name = (last.is("%") || last.is("@")) && text.starts_with('"');
            let stars = text.chars().all(|c| c == '*');
            if quoted_name || stars {
                last.text.push_str(&text);
                return Ok(());
            }
        }

        let token = match text.chars().next().and_then(Encloser::opened_by) {
            Some(encloser) => {
                let inner = tokenize(&text[1..text.len() - 1], self.line_num)?;
                Token {
                    text,
                    group: Some(Group {
                        encloser,
                        tokens: inner,
                    }),
                }
            }
            None => Token::atom(text),
        };

        // `i32 (i8*)*` stays one type
        if let Some(last) = self.last_mergeable() {
            if types::is_type(&last.text) && is_function_def(&token) {
                last.text.push(' ');
                last.text.push_str(&token.text);
                return Ok(());
            }
        }

        if token.group.is_none() {
            let unstarred = token.text.trim_end_matches('*');
            if unstarred.ends_with('}') {
                let open = self
                    .tokens
                    .iter()
                    .rposition(|t| t.group.is_none() && t.is("{"));
                if let Some(open) = open {
                    let mut inner = self.tokens.split_off(open + 1);
                    self.tokens.pop();
                    let head = &unstarred[..unstarred.len() - 1];
                    if !head.is_empty() {
                        inner.push(Token::atom(head));
                    }
                    let suffix = &token.text[unstarred.len()..];
                    self.tokens.push(Token::brace(inner, suffix));
                    return Ok(());
                }
            }
        }

        self.tokens.push(token);
        Ok(())
    }
}

/// A parenthesized list of bare types, e.g. the `(i8*, ...)` of a
/// function pointer type.
fn is_function_def(token: &Token) -> bool {
    let bare = types::remove_all_pointing(&token.text);
    if !bare.starts_with('(') || !bare.ends_with(')') {
        return false;
    }
    if bare == "()" || bare == "(...)" {
        return true;
    }
    let Some(inner) = token.inner() else {
        return false;
    };
    split_commas(inner)
        .iter()
        .all(|seg| seg.len() == 1 && (types::is_type(&seg[0].text) || seg[0].is("...")))
}
