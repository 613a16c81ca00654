//! Whitespace / word / symbol tokenizer
//!
//! Tokens are maximal runs of a single character class. Concatenating
//! the tokens of a string reconstructs it exactly, which lets pattern
//! synthesis and merging work on tokens without losing bytes.

/// Character class of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind
{
    Whitespace,
    Word,
    Symbol,
}

impl TokenKind
{
    fn of(c: char) -> Self
    {
        if c.is_whitespace()
        {
            TokenKind::Whitespace
        }
        else if c.is_alphanumeric() || c == '_'
        {
            TokenKind::Word
        }
        else
        {
            TokenKind::Symbol
        }
    }
}

/// A borrowed token; equality compares text only
#[derive(Debug, Clone, Copy, Eq, Hash)]
pub struct Token<'a>
{
    pub kind: TokenKind,
    pub text: &'a str,
}

impl PartialEq for Token<'_>
{
    fn eq(
        &self,
        other: &Self,
    ) -> bool
    {
        self.text == other.text
    }
}

impl Token<'_>
{
    pub fn is_whitespace(&self) -> bool
    {
        self.kind == TokenKind::Whitespace
    }
}

/// Split `input` into class runs, left to right
pub fn tokenize(input: &str) -> Vec<Token<'_>>
{
    let mut tokens = Vec::new();
    let mut chars = input.char_indices();

    let Some((_, first)) = chars.next()
    else
    {
        return tokens;
    };

    let mut start = 0usize;
    let mut kind = TokenKind::of(first);

    for (idx, c) in chars
    {
        let next = TokenKind::of(c);
        if next != kind
        {
            tokens.push(Token { kind, text: &input[start..idx] });
            start = idx;
            kind = next;
        }
    }

    tokens.push(Token { kind, text: &input[start..] });
    tokens
}
