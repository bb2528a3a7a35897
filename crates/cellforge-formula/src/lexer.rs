//! Formula lexer
//!
//! Turns formula text into a flat, ordered sequence of typed [`Token`]s in a
//! single pass. The lexer never fails: anything it cannot classify becomes a
//! bare [`TokenKind::Text`] token, which the evaluator rejects later.

use cellforge_core::CellError;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("static pattern")
});

static CELL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$?[A-Z]+\$?\d+$").expect("static pattern"));

static RANGE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$?[A-Z]+\$?\d+:\$?[A-Z]+\$?\d+$").expect("static pattern")
});

static FUNCTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_.]*$").expect("static pattern"));

/// Characters that end an unrecognised text run
const TEXT_TERMINATORS: &str = "()+-*/^&=<>%,;";

/// Kind of a formula token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Numeric literal (`3`, `-1.5`, `2E-3`)
    Number,
    /// Quoted string literal, or an unrecognised bare run
    Text,
    /// `TRUE` / `FALSE`
    Logical,
    /// Single cell reference (`A1`, `$B$2`)
    CellRef,
    /// Rectangular range reference (`A1:B10`)
    RangeRef,
    /// Function name, upper-cased, always followed by `(`
    FunctionName,
    /// `+ - * / ^ & = <> < > <= >= %`
    Operator,
    /// `(`
    GroupOpen,
    /// `)`
    GroupClose,
    /// `,` or `;`
    ArgSeparator,
    /// Built-in error value (`#DIV/0!`, `#N/A`, ...)
    ErrorLiteral,
}

/// A single formula token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text; quoted literals keep their quotes, names and
    /// references are upper-cased
    pub text: String,
}

impl Token {
    fn new<S: Into<String>>(kind: TokenKind, text: S) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Whether this is a quoted string literal (as opposed to a bare run)
    pub fn is_quoted(&self) -> bool {
        self.kind == TokenKind::Text
            && matches!(self.text.chars().next(), Some('"') | Some('\''))
    }

    /// Content of a quoted literal with the doubled-quote escapes removed
    ///
    /// Returns `None` for bare text runs and non-text tokens.
    pub fn string_value(&self) -> Option<String> {
        if !self.is_quoted() {
            return None;
        }
        let quote = self.text.chars().next()?;
        let inner = &self.text[quote.len_utf8()..];
        let inner = inner.strip_suffix(quote).unwrap_or(inner);
        let doubled: String = [quote, quote].iter().collect();
        Some(inner.replace(&doubled, &quote.to_string()))
    }

    /// Error value of an [`TokenKind::ErrorLiteral`] token
    pub fn error_value(&self) -> Option<CellError> {
        match self.kind {
            TokenKind::ErrorLiteral => CellError::from_str(&self.text),
            _ => None,
        }
    }
}

/// Tokenize a formula (the leading `=` is optional)
///
/// Blank input yields an empty sequence.
///
/// # Example
/// ```
/// use cellforge_formula::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize("=3-4");
/// let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Operator, TokenKind::Number]);
/// ```
pub fn tokenize(formula: &str) -> Vec<Token> {
    let formula = formula.trim();
    let formula = formula.strip_prefix('=').unwrap_or(formula);

    let mut lexer = Lexer {
        input: formula,
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) {
        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }

            let matched = self.try_string()
                || self.try_number()
                || self.try_operator()
                || self.try_function()
                || self.try_reference()
                || self.try_error()
                || self.try_parenthesis()
                || self.try_separator();

            if !matched {
                self.consume_text();
            }
        }
    }

    fn try_string(&mut self) -> bool {
        let quote = match self.peek_char() {
            Some(c @ ('"' | '\'')) => c,
            _ => return false,
        };

        let start = self.pos;
        self.advance();
        while let Some(c) = self.peek_char() {
            self.advance();
            if c == quote {
                if self.peek_char() == Some(quote) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.push(TokenKind::Text, self.slice_from(start));
        true
    }

    fn try_number(&mut self) -> bool {
        let start = self.pos;

        if self.peek_char() == Some('-') {
            let negation_allowed = match self.tokens.last() {
                None => true,
                // Postfix `%` closes an operand
                Some(t) => match t.kind {
                    TokenKind::Operator => t.text != "%",
                    TokenKind::GroupOpen | TokenKind::ArgSeparator => true,
                    _ => false,
                },
            };
            if !negation_allowed {
                return false;
            }
            self.advance();
        }

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '.' {
                self.advance();
            } else if (c == 'e' || c == 'E')
                && self.input[start..self.pos]
                    .chars()
                    .last()
                    .map_or(false, |p| p.is_ascii_digit())
            {
                self.advance();
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.advance();
                }
            } else {
                break;
            }
        }

        let text = self.slice_from(start);
        if !text.is_empty() && NUMBER.is_match(text) {
            self.push(TokenKind::Number, text);
            true
        } else {
            self.pos = start;
            false
        }
    }

    fn try_operator(&mut self) -> bool {
        let c = match self.peek_char() {
            Some(c) if "+-*/^&=<>%".contains(c) => c,
            _ => return false,
        };

        let two = match (c, self.peek_char_at(1)) {
            ('<', Some('>')) => Some("<>"),
            ('<', Some('=')) => Some("<="),
            ('>', Some('=')) => Some(">="),
            _ => None,
        };

        match two {
            Some(op) => {
                self.advance();
                self.advance();
                self.push(TokenKind::Operator, op);
            }
            None => {
                self.advance();
                self.push(TokenKind::Operator, c.to_string());
            }
        }
        true
    }

    fn try_function(&mut self) -> bool {
        let start = self.pos;
        match self.peek_char() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return false,
        }

        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.advance();
        }
        let name = self.input[start..self.pos].to_uppercase();

        self.skip_whitespace();
        if self.peek_char() == Some('(') && FUNCTION_NAME.is_match(&name) {
            self.push(TokenKind::FunctionName, name);
            return true;
        }

        self.pos = start;
        false
    }

    fn try_reference(&mut self) -> bool {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '$' || c == ':')
        {
            self.advance();
        }

        let text = self.input[start..self.pos].to_uppercase();
        if !text.is_empty() {
            if text.contains(':') && RANGE_REF.is_match(&text) {
                self.push(TokenKind::RangeRef, text);
                return true;
            }
            if CELL_REF.is_match(&text) {
                self.push(TokenKind::CellRef, text);
                return true;
            }
            if text == "TRUE" || text == "FALSE" {
                self.push(TokenKind::Logical, text);
                return true;
            }
        }

        self.pos = start;
        false
    }

    fn try_error(&mut self) -> bool {
        if self.peek_char() != Some('#') {
            return false;
        }

        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || "#!/?".contains(c))
        {
            self.advance();
        }

        let text = self.slice_from(start);
        if CellError::ALL.iter().any(|e| e.as_str() == text) {
            self.push(TokenKind::ErrorLiteral, text);
            true
        } else {
            self.pos = start;
            false
        }
    }

    fn try_parenthesis(&mut self) -> bool {
        let kind = match self.peek_char() {
            Some('(') => TokenKind::GroupOpen,
            Some(')') => TokenKind::GroupClose,
            _ => return false,
        };
        let start = self.pos;
        self.advance();
        self.push(kind, self.slice_from(start));
        true
    }

    fn try_separator(&mut self) -> bool {
        match self.peek_char() {
            Some(c @ (',' | ';')) => {
                self.advance();
                self.push(TokenKind::ArgSeparator, c.to_string());
                true
            }
            _ => false,
        }
    }

    fn consume_text(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || TEXT_TERMINATORS.contains(c) {
                break;
            }
            self.advance();
        }
        // Always make progress, even on a lone terminator the other rules refused
        if self.pos == start {
            self.advance();
        }
        self.push(TokenKind::Text, self.slice_from(start));
    }

    // === Scanner helpers ===

    fn push<S: Into<String>>(&mut self, kind: TokenKind, text: S) {
        self.tokens.push(Token::new(kind, text));
    }

    /// Input consumed since `start`
    fn slice_from(&self, start: usize) -> &'a str {
        let input: &'a str = self.input;
        &input[start..self.pos]
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(formula: &str) -> Vec<TokenKind> {
        tokenize(formula).iter().map(|t| t.kind).collect()
    }

    fn texts(formula: &str) -> Vec<String> {
        tokenize(formula).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_blank_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("=").is_empty());
    }

    #[test]
    fn test_subtraction_is_not_a_negative_literal() {
        assert_eq!(texts("3-4"), vec!["3", "-", "4"]);
        assert_eq!(texts("A1-4"), vec!["A1", "-", "4"]);
        assert_eq!(texts("(1)-2"), vec!["(", "1", ")", "-", "2"]);
    }

    #[test]
    fn test_negative_literal_positions() {
        assert_eq!(texts("-4"), vec!["-4"]);
        assert_eq!(texts("2*-4"), vec!["2", "*", "-4"]);
        assert_eq!(texts("(-4)"), vec!["(", "-4", ")"]);
        assert_eq!(texts("SUM(1,-4)"), vec!["SUM", "(", "1", ",", "-4", ")"]);
        assert_eq!(texts("50%-2"), vec!["50", "%", "-", "2"]);
        assert_eq!(texts("50%*-2"), vec!["50", "%", "*", "-2"]);
        // Not followed by a digit: stays an operator
        assert_eq!(kinds("-A1"), vec![TokenKind::Operator, TokenKind::CellRef]);
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(texts("1.5E-3"), vec!["1.5E-3"]);
        assert_eq!(texts(".5"), vec![".5"]);
        assert_eq!(kinds("1.2.3"), vec![TokenKind::Text]);
    }

    #[test]
    fn test_strings() {
        let tokens = tokenize(r#"="say ""hi""" & 'x'"#);
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].string_value().as_deref(), Some(r#"say "hi""#));
        assert_eq!(tokens[1].text, "&");
        assert_eq!(tokens[2].string_value().as_deref(), Some("x"));
    }

    #[test]
    fn test_functions_and_references() {
        let tokens = tokenize("=sum (a1:$B$10) + c3");
        assert_eq!(
            kinds("=sum (a1:$B$10) + c3"),
            vec![
                TokenKind::FunctionName,
                TokenKind::GroupOpen,
                TokenKind::RangeRef,
                TokenKind::GroupClose,
                TokenKind::Operator,
                TokenKind::CellRef,
            ]
        );
        assert_eq!(tokens[0].text, "SUM");
        assert_eq!(tokens[2].text, "A1:$B$10");
        assert_eq!(tokens[5].text, "C3");
    }

    #[test]
    fn test_logicals_and_errors() {
        assert_eq!(
            kinds("TRUE,false,#N/A,#DIV/0!"),
            vec![
                TokenKind::Logical,
                TokenKind::ArgSeparator,
                TokenKind::Logical,
                TokenKind::ArgSeparator,
                TokenKind::ErrorLiteral,
                TokenKind::ArgSeparator,
                TokenKind::ErrorLiteral,
            ]
        );
        assert_eq!(tokenize("#N/A")[0].error_value(), Some(CellError::Na));
        // Not in the vocabulary: becomes bare text
        assert_eq!(kinds("#BOGUS!"), vec![TokenKind::Text]);
    }

    #[test]
    fn test_multi_char_operators() {
        assert_eq!(texts("1<>2"), vec!["1", "<>", "2"]);
        assert_eq!(texts("1<=2"), vec!["1", "<=", "2"]);
        assert_eq!(texts("1>=2"), vec!["1", ">=", "2"]);
        assert_eq!(texts("50%"), vec!["50", "%"]);
    }

    #[test]
    fn test_unrecognised_runs_are_bare_text() {
        let tokens = tokenize("=hello world");
        assert_eq!(kinds("=hello world"), vec![TokenKind::Text, TokenKind::Text]);
        assert!(!tokens[0].is_quoted());
        assert_eq!(tokens[0].string_value(), None);
    }
}
