// Copyright 2025 Sqlweave Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Expression lexer
//!
//! Converts expression text into tokens. Works on a char buffer so that
//! positions are character based.

use super::token::{is_keyword, Position, Token, TokenType};

/// Lexer for the expression language
pub struct Lexer {
    input: Vec<char>,
    /// Index of the current character
    position: usize,
    /// Index of the next character
    read_position: usize,
    /// Current character, '\0' at end of input
    ch: char,
    pos: Position,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer {
            input: input.chars().collect(),
            position: 0,
            read_position: 0,
            ch: '\0',
            pos: Position::new(0, 0),
        };
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) {
        if self.read_position >= self.input.len() {
            self.ch = '\0';
            self.position = self.input.len();
        } else {
            self.ch = self.input[self.read_position];
            self.position = self.read_position;
        }
        self.read_position += 1;
        self.pos = Position::new(self.position, self.position + 1);
    }

    fn peek_char(&self) -> char {
        if self.read_position >= self.input.len() {
            '\0'
        } else {
            self.input[self.read_position]
        }
    }

    /// Produce the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let pos = self.pos;

        match self.ch {
            '\0' => Token::eof(pos),

            '\'' | '"' => match self.read_string_literal(self.ch) {
                Ok(literal) => Token::new(TokenType::String, literal, pos),
                Err(message) => Token::new(TokenType::Error, message, pos),
            },

            c if c.is_ascii_digit() => {
                let literal = self.read_number();
                if literal.contains('.') || literal.contains('e') || literal.contains('E') {
                    Token::new(TokenType::Float, literal, pos)
                } else {
                    Token::new(TokenType::Integer, literal, pos)
                }
            }

            c if c.is_alphabetic() || c == '_' || c == '$' || c == '#' => {
                let literal = self.read_identifier();
                if is_keyword(&literal) {
                    Token::new(TokenType::Keyword, literal, pos)
                } else {
                    Token::new(TokenType::Identifier, literal, pos)
                }
            }

            '(' | ')' | '[' | ']' | '{' | '}' | '.' | ',' => {
                let literal = self.ch.to_string();
                self.read_char();
                Token::new(TokenType::Punctuator, literal, pos)
            }

            _ => {
                let literal = self.read_operator();
                match literal.as_str() {
                    "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" | "!" | "+" | "-"
                    | "*" | "/" | "%" | "?" | ":" => Token::new(TokenType::Operator, literal, pos),
                    _ => Token::new(
                        TokenType::Error,
                        format!("unexpected character '{}'", literal),
                        pos,
                    ),
                }
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.ch.is_whitespace() {
            self.read_char();
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        result.push(self.ch);
        self.read_char();

        while self.ch.is_alphanumeric() || self.ch == '_' || self.ch == '$' {
            result.push(self.ch);
            self.read_char();
        }

        result
    }

    fn read_number(&mut self) -> String {
        let mut result = String::new();
        while self.ch.is_ascii_digit() {
            result.push(self.ch);
            self.read_char();
        }

        if self.ch == '.' && self.peek_char().is_ascii_digit() {
            result.push(self.ch);
            self.read_char();
            while self.ch.is_ascii_digit() {
                result.push(self.ch);
                self.read_char();
            }
        }

        if (self.ch == 'e' || self.ch == 'E')
            && (self.peek_char().is_ascii_digit() || self.peek_char() == '-')
        {
            result.push(self.ch);
            self.read_char();
            if self.ch == '-' {
                result.push(self.ch);
                self.read_char();
            }
            while self.ch.is_ascii_digit() {
                result.push(self.ch);
                self.read_char();
            }
        }

        // Typed numeric suffixes such as 10L or 2.5f
        if matches!(self.ch, 'L' | 'l' | 'D' | 'd' | 'F' | 'f')
            && !self.peek_char().is_alphanumeric()
        {
            if matches!(self.ch, 'D' | 'd' | 'F' | 'f') && !result.contains('.') {
                result.push_str(".0");
            }
            self.read_char();
        }

        result
    }

    fn read_string_literal(&mut self, quote: char) -> Result<String, String> {
        let mut result = String::new();
        self.read_char(); // opening quote

        loop {
            match self.ch {
                '\0' => return Err("unterminated string literal".to_string()),
                '\\' => {
                    self.read_char();
                    let escaped = match self.ch {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\0' => return Err("unterminated string literal".to_string()),
                        other => other,
                    };
                    result.push(escaped);
                    self.read_char();
                }
                c if c == quote => {
                    self.read_char(); // closing quote
                    return Ok(result);
                }
                c => {
                    result.push(c);
                    self.read_char();
                }
            }
        }
    }

    fn read_operator(&mut self) -> String {
        let first = self.ch;
        self.read_char();
        let two = format!("{}{}", first, self.ch);
        if matches!(two.as_str(), "==" | "!=" | "<=" | ">=" | "&&" | "||") {
            self.read_char();
            return two;
        }
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<(TokenType, String)> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            if tok.token_type == TokenType::Eof {
                break;
            }
            out.push((tok.token_type, tok.literal));
        }
        out
    }

    #[test]
    fn test_simple_condition() {
        let toks = tokens("name != null and age >= 18");
        assert_eq!(
            toks,
            vec![
                (TokenType::Identifier, "name".into()),
                (TokenType::Operator, "!=".into()),
                (TokenType::Keyword, "null".into()),
                (TokenType::Keyword, "and".into()),
                (TokenType::Identifier, "age".into()),
                (TokenType::Operator, ">=".into()),
                (TokenType::Integer, "18".into()),
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        let toks = tokens(r#"'it\'s' "two""#);
        assert_eq!(toks[0], (TokenType::String, "it's".into()));
        assert_eq!(toks[1], (TokenType::String, "two".into()));
    }

    #[test]
    fn test_numbers() {
        let toks = tokens("1 2.5 3L 4d 1e3");
        assert_eq!(toks[0], (TokenType::Integer, "1".into()));
        assert_eq!(toks[1], (TokenType::Float, "2.5".into()));
        assert_eq!(toks[2], (TokenType::Integer, "3".into()));
        assert_eq!(toks[3], (TokenType::Float, "4.0".into()));
        assert_eq!(toks[4], (TokenType::Float, "1e3".into()));
    }

    #[test]
    fn test_paths_and_calls() {
        let toks = tokens("list.size() > 0 && map['k'][0]");
        let literals: Vec<&str> = toks.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(
            literals,
            vec!["list", ".", "size", "(", ")", ">", "0", "&&", "map", "[", "k", "]", "[", "0", "]"]
        );
    }

    #[test]
    fn test_error_tokens() {
        let toks = tokens("a = b");
        assert_eq!(toks[1].0, TokenType::Error);
        let toks = tokens("'open");
        assert_eq!(toks[0].0, TokenType::Error);
    }

    #[test]
    fn test_position_tracking() {
        let mut lexer = Lexer::new("ab  cd");
        assert_eq!(lexer.next_token().position.column, 1);
        assert_eq!(lexer.next_token().position.column, 5);
    }
}
