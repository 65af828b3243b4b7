//! Glob patterns as accepted by `KEYS`.
//!
//! `*` matches any run of characters (including none), `?` matches exactly one character and
//! every other character matches itself. Patterns are anchored: the whole key must match.

#[derive(Debug, Clone, PartialEq)]
enum Token {
    AnySequence,
    AnyChar,
    Literal(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    tokens: Vec<Token>,
}

impl Pattern {
    pub fn compile(pattern: &str) -> Pattern {
        let mut tokens = Vec::with_capacity(pattern.len());

        for c in pattern.chars() {
            let token = match c {
                '*' => Token::AnySequence,
                '?' => Token::AnyChar,
                c => Token::Literal(c),
            };

            // Consecutive stars are equivalent to a single one.
            if token == Token::AnySequence && tokens.last() == Some(&Token::AnySequence) {
                continue;
            }
            tokens.push(token);
        }

        Pattern { tokens }
    }

    pub fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().collect();

        let mut p = 0;
        let mut t = 0;
        // Position right after the last star seen, and the text position it is currently
        // assumed to have consumed up to.
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.tokens.get(p) {
                Some(Token::AnySequence) => {
                    p += 1;
                    backtrack = Some((p, t));
                    continue;
                }
                Some(Token::AnyChar) => {
                    p += 1;
                    t += 1;
                    continue;
                }
                Some(Token::Literal(c)) if *c == text[t] => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }

            // Mismatch: let the last star swallow one more character.
            match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            }
        }

        self.tokens[p..].iter().all(|token| *token == Token::AnySequence)
    }
}
