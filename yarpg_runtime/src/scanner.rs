use crate::{yarpg_log, Error};

/// Name of the token the scanner yields at the end of the input.
pub const EOF: &str = "EOF";

/// The lexer tables, as emitted by the generator.
#[derive(Copy, Clone, Debug)]
pub struct LexerTables<'a> {
    pub initial_state: usize,
    /// Flat, row-major state x event matrix; -1 is "no transition".
    pub transitions: &'a [i32],
    pub nevents: usize,
    /// (first, last, event), tested in order.  Characters outside every range get the event
    /// `event_ranges.len()`.
    pub event_ranges: &'a [(char, char, usize)],
    pub token_per_state: &'a [Option<&'a str>],
}

impl<'a> LexerTables<'a> {
    fn classify(&self, c: char) -> usize {
        self.event_ranges
            .iter()
            .find(|&&(from, to, _)| from <= c && c <= to)
            .map_or(self.event_ranges.len(), |&(_, _, event)| event)
    }

    fn next_state(&self, state: usize, c: char) -> Option<usize> {
        let event = self.classify(c);
        if event >= self.nevents {
            return None;
        }
        match self.transitions.get(state * self.nevents + event) {
            Some(&next) if next >= 0 => Some(next as usize),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token<'a, 't> {
    pub name: &'a str,
    pub text: &'t str,
    pub offset: usize,
}

/// Cuts `input` into the longest tokens the lexer tables recognize, then yields `EOF`.
#[derive(Clone, Debug)]
pub struct Scanner<'a, 't> {
    tables: LexerTables<'a>,
    input: &'t str,
    pos: usize,
    done: bool,
}

impl<'a, 't> Scanner<'a, 't> {
    pub fn new(tables: LexerTables<'a>, input: &'t str) -> Self {
        Self {
            tables,
            input,
            pos: 0,
            done: false,
        }
    }

    fn next_token(&mut self) -> Result<Token<'a, 't>, Error> {
        let rest = &self.input[self.pos..];
        let mut state = self.tables.initial_state;
        let mut last_match: Option<(&'a str, usize)> = None;
        for (i, c) in rest.char_indices() {
            state = match self.tables.next_state(state, c) {
                Some(next) => next,
                None => break,
            };
            if let Some(Some(name)) = self.tables.token_per_state.get(state) {
                last_match = Some((*name, i + c.len_utf8()));
            }
        }

        match last_match {
            Some((name, len)) => {
                let token = Token {
                    name,
                    text: &rest[..len],
                    offset: self.pos,
                };
                yarpg_log!("scanned {} {:?} at {}", name, token.text, self.pos);
                self.pos += len;
                Ok(token)
            }
            None => Err(Error::UnexpectedChar {
                offset: self.pos,
                ch: rest.chars().next().unwrap_or('\0'),
            }),
        }
    }
}

impl<'a, 't> Iterator for Scanner<'a, 't> {
    type Item = Result<Token<'a, 't>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.pos >= self.input.len() {
            self.done = true;
            return Some(Ok(Token {
                name: EOF,
                text: "",
                offset: self.pos,
            }));
        }
        let result = self.next_token();
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
