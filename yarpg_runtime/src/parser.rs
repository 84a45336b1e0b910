use crate::{yarpg_log, Error};

const TAG_BITS: u32 = 3;
const TAG_MASK: i32 = (1 << TAG_BITS) - 1;
const TAG_ERROR: i32 = 0;
const TAG_SHIFT: i32 = 1;
const TAG_REDUCE: i32 = 2;
const TAG_GOTO: i32 = 3;
const TAG_ACCEPT: i32 = 4;

/// The compressed parse tables, as emitted by the generator.
///
/// `action_table` and `goto_table` are flat, row-major, with `nterminals` and
/// `nnon_terminals` columns.  An `action_index` entry with its low bit set holds a whole row
/// inline (`(action << 1) | 1`); otherwise it is `row << 1`.  `goto_index` holds row numbers.
#[derive(Copy, Clone, Debug)]
pub struct ParserTables<'a> {
    pub action_table: &'a [i32],
    pub action_index: &'a [i32],
    pub goto_table: &'a [i32],
    pub goto_index: &'a [i32],
    pub nterminals: usize,
    pub nnon_terminals: usize,
    /// Rule -> left-hand side non-terminal.
    pub rule_lhs: &'a [usize],
    /// Rule -> number of values popped when reducing by it.
    pub rule_len: &'a [usize],
}

impl<'a> ParserTables<'a> {
    fn action(&self, state: usize, terminal: usize) -> Result<i32, Error> {
        let entry = *self
            .action_index
            .get(state)
            .ok_or(Error::BadTables("state out of range"))?;
        if entry & 1 == 1 {
            Ok(entry >> 1)
        } else {
            let row = (entry >> 1) as usize;
            self.action_table
                .get(row * self.nterminals + terminal)
                .copied()
                .ok_or(Error::BadTables("action cell out of range"))
        }
    }

    fn goto(&self, state: usize, nt: usize) -> Result<i32, Error> {
        let row = *self
            .goto_index
            .get(state)
            .ok_or(Error::BadTables("state out of range"))? as usize;
        self.goto_table
            .get(row * self.nnon_terminals + nt)
            .copied()
            .ok_or(Error::BadTables("goto cell out of range"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushResult<V> {
    /// The token was shifted; push the next one.
    Shifted,
    /// The input was accepted; carries the value of the accept rule.
    Accepted(V),
}

/// A push parser: the application feeds tokens, and the parser calls back into the application
/// whenever it reduces by a rule.
#[derive(Clone, Debug)]
pub struct ParserState<'a, V> {
    tables: ParserTables<'a>,
    state_stack: Vec<usize>,
    value_stack: Vec<V>,
    accepted: bool,
}

impl<'a, V> ParserState<'a, V> {
    pub fn new(tables: ParserTables<'a>) -> Self {
        let mut state_stack = Vec::with_capacity(20);
        state_stack.push(0);
        Self {
            tables,
            state_stack,
            value_stack: Vec::new(),
            accepted: false,
        }
    }

    pub fn state(&self) -> usize {
        self.state_stack.last().copied().unwrap_or(0)
    }

    /// Advances the parser by one token.  `reduce` is called with the rule number and the
    /// values of the rule's right-hand side (in order), and returns the value of the left-hand
    /// side.  Reductions continue until the token is shifted or the input is accepted.
    pub fn push_token<F>(
        &mut self,
        terminal: usize,
        value: V,
        mut reduce: F,
    ) -> Result<PushResult<V>, Error>
    where
        F: FnMut(usize, Vec<V>) -> V,
    {
        if self.accepted {
            return Err(Error::AlreadyAccepted);
        }

        loop {
            let state = self.state();
            let code = self.tables.action(state, terminal)?;
            let payload = code >> TAG_BITS;
            match code & TAG_MASK {
                TAG_SHIFT => {
                    yarpg_log!(
                        "state {}: shift terminal {}, goto state {}",
                        state,
                        terminal,
                        payload
                    );
                    self.state_stack.push(payload as usize);
                    self.value_stack.push(value);
                    return Ok(PushResult::Shifted);
                }
                TAG_REDUCE => {
                    let rule = payload as usize;
                    let values = self.pop(rule)?;
                    let lhs_value = reduce(rule, values);
                    self.goto_after_reduce(rule, lhs_value)?;
                }
                TAG_ACCEPT => {
                    let rule = payload as usize;
                    yarpg_log!("state {}: accept by rule {}", state, rule);
                    let values = self.pop(rule)?;
                    self.accepted = true;
                    return Ok(PushResult::Accepted(reduce(rule, values)));
                }
                TAG_ERROR => {
                    yarpg_log!("state {}: syntax error at terminal {}", state, terminal);
                    return Err(Error::SyntaxError { state, terminal });
                }
                TAG_GOTO => return Err(Error::BadTables("goto in action table")),
                _ => return Err(Error::BadTables("unknown action tag")),
            }
        }
    }

    fn pop(&mut self, rule: usize) -> Result<Vec<V>, Error> {
        let len = *self
            .tables
            .rule_len
            .get(rule)
            .ok_or(Error::BadTables("rule out of range"))?;
        if len > self.value_stack.len() || len >= self.state_stack.len() {
            return Err(Error::BadTables("stack underflow"));
        }
        yarpg_log!("reduce by rule {}, popping {} values", rule, len);
        let values = self.value_stack.split_off(self.value_stack.len() - len);
        let new_len = self.state_stack.len() - len;
        self.state_stack.truncate(new_len);
        Ok(values)
    }

    fn goto_after_reduce(&mut self, rule: usize, value: V) -> Result<(), Error> {
        let lhs = *self
            .tables
            .rule_lhs
            .get(rule)
            .ok_or(Error::BadTables("rule out of range"))?;
        let state = self.state();
        let code = self.tables.goto(state, lhs)?;
        if code & TAG_MASK != TAG_GOTO {
            return Err(Error::BadTables("missing goto"));
        }
        let next = (code >> TAG_BITS) as usize;
        yarpg_log!("state {}: goto state {} on non-terminal {}", state, next, lhs);
        self.state_stack.push(next);
        self.value_stack.push(value);
        Ok(())
    }
}
