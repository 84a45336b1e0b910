use crate::errors::Error;
use crate::grammar::{Terminal, EOF};
use crate::TerminalId;
use log::{debug, warn};
use std::collections::HashMap;

/// An inclusive range of characters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct CharRange {
    pub from: char,
    pub to: char,
}

impl CharRange {
    pub fn new(from: char, to: char) -> CharRange {
        CharRange { from, to }
    }

    pub fn single(c: char) -> CharRange {
        CharRange { from: c, to: c }
    }

    pub fn contains(&self, c: char) -> bool {
        self.from <= c && c <= self.to
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PatternError {
    pub message: String,
}

impl PatternError {
    pub fn new(message: impl Into<String>) -> PatternError {
        PatternError {
            message: message.into(),
        }
    }
}

/// The deterministic machine that recognizes every token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombinedMachine {
    pub initial_state: usize,
    /// Event number -> the character ranges it stands for.
    pub events: Vec<Vec<CharRange>>,
    /// State -> event -> next state.
    pub transitions: Vec<Vec<Option<usize>>>,
    /// State -> the terminal recognized when the machine stops there.
    pub final_tags: Vec<Option<TerminalId>>,
    /// States where several terminals accept, with those terminals.  Such states have no tag.
    pub collisions: Vec<(usize, Vec<TerminalId>)>,
}

/// Compiles the patterns of individual terminals and combines them into one machine.
pub trait RegexCompiler {
    type Machine;

    /// Compiles `pattern` into a machine whose accepting states are tagged with `tag`.
    fn compile(&self, pattern: &str, tag: TerminalId) -> Result<Self::Machine, PatternError>;

    fn combine(&self, machines: Vec<Self::Machine>) -> CombinedMachine;
}

/// The tables of the companion lexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexerTables {
    pub initial_state: usize,
    /// State -> name of the token recognized when stopping there.
    pub token_per_state: Vec<Option<String>>,
    /// Character range -> event number.  Ranges are tested in order.
    pub event_map: Vec<(CharRange, usize)>,
    /// State -> event -> next state.
    pub transitions: Vec<Vec<Option<usize>>>,
    /// (terminal name, action code), in terminal order.
    pub token_actions: Vec<(String, String)>,
    /// States that recognize no token because several terminals accept there.
    pub collisions: Vec<(usize, Vec<String>)>,
}

impl LexerTables {
    pub fn nstates(&self) -> usize {
        self.transitions.len()
    }

    /// Width of the transition matrix.
    pub fn nevents(&self) -> usize {
        self.transitions.first().map_or(0, Vec::len)
    }

    /// The event for characters outside every range.  No state has a transition on it.
    pub fn default_event(&self) -> usize {
        self.event_map.len()
    }

    pub fn classify(&self, c: char) -> usize {
        self.event_map
            .iter()
            .find(|(range, _)| range.contains(c))
            .map_or_else(|| self.default_event(), |&(_, event)| event)
    }

    pub fn next_state(&self, state: usize, c: char) -> Option<usize> {
        let event = self.classify(c);
        self.transitions.get(state)?.get(event).copied().flatten()
    }

    /// The transition matrix with -1 for "no transition", for the emitter and the runtime.
    pub fn encoded_transitions(&self) -> Vec<Vec<i32>> {
        self.transitions
            .iter()
            .map(|row| row.iter().map(|t| t.map_or(-1, |s| s as i32)).collect())
            .collect()
    }
}

/// Builds the lexer tables from the patterns of `terminals`.  `EOF` and terminals without a
/// pattern are skipped.
pub fn assemble<C: RegexCompiler>(
    terminals: &[Terminal],
    compiler: &C,
) -> Result<LexerTables, Error> {
    let mut machines = Vec::new();
    for t in terminals.iter() {
        if t.name == EOF {
            continue;
        }
        let pattern = match &t.pattern {
            Some(pattern) => pattern,
            None => continue,
        };
        debug!("compiling t{} {} = /{}/", t.number, t.name, pattern);
        let machine = compiler
            .compile(pattern, t.number)
            .map_err(|source| Error::InvalidPattern {
                terminal: t.name.clone(),
                source,
            })?;
        machines.push(machine);
    }

    let combined = compiler.combine(machines);
    let names: HashMap<TerminalId, &str> =
        terminals.iter().map(|t| (t.number, t.name.as_str())).collect();

    let token_per_state: Vec<Option<String>> = combined
        .final_tags
        .iter()
        .map(|tag| tag.and_then(|t| names.get(&t)).map(|name| name.to_string()))
        .collect();

    let mut event_map: Vec<(CharRange, usize)> = Vec::new();
    for (event, ranges) in combined.events.iter().enumerate() {
        for &range in ranges.iter() {
            event_map.push((range, event));
        }
    }

    let collisions: Vec<(usize, Vec<String>)> = combined
        .collisions
        .iter()
        .map(|(state, tags)| {
            let competing: Vec<String> = tags
                .iter()
                .filter_map(|t| names.get(t))
                .map(|name| name.to_string())
                .collect();
            warn!(
                "lexer state {} matches {}; input ending there is not recognized as any of them",
                state,
                competing.join(" and ")
            );
            (*state, competing)
        })
        .collect();

    let token_actions: Vec<(String, String)> = terminals
        .iter()
        .filter_map(|t| t.code.as_ref().map(|code| (t.name.clone(), code.clone())))
        .collect();

    debug!(
        "lexer: {} states, {} events, initial state {}",
        combined.transitions.len(),
        combined.events.len(),
        combined.initial_state
    );
    for (state, token) in token_per_state.iter().enumerate() {
        if let Some(token) = token {
            debug!("    state {} recognizes {}", state, token);
        }
    }

    Ok(LexerTables {
        initial_state: combined.initial_state,
        token_per_state,
        event_map,
        transitions: combined.transitions,
        token_actions,
        collisions,
    })
}
