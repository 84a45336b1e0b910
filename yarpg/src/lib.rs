//! # YARPG -- Yet Another Regular Parser Generator
//!
//! This crate is the back end of a parser generator.  It does not read grammar files and it
//! does not write source code.  Instead, it takes a grammar that has already been loaded (see
//! [`GrammarBuilder`]) and computes everything a code emitter needs:
//!
//! * an LR(0)-style automaton, whose shift/reduce conflicts are settled by the precedence and
//!   associativity declarations of the grammar;
//! * the dense, compressed action and goto tables that drive the generated parser;
//! * a combined character automaton for the companion lexer, built from the regular
//!   expression declared for each terminal.
//!
//! # Pipeline
//!
//! ```text
//! GrammarBuilder::build -> Grammar
//!     build_automaton   -> Automaton      (states, items, one action per item)
//!     resolve_conflicts -> ResolvedRows   (dense action/goto rows per state)
//!     compress          -> ParseTables    (deduplicated, bit-packed rows)
//! assemble(terminals, compiler) -> LexerTables
//! ```
//!
//! [`generate`] runs all of these and returns a [`GeneratedParser`], which is the hand-off
//! bundle for an emitter.  The `yarpg_runtime` crate interprets the same tables, and is what
//! generated code links against.
//!
//! # Example
//!
//! ```rust
//! use yarpg::{GrammarBuilder, GeneratorOptions, NfaRegexCompiler};
//!
//! let mut g = GrammarBuilder::new();
//! g.parser_name("CalcParser").lexer_name("CalcLexer");
//! g.terminal("PLUS", Some(r"\+"), None);
//! g.terminal("NUMBER", Some("[0-9]+"), None);
//! g.precedence("left", &["PLUS"]);
//! g.rule("S", &["E", "EOF"]).code("$$ = $1;");
//! g.rule("E", &["E", "PLUS", "E"]).code("$$ = add($1, $3);");
//! g.rule("E", &["NUMBER"]).code("$$ = num($1);");
//! g.accept("S");
//! let grammar = g.build().unwrap();
//!
//! let options = GeneratorOptions { generate_lexer: true, dump_states: false };
//! let parser = yarpg::generate(&grammar, &options, &NfaRegexCompiler::new()).unwrap();
//! assert_eq!(parser.terminal_names, ["EOF", "PLUS", "NUMBER"]);
//! assert!(parser.lexer.is_some());
//! ```
//!
//! # Accept rules
//!
//! Every accept non-terminal has exactly one rule, and that rule ends with the reserved
//! terminal `EOF`, e.g. `S : E EOF`.  The parser accepts when it sees `EOF` while positioned
//! just before it in an accept rule; `EOF` itself is never shifted.
//!
//! # Conflicts
//!
//! The automaton has no lookahead.  Wherever a state can both reduce and shift, the
//! precedence of the reduced rule is compared with the precedence of each shifting rule.
//! Every such conflict is reported as a [`Conflict`], and never stops generation.

#![warn(rust_2018_idioms)]
#![allow(clippy::new_without_default)]

mod action_code;
mod closure;
mod errors;
mod grammar;
mod lexer;
mod lr0;
mod mkpar;
mod packing;
mod ramp_table;
mod regex;
mod tvec;
mod util;

#[cfg(test)]
mod tests;

use log::{debug, info};

pub use crate::action_code::{resolve, resolve_rule_code, used_positions};
pub use crate::errors::Error;
pub use crate::grammar::{
    Associativity, Grammar, GrammarBuilder, NonTerminal, PrecedenceRule, Rule, RuleBuilder,
    Settings, Terminal, EOF,
};
pub use crate::lexer::{
    assemble, CharRange, CombinedMachine, LexerTables, PatternError, RegexCompiler,
};
pub use crate::lr0::{build_automaton, Automaton, GroupKey, Item, ItemGroup, State};
pub use crate::mkpar::{resolve_conflicts, Conflict, ResolvedRows, Resolution, StateRows};
pub use crate::packing::{compress, ParseTables};
pub use crate::regex::{Nfa, NfaRegexCompiler};
pub use crate::tvec::TVec;

macro_rules! int_alias {
    (type $name:ident = $int:ty;) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
        pub struct $name(pub $int);

        impl $name {
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl core::ops::Add<$int> for $name {
            type Output = Self;
            fn add(self, rhs: $int) -> $name {
                $name(self.0 + rhs)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, fmt)
            }
        }

        impl core::convert::From<$name> for usize {
            fn from(i: $name) -> usize {
                i.0 as usize
            }
        }

        impl core::convert::From<usize> for $name {
            fn from(i: usize) -> $name {
                $name(i as $int)
            }
        }
    };
}

int_alias! {type TerminalId = u32;}
int_alias! {type NonTerminalId = u32;}
int_alias! {type RuleId = u32;}
int_alias! {type StateId = u32;}

impl TerminalId {
    /// `EOF` is always the first terminal.
    pub const EOF: TerminalId = TerminalId(0);
}

/// A grammar symbol.  Terminals and non-terminals are numbered independently, and each number
/// is used directly as a column of the action table or of the goto table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Symbol {
    Terminal(TerminalId),
    NonTerminal(NonTerminalId),
}

/// The action taken by the parser for one (state, symbol) cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Error,
    Shift(StateId),
    Reduce(RuleId),
    Goto(StateId),
    Accept(RuleId),
}

impl Action {
    pub const TAG_BITS: u32 = 3;
    pub const TAG_MASK: i32 = (1 << Action::TAG_BITS) - 1;

    pub const TAG_ERROR: i32 = 0;
    pub const TAG_SHIFT: i32 = 1;
    pub const TAG_REDUCE: i32 = 2;
    pub const TAG_GOTO: i32 = 3;
    pub const TAG_ACCEPT: i32 = 4;

    pub fn tag(self) -> i32 {
        match self {
            Action::Error => Action::TAG_ERROR,
            Action::Shift(_) => Action::TAG_SHIFT,
            Action::Reduce(_) => Action::TAG_REDUCE,
            Action::Goto(_) => Action::TAG_GOTO,
            Action::Accept(_) => Action::TAG_ACCEPT,
        }
    }

    /// The state or rule number carried by the action.  `Error` carries -1.
    pub fn payload(self) -> i32 {
        match self {
            Action::Error => -1,
            Action::Shift(state) | Action::Goto(state) => state.0 as i32,
            Action::Reduce(rule) | Action::Accept(rule) => rule.0 as i32,
        }
    }

    /// Packs the action into `(payload << 3) | tag`.
    pub fn encode(self) -> i32 {
        (self.payload() << Action::TAG_BITS) | self.tag()
    }

    /// Inverse of `encode`.  Returns `None` for an unknown tag or a negative payload on
    /// anything but `Error`.
    pub fn decode(code: i32) -> Option<Action> {
        let payload = code >> Action::TAG_BITS;
        let tag = code & Action::TAG_MASK;
        if tag == Action::TAG_ERROR {
            return Some(Action::Error);
        }
        if payload < 0 {
            return None;
        }
        let payload = payload as u32;
        match tag {
            Action::TAG_SHIFT => Some(Action::Shift(StateId(payload))),
            Action::TAG_REDUCE => Some(Action::Reduce(RuleId(payload))),
            Action::TAG_GOTO => Some(Action::Goto(StateId(payload))),
            Action::TAG_ACCEPT => Some(Action::Accept(RuleId(payload))),
            _ => None,
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Action::Error => write!(fmt, "Error"),
            Action::Shift(s) => write!(fmt, "Shift s{}", s),
            Action::Reduce(r) => write!(fmt, "Reduce r{}", r),
            Action::Goto(s) => write!(fmt, "Goto s{}", s),
            Action::Accept(r) => write!(fmt, "Accept r{}", r),
        }
    }
}

/// Switches that do not belong to the grammar itself.
#[derive(Clone, Debug, Default)]
pub struct GeneratorOptions {
    /// Assemble the lexer automaton from the terminals' patterns.
    pub generate_lexer: bool,
    /// Log every state of the automaton at `info` level.
    pub dump_states: bool,
}

/// One row of the rule table handed to the emitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleEntry {
    pub lhs: NonTerminalId,
    pub lhs_name: String,
    pub rhs_names: Vec<String>,
    pub accept: bool,
}

impl RuleEntry {
    /// Number of values the runtime pops when reducing by this rule.  For accept rules the
    /// trailing `EOF` is never on the stack.
    pub fn pop_count(&self) -> usize {
        if self.accept {
            self.rhs_names.len().saturating_sub(1)
        } else {
            self.rhs_names.len()
        }
    }
}

/// Everything an emitter needs to write a parser (and optionally a lexer).
#[derive(Clone, Debug)]
pub struct GeneratedParser {
    pub settings: Settings,
    pub tables: ParseTables,
    pub conflicts: Vec<Conflict>,
    pub terminal_names: Vec<String>,
    pub non_terminal_names: Vec<String>,
    pub rule_table: Vec<RuleEntry>,
    /// Resolved action code, indexed by rule number.
    pub reduce_actions: Vec<String>,
    pub lexer: Option<LexerTables>,
}

impl GeneratedParser {
    /// Rule number -> left-hand side non-terminal number.
    pub fn rule_lhs(&self) -> Vec<usize> {
        self.rule_table.iter().map(|r| r.lhs.index()).collect()
    }

    /// Rule number -> number of values popped on reduction.
    pub fn rule_len(&self) -> Vec<usize> {
        self.rule_table.iter().map(|r| r.pop_count()).collect()
    }
}

/// The variable name the emitter assigns the reduced value to.
pub const LHS_VARIABLE: &str = "node";

/// Runs the whole back end over `grammar`.
pub fn generate<C: RegexCompiler>(
    grammar: &Grammar,
    options: &GeneratorOptions,
    compiler: &C,
) -> Result<GeneratedParser, Error> {
    grammar.settings.validate()?;

    let mut automaton = build_automaton(grammar)?;
    if options.dump_states {
        for state in automaton.states.iter() {
            info!("{}", state.dump(grammar));
        }
    }

    let rows = resolve_conflicts(grammar, &mut automaton)?;
    let tables = compress(&rows);
    debug!(
        "tables: {} states, {} action rows, {} goto rows",
        tables.nstates(),
        tables.action_table.len(),
        tables.goto_table.len()
    );

    let lexer = if options.generate_lexer {
        Some(assemble(grammar.terminals.vec(), compiler)?)
    } else {
        None
    };

    let rule_table = grammar
        .rules
        .iter()
        .map(|rule| RuleEntry {
            lhs: rule.lhs,
            lhs_name: grammar.non_terminal(rule.lhs).name.clone(),
            rhs_names: rule
                .rhs
                .iter()
                .map(|&sym| grammar.symbol_name(sym).to_string())
                .collect(),
            accept: rule.accept,
        })
        .collect();

    // Variable names are numbered across all rules, so that every reduction in the
    // emitted switch gets distinct locals.
    let mut var_count: usize = 1;
    let mut reduce_actions = Vec::with_capacity(grammar.nrules());
    for rule in grammar.rules.iter() {
        let used = used_positions(rule.code.as_deref().unwrap_or(""), rule.rhs.len());
        let names: Vec<Option<String>> = (1..=rule.rhs.len())
            .map(|position| {
                if used.contains(&position) {
                    let name = format!("n{}", var_count);
                    var_count += 1;
                    Some(name)
                } else {
                    None
                }
            })
            .collect();
        reduce_actions.push(resolve_rule_code(grammar, rule.number, LHS_VARIABLE, &names)?);
    }

    Ok(GeneratedParser {
        settings: grammar.settings.clone(),
        tables,
        conflicts: rows.conflicts,
        terminal_names: grammar.terminals.iter().map(|t| t.name.clone()).collect(),
        non_terminal_names: grammar
            .non_terminals
            .iter()
            .map(|nt| nt.name.clone())
            .collect(),
        rule_table,
        reduce_actions,
        lexer,
    })
}
