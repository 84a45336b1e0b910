use crate::lexer::PatternError;
use crate::StateId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("the terminal name `{name}` is reserved")]
    ReservedTerminal { name: String },

    #[error("terminal `{name}` is declared more than once")]
    DuplicateTerminal { name: String },

    #[error("the following symbols are referenced, but never defined: {}", .names.join(", "))]
    UndefinedSymbol { names: Vec<String> },

    #[error("terminal `{name}` cannot be the left-hand side of a rule")]
    TerminalOnLeftSide { name: String },

    #[error("accept state `{name}` is declared more than once")]
    DuplicateAccept { name: String },

    #[error("no rule for accept state `{name}`")]
    NoAcceptRule { name: String },

    #[error("multiple rules ({count}) match accept state `{name}`")]
    MultipleAcceptRules { name: String, count: usize },

    #[error("accept rule `{rule}` must end with EOF")]
    AcceptRuleWithoutEof { rule: String },

    #[error("the grammar declares no accept states")]
    NoAcceptStates,

    #[error("token `{name}` appears in more than one precedence rule")]
    DuplicatePrecedence { name: String },

    #[error("unknown associativity `{keyword}`, expected left, right or nonassoc")]
    UnknownAssociativity { keyword: String },

    #[error("rule `{rule}` uses %prec `{name}`, which is in no precedence rule")]
    UnknownPrecedence { rule: String, name: String },

    #[error("missing lvalue ($$) in rule `{rule}`")]
    MissingLhsAssignment { rule: String },

    #[error("invalid pattern for terminal `{terminal}`: {source}")]
    InvalidPattern {
        terminal: String,
        #[source]
        source: PatternError,
    },

    #[error("missing setting: {name}")]
    MissingSetting { name: &'static str },

    #[error("state s{state} has several completed items in one group:\n{items}")]
    AmbiguousEndGroup { state: StateId, items: String },

    #[error("state s{state} reduces by more than one rule:\n{rules}")]
    MultipleReductions { state: StateId, rules: String },

    #[error("state s{state} has an item with no action:\n{items}")]
    UnassignedItem { state: StateId, items: String },
}
