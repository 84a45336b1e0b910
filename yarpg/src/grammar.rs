use crate::errors::Error;
use crate::tvec::TVec;
use crate::{NonTerminalId, RuleId, Symbol, TerminalId};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

/// The reserved end-of-input terminal.  It is always terminal 0.
pub const EOF: &str = "EOF";

const DEFAULT_VALUE_TYPE: &str = "Node";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Terminal {
    pub name: String,
    pub number: TerminalId,
    /// Regular expression recognized by the lexer, if any.
    pub pattern: Option<String>,
    /// Code run by the lexer when it recognizes this terminal.
    pub code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonTerminal {
    pub name: String,
    pub number: NonTerminalId,
    /// Name of the type of the semantic value of this symbol.
    pub value_type: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
    NonAssoc,
}

impl FromStr for Associativity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Associativity::Left),
            "right" => Ok(Associativity::Right),
            "nonassoc" => Ok(Associativity::NonAssoc),
            _ => Err(Error::UnknownAssociativity {
                keyword: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecedenceRule {
    /// 1 is the lowest level.
    pub level: u32,
    pub associativity: Associativity,
    pub members: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub number: RuleId,
    pub lhs: NonTerminalId,
    pub rhs: Vec<Symbol>,
    /// Index into `Grammar::precedence`.
    pub precedence: Option<usize>,
    pub accept: bool,
    pub code: Option<String>,
}

/// Names the emitter uses for the generated code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    pub parser_name: Option<String>,
    pub lexer_name: Option<String>,
    pub package: Option<String>,
    pub token_enum: Option<String>,
    pub imports: Vec<String>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.parser_name.is_none() {
            return Err(Error::MissingSetting {
                name: "parser name",
            });
        }
        if self.lexer_name.is_none() && self.token_enum.is_none() {
            return Err(Error::MissingSetting {
                name: "lexer name or token enum",
            });
        }
        Ok(())
    }
}

/// A validated grammar with dense numbering.  Immutable once built.
#[derive(Clone, Debug)]
pub struct Grammar {
    pub settings: Settings,
    pub terminals: TVec<TerminalId, Terminal>,
    pub non_terminals: TVec<NonTerminalId, NonTerminal>,
    pub rules: TVec<RuleId, Rule>,
    pub precedence: Vec<PrecedenceRule>,
}

impl Grammar {
    pub fn nterminals(&self) -> usize {
        self.terminals.len()
    }

    pub fn nnon_terminals(&self) -> usize {
        self.non_terminals.len()
    }

    pub fn nrules(&self) -> usize {
        self.rules.len()
    }

    pub fn terminal(&self, t: TerminalId) -> &Terminal {
        &self.terminals[t]
    }

    pub fn non_terminal(&self, nt: NonTerminalId) -> &NonTerminal {
        &self.non_terminals[nt]
    }

    pub fn rule(&self, r: RuleId) -> &Rule {
        &self.rules[r]
    }

    pub fn find_terminal(&self, name: &str) -> Option<TerminalId> {
        self.terminals
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.number)
    }

    pub fn find_non_terminal(&self, name: &str) -> Option<NonTerminalId> {
        self.non_terminals
            .iter()
            .find(|nt| nt.name == name)
            .map(|nt| nt.number)
    }

    pub fn symbol_name(&self, sym: Symbol) -> &str {
        match sym {
            Symbol::Terminal(t) => &self.terminal(t).name,
            Symbol::NonTerminal(nt) => &self.non_terminal(nt).name,
        }
    }

    pub fn rule_precedence(&self, r: RuleId) -> Option<&PrecedenceRule> {
        self.rule(r).precedence.map(|i| &self.precedence[i])
    }

    pub fn accept_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.accept)
    }

    /// All rules whose left-hand side is `nt`, in rule order.
    pub fn rules_for(&self, nt: NonTerminalId) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.lhs == nt)
    }

    pub fn rule_to_str(&self, r: RuleId) -> String {
        let rule = self.rule(r);
        let mut s = format!("(r{}) {} :", r, self.non_terminal(rule.lhs).name);
        for &sym in rule.rhs.iter() {
            s.push(' ');
            s.push_str(self.symbol_name(sym));
        }
        s
    }
}

/// A rule as declared, before symbols are resolved.
#[derive(Clone, Debug)]
pub struct RuleBuilder {
    lhs: String,
    rhs: Vec<String>,
    prec: Option<String>,
    value_type: Option<String>,
    code: Option<String>,
}

impl RuleBuilder {
    /// Sets the action code template of the rule.
    pub fn code(&mut self, code: &str) -> &mut Self {
        self.code = Some(code.to_string());
        self
    }

    /// Overrides the precedence of the rule (`%prec NAME`).
    pub fn prec(&mut self, name: &str) -> &mut Self {
        self.prec = Some(name.to_string());
        self
    }

    /// Sets the type of the semantic value of the left-hand side.
    pub fn value_type(&mut self, ty: &str) -> &mut Self {
        self.value_type = Some(ty.to_string());
        self
    }
}

#[derive(Clone, Debug)]
struct TerminalDef {
    name: String,
    pattern: Option<String>,
    code: Option<String>,
}

/// Collects declarations in any order; `build` numbers and validates them.
#[derive(Clone, Debug, Default)]
pub struct GrammarBuilder {
    settings: Settings,
    terminals: Vec<TerminalDef>,
    precedence: Vec<(String, Vec<String>)>,
    rules: Vec<RuleBuilder>,
    accept: Vec<String>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parser_name(&mut self, name: &str) -> &mut Self {
        self.settings.parser_name = Some(name.to_string());
        self
    }

    pub fn lexer_name(&mut self, name: &str) -> &mut Self {
        self.settings.lexer_name = Some(name.to_string());
        self
    }

    pub fn package(&mut self, name: &str) -> &mut Self {
        self.settings.package = Some(name.to_string());
        self
    }

    pub fn token_enum(&mut self, name: &str) -> &mut Self {
        self.settings.token_enum = Some(name.to_string());
        self
    }

    pub fn import(&mut self, path: &str) -> &mut Self {
        self.settings.imports.push(path.to_string());
        self
    }

    /// Declares a terminal.  Terminals are numbered in declaration order, after `EOF`.
    pub fn terminal(&mut self, name: &str, pattern: Option<&str>, code: Option<&str>) -> &mut Self {
        self.terminals.push(TerminalDef {
            name: name.to_string(),
            pattern: pattern.map(str::to_string),
            code: code.map(str::to_string),
        });
        self
    }

    /// Declares the next precedence level, one higher than the previous one.
    /// `associativity` is `left`, `right` or `nonassoc`, in any case.
    pub fn precedence(&mut self, associativity: &str, members: &[&str]) -> &mut Self {
        self.precedence.push((
            associativity.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        ));
        self
    }

    /// Declares `lhs : rhs...`.  The returned builder sets the optional parts of the rule.
    pub fn rule(&mut self, lhs: &str, rhs: &[&str]) -> &mut RuleBuilder {
        self.rules.push(RuleBuilder {
            lhs: lhs.to_string(),
            rhs: rhs.iter().map(|s| s.to_string()).collect(),
            prec: None,
            value_type: None,
            code: None,
        });
        let last = self.rules.len() - 1;
        &mut self.rules[last]
    }

    /// Declares a non-terminal from which parsing starts.
    pub fn accept(&mut self, name: &str) -> &mut Self {
        self.accept.push(name.to_string());
        self
    }

    pub fn build(&self) -> Result<Grammar, Error> {
        let terminals = self.build_terminals()?;
        let precedence = self.build_precedence()?;
        let terminal_numbers: HashMap<&str, TerminalId> = terminals
            .iter()
            .map(|t| (t.name.as_str(), t.number))
            .collect();

        let non_terminals = self.build_non_terminals(&terminal_numbers)?;
        let non_terminal_numbers: HashMap<&str, NonTerminalId> = non_terminals
            .iter()
            .map(|nt| (nt.name.as_str(), nt.number))
            .collect();

        let mut rules: TVec<RuleId, Rule> = TVec::new();
        for def in self.rules.iter() {
            let number = RuleId::from(rules.len());
            let lhs = non_terminal_numbers[def.lhs.as_str()];
            let rhs: Vec<Symbol> = def
                .rhs
                .iter()
                .map(|name| match terminal_numbers.get(name.as_str()) {
                    Some(&t) => Symbol::Terminal(t),
                    None => Symbol::NonTerminal(non_terminal_numbers[name.as_str()]),
                })
                .collect();

            let precedence = match &def.prec {
                Some(name) => match find_precedence(&precedence, name) {
                    Some(level) => Some(level),
                    None => {
                        return Err(Error::UnknownPrecedence {
                            rule: format!("{} : {}", def.lhs, def.rhs.join(" ")),
                            name: name.clone(),
                        })
                    }
                },
                // The right-most terminal of the rule determines its precedence.
                None => def
                    .rhs
                    .iter()
                    .rev()
                    .find(|name| terminal_numbers.contains_key(name.as_str()))
                    .and_then(|name| find_precedence(&precedence, name)),
            };

            rules.push(Rule {
                number,
                lhs,
                rhs,
                precedence,
                accept: false,
                code: def.code.clone(),
            });
        }

        self.mark_accept_rules(&non_terminal_numbers, &mut rules, &terminals, &non_terminals)?;

        let gram = Grammar {
            settings: self.settings.clone(),
            terminals,
            non_terminals,
            rules,
            precedence,
        };
        report_unused_terminals(&gram);
        print_grammar(&gram);
        Ok(gram)
    }

    fn build_terminals(&self) -> Result<TVec<TerminalId, Terminal>, Error> {
        let mut terminals: TVec<TerminalId, Terminal> = TVec::new();
        terminals.push(Terminal {
            name: EOF.to_string(),
            number: TerminalId::EOF,
            pattern: None,
            code: None,
        });
        for def in self.terminals.iter() {
            if def.name == EOF {
                return Err(Error::ReservedTerminal {
                    name: def.name.clone(),
                });
            }
            if terminals.iter().any(|t| t.name == def.name) {
                return Err(Error::DuplicateTerminal {
                    name: def.name.clone(),
                });
            }
            let number = TerminalId::from(terminals.len());
            terminals.push(Terminal {
                name: def.name.clone(),
                number,
                pattern: def.pattern.clone(),
                code: def.code.clone(),
            });
        }
        Ok(terminals)
    }

    fn build_precedence(&self) -> Result<Vec<PrecedenceRule>, Error> {
        let mut rules: Vec<PrecedenceRule> = Vec::with_capacity(self.precedence.len());
        for (i, (keyword, members)) in self.precedence.iter().enumerate() {
            let associativity: Associativity = keyword.parse()?;
            let mut set = BTreeSet::new();
            for name in members.iter() {
                if set.contains(name) || rules.iter().any(|r| r.members.contains(name)) {
                    return Err(Error::DuplicatePrecedence { name: name.clone() });
                }
                set.insert(name.clone());
            }
            rules.push(PrecedenceRule {
                level: i as u32 + 1,
                associativity,
                members: set,
            });
        }
        Ok(rules)
    }

    /// Non-terminals are numbered in order of first appearance, scanning each rule's
    /// left-hand side and then its right-hand side.
    fn build_non_terminals(
        &self,
        terminal_numbers: &HashMap<&str, TerminalId>,
    ) -> Result<TVec<NonTerminalId, NonTerminal>, Error> {
        let mut non_terminals: TVec<NonTerminalId, NonTerminal> = TVec::new();
        let mut numbers: HashMap<&str, NonTerminalId> = HashMap::new();
        let mut defined: BTreeSet<&str> = BTreeSet::new();

        for def in self.rules.iter() {
            if terminal_numbers.contains_key(def.lhs.as_str()) {
                return Err(Error::TerminalOnLeftSide {
                    name: def.lhs.clone(),
                });
            }
            defined.insert(def.lhs.as_str());
            let names = core::iter::once(&def.lhs).chain(
                def.rhs
                    .iter()
                    .filter(|name| !terminal_numbers.contains_key(name.as_str())),
            );
            for name in names {
                if !numbers.contains_key(name.as_str()) {
                    let number = non_terminals.push(NonTerminal {
                        name: name.clone(),
                        number: NonTerminalId::from(non_terminals.len()),
                        value_type: DEFAULT_VALUE_TYPE.to_string(),
                    });
                    numbers.insert(name.as_str(), number);
                }
            }
            if let Some(ty) = &def.value_type {
                non_terminals[numbers[def.lhs.as_str()]].value_type = ty.clone();
            }
        }

        let undefined: Vec<String> = non_terminals
            .iter()
            .filter(|nt| !defined.contains(nt.name.as_str()))
            .map(|nt| nt.name.clone())
            .collect();
        if !undefined.is_empty() {
            return Err(Error::UndefinedSymbol { names: undefined });
        }
        Ok(non_terminals)
    }

    fn mark_accept_rules(
        &self,
        non_terminal_numbers: &HashMap<&str, NonTerminalId>,
        rules: &mut TVec<RuleId, Rule>,
        terminals: &TVec<TerminalId, Terminal>,
        non_terminals: &TVec<NonTerminalId, NonTerminal>,
    ) -> Result<(), Error> {
        if self.accept.is_empty() {
            return Err(Error::NoAcceptStates);
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for name in self.accept.iter() {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateAccept { name: name.clone() });
            }
            let nt = match non_terminal_numbers.get(name.as_str()) {
                Some(&nt) => nt,
                None => return Err(Error::NoAcceptRule { name: name.clone() }),
            };
            let matching: Vec<RuleId> = rules
                .iter()
                .filter(|r| r.lhs == nt)
                .map(|r| r.number)
                .collect();
            let rule = match matching.as_slice() {
                [] => return Err(Error::NoAcceptRule { name: name.clone() }),
                [rule] => *rule,
                _ => {
                    return Err(Error::MultipleAcceptRules {
                        name: name.clone(),
                        count: matching.len(),
                    })
                }
            };

            let r = &mut rules[rule];
            if r.rhs.last() != Some(&Symbol::Terminal(TerminalId::EOF)) {
                let mut text = format!("{} :", non_terminals[r.lhs].name);
                for &sym in r.rhs.iter() {
                    text.push(' ');
                    text.push_str(match sym {
                        Symbol::Terminal(t) => &terminals[t].name,
                        Symbol::NonTerminal(nt) => &non_terminals[nt].name,
                    });
                }
                return Err(Error::AcceptRuleWithoutEof { rule: text });
            }
            r.accept = true;
        }
        Ok(())
    }
}

fn find_precedence(rules: &[PrecedenceRule], name: &str) -> Option<usize> {
    rules.iter().position(|r| r.members.contains(name))
}

fn report_unused_terminals(gram: &Grammar) {
    let mut used = vec![false; gram.nterminals()];
    used[TerminalId::EOF.index()] = true;
    for rule in gram.rules.iter() {
        for &sym in rule.rhs.iter() {
            if let Symbol::Terminal(t) = sym {
                used[t.index()] = true;
            }
        }
    }
    for t in gram.terminals.iter() {
        if !used[t.number.index()] {
            warn!("terminal {} is never used in a rule", t.name);
        }
    }
}

fn print_grammar(gram: &Grammar) {
    debug!("grammar:");
    for t in gram.terminals.iter() {
        debug!("    terminal t{} {}", t.number, t.name);
    }
    for nt in gram.non_terminals.iter() {
        debug!("    non-terminal n{} {} ({})", nt.number, nt.name, nt.value_type);
    }
    for r in gram.rules.ids() {
        debug!("    {}", gram.rule_to_str(r));
    }
}
