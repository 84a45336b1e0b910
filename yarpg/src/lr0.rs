use crate::closure::{closure, set_derives, set_first_derives};
use crate::errors::Error;
use crate::grammar::Grammar;
use crate::tvec::TVec;
use crate::util::Bitv32;
use crate::{Action, RuleId, StateId, Symbol};
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;

/// A position within a rule.  Identity is `(rule, position)`; the action an item carries is
/// stored by the state that owns it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Item {
    pub rule: RuleId,
    pub position: usize,
}

impl Item {
    pub fn new(rule: RuleId, position: usize) -> Item {
        Item { rule, position }
    }

    pub fn advance(self) -> Item {
        Item::new(self.rule, self.position + 1)
    }

    /// The symbol after the dot, if any.
    pub fn current_symbol(self, gram: &Grammar) -> Option<Symbol> {
        gram.rule(self.rule).rhs.get(self.position).copied()
    }

    /// Accept rules end with `EOF`, which is never shifted, so an accept item is complete
    /// once only `EOF` is left.
    pub fn has_more_symbols(self, gram: &Grammar) -> bool {
        let rule = gram.rule(self.rule);
        if rule.accept {
            self.position + 1 < rule.rhs.len()
        } else {
            self.position < rule.rhs.len()
        }
    }

    pub fn to_str(self, gram: &Grammar) -> String {
        let rule = gram.rule(self.rule);
        let mut s = format!(
            "(r{}) {} :",
            self.rule,
            gram.non_terminal(rule.lhs).name
        );
        for (i, &sym) in rule.rhs.iter().enumerate() {
            if i == self.position {
                s.push_str(" .");
            }
            s.push(' ');
            s.push_str(gram.symbol_name(sym));
        }
        if self.position >= rule.rhs.len() {
            s.push_str(" .");
        }
        s
    }
}

/// What the items of a group have in common.  Ordering gives the visiting order: terminals
/// by number, then non-terminals by number, then `End`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum GroupKey {
    Symbol(Symbol),
    End,
}

/// Items of one state that share a current symbol.  Equal groups (in any state) get the
/// same action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ItemGroup {
    pub items: BTreeSet<Item>,
}

impl ItemGroup {
    pub fn has_more_symbols(&self, gram: &Grammar) -> bool {
        self.items.iter().all(|item| item.has_more_symbols(gram))
    }
}

#[derive(Clone, Debug)]
pub struct State {
    pub id: StateId,
    /// Every item of the state (kernel and closure), with its action once one is assigned.
    pub items: BTreeMap<Item, Option<Action>>,
}

impl State {
    fn new(id: StateId, items: impl IntoIterator<Item = Item>) -> State {
        State {
            id,
            items: items.into_iter().map(|item| (item, None)).collect(),
        }
    }

    pub fn action(&self, item: Item) -> Option<Action> {
        self.items.get(&item).copied().flatten()
    }

    pub fn set_action(&mut self, item: Item, action: Action) {
        self.items.insert(item, Some(action));
    }

    /// Partitions the items by current symbol.  Items with no more symbols to read form the
    /// `End` group, except accept items, which are grouped under `EOF`.
    pub fn groups(&self, gram: &Grammar) -> BTreeMap<GroupKey, ItemGroup> {
        let mut groups: BTreeMap<GroupKey, ItemGroup> = BTreeMap::new();
        for &item in self.items.keys() {
            let key = match item.current_symbol(gram) {
                Some(sym) => GroupKey::Symbol(sym),
                None => GroupKey::End,
            };
            groups.entry(key).or_default().items.insert(item);
        }
        groups
    }

    pub fn dump(&self, gram: &Grammar) -> String {
        let mut s = format!("State s{}\n", self.id);
        for (&item, action) in self.items.iter() {
            let _ = match action {
                Some(action) => writeln!(s, "    {:<40} {}", item.to_str(gram), action),
                None => writeln!(s, "    {}", item.to_str(gram)),
            };
        }
        s
    }
}

#[derive(Clone, Debug)]
pub struct Automaton {
    pub states: TVec<StateId, State>,
}

impl Automaton {
    pub fn nstates(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }
}

/// Builds the automaton for `gram`.  States are numbered in creation order, starting with the
/// state that holds the accept items.
pub fn build_automaton(gram: &Grammar) -> Result<Automaton, Error> {
    let derives = set_derives(gram);
    let first_derives = set_first_derives(gram, &derives);
    let mut rule_set = Bitv32::from_elem(gram.nrules(), false);

    let mut states: TVec<StateId, State> = TVec::new();
    states.push(State::new(
        StateId(0),
        gram.accept_rules().map(|r| Item::new(r.number, 0)),
    ));

    let mut group_actions: HashMap<ItemGroup, Action> = HashMap::new();

    // this_state is our position within the work list; new states are appended to the end
    // of it while it is being walked.
    let mut this_state: usize = 0;
    while this_state < states.len() {
        let id = StateId::from(this_state);
        let kernel: BTreeSet<Item> = states[id].items.keys().copied().collect();
        let items = closure(gram, &kernel, &first_derives, &mut rule_set);
        for &item in items.iter() {
            states[id].items.entry(item).or_insert(None);
        }
        debug!("computing actions for {}", states[id].dump(gram));

        let groups = states[id].groups(gram);
        for (key, group) in groups {
            let action = if let Some(&action) = group_actions.get(&group) {
                action
            } else {
                match key {
                    GroupKey::Symbol(symbol) if group.has_more_symbols(gram) => {
                        let target = states.push(State::new(
                            StateId::from(states.len()),
                            group.items.iter().map(|item| item.advance()),
                        ));
                        debug!(
                            "    created state s{} on {}",
                            target,
                            gram.symbol_name(symbol)
                        );
                        let action = match symbol {
                            Symbol::Terminal(_) => Action::Shift(target),
                            Symbol::NonTerminal(_) => Action::Goto(target),
                        };
                        group_actions.insert(group.clone(), action);
                        action
                    }
                    _ => end_action(gram, &states[id], &group)?,
                }
            };

            for &item in group.items.iter() {
                states[id].set_action(item, action);
            }
        }

        this_state += 1;
    }

    debug!("automaton has {} states", states.len());
    Ok(Automaton { states })
}

/// Action for a group whose items have nothing left to read.  Such a group must hold exactly
/// one item.
fn end_action(gram: &Grammar, state: &State, group: &ItemGroup) -> Result<Action, Error> {
    let mut iter = group.items.iter();
    match (iter.next(), iter.next()) {
        (Some(item), None) => {
            let rule = gram.rule(item.rule);
            if rule.accept {
                Ok(Action::Accept(rule.number))
            } else {
                Ok(Action::Reduce(rule.number))
            }
        }
        _ => Err(Error::AmbiguousEndGroup {
            state: state.id,
            items: state.dump(gram),
        }),
    }
}
