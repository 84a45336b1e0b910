use crate::errors::Error;
use crate::grammar::{Associativity, Grammar};
use crate::lr0::{Automaton, Item, State};
use crate::tvec::TVec;
use crate::{Action, RuleId, StateId, Symbol, TerminalId};
use log::{debug, warn};

/// How a shift/reduce conflict was settled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// The reduce rule binds tighter, or both are equal and left-associative.
    Reduce,
    /// The shift rule binds tighter, or both are equal and right-associative.
    Shift,
    /// Both are equal and non-associative; the input is a syntax error.
    Error,
    /// One of the rules has no precedence.
    ShiftByDefault,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateId,
    pub terminal: TerminalId,
    pub shift_rule: RuleId,
    pub reduce_rule: RuleId,
    pub resolution: Resolution,
}

/// The dense rows of one state, before compression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateRows {
    /// Indexed by terminal number.
    pub actions: Vec<Action>,
    /// Indexed by non-terminal number.
    pub gotos: Vec<Action>,
}

#[derive(Clone, Debug)]
pub struct ResolvedRows {
    pub rows: TVec<StateId, StateRows>,
    pub conflicts: Vec<Conflict>,
}

/// Builds the action and goto rows of every state, settling shift/reduce conflicts by
/// precedence.  Items whose action changes are updated in `automaton`.
pub fn resolve_conflicts(gram: &Grammar, automaton: &mut Automaton) -> Result<ResolvedRows, Error> {
    let mut rows: TVec<StateId, StateRows> = TVec::new();
    let mut conflicts: Vec<Conflict> = Vec::new();
    for state in automaton.states.iter_mut() {
        rows.push(resolve_state(gram, state, &mut conflicts)?);
    }

    let srtotal = conflicts
        .iter()
        .filter(|c| c.resolution == Resolution::ShiftByDefault)
        .count();
    if srtotal > 0 {
        warn!("{} shift/reduce conflict(s) resolved by shifting", srtotal);
    }
    report_unused_rules(gram, &rows);

    Ok(ResolvedRows { rows, conflicts })
}

fn resolve_state(
    gram: &Grammar,
    state: &mut State,
    conflicts: &mut Vec<Conflict>,
) -> Result<StateRows, Error> {
    let mut action_row: Vec<Option<Action>> = vec![None; gram.nterminals()];
    let mut goto_row: Vec<Option<Action>> = vec![None; gram.nnon_terminals()];
    let mut reduction: Option<RuleId> = None;
    let mut shifts: Vec<(Item, TerminalId)> = Vec::new();

    for (&item, &action) in state.items.iter() {
        let action = match action {
            Some(action) => action,
            None => {
                return Err(Error::UnassignedItem {
                    state: state.id,
                    items: state.dump(gram),
                })
            }
        };
        match (action, item.current_symbol(gram)) {
            (Action::Goto(_), Some(Symbol::NonTerminal(nt))) => {
                goto_row[nt.index()] = Some(action);
            }
            (Action::Shift(_), Some(Symbol::Terminal(t))) => {
                action_row[t.index()] = Some(action);
                shifts.push((item, t));
            }
            (Action::Accept(_), Some(Symbol::Terminal(t))) => {
                action_row[t.index()] = Some(action);
            }
            // build_automaton already rejects a completed group of more than one item,
            // so a second reduction only shows up in a hand-assembled automaton.
            (Action::Reduce(rule), _) => match reduction {
                Some(existing) if existing != rule => {
                    return Err(Error::MultipleReductions {
                        state: state.id,
                        rules: state.dump(gram),
                    });
                }
                _ => reduction = Some(rule),
            },
            _ => debug!(
                "s{}: ignoring {} for {}",
                state.id,
                action,
                item.to_str(gram)
            ),
        }
    }

    if let Some(reduce_rule) = reduction {
        if !shifts.is_empty() {
            debug!("before resolution:\n{}", state.dump(gram));
            for &(item, terminal) in shifts.iter() {
                let resolution = resolve_shift_reduce(gram, item.rule, reduce_rule);
                let conflict = Conflict {
                    state: state.id,
                    terminal,
                    shift_rule: item.rule,
                    reduce_rule,
                    resolution,
                };
                warn!(
                    "s{}: shift/reduce conflict on {} between {} and {}, resolved as {:?}",
                    state.id,
                    gram.terminal(terminal).name,
                    gram.rule_to_str(item.rule),
                    gram.rule_to_str(reduce_rule),
                    resolution
                );
                match resolution {
                    Resolution::Reduce => {
                        action_row[terminal.index()] = Some(Action::Reduce(reduce_rule));
                        state.set_action(item, Action::Reduce(reduce_rule));
                    }
                    Resolution::Error => {
                        action_row[terminal.index()] = Some(Action::Error);
                        state.set_action(item, Action::Error);
                    }
                    Resolution::Shift | Resolution::ShiftByDefault => {}
                }
                conflicts.push(conflict);
            }
            debug!("after resolution:\n{}", state.dump(gram));
        }
    }

    // Without lookahead, a state that reduces does so on anything it cannot shift.
    let default_action = match reduction {
        Some(rule) => Action::Reduce(rule),
        None => Action::Error,
    };
    let actions: Vec<Action> = action_row
        .into_iter()
        .map(|a| a.unwrap_or(default_action))
        .collect();
    let gotos: Vec<Action> = goto_row
        .into_iter()
        .map(|a| a.unwrap_or(Action::Error))
        .collect();

    debug!("s{} actions: {:?}", state.id, actions);
    debug!("s{} gotos: {:?}", state.id, gotos);
    Ok(StateRows { actions, gotos })
}

fn resolve_shift_reduce(gram: &Grammar, shift_rule: RuleId, reduce_rule: RuleId) -> Resolution {
    match (
        gram.rule_precedence(reduce_rule),
        gram.rule_precedence(shift_rule),
    ) {
        (Some(reduce), Some(shift)) => {
            if reduce.level > shift.level {
                Resolution::Reduce
            } else if reduce.level < shift.level {
                Resolution::Shift
            } else {
                match reduce.associativity {
                    Associativity::Left => Resolution::Reduce,
                    Associativity::Right => Resolution::Shift,
                    Associativity::NonAssoc => Resolution::Error,
                }
            }
        }
        _ => Resolution::ShiftByDefault,
    }
}

fn report_unused_rules(gram: &Grammar, rows: &TVec<StateId, StateRows>) {
    let mut rules_used = vec![false; gram.nrules()];
    for row in rows.iter() {
        for action in row.actions.iter() {
            match *action {
                Action::Reduce(rule) | Action::Accept(rule) => rules_used[rule.index()] = true,
                _ => {}
            }
        }
    }

    for (i, used) in rules_used.iter().enumerate() {
        if !used {
            warn!("rule {} is never reduced", gram.rule_to_str(RuleId::from(i)));
        }
    }
}
