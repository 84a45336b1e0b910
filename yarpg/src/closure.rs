use crate::grammar::Grammar;
use crate::lr0::Item;
use crate::ramp_table::RampTable;
use crate::util::{Bitmat, Bitv32};
use crate::{NonTerminalId, RuleId, Symbol};
use log::debug;
use std::collections::BTreeSet;

// maps from NonTerminal -> [Rule]
pub type DerivesTable = RampTable<NonTerminalId, RuleId>;

/// Computes the DERIVES table, which maps each non-terminal to the rules it is the left-hand
/// side of.
pub fn set_derives(gram: &Grammar) -> DerivesTable {
    let mut derives = DerivesTable::new();
    for nt in gram.non_terminals.ids() {
        for rule in gram.rules_for(nt) {
            derives.push_value(rule.number);
        }
        derives.finish_key();
    }
    print_derives(gram, &derives);
    derives
}

/// Computes the "epsilon-free firsts" (EFF) relation, a bit matrix [nnon_terminals,
/// nnon_terminals].  Row A has column B set when some rule of A starts with B, or B is
/// reachable that way through other non-terminals, or A == B.
fn set_eff(gram: &Grammar, derives: &DerivesTable) -> Bitmat {
    let n = gram.nnon_terminals();
    let mut eff = Bitmat::new(n, n);
    for (row, rules) in derives.iter_values().enumerate() {
        for &rule in rules {
            if let Some(&Symbol::NonTerminal(first)) = gram.rule(rule).rhs.first() {
                eff.set(row, first.index());
            }
        }
    }
    eff.reflexive_transitive_closure();
    print_eff(gram, &eff);
    eff
}

/// Returns the first_derives relation, which is a bit matrix of size [nnon_terminals, nrules].
/// Row A holds every rule whose item at position 0 belongs in a state that expects A.
pub fn set_first_derives(gram: &Grammar, derives: &DerivesTable) -> Bitmat {
    let eff = set_eff(gram, derives);
    let mut first_derives = Bitmat::new(gram.nnon_terminals(), gram.nrules());
    for (i, j) in eff.iter_ones() {
        for &rule in derives.values(NonTerminalId::from(j)) {
            first_derives.set(i, rule.index());
        }
    }
    print_first_derives(gram, &first_derives);
    first_derives
}

/// Computes the closure of `kernel`.  For each item that still has symbols to read and whose
/// current symbol is a non-terminal, the matching row of `first_derives` is merged into
/// `rule_set`; then an item at position 0 is added for each rule found.
///
/// `rule_set` is scratch space of `nrules` bits, owned by the caller so that it is not
/// reallocated for every state.
pub fn closure(
    gram: &Grammar,
    kernel: &BTreeSet<Item>,
    first_derives: &Bitmat,
    rule_set: &mut Bitv32,
) -> BTreeSet<Item> {
    rule_set.set_all(false);
    for item in kernel.iter() {
        if !item.has_more_symbols(gram) {
            continue;
        }
        if let Some(Symbol::NonTerminal(nt)) = item.current_symbol(gram) {
            rule_set.union_with(first_derives.row(nt.index()));
        }
    }

    let mut items = kernel.clone();
    for r in rule_set.iter_ones() {
        items.insert(Item::new(RuleId::from(r), 0));
    }
    items
}

fn print_derives(gram: &Grammar, derives: &DerivesTable) {
    debug!("DERIVES:");
    for nt in gram.non_terminals.ids() {
        debug!("    {} derives rules: ", gram.non_terminal(nt).name);
        for &rule in derives.values(nt) {
            debug!("        {}", gram.rule_to_str(rule));
        }
    }
}

fn print_eff(gram: &Grammar, eff: &Bitmat) {
    debug!("Epsilon Free Firsts");
    for i in 0..eff.rows {
        debug!("{}", gram.non_terminals.vec()[i].name);
        for j in eff.iter_ones_in_row(i) {
            debug!("  {}", gram.non_terminals.vec()[j].name);
        }
    }
}

fn print_first_derives(gram: &Grammar, first_derives: &Bitmat) {
    debug!("");
    debug!("First Derives");
    debug!("");
    for i in 0..first_derives.rows {
        debug!("{} derives", gram.non_terminals.vec()[i].name);
        for j in first_derives.iter_ones_in_row(i) {
            debug!("    {}", gram.rule_to_str(RuleId::from(j)));
        }
    }
}
