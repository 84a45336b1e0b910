//! A small regex compiler: patterns are parsed by `regex-syntax`, turned into Thompson NFAs
//! over character ranges, and combined into one DFA by subset construction.

use crate::lexer::{CharRange, CombinedMachine, PatternError, RegexCompiler};
use crate::TerminalId;
use log::{debug, trace};
use regex_syntax::hir::{Class, Hir, HirKind};
use std::collections::{BTreeSet, HashMap};

#[derive(Clone, Debug, Default)]
struct NfaState {
    transitions: Vec<(CharRange, usize)>,
    epsilon: Vec<usize>,
}

/// A Thompson NFA for one pattern.  It has a single accepting state, tagged with the terminal
/// it recognizes.
#[derive(Clone, Debug)]
pub struct Nfa {
    states: Vec<NfaState>,
    start: usize,
    accept: usize,
    tag: TerminalId,
}

impl Nfa {
    pub fn nstates(&self) -> usize {
        self.states.len()
    }

    pub fn tag(&self) -> TerminalId {
        self.tag
    }
}

struct NfaBuilder {
    states: Vec<NfaState>,
}

impl NfaBuilder {
    fn add_state(&mut self) -> usize {
        self.states.push(NfaState::default());
        self.states.len() - 1
    }

    fn epsilon(&mut self, from: usize, to: usize) {
        self.states[from].epsilon.push(to);
    }

    fn range(&mut self, from: usize, range: CharRange, to: usize) {
        self.states[from].transitions.push((range, to));
    }

    /// Builds a fragment for `hir` and returns its (start, end) states.
    fn build(&mut self, hir: &Hir) -> Result<(usize, usize), PatternError> {
        match hir.kind() {
            HirKind::Empty => {
                let s = self.add_state();
                Ok((s, s))
            }
            HirKind::Literal(lit) => {
                let text = std::str::from_utf8(&lit.0)
                    .map_err(|_| PatternError::new("literal is not valid UTF-8"))?;
                let start = self.add_state();
                let mut cur = start;
                for c in text.chars() {
                    let next = self.add_state();
                    self.range(cur, CharRange::single(c), next);
                    cur = next;
                }
                Ok((start, cur))
            }
            HirKind::Class(class) => {
                let start = self.add_state();
                let end = self.add_state();
                match class {
                    Class::Unicode(class) => {
                        for r in class.ranges() {
                            self.range(start, CharRange::new(r.start(), r.end()), end);
                        }
                    }
                    Class::Bytes(class) => {
                        for r in class.ranges() {
                            if !r.end().is_ascii() {
                                return Err(PatternError::new(format!(
                                    "byte class {:?} reaches past ASCII, which is not supported",
                                    class
                                )));
                            }
                            self.range(
                                start,
                                CharRange::new(char::from(r.start()), char::from(r.end())),
                                end,
                            );
                        }
                    }
                }
                Ok((start, end))
            }
            HirKind::Look(look) => Err(PatternError::new(format!(
                "look-around assertion {:?} is not supported",
                look
            ))),
            HirKind::Repetition(rep) => {
                let start = self.add_state();
                let mut cur = start;
                for _ in 0..rep.min {
                    let (a, b) = self.build(&rep.sub)?;
                    self.epsilon(cur, a);
                    cur = b;
                }
                match rep.max {
                    None => {
                        let (a, b) = self.build(&rep.sub)?;
                        let hub = self.add_state();
                        self.epsilon(cur, hub);
                        self.epsilon(hub, a);
                        self.epsilon(b, hub);
                        cur = hub;
                    }
                    Some(max) => {
                        let exit = self.add_state();
                        for _ in rep.min..max {
                            let (a, b) = self.build(&rep.sub)?;
                            self.epsilon(cur, a);
                            self.epsilon(cur, exit);
                            cur = b;
                        }
                        self.epsilon(cur, exit);
                        cur = exit;
                    }
                }
                Ok((start, cur))
            }
            HirKind::Capture(cap) => self.build(&cap.sub),
            HirKind::Concat(subs) => {
                let start = self.add_state();
                let mut cur = start;
                for sub in subs.iter() {
                    let (a, b) = self.build(sub)?;
                    self.epsilon(cur, a);
                    cur = b;
                }
                Ok((start, cur))
            }
            HirKind::Alternation(subs) => {
                let start = self.add_state();
                let end = self.add_state();
                for sub in subs.iter() {
                    let (a, b) = self.build(sub)?;
                    self.epsilon(start, a);
                    self.epsilon(b, end);
                }
                Ok((start, end))
            }
        }
    }
}

/// The reference `RegexCompiler`.
#[derive(Clone, Debug, Default)]
pub struct NfaRegexCompiler {}

impl NfaRegexCompiler {
    pub fn new() -> Self {
        Self {}
    }

    /// Builds the NFA for an already parsed pattern.
    pub fn compile_hir(&self, hir: &Hir, tag: TerminalId) -> Result<Nfa, PatternError> {
        let mut builder = NfaBuilder { states: Vec::new() };
        let (start, accept) = builder.build(hir)?;
        Ok(Nfa {
            states: builder.states,
            start,
            accept,
            tag,
        })
    }
}

impl RegexCompiler for NfaRegexCompiler {
    type Machine = Nfa;

    fn compile(&self, pattern: &str, tag: TerminalId) -> Result<Nfa, PatternError> {
        let hir = regex_syntax::Parser::new()
            .parse(pattern)
            .map_err(|e| PatternError::new(e.to_string()))?;
        let nfa = self.compile_hir(&hir, tag)?;
        trace!("pattern /{}/ -> {} nfa states", pattern, nfa.states.len());
        Ok(nfa)
    }

    fn combine(&self, machines: Vec<Nfa>) -> CombinedMachine {
        // Union of all machines under a new start state 0.
        let mut states: Vec<NfaState> = vec![NfaState::default()];
        let mut accepting: HashMap<usize, TerminalId> = HashMap::new();
        for m in machines {
            let offset = states.len();
            states[0].epsilon.push(m.start + offset);
            accepting.insert(m.accept + offset, m.tag);
            states.extend(m.states.into_iter().map(|s| NfaState {
                transitions: s
                    .transitions
                    .into_iter()
                    .map(|(r, t)| (r, t + offset))
                    .collect(),
                epsilon: s.epsilon.into_iter().map(|t| t + offset).collect(),
            }));
        }

        let events = disjoint_ranges(&states);
        debug!("combined nfa: {} states, {} events", states.len(), events.len());

        let mut state_map: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut sets: Vec<Vec<usize>> = Vec::new();
        let mut transitions: Vec<Vec<Option<usize>>> = Vec::new();
        let mut final_tags: Vec<Option<TerminalId>> = Vec::new();
        let mut collisions: Vec<(usize, Vec<TerminalId>)> = Vec::new();

        let start_set = epsilon_closure(&states, &[0]);
        state_map.insert(start_set.clone(), 0);
        final_tags.push(resolve_tag(&accepting, &start_set, 0, &mut collisions));
        sets.push(start_set);

        let mut this_state = 0;
        while this_state < sets.len() {
            let mut row = vec![None; events.len()];
            for (event, range) in events.iter().enumerate() {
                let targets: Vec<usize> = sets[this_state]
                    .iter()
                    .flat_map(|&s| states[s].transitions.iter())
                    .filter(|(r, _)| r.contains(range.from))
                    .map(|&(_, t)| t)
                    .collect();
                if targets.is_empty() {
                    continue;
                }
                let target_set = epsilon_closure(&states, &targets);
                let target = match state_map.get(&target_set) {
                    Some(&existing) => existing,
                    None => {
                        let new_state = sets.len();
                        final_tags.push(resolve_tag(
                            &accepting,
                            &target_set,
                            new_state,
                            &mut collisions,
                        ));
                        state_map.insert(target_set.clone(), new_state);
                        sets.push(target_set);
                        new_state
                    }
                };
                row[event] = Some(target);
            }
            transitions.push(row);
            this_state += 1;
        }

        CombinedMachine {
            initial_state: 0,
            events: events.into_iter().map(|r| vec![r]).collect(),
            transitions,
            final_tags,
            collisions,
        }
    }
}

/// Sorted set of states reachable from `seeds` through epsilon moves.
fn epsilon_closure(states: &[NfaState], seeds: &[usize]) -> Vec<usize> {
    let mut seen: BTreeSet<usize> = seeds.iter().copied().collect();
    let mut stack: Vec<usize> = seeds.to_vec();
    while let Some(s) = stack.pop() {
        for &t in states[s].epsilon.iter() {
            if seen.insert(t) {
                stack.push(t);
            }
        }
    }
    seen.into_iter().collect()
}

/// A DFA state is tagged only when all of its accepting NFA states agree on the terminal.
/// Otherwise the competing terminals are added to `collisions`.
fn resolve_tag(
    accepting: &HashMap<usize, TerminalId>,
    set: &[usize],
    state: usize,
    collisions: &mut Vec<(usize, Vec<TerminalId>)>,
) -> Option<TerminalId> {
    let tags: BTreeSet<TerminalId> = set.iter().filter_map(|s| accepting.get(s).copied()).collect();
    if tags.len() > 1 {
        debug!("dfa state {} accepts several terminals: {:?}", state, tags);
        collisions.push((state, tags.into_iter().collect()));
        return None;
    }
    tags.into_iter().next()
}

const SURROGATES: core::ops::RangeInclusive<u32> = 0xD800..=0xDFFF;

/// Splits the labels of all transitions into disjoint ranges, so that each range is either
/// wholly inside or wholly outside every label.  Gaps covered by no label are dropped.
fn disjoint_ranges(states: &[NfaState]) -> Vec<CharRange> {
    let labels: Vec<CharRange> = states
        .iter()
        .flat_map(|s| s.transitions.iter().map(|&(r, _)| r))
        .collect();

    let mut bounds: BTreeSet<u32> = BTreeSet::new();
    for r in labels.iter() {
        bounds.insert(r.from as u32);
        bounds.insert(r.to as u32 + 1);
    }
    let bounds: Vec<u32> = bounds.into_iter().collect();

    let mut out = Vec::new();
    for w in bounds.windows(2) {
        let mut lo = w[0];
        let mut hi = w[1] - 1;
        if SURROGATES.contains(&lo) {
            lo = *SURROGATES.end() + 1;
        }
        if SURROGATES.contains(&hi) {
            hi = *SURROGATES.start() - 1;
        }
        let (from, to) = match (char::from_u32(lo), char::from_u32(hi)) {
            (Some(from), Some(to)) if from <= to => (from, to),
            _ => continue,
        };
        if labels.iter().any(|l| l.contains(from)) {
            out.push(CharRange::new(from, to));
        }
    }
    out
}
