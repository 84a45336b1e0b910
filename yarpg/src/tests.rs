use super::*;
use std::collections::BTreeSet;

#[static_init::dynamic]
static INIT_LOGGER: () = {
    env_logger::builder().default_format_timestamp(false).init();
};

/// S : E EOF ; E : E PLUS E | E TIMES E | NUMBER
/// `precedence` is a list of (associativity, members), lowest first.
fn ambiguous(precedence: &[(&str, &[&str])]) -> Grammar {
    let mut g = GrammarBuilder::new();
    g.terminal("PLUS", Some(r"\+"), None);
    g.terminal("TIMES", Some(r"\*"), None);
    g.terminal("NUMBER", Some("[0-9]+"), None);
    for &(assoc, members) in precedence {
        g.precedence(assoc, members);
    }
    g.rule("S", &["E", "EOF"]).code("$$ = $1;");
    g.rule("E", &["E", "PLUS", "E"]).code("$$ = $1 + $3;");
    g.rule("E", &["E", "TIMES", "E"]).code("$$ = $1 * $3;");
    g.rule("E", &["NUMBER"]).code("$$ = $1;");
    g.accept("S");
    g.build().unwrap()
}

fn t(gram: &Grammar, name: &str) -> TerminalId {
    gram.find_terminal(name).unwrap()
}

/// The state that holds `item` in its item set.
fn state_with(automaton: &Automaton, item: Item) -> StateId {
    automaton
        .states
        .iter()
        .find(|s| s.items.contains_key(&item))
        .map(|s| s.id)
        .unwrap()
}

fn tables(gram: &Grammar) -> (Automaton, ResolvedRows, ParseTables) {
    let mut automaton = build_automaton(gram).unwrap();
    let rows = resolve_conflicts(gram, &mut automaton).unwrap();
    let tables = compress(&rows);
    (automaton, rows, tables)
}

const PLUS_RULE: RuleId = RuleId(1);
const TIMES_RULE: RuleId = RuleId(2);

/// The action in the state reached after `E op E`, on `lookahead`.
fn action_after(precedence: &[(&str, &[&str])], rule: RuleId, lookahead: &str) -> Action {
    let gram = ambiguous(precedence);
    let (automaton, _, tables) = tables(&gram);
    let state = state_with(&automaton, Item::new(rule, 3));
    tables.action(state, t(&gram, lookahead)).unwrap()
}

#[test]
fn numbering_is_dense() {
    let gram = ambiguous(&[]);
    let names: Vec<&str> = gram.terminals.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["EOF", "PLUS", "TIMES", "NUMBER"]);
    assert_eq!(
        gram.terminals.iter().filter(|t| t.name == EOF).count(),
        1
    );
    for (i, t) in gram.terminals.iter().enumerate() {
        assert_eq!(t.number.index(), i);
    }

    let names: Vec<&str> = gram.non_terminals.iter().map(|nt| nt.name.as_str()).collect();
    assert_eq!(names, ["S", "E"]);
    for (i, nt) in gram.non_terminals.iter().enumerate() {
        assert_eq!(nt.number.index(), i);
        assert_eq!(nt.value_type, "Node");
    }

    for (i, r) in gram.rules.iter().enumerate() {
        assert_eq!(r.number.index(), i);
    }
    assert!(gram.rule(RuleId(0)).accept);
    assert!(!gram.rule(PLUS_RULE).accept);
}

#[test]
fn non_terminals_numbered_by_first_appearance() {
    let mut g = GrammarBuilder::new();
    g.terminal("X", None, None);
    g.rule("S", &["A", "B", "EOF"]);
    g.rule("B", &["X"]).value_type("BNode");
    g.rule("A", &["X"]);
    g.accept("S");
    let gram = g.build().unwrap();
    let names: Vec<&str> = gram.non_terminals.iter().map(|nt| nt.name.as_str()).collect();
    assert_eq!(names, ["S", "A", "B"]);
    assert_eq!(gram.non_terminal(NonTerminalId(2)).value_type, "BNode");
}

#[test]
fn rule_precedence_from_rightmost_terminal() {
    let gram = ambiguous(&[("left", &["PLUS"]), ("left", &["TIMES"])]);
    assert_eq!(gram.rule_precedence(PLUS_RULE).unwrap().level, 1);
    assert_eq!(gram.rule_precedence(TIMES_RULE).unwrap().level, 2);
    assert!(gram.rule_precedence(RuleId(3)).is_none());
}

#[test]
fn explicit_prec_overrides_rightmost_terminal() {
    let mut g = GrammarBuilder::new();
    g.terminal("MINUS", None, None);
    g.terminal("NUMBER", None, None);
    g.precedence("left", &["MINUS"]);
    g.precedence("right", &["UMINUS"]);
    g.rule("S", &["E", "EOF"]);
    g.rule("E", &["MINUS", "E"]).prec("UMINUS");
    g.rule("E", &["NUMBER"]);
    g.accept("S");
    let gram = g.build().unwrap();
    let prec = gram.rule_precedence(RuleId(1)).unwrap();
    assert_eq!(prec.level, 2);
    assert_eq!(prec.associativity, Associativity::Right);
}

#[test]
fn associativity_keywords() {
    assert_eq!("LEFT".parse::<Associativity>().unwrap(), Associativity::Left);
    assert_eq!("Right".parse::<Associativity>().unwrap(), Associativity::Right);
    assert_eq!(
        "nonassoc".parse::<Associativity>().unwrap(),
        Associativity::NonAssoc
    );
    match "middle".parse::<Associativity>() {
        Err(Error::UnknownAssociativity { keyword }) => assert_eq!(keyword, "middle"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn configuration_errors() {
    let mut g = GrammarBuilder::new();
    g.terminal("EOF", None, None);
    g.rule("S", &["EOF"]);
    g.accept("S");
    assert!(matches!(g.build(), Err(Error::ReservedTerminal { .. })));

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None).terminal("A", None, None);
    g.rule("S", &["A", "EOF"]);
    g.accept("S");
    assert!(matches!(g.build(), Err(Error::DuplicateTerminal { .. })));

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.rule("S", &["A", "Missing", "EOF"]);
    g.accept("S");
    match g.build() {
        Err(Error::UndefinedSymbol { names }) => assert_eq!(names, ["Missing"]),
        other => panic!("unexpected: {:?}", other),
    }

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.rule("S", &["A", "EOF"]);
    g.rule("S", &["EOF"]);
    g.accept("S");
    assert!(matches!(
        g.build(),
        Err(Error::MultipleAcceptRules { count: 2, .. })
    ));

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.rule("S", &["A"]);
    g.accept("S");
    assert!(matches!(g.build(), Err(Error::AcceptRuleWithoutEof { .. })));

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.rule("S", &["A", "EOF"]);
    g.accept("S").accept("S");
    assert!(matches!(g.build(), Err(Error::DuplicateAccept { .. })));

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.rule("S", &["A", "EOF"]);
    g.accept("T");
    assert!(matches!(g.build(), Err(Error::NoAcceptRule { .. })));

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.rule("S", &["A", "EOF"]);
    assert!(matches!(g.build(), Err(Error::NoAcceptStates)));

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.precedence("left", &["A"]).precedence("right", &["A"]);
    g.rule("S", &["A", "EOF"]);
    g.accept("S");
    assert!(matches!(g.build(), Err(Error::DuplicatePrecedence { .. })));

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.rule("S", &["A", "EOF"]).prec("NOWHERE");
    g.accept("S");
    assert!(matches!(g.build(), Err(Error::UnknownPrecedence { .. })));

    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.rule("S", &["A", "EOF"]);
    g.rule("A", &["EOF"]);
    g.accept("S");
    assert!(matches!(g.build(), Err(Error::TerminalOnLeftSide { .. })));
}

#[test]
fn settings_validation() {
    let mut s = Settings::default();
    assert!(matches!(s.validate(), Err(Error::MissingSetting { .. })));
    s.parser_name = Some("P".to_string());
    assert!(matches!(s.validate(), Err(Error::MissingSetting { .. })));
    s.token_enum = Some("Tok".to_string());
    assert!(s.validate().is_ok());
}

#[test]
fn action_encoding() {
    assert_eq!(Action::Error.encode(), -8);
    assert_eq!(Action::Shift(StateId(5)).encode(), (5 << 3) | 1);
    assert_eq!(Action::Accept(RuleId(0)).encode(), 4);
    for &a in [
        Action::Error,
        Action::Shift(StateId(7)),
        Action::Reduce(RuleId(3)),
        Action::Goto(StateId(12)),
        Action::Accept(RuleId(0)),
    ]
    .iter()
    {
        assert_eq!(Action::decode(a.encode()), Some(a));
    }
    assert_eq!(Action::decode(5), None);
}

#[test]
fn closure_follows_leading_non_terminals() {
    // S : A EOF ; A : B x | y ; B : z
    let mut g = GrammarBuilder::new();
    g.terminal("x", None, None)
        .terminal("y", None, None)
        .terminal("z", None, None);
    g.rule("S", &["A", "EOF"]);
    g.rule("A", &["B", "x"]);
    g.rule("A", &["y"]);
    g.rule("B", &["z"]);
    g.accept("S");
    let gram = g.build().unwrap();
    let automaton = build_automaton(&gram).unwrap();

    let s0: BTreeSet<Item> = automaton.state(StateId(0)).items.keys().copied().collect();
    let expected: BTreeSet<Item> = (0..4).map(|r| Item::new(RuleId(r), 0)).collect();
    assert_eq!(s0, expected);
}

#[test]
fn every_item_has_an_action() {
    let gram = ambiguous(&[("left", &["PLUS"]), ("left", &["TIMES"])]);
    let automaton = build_automaton(&gram).unwrap();
    for state in automaton.states.iter() {
        for (item, action) in state.items.iter() {
            assert!(action.is_some(), "s{} {}", state.id, item.to_str(&gram));
        }
    }
}

#[test]
fn equal_groups_share_a_state() {
    let gram = ambiguous(&[]);
    let automaton = build_automaton(&gram).unwrap();
    // E : NUMBER . is reached from three states, but exists only once.
    let count = automaton
        .states
        .iter()
        .filter(|s| s.items.contains_key(&Item::new(RuleId(3), 1)))
        .count();
    assert_eq!(count, 1);
    assert_eq!(automaton.nstates(), 7);
}

#[test]
fn accept_on_eof() {
    let gram = ambiguous(&[]);
    let (automaton, _, tables) = tables(&gram);
    let state = state_with(&automaton, Item::new(RuleId(0), 1));
    assert_eq!(
        tables.action(state, TerminalId::EOF),
        Some(Action::Accept(RuleId(0)))
    );
}

#[test]
fn higher_reduce_precedence_reduces() {
    let prec: &[(&str, &[&str])] = &[("left", &["PLUS"]), ("left", &["TIMES"])];
    assert_eq!(
        action_after(prec, TIMES_RULE, "PLUS"),
        Action::Reduce(TIMES_RULE)
    );
}

#[test]
fn lower_reduce_precedence_shifts() {
    let prec: &[(&str, &[&str])] = &[("left", &["PLUS"]), ("left", &["TIMES"])];
    assert!(matches!(
        action_after(prec, PLUS_RULE, "TIMES"),
        Action::Shift(_)
    ));
}

#[test]
fn equal_left_reduces() {
    let prec: &[(&str, &[&str])] = &[("left", &["PLUS"])];
    assert_eq!(
        action_after(prec, PLUS_RULE, "PLUS"),
        Action::Reduce(PLUS_RULE)
    );
}

#[test]
fn equal_nonassoc_is_error() {
    let prec: &[(&str, &[&str])] = &[("nonassoc", &["PLUS"])];
    assert_eq!(action_after(prec, PLUS_RULE, "PLUS"), Action::Error);
}

#[test]
fn equal_right_shifts() {
    let prec: &[(&str, &[&str])] = &[("right", &["PLUS"])];
    assert!(matches!(
        action_after(prec, PLUS_RULE, "PLUS"),
        Action::Shift(_)
    ));
}

#[test]
fn missing_precedence_shifts() {
    let gram = ambiguous(&[]);
    let (automaton, rows, tables) = tables(&gram);
    let state = state_with(&automaton, Item::new(PLUS_RULE, 3));
    assert!(matches!(
        tables.action(state, t(&gram, "PLUS")),
        Some(Action::Shift(_))
    ));
    assert!(rows
        .conflicts
        .iter()
        .all(|c| c.resolution == Resolution::ShiftByDefault));
    assert_eq!(rows.conflicts.len(), 4);
}

#[test]
fn conflicts_are_recorded() {
    let gram = ambiguous(&[("left", &["PLUS"]), ("left", &["TIMES"])]);
    let (automaton, rows, _) = tables(&gram);
    let state = state_with(&automaton, Item::new(PLUS_RULE, 3));
    let in_state: Vec<&Conflict> = rows.conflicts.iter().filter(|c| c.state == state).collect();
    assert_eq!(in_state.len(), 2);
    let on_plus = in_state
        .iter()
        .find(|c| c.terminal == t(&gram, "PLUS"))
        .unwrap();
    assert_eq!(on_plus.resolution, Resolution::Reduce);
    assert_eq!(on_plus.reduce_rule, PLUS_RULE);
    let on_times = in_state
        .iter()
        .find(|c| c.terminal == t(&gram, "TIMES"))
        .unwrap();
    assert_eq!(on_times.resolution, Resolution::Shift);

    // The shift item was rewritten to the reduction.
    assert_eq!(
        automaton.state(state).action(Item::new(PLUS_RULE, 1)),
        Some(Action::Reduce(PLUS_RULE))
    );
}

#[test]
fn reduce_fills_empty_cells() {
    let gram = ambiguous(&[("left", &["PLUS"]), ("left", &["TIMES"])]);
    let (automaton, rows, _) = tables(&gram);
    let state = state_with(&automaton, Item::new(RuleId(3), 1));
    assert!(rows.rows[state]
        .actions
        .iter()
        .all(|&a| a == Action::Reduce(RuleId(3))));
    assert!(rows.rows[state].gotos.iter().all(|&a| a == Action::Error));
}

#[test]
fn compression_round_trip() {
    let gram = ambiguous(&[("left", &["PLUS"]), ("left", &["TIMES"])]);
    let (_, rows, tables) = tables(&gram);
    assert_eq!(tables.nstates(), rows.rows.len());
    for (state, row) in rows.rows.iter_enumerated() {
        for (t, &expected) in row.actions.iter().enumerate() {
            assert_eq!(tables.action(state, TerminalId::from(t)), Some(expected));
        }
        for (nt, &expected) in row.gotos.iter().enumerate() {
            assert_eq!(tables.goto(state, NonTerminalId::from(nt)), Some(expected));
        }
    }
}

#[test]
fn uniform_rows_are_inline() {
    let gram = ambiguous(&[("left", &["PLUS"]), ("left", &["TIMES"])]);
    let (automaton, _, tables) = tables(&gram);
    let state = state_with(&automaton, Item::new(RuleId(3), 1));
    let entry = tables.action_index[state.index()];
    assert_eq!(entry & 1, 1);
    assert_eq!(entry >> 1, Action::Reduce(RuleId(3)).encode());
}

#[test]
fn equal_rows_are_stored_once() {
    let gram = ambiguous(&[("left", &["PLUS"]), ("left", &["TIMES"])]);
    let (_, rows, tables) = tables(&gram);
    for (a, ra) in rows.rows.iter_enumerated() {
        for (b, rb) in rows.rows.iter_enumerated() {
            if ra.gotos == rb.gotos {
                assert_eq!(tables.goto_index[a.index()], tables.goto_index[b.index()]);
            }
            if ra.actions == rb.actions {
                assert_eq!(
                    tables.action_index[a.index()],
                    tables.action_index[b.index()]
                );
            }
        }
    }
    for (i, row) in tables.action_table.iter().enumerate() {
        assert!(!tables.action_table[i + 1..].contains(row));
    }
}

#[test]
fn encoded_tables_match_rows() {
    let gram = ambiguous(&[]);
    let (_, _, tables) = tables(&gram);
    let encoded = tables.encoded_action_table();
    assert_eq!(encoded.len(), tables.action_table.len());
    for (row, codes) in tables.action_table.iter().zip(encoded.iter()) {
        let decoded: Vec<Action> = codes.iter().map(|&c| Action::decode(c).unwrap()).collect();
        assert_eq!(&decoded, row);
    }
    assert_eq!(tables.encoded_goto_table().len(), tables.goto_table.len());
}

#[test]
fn action_code_substitution() {
    let names = vec![Some("n1".to_string()), None, Some("n3".to_string())];
    assert_eq!(
        resolve("$$ = add($1, $3);", "node", &names).unwrap(),
        "node = add(n1, n3);"
    );
    assert_eq!(resolve("", "node", &names).unwrap(), ";");
    assert_eq!(resolve("   ", "node", &names).unwrap(), ";");
    assert_eq!(resolve("print($1);", "node", &names), None);
    // Unnamed and out-of-range positions are left alone.
    assert_eq!(
        resolve("$$ = f($2, $9, $);", "node", &names).unwrap(),
        "node = f($2, $9, $);"
    );
}

#[test]
fn multi_digit_positions() {
    let names: Vec<Option<String>> = (1..=12).map(|i| Some(format!("v{}", i))).collect();
    assert_eq!(
        resolve("$$ = $12 + $1;", "node", &names).unwrap(),
        "node = v12 + v1;"
    );
    let used = used_positions("$$ = $12 + $1 + $1 + $40;", 12);
    assert_eq!(used.into_iter().collect::<Vec<_>>(), [1, 12]);
}

#[test]
fn missing_lhs_names_the_rule() {
    let mut g = GrammarBuilder::new();
    g.terminal("A", None, None);
    g.rule("S", &["A", "EOF"]).code("print($1);");
    g.accept("S");
    let gram = g.build().unwrap();
    match resolve_rule_code(&gram, RuleId(0), "node", &[None, None]) {
        Err(Error::MissingLhsAssignment { rule }) => assert_eq!(rule, "(r0) S : A EOF"),
        other => panic!("unexpected: {:?}", other),
    }
}

/// A compiler that hands back canned machines, to test the assembler on its own.
struct CannedCompiler {
    machine: CombinedMachine,
}

impl RegexCompiler for CannedCompiler {
    type Machine = TerminalId;

    fn compile(&self, pattern: &str, tag: TerminalId) -> Result<TerminalId, PatternError> {
        if pattern == "(" {
            Err(PatternError::new("unbalanced"))
        } else {
            Ok(tag)
        }
    }

    fn combine(&self, _machines: Vec<TerminalId>) -> CombinedMachine {
        self.machine.clone()
    }
}

fn terminal(name: &str, number: u32, pattern: Option<&str>, code: Option<&str>) -> Terminal {
    Terminal {
        name: name.to_string(),
        number: TerminalId(number),
        pattern: pattern.map(str::to_string),
        code: code.map(str::to_string),
    }
}

#[test]
fn assemble_exposes_machine() {
    let compiler = CannedCompiler {
        machine: CombinedMachine {
            initial_state: 0,
            events: vec![
                vec![CharRange::new('0', '9')],
                vec![CharRange::single('+'), CharRange::single('-')],
            ],
            transitions: vec![
                vec![Some(1), Some(2)],
                vec![Some(1), None],
                vec![None, None],
            ],
            final_tags: vec![None, Some(TerminalId(2)), Some(TerminalId(1))],
            collisions: vec![(0, vec![TerminalId(1), TerminalId(2)])],
        },
    };
    let terminals = vec![
        terminal("EOF", 0, Some("never compiled"), None),
        terminal("SIGN", 1, Some("[+-]"), Some("sign()")),
        terminal("NUMBER", 2, Some("[0-9]+"), None),
        terminal("UNUSED", 3, None, None),
    ];
    let lexer = assemble(&terminals, &compiler).unwrap();

    assert_eq!(lexer.initial_state, 0);
    assert_eq!(
        lexer.token_per_state,
        [None, Some("NUMBER".to_string()), Some("SIGN".to_string())]
    );
    assert_eq!(
        lexer.event_map,
        [
            (CharRange::new('0', '9'), 0),
            (CharRange::single('+'), 1),
            (CharRange::single('-'), 1),
        ]
    );
    assert_eq!(lexer.classify('7'), 0);
    assert_eq!(lexer.classify('-'), 1);
    assert_eq!(lexer.classify('x'), lexer.default_event());
    assert_eq!(lexer.default_event(), 3);
    assert_eq!(lexer.next_state(0, '4'), Some(1));
    assert_eq!(lexer.next_state(1, '+'), None);
    assert_eq!(
        lexer.token_actions,
        [("SIGN".to_string(), "sign()".to_string())]
    );
    assert_eq!(lexer.encoded_transitions()[1], [1, -1]);
    assert_eq!(
        lexer.collisions,
        [(0, vec!["SIGN".to_string(), "NUMBER".to_string()])]
    );
}

#[test]
fn pattern_error_names_terminal() {
    let compiler = CannedCompiler {
        machine: CombinedMachine {
            initial_state: 0,
            events: vec![],
            transitions: vec![vec![]],
            final_tags: vec![None],
            collisions: vec![],
        },
    };
    let terminals = vec![
        terminal("EOF", 0, None, None),
        terminal("LPAREN", 1, Some("("), None),
    ];
    match assemble(&terminals, &compiler) {
        Err(Error::InvalidPattern { terminal, .. }) => assert_eq!(terminal, "LPAREN"),
        other => panic!("unexpected: {:?}", other),
    }

    let terminals = vec![terminal("BAD", 1, Some("(abc"), None)];
    match assemble(&terminals, &NfaRegexCompiler::new()) {
        Err(Error::InvalidPattern { terminal, .. }) => assert_eq!(terminal, "BAD"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn look_assertions_are_rejected() {
    let err = NfaRegexCompiler::new()
        .compile("^a", TerminalId(1))
        .unwrap_err();
    assert!(err.message.contains("not supported"), "{}", err);
}

#[test]
fn nfa_compiler_splits_ranges() {
    let compiler = NfaRegexCompiler::new();
    let machines = vec![
        compiler.compile("[a-z]+", TerminalId(1)).unwrap(),
        compiler.compile("if", TerminalId(2)).unwrap(),
    ];
    let combined = compiler.combine(machines);
    let ranges: Vec<CharRange> = combined.events.iter().flatten().copied().collect();
    assert_eq!(
        ranges,
        [
            CharRange::new('a', 'e'),
            CharRange::single('f'),
            CharRange::new('g', 'h'),
            CharRange::single('i'),
            CharRange::new('j', 'z'),
        ]
    );

    let i_event = 3;
    let f_event = 1;
    let after_i = combined.transitions[combined.initial_state][i_event].unwrap();
    assert_eq!(combined.final_tags[after_i], Some(TerminalId(1)));
    // "if" is both an identifier and a keyword, so that state is untagged.
    let after_if = combined.transitions[after_i][f_event].unwrap();
    assert_eq!(combined.final_tags[after_if], None);
    let after_ifa = combined.transitions[after_if][0].unwrap();
    assert_eq!(combined.final_tags[after_ifa], Some(TerminalId(1)));
    assert_eq!(combined.final_tags[combined.initial_state], None);
    assert_eq!(
        combined.collisions,
        [(after_if, vec![TerminalId(1), TerminalId(2)])]
    );
}

#[test]
fn byte_classes_must_be_ascii() {
    use regex_syntax::hir::{Class, ClassBytes, ClassBytesRange, Hir};

    let compiler = NfaRegexCompiler::new();
    let nfa = compiler.compile("(?-u)[a-c]", TerminalId(7)).unwrap();
    assert_eq!(nfa.tag(), TerminalId(7));
    assert_eq!(nfa.nstates(), 2);
    let combined = compiler.combine(vec![nfa]);
    assert_eq!(combined.events, [vec![CharRange::new('a', 'c')]]);

    let high = Hir::class(Class::Bytes(ClassBytes::new(vec![ClassBytesRange::new(
        0x41, 0xFF,
    )])));
    let err = compiler.compile_hir(&high, TerminalId(7)).unwrap_err();
    assert!(err.message.contains("past ASCII"), "{}", err);
}

#[test]
fn nfa_compiler_counted_repetition() {
    let compiler = NfaRegexCompiler::new();
    let combined = compiler.combine(vec![compiler.compile("x{2,3}", TerminalId(4)).unwrap()]);
    let mut state = combined.initial_state;
    let mut tags = Vec::new();
    for _ in 0..3 {
        state = combined.transitions[state][0].unwrap();
        tags.push(combined.final_tags[state]);
    }
    assert_eq!(tags, [None, Some(TerminalId(4)), Some(TerminalId(4))]);
    assert_eq!(combined.transitions[state][0], None);
}

/// S : E EOF ; E : A | B ; A : x ; B : x
fn reduce_reduce() -> Grammar {
    let mut g = GrammarBuilder::new();
    g.terminal("x", None, None);
    g.rule("S", &["E", "EOF"]);
    g.rule("E", &["A"]);
    g.rule("E", &["B"]);
    g.rule("A", &["x"]);
    g.rule("B", &["x"]);
    g.accept("S");
    g.build().unwrap()
}

#[test]
fn reduce_reduce_is_an_ambiguous_end_group() {
    let gram = reduce_reduce();
    match build_automaton(&gram) {
        Err(Error::AmbiguousEndGroup { state, items }) => {
            assert_eq!(state, StateId(1));
            assert!(items.contains("(r3) A : x ."), "{}", items);
            assert!(items.contains("(r4) B : x ."), "{}", items);
        }
        other => panic!("unexpected: {:?}", other.map(|a| a.nstates())),
    }
}

/// A single hand-built state holding `items`, for checks the builder never lets through.
fn lone_state(items: &[(Item, Option<Action>)]) -> Automaton {
    let mut states: TVec<StateId, State> = TVec::new();
    states.push(State {
        id: StateId(0),
        items: items.iter().copied().collect(),
    });
    Automaton { states }
}

#[test]
fn two_reductions_in_one_state() {
    let gram = reduce_reduce();
    let a_rule = gram.rules_for(gram.find_non_terminal("A").unwrap()).next().unwrap().number;
    let b_rule = gram.rules_for(gram.find_non_terminal("B").unwrap()).next().unwrap().number;
    let mut automaton = lone_state(&[
        (Item::new(a_rule, 1), Some(Action::Reduce(a_rule))),
        (Item::new(b_rule, 1), Some(Action::Reduce(b_rule))),
    ]);
    match resolve_conflicts(&gram, &mut automaton) {
        Err(Error::MultipleReductions { state, rules }) => {
            assert_eq!(state, StateId(0));
            assert!(rules.contains("A : x ."), "{}", rules);
        }
        other => panic!("unexpected: {:?}", other.map(|r| r.conflicts)),
    }
}

#[test]
fn item_without_action() {
    let gram = reduce_reduce();
    let mut automaton = lone_state(&[
        (Item::new(RuleId(3), 0), Some(Action::Shift(StateId(1)))),
        (Item::new(RuleId(4), 0), None),
    ]);
    assert!(matches!(
        resolve_conflicts(&gram, &mut automaton),
        Err(Error::UnassignedItem { state: StateId(0), .. })
    ));
}

#[test]
fn generate_bundles_everything() {
    let mut g = GrammarBuilder::new();
    g.parser_name("Calc").token_enum("Tok").package("calc");
    g.terminal("PLUS", Some(r"\+"), None);
    g.terminal("NUMBER", Some("[0-9]+"), Some("$$ = parse(text);"));
    g.precedence("left", &["PLUS"]);
    g.rule("S", &["E", "EOF"]).code("$$ = $1;");
    g.rule("E", &["E", "PLUS", "E"]).code("$$ = $1 + $3;");
    g.rule("E", &["NUMBER"]).code("$$ = $1;");
    g.rule("E", &["E", "PLUS"]);
    g.accept("S");
    let gram = g.build().unwrap();

    let options = GeneratorOptions {
        generate_lexer: false,
        dump_states: true,
    };
    let parser = generate(&gram, &options, &NfaRegexCompiler::new()).unwrap();
    assert!(parser.lexer.is_none());
    assert_eq!(parser.terminal_names, ["EOF", "PLUS", "NUMBER"]);
    assert_eq!(parser.non_terminal_names, ["S", "E"]);
    assert_eq!(
        parser.reduce_actions,
        ["node = n1;", "node = n2 + n3;", "node = n4;", ";"]
    );
    assert_eq!(parser.rule_lhs(), [0, 1, 1, 1]);
    assert_eq!(parser.rule_len(), [1, 3, 1, 2]);
    assert_eq!(parser.rule_table[1].rhs_names, ["E", "PLUS", "E"]);
    assert_eq!(parser.settings.package.as_deref(), Some("calc"));
}

#[test]
fn generate_requires_settings() {
    let gram = ambiguous(&[]);
    let options = GeneratorOptions::default();
    assert!(matches!(
        generate(&gram, &options, &NfaRegexCompiler::new()),
        Err(Error::MissingSetting { .. })
    ));
}
