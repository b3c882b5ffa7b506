//! End-to-end parsing tests

mod common;

use common::{arithmetic, compounds, nt, number_parser, strict_arithmetic, t};
use forkparse::grammar::{Expression, Grammar, SpecialSymbol};
use forkparse::{ExecutionStrategy, Leaf, ParseError, Parser, ParserConfig};
use std::io::{self, Cursor, Read};

const STRATEGIES: [ExecutionStrategy; 2] = [
    ExecutionStrategy::Sequential,
    ExecutionStrategy::Concurrent { threads: 2 },
];

fn digits_grammar() -> Grammar {
    Grammar::builder()
        .rule(nt("Digit"), SpecialSymbol::digit())
        .rule(nt("Number"), Expression::seq([nt("Digit").into(), Expression::repeat(nt("Digit"))]))
        .rule(nt("Main"), Expression::seq([nt("Number").into(), Expression::eof()]))
        .build()
        .unwrap()
}

#[test]
fn test_number_of_digits() {
    for strategy in STRATEGIES {
        let parser = Parser::builder(digits_grammar(), nt("Main"))
            .strategy(strategy)
            .build()
            .unwrap();

        let ast = parser.parse_str("42").unwrap().expect("42 is a number");
        let main = ast.root().as_branch().unwrap();
        assert_eq!(main.non_terminal, nt("Main"));
        let number = main.children[0].as_branch().unwrap();
        assert_eq!(number.non_terminal, nt("Number"));
        assert_eq!(number.text(), "42");
        assert_eq!(
            ast.to_string(),
            "Main\n|Number\n||Digit\n|||'4'\n||Digit\n|||'2'\n||''\n|''\n"
        );

        assert!(parser.parse_str("4a").unwrap().is_none());
        assert!(parser.parse_str("").unwrap().is_none());
    }
}

fn long_number(len: usize) -> String {
    "0123456789".chars().cycle().take(len).collect()
}

#[test]
fn test_long_number() {
    let digits = long_number(50_000);
    for strategy in STRATEGIES {
        let parser = number_parser(digits_grammar(), strategy);
        let ast = parser.parse_str(&digits).unwrap().expect("a long number");
        assert_eq!(ast.text(), digits);
        assert_eq!(compounds(ast.root()), [digits.as_str()]);

        let stats = parser.parse_with_stats(&digits).unwrap().1;
        assert_eq!(stats.forks, 0);

        assert!(parser.parse_str(&format!("{digits}x")).unwrap().is_none());
    }
}

#[test]
fn test_long_number_without_unfolding() {
    let digits = long_number(50_000);
    for strategy in STRATEGIES {
        let config = ParserConfig::new().with_strategy(strategy).with_unfold_synthetic(false);
        let parser = Parser::builder(digits_grammar(), nt("Main")).config(config).build().unwrap();
        let ast = parser.parse_str(&digits).unwrap().expect("a long number");
        assert_eq!(ast.text(), digits);
        // Main, Number and the first digit, then one nested repetition per
        // further digit, closed by its empty tail and the end of input.
        assert_eq!(ast.to_string().lines().count(), 4 + 3 * (digits.len() - 1) + 2);
    }
}

#[test]
fn test_deeply_nested_sum() {
    let mut sum = String::from("0");
    for i in 1..=2_000 {
        sum = format!("({sum}+{i})");
    }
    for strategy in STRATEGIES {
        let parser = number_parser(strict_arithmetic(), strategy);
        let ast = parser.parse_str(&sum).unwrap().expect("balanced sum");
        assert_eq!(ast.text(), sum);
        let numbers = compounds(ast.root());
        assert_eq!(numbers.len(), 2_001);
        assert_eq!(numbers[0], "0");
        assert_eq!(numbers[2_000], "2000");
    }
}

#[test]
fn test_parenthesised_sum() {
    for strategy in STRATEGIES {
        let parser = number_parser(strict_arithmetic(), strategy);
        let ast = parser.parse_str("(1+2)").unwrap().expect("balanced sum");
        assert_eq!(ast.text(), "(1+2)");
        assert_eq!(compounds(ast.root()), ["1", "2"]);
        assert!(parser.parse_str("(1+2").unwrap().is_none());
        assert!(parser.parse_str("(1+2))").unwrap().is_none());
    }
}

#[test]
fn test_sum_with_whitespace() {
    for strategy in STRATEGIES {
        let parser = number_parser(arithmetic(), strategy);

        let ast = parser
            .parse_str("((12+13) + 158   )")
            .unwrap()
            .expect("balanced sum");
        assert_eq!(ast.text(), "((12+13) + 158   )");
        assert_eq!(compounds(ast.root()), ["12", "13", "158"]);

        assert!(parser.parse_str("((12+13) + 158   ").unwrap().is_none());
    }
}

#[test]
fn test_processors_remove_empty_leaves() {
    let parser = number_parser(strict_arithmetic(), ExecutionStrategy::Sequential);
    let ast = parser.parse_str("7").unwrap().unwrap();
    assert_eq!(ast.to_string(), "Main\n|Expr\n||'7'\n");
}

#[test]
fn test_without_processors_tree_keeps_empties() {
    let parser = Parser::builder(strict_arithmetic(), nt("Main")).build().unwrap();
    let ast = parser.parse_str("7").unwrap().unwrap();
    assert_eq!(ast.to_string(), "Main\n|Expr\n||Number\n|||'7'\n|||''\n|''\n");
}

#[test]
fn test_prefix_accepted_without_end_of_file() {
    let grammar = Grammar::builder()
        .rule(nt("Main"), Expression::seq([t("let"), Expression::from(SpecialSymbol::whitespace())]))
        .build()
        .unwrap();
    let parser = Parser::builder(grammar, nt("Main")).build().unwrap();
    let ast = parser.parse_str("let x").unwrap().unwrap();
    assert_eq!(ast.text(), "let ");
    assert!(parser.parse_str("le").unwrap().is_none());
}

#[test]
fn test_multi_character_terminals_backtrack() {
    // Both keywords start with 'f'; only one of them matches the whole word.
    let grammar = Grammar::builder()
        .rule(
            nt("Main"),
            Expression::seq([Expression::choice([t("for"), t("fun")]), Expression::eof()]),
        )
        .build()
        .unwrap();
    for strategy in STRATEGIES {
        let parser = Parser::builder(grammar.clone(), nt("Main"))
            .strategy(strategy)
            .build()
            .unwrap();
        assert_eq!(parser.parse_str("fun").unwrap().unwrap().text(), "fun");
        assert_eq!(parser.parse_str("for").unwrap().unwrap().text(), "for");
        assert!(parser.parse_str("fox").unwrap().is_none());
    }
}

#[test]
fn test_optional_sign() {
    let digit = SpecialSymbol::digit();
    let grammar = Grammar::builder()
        .rule(
            nt("Int"),
            Expression::seq([
                Expression::maybe(t("-")),
                Expression::from(&digit),
                Expression::repeat(&digit),
            ]),
        )
        .rule(nt("Main"), Expression::seq([nt("Int").into(), Expression::eof()]))
        .build()
        .unwrap();
    let parser = Parser::builder(grammar, nt("Main")).build().unwrap();
    assert!(parser.parse_str("-12").unwrap().is_some());
    assert!(parser.parse_str("12").unwrap().is_some());
    assert!(parser.parse_str("--12").unwrap().is_none());
    assert!(parser.parse_str("-").unwrap().is_none());
}

#[test]
fn test_parse_chars() {
    let parser = number_parser(strict_arithmetic(), ExecutionStrategy::Sequential);
    let ast = parser.parse_chars("(3+(4+5))".chars().collect::<Vec<_>>()).unwrap().unwrap();
    assert_eq!(compounds(ast.root()), ["3", "4", "5"]);
}

#[test]
fn test_parse_reader() {
    for strategy in STRATEGIES {
        let parser = number_parser(arithmetic(), strategy);
        let ast = parser
            .parse_reader(Cursor::new(b"( 1 + 22 )".to_vec()))
            .unwrap()
            .unwrap();
        assert_eq!(ast.text(), "( 1 + 22 )");
        assert!(parser.parse_reader(Cursor::new(b"( 1 +".to_vec())).unwrap().is_none());
    }
}

#[test]
fn test_reader_errors_are_reported() {
    struct FailAfter(Cursor<Vec<u8>>);
    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "gone")),
                n => Ok(n),
            }
        }
    }

    let parser = number_parser(arithmetic(), ExecutionStrategy::Sequential);
    let result = parser.parse_reader(FailAfter(Cursor::new(b"(1+".to_vec())));
    assert!(matches!(result, Err(ParseError::Source(_))));

    let result = parser.parse_reader(Cursor::new(vec![b'(', 0xc3]));
    assert!(matches!(result, Err(ParseError::InvalidUtf8 { .. })));
}

#[test]
fn test_stats_report_forks() {
    let parser = number_parser(arithmetic(), ExecutionStrategy::Sequential);
    let (ast, stats) = parser.parse_with_stats("(1 + 2)").unwrap();
    assert!(ast.is_some());
    assert!(stats.accepted);
    assert!(stats.forks > 0);
    assert!(stats.transitions > stats.forks);

    let (ast, stats) = parser.parse_with_stats("(1 + 2").unwrap();
    assert!(ast.is_none());
    assert!(!stats.accepted);
}

#[test]
fn test_parser_is_shared_between_threads() {
    let parser = number_parser(arithmetic(), ExecutionStrategy::Sequential);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let parser = &parser;
                scope.spawn(move || {
                    let input = format!("({i} + {i})");
                    parser.parse_str(&input).unwrap().map(|ast| ast.text())
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(format!("({i} + {i})")));
        }
    });
}

#[test]
fn test_compound_leaf_names_its_non_terminal() {
    let parser = number_parser(strict_arithmetic(), ExecutionStrategy::Sequential);
    let ast = parser.parse_str("12").unwrap().unwrap();
    let expr = ast.root().as_branch().unwrap().children[0].as_branch().unwrap();
    match expr.children[0].as_leaf() {
        Some(Leaf::Compound { non_terminal, value }) => {
            assert_eq!(*non_terminal, nt("Number"));
            assert_eq!(value, "12");
        }
        other => panic!("expected a compound leaf, got {other:?}"),
    }
}
