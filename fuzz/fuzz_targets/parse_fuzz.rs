#![no_main]
use forkparse::ast::{RemoveEmpties, StringifyNonTerminals};
use forkparse::grammar::{Expression, Grammar, NonTerminal, SpecialSymbol, Terminal};
use forkparse::{ExecutionStrategy, Parser};
use libfuzzer_sys::fuzz_target;
use std::sync::LazyLock;

fn t(literal: &str) -> Expression {
    Terminal::new(literal).unwrap().into()
}

fn grammar() -> Grammar {
    let digit = SpecialSymbol::digit();
    let number = NonTerminal::new("Number");
    let spaces = NonTerminal::new("Spaces");
    let expr = NonTerminal::new("Expr");
    Grammar::builder()
        .rule(number.clone(), Expression::seq([Expression::from(&digit), Expression::repeat(&digit)]))
        .rule(spaces.clone(), Expression::repeat(SpecialSymbol::whitespace()))
        .rule(
            expr.clone(),
            Expression::choice([
                Expression::from(&number),
                Expression::seq([
                    t("("),
                    Expression::from(&spaces),
                    Expression::from(&expr),
                    Expression::repeat(Expression::seq([t("+"), Expression::from(&spaces), Expression::from(&expr)])),
                    t(")"),
                ]),
            ]),
        )
        .rule(NonTerminal::new("Main"), Expression::seq([Expression::from(&expr), Expression::eof()]))
        .build()
        .unwrap()
}

fn parser(strategy: ExecutionStrategy) -> Parser {
    Parser::builder(grammar(), NonTerminal::new("Main"))
        .strategy(strategy)
        .processor(RemoveEmpties)
        .processor(StringifyNonTerminals::new([NonTerminal::new("Number")]))
        .build()
        .unwrap()
}

static SEQUENTIAL: LazyLock<Parser> = LazyLock::new(|| parser(ExecutionStrategy::Sequential));
static CONCURRENT: LazyLock<Parser> = LazyLock::new(|| parser(ExecutionStrategy::Concurrent { threads: 2 }));

fuzz_target!(|data: &[u8]| {
    // Keep inputs short: rejected inputs explore every alternative.
    if data.len() > 64 {
        return;
    }
    let Ok(input) = std::str::from_utf8(data) else {
        let result = SEQUENTIAL.parse_reader(std::io::Cursor::new(data.to_vec()));
        assert!(result.is_err() || result.is_ok_and(|ast| ast.is_none()));
        return;
    };

    let sequential = SEQUENTIAL.parse_str(input).unwrap();
    let concurrent = CONCURRENT.parse_str(input).unwrap();
    assert_eq!(
        sequential.as_ref().map(|ast| ast.text()),
        concurrent.as_ref().map(|ast| ast.text())
    );
    if let Some(ast) = sequential {
        assert_eq!(ast.text(), input);
    }
});
