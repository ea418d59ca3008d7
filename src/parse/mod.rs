use crate::{
    ast::Program,
    error::{HercodeError, Result},
    parse::parser::Parser,
};

pub mod error;
mod parser;

/// A program that parsed, possibly with recovered-from diagnostics.
#[derive(Debug)]
pub struct Parsed<'src> {
    pub program: Program<'src>,
    pub diagnostics: Vec<HercodeError>,
    /// Indentation level the parser ended on; zero for well-formed input.
    pub indent: usize,
}

/// Parses `source`. The only failure is a missing `start:` block, in which
/// case every diagnostic gathered so far travels with the error.
pub fn parse<'src>(source: &'src str) -> Result<Parsed<'src>> {
    let mut parser = Parser::new(source);
    let program = parser.program();
    let indent = parser.indent();
    let diagnostics = parser.into_diagnostics();

    match program {
        Some(program) => Ok(Parsed {
            program,
            diagnostics,
            indent,
        }),
        None => Err(HercodeError::Aborted { diagnostics }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::Node, lex::TokenKind, parse::error::SyntaxError};

    fn syntax_errors(parsed: &Parsed) -> Vec<SyntaxError> {
        parsed
            .diagnostics
            .iter()
            .filter_map(|diagnostic| match diagnostic {
                HercodeError::SyntaxError(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn good_programs() {
        let sources = [
            "start:\n    say \"hi\"\n",
            "start:\n    say \"hi\"\nend\n",
            "function greet:\n    say \"hi\"\nstart:\n    greet\n",
            "function greet:\n    say \"hi\"\nend\nstart:\n    greet\nend",
            "# comment\nfunction a:\n\tsay \"x\"\n\nfunction b:\n\ta\nstart:\n\tb\n",
            "start:\n    __c__ { printf(\"%d\", 1); }\n",
        ];

        for source in sources {
            let parsed = parse(source).unwrap();
            assert!(parsed.diagnostics.is_empty(), "{source:?}: {:?}", parsed.diagnostics);
            assert_eq!(parsed.indent, 0, "{source:?}");
        }
    }

    #[test]
    fn missing_start_is_fatal() {
        let sources = ["", "say \"hi\"", "function f:\n    say \"x\"\n"];
        for source in sources {
            assert!(matches!(parse(source), Err(HercodeError::Aborted { .. })));
        }
    }

    #[test]
    fn missing_start_keeps_earlier_diagnostics() {
        let Err(HercodeError::Aborted { diagnostics }) = parse("@\n") else {
            panic!("expected abort");
        };

        assert_eq!(diagnostics.len(), 2);
        assert!(matches!(
            diagnostics.last(),
            Some(HercodeError::SyntaxError(SyntaxError::MissingStart { .. }))
        ));
    }

    #[test]
    fn node_count_matches_definitions_and_statements() {
        let source = "\
function one:
    say \"1\"
function two:
    one
    say \"2\"
start:
    one
    two
    say \"done\"
";
        let parsed = parse(source).unwrap();

        assert_eq!(parsed.program.len(), 5);
        assert_eq!(parsed.program.iter().filter(|n| n.is_function_def()).count(), 2);
        assert_eq!(parsed.indent, 0);
    }

    #[test]
    fn function_bodies_own_their_statements() {
        let source = "function greet:\n    say \"hi\"\n    other\nstart:\n    greet\n";
        let parsed = parse(source).unwrap();

        assert_eq!(
            parsed.program,
            vec![
                Node::FunctionDef {
                    name: "greet",
                    body: vec![Node::Emit("hi"), Node::FunctionCall("other")],
                },
                Node::FunctionCall("greet"),
            ]
        );
    }

    #[test]
    fn empty_functions() {
        let sources = [
            "function f:\nend\nstart:\n    f\n",
            "function f:\nfunction g:\n    say \"g\"\nstart:\n    f\n",
            "function f:\nstart:\n    f\n",
        ];

        for source in sources {
            let parsed = parse(source).unwrap();
            assert_eq!(
                parsed.program[0],
                Node::FunctionDef {
                    name: "f",
                    body: vec![]
                },
                "{source:?}"
            );
            assert!(syntax_errors(&parsed).is_empty(), "{source:?}");
        }

        let parsed = parse("function f:\nfunction g:\n    say \"g\"\nstart:\n    f\n").unwrap();
        assert!(matches!(parsed.program[1], Node::FunctionDef { name: "g", .. }));
    }

    #[test]
    fn trailing_function_without_start_aborts() {
        let mut parser = Parser::new("function f:");
        assert!(parser.program().is_none());
    }

    #[test]
    fn explicit_end_closes_function() {
        let source = "function f:\n    say \"a\"\n    end\nstart:\n    f\n";
        let parsed = parse(source).unwrap();

        assert_eq!(
            parsed.program[0],
            Node::FunctionDef {
                name: "f",
                body: vec![Node::Emit("a")]
            }
        );
        assert_eq!(parsed.program[1], Node::FunctionCall("f"));
    }

    #[test]
    fn deeper_dedent_does_not_close_function() {
        let source = "function f:\n  say \"a\"\n      stray\n  say \"b\"\nstart:\n  f\n";
        let parsed = parse(source).unwrap();

        let Node::FunctionDef { body, .. } = &parsed.program[0] else {
            panic!("expected function");
        };
        assert_eq!(body.first(), Some(&Node::Emit("a")));
        assert_eq!(body.last(), Some(&Node::Emit("b")));
        assert_eq!(parsed.program.last(), Some(&Node::FunctionCall("f")));
    }

    #[test]
    fn unknown_token_between_statements() {
        let source = "start:\n    say \"one\"\n    ?\n    say \"two\"\n";
        let parsed = parse(source).unwrap();

        assert_eq!(parsed.program, vec![Node::Emit("one"), Node::Emit("two")]);
        assert!(matches!(
            syntax_errors(&parsed).as_slice(),
            [SyntaxError::UnexpectedToken {
                found: TokenKind::Unknown,
                ..
            }]
        ));
    }

    #[test]
    fn say_without_string() {
        let source = "start:\n    say\n    say \"ok\"\n";
        let parsed = parse(source).unwrap();

        assert_eq!(parsed.program, vec![Node::Emit("ok")]);
        assert!(matches!(
            syntax_errors(&parsed).as_slice(),
            [SyntaxError::ExpectedToken {
                expected: TokenKind::String,
                found: TokenKind::Newline,
                ..
            }]
        ));
    }

    #[test]
    fn bad_function_header_yields_no_node() {
        let source = "function :\n    say \"lost\"\nstart:\n    say \"kept\"\n";
        let parsed = parse(source).unwrap();

        assert_eq!(parsed.program, vec![Node::Emit("kept")]);
        assert!(matches!(
            syntax_errors(&parsed).as_slice(),
            [SyntaxError::ExpectedToken {
                expected: TokenKind::Identifier,
                ..
            }]
        ));
    }

    #[test]
    fn missing_colon_yields_no_node() {
        let source = "function f\n    say \"lost\"\nstart:\n    say \"kept\"\n";
        let parsed = parse(source).unwrap();

        assert_eq!(parsed.program, vec![Node::Emit("kept")]);
        assert!(matches!(
            syntax_errors(&parsed).as_slice(),
            [SyntaxError::ExpectedToken {
                expected: TokenKind::Colon,
                ..
            }]
        ));
    }

    #[test]
    fn redundant_start_is_skipped() {
        let source = "start:\n    say \"a\"\n    start:\n    say \"b\"\n";
        let parsed = parse(source).unwrap();

        assert_eq!(parsed.program, vec![Node::Emit("a"), Node::Emit("b")]);
        assert!(matches!(
            syntax_errors(&parsed).as_slice(),
            [SyntaxError::RedundantStart { .. }]
        ));
    }

    #[test]
    fn function_inside_start_is_kept() {
        let source = "start:\n    say \"a\"\n    function f:\n        say \"b\"\n    f\n";
        let parsed = parse(source).unwrap();

        assert_eq!(
            parsed.program,
            vec![
                Node::Emit("a"),
                Node::FunctionDef {
                    name: "f",
                    body: vec![Node::Emit("b")]
                },
                Node::FunctionCall("f"),
            ]
        );
        assert!(matches!(
            syntax_errors(&parsed).as_slice(),
            [SyntaxError::MisplacedFunction { .. }]
        ));
        assert_eq!(parsed.indent, 0);
    }

    #[test]
    fn unbalanced_indentation_is_reported() {
        let source = "start:\n    say \"a\"\n    end\n        say \"b\"\n";
        let parsed = parse(source).unwrap();

        assert_eq!(parsed.program, vec![Node::Emit("a")]);
        assert!(matches!(
            syntax_errors(&parsed).as_slice(),
            [
                SyntaxError::TrailingInput { .. },
                SyntaxError::UnbalancedIndentation { level: 4, .. }
            ]
        ));
    }

    #[test]
    fn start_without_indent_still_parses() {
        let parsed = parse("start:\nsay \"flat\"\n").unwrap();

        assert_eq!(parsed.program, vec![Node::Emit("flat")]);
        assert!(matches!(
            syntax_errors(&parsed).as_slice(),
            [SyntaxError::ExpectedToken {
                expected: TokenKind::Indent,
                ..
            }]
        ));
    }

    #[test]
    fn foreign_blocks_are_statements() {
        let source = "function f:\n    __c__ { puts(\"x\"); }\nstart:\n    __c__ {}\n";
        let parsed = parse(source).unwrap();

        assert_eq!(
            parsed.program,
            vec![
                Node::FunctionDef {
                    name: "f",
                    body: vec![Node::ForeignBlock(" puts(\"x\"); ")]
                },
                Node::ForeignBlock(""),
            ]
        );
    }
}
