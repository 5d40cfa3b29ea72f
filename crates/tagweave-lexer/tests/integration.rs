use tagweave_lexer::{tokenize, Attribute, LexError, Lexer, Syntax, SyntaxSpec, TokenKind};

fn names(source: &str, syntax: &Syntax) -> Vec<String> {
    tokenize(source, syntax)
        .unwrap()
        .into_iter()
        .map(|t| match t.kind {
            TokenKind::Literal(text) => format!("'{}'", text),
            TokenKind::TagOpen {
                name, self_closing, ..
            } => {
                if self_closing {
                    format!("<{}/>", name)
                } else {
                    format!("<{}>", name)
                }
            }
            TokenKind::TagClose { name } => format!("</{}>", name),
        })
        .collect()
}

#[test]
fn test_bbcode_document() {
    let source = "[quote=alice]Hello [b]world[/b]![br/][/quote]";
    let tokens = tokenize(source, &Syntax::default()).unwrap();

    assert_eq!(
        tokens[0].kind,
        TokenKind::TagOpen {
            name: "quote".into(),
            attributes: vec![Attribute::new("quote", Some("alice"))],
            self_closing: false,
        }
    );
    assert_eq!(
        names(source, &Syntax::default()),
        vec!["<quote>", "'Hello '", "<b>", "'world'", "</b>", "'!'", "<br/>", "</quote>"]
    );
}

#[test]
fn test_same_source_different_syntax() {
    let source = "<p>[b]x[/b]</p>";

    assert_eq!(
        names(source, &Syntax::bbcode()),
        vec!["'<p>'", "<b>", "'x'", "</b>", "'</p>'"]
    );
    assert_eq!(
        names(source, &Syntax::angle()),
        vec!["<p>", "'[b]x[/b]'", "</p>"]
    );
}

#[test]
fn test_multiline_positions() {
    let source = "line one\n  [tag a=1]\n[/tag]";
    let tokens = tokenize(source, &Syntax::default()).unwrap();

    assert_eq!(tokens[1].span.start.line, 2);
    assert_eq!(tokens[1].span.start.column, 3);
    assert_eq!(tokens[3].span.start.line, 3);
    assert_eq!(tokens[3].span.start.column, 1);
}

#[test]
fn test_error_is_total() {
    // Nothing is returned for a source that fails part-way.
    let result = tokenize("fine [b]fine[/b] broken [x", &Syntax::default());
    match result {
        Err(LexError::UnterminatedTag { position }) => assert_eq!(position.offset, 24),
        other => panic!("expected unterminated tag, got {:?}", other),
    }
}

#[test]
fn test_custom_markers() {
    let syntax = SyntaxSpec {
        open: "{{".into(),
        close: "}}".into(),
        end_marker: '#',
        self_close_marker: '!',
    }
    .build()
    .unwrap();

    assert_eq!(
        names("{{if x}}a{{#if}}{{hr!}}", &syntax),
        vec!["<if>", "'a'", "</if>", "<hr/>"]
    );
}

#[test]
fn test_lexer_is_streaming() {
    let syntax = Syntax::default();
    let mut lexer = Lexer::new("[a]b[/a]", &syntax);

    let first = lexer.next().unwrap().unwrap();
    assert_eq!(first.tag_name(), Some("a"));
    assert_eq!(lexer.rest(), "b[/a]");
}
