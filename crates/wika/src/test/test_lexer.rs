use crate::lexer::{Lexer, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(source);
    let mut out = Vec::new();
    loop {
        let token = lexer.scan_token();
        if token.kind == TokenKind::Dulo {
            break;
        }
        out.push(token.kind);
    }
    out
}

#[test]
fn keywords_are_recognized_not_identifiers() {
    assert_eq!(
        kinds("kung habang kada gawain uri ibalik ito mula sim"),
        vec![
            TokenKind::Kung,
            TokenKind::Habang,
            TokenKind::Kada,
            TokenKind::Gawain,
            TokenKind::Uri,
            TokenKind::Ibalik,
            TokenKind::Ito,
            TokenKind::Mula,
            TokenKind::Sim,
        ]
    );
}

#[test]
fn identifier_sharing_a_keyword_prefix_is_not_misclassified() {
    assert_eq!(kinds("kungfu"), vec![TokenKind::Identifier]);
    assert_eq!(kinds("itotoy"), vec![TokenKind::Identifier]);
}

#[test]
fn two_char_operators_are_single_tokens() {
    assert_eq!(
        kinds("!= == <= >= ++ --"),
        vec![
            TokenKind::BangEqual,
            TokenKind::EqualEqual,
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
            TokenKind::PlusPlus,
            TokenKind::MinusMinus,
        ]
    );
}

#[test]
fn string_and_number_literals() {
    assert_eq!(kinds(r#""hello" 3.5 42"#), vec![TokenKind::String, TokenKind::Number, TokenKind::Number]);
}

#[test]
fn unterminated_string_is_a_problem_token() {
    let mut lexer = Lexer::new("\"unterminated");
    let token = lexer.scan_token();
    assert_eq!(token.kind, TokenKind::Problema);
}

#[test]
fn line_numbers_advance_across_newlines() {
    let mut lexer = Lexer::new("kilalanin\nx\n=\n1");
    let first = lexer.scan_token();
    assert_eq!(first.line, 1);
    let x = lexer.scan_token();
    assert_eq!(x.line, 2);
    let eq = lexer.scan_token();
    assert_eq!(eq.line, 3);
    let one = lexer.scan_token();
    assert_eq!(one.line, 4);
}

#[test]
fn line_comments_are_skipped() {
    assert_eq!(kinds("// buong linyang puna\nkilalanin"), vec![TokenKind::Kilalanin]);
}
