// the nova64 assembler. line-oriented: one statement per line, `;` comments,
// `:LABEL` declarations, case-insensitive mnemonics and symbols. two passes -
// the first counts emitted words to pin down every label, the second encodes.
// each line runs through a chumsky parser so failures carry their one-based
// source line number.
use crate::error::{ AssembleError, AssembleErrorKind };
use crate::opcode::{ self, OPERAND_MASK, TOP };
use crate::Image;
use chumsky::prelude::*;
use std::collections::HashMap;


#[derive(Debug, Clone)]
struct Statement {
    mnemonic : String,
    operand : Option<String>,
}


#[derive(Debug, Clone)]
struct Line {
    label : Option<String>,
    statement : Option<Statement>,
}


fn token() -> impl Parser<char, String, Error = Simple<char>> + Clone {
    filter(|c : &char| !c.is_whitespace()).repeated().at_least(1).collect()
}


// a whole (pre-trimmed) source line. a label line may carry an inline statement;
// tokens after a statement's operand are ignored
fn line_parser() -> impl Parser<char, Line, Error = Simple<char>> {
    let comment = just(';')
        .then(any().repeated())
        .map(|_| Line { label : None, statement : None });
    let statement = token()
        .padded()
        .then(token().padded().or_not())
        .then_ignore(any().repeated())
        .map(|(mnemonic, operand)| Statement { mnemonic, operand });
    let labeled = just(':')
        .ignore_then(token())
        .then(statement.clone().or_not())
        .map(|(label, statement)| Line { label : Some(label), statement });
    let bare = statement.map(|statement| Line { label : None, statement : Some(statement) });
    choice((comment, labeled, bare))
        .or_not()
        .map(|line| line.unwrap_or(Line { label : None, statement : None }))
        .then_ignore(end())
}


pub fn assemble(source : &str) -> Result<Image, AssembleError> {
    let parser = line_parser();
    let mut lines = Vec::new();
    for (number, raw) in source.lines().enumerate() {
        let line = parser.parse(raw.trim()).map_err(|errors| AssembleError {
            line : number + 1,
            kind : AssembleErrorKind::Syntax(
                errors
                    .first()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unparseable line".to_string()),
            ),
        })?;
        lines.push(line);
    }

    // pass 1: a label takes the value of the emit counter; only statements
    // advance it. duplicate labels are last-write-wins.
    let mut labels : HashMap<String, u32> = HashMap::new();
    let mut counter = 0u32;
    for line in &lines {
        if let Some(label) = &line.label {
            labels.insert(label.to_uppercase(), counter);
        }
        if line.statement.is_some() {
            counter += 1;
        }
    }

    // pass 2: encode each statement as one word
    let mut code = Vec::with_capacity(counter as usize);
    for (number, line) in lines.iter().enumerate() {
        if let Some(statement) = &line.statement {
            let word = encode_statement(statement, &labels)
                .map_err(|kind| AssembleError { line : number + 1, kind })?;
            code.push(word);
        }
    }
    Ok(Image { labels, code })
}


// operand resolution order: integer literal, then label, then the TOP keyword.
// a declared label named TOP therefore shadows the sentinel.
fn encode_statement(
    statement : &Statement,
    labels : &HashMap<String, u32>,
) -> Result<u32, AssembleErrorKind> {
    let mnemonic = statement.mnemonic.to_uppercase();
    let op = opcode::from_mnemonic(&mnemonic)
        .ok_or(AssembleErrorKind::OpCodeNotFound(mnemonic))?;
    let operand = match &statement.operand {
        None => 0,
        Some(token) => {
            let arg = token.to_uppercase();
            match literal(&arg) {
                Literal::Fits(value) => value,
                Literal::TooWide => return Err(AssembleErrorKind::ExceedsOperandSize(arg)),
                Literal::NotNumeric => {
                    if let Some(&address) = labels.get(&arg) {
                        address
                    } else if arg == "TOP" {
                        TOP
                    } else {
                        return Err(AssembleErrorKind::UnknownOperand(arg));
                    }
                }
            }
        }
    };
    Ok(opcode::encode(op, operand))
}


enum Literal {
    Fits(u32), // masked to 24 bits
    TooWide, // a number, but one that can't ride in an operand
    NotNumeric,
}


// automatic-base integer literal: decimal, 0x hex, 0o or leading-zero octal,
// 0b binary, with an optional sign. the input is already uppercased.
fn literal(arg : &str) -> Literal {
    let (negative, digits) = if let Some(rest) = arg.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = arg.strip_prefix('+') {
        (false, rest)
    } else {
        (false, arg)
    };
    // from_str_radix would happily take a second sign here
    if digits.starts_with('-') || digits.starts_with('+') {
        return Literal::NotNumeric;
    }
    let (radix, digits) = if let Some(rest) = digits.strip_prefix("0X") {
        (16, rest)
    } else if let Some(rest) = digits.strip_prefix("0B") {
        (2, rest)
    } else if let Some(rest) = digits.strip_prefix("0O") {
        (8, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    let value = match i64::from_str_radix(digits, radix) {
        Ok(v) if negative => -v,
        Ok(v) => v,
        Err(_) => return Literal::NotNumeric,
    };
    if (-(1i64 << 23)..1i64 << 24).contains(&value) {
        Literal::Fits(value as u32 & OPERAND_MASK)
    } else if (-(1i64 << 31)..1i64 << 32).contains(&value) {
        Literal::TooWide
    } else {
        Literal::NotNumeric
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_words_in_program_order() {
        let image = assemble("PUSH 2\nPUSH 3\nADD\nKILL\n").unwrap();
        assert_eq!(
            image.code,
            vec![
                opcode::encode(opcode::PUSH, 2),
                opcode::encode(opcode::PUSH, 3),
                opcode::encode(opcode::ADD, 0),
                opcode::encode(opcode::KILL, 0),
            ]
        );
        assert!(image.labels.is_empty());
    }

    #[test]
    fn every_mnemonic_assembles_to_its_own_opcode() {
        for &(name, op) in opcode::MNEMONICS {
            let image = assemble(&format!("{} 1\n", name)).unwrap();
            assert_eq!(opcode::decode(image.code[0]), (op, 1));
        }
    }

    #[test]
    fn labels_inline_and_aliasing() {
        let source = "; leading comment\n\n:START PUSH 1\n:NEXT\nJMP START\n";
        let image = assemble(source).unwrap();
        // :START carries an inline statement at word 0; :NEXT aliases the
        // following statement at word 1
        assert_eq!(image.lookup("START"), Some(0));
        assert_eq!(image.lookup("NEXT"), Some(1));
        assert_eq!(image.code.len(), 2);
        assert_eq!(image.code[1], opcode::encode(opcode::JMP, 0));
    }

    #[test]
    fn mnemonics_and_labels_are_case_insensitive() {
        let image = assemble("push 5\njmp start\n:start kill\n").unwrap();
        assert_eq!(
            image.code,
            vec![
                opcode::encode(opcode::PUSH, 5),
                opcode::encode(opcode::JMP, 2),
                opcode::encode(opcode::KILL, 0),
            ]
        );
        assert_eq!(image.lookup("Start"), Some(2));
    }

    #[test]
    fn duplicate_labels_are_last_write_wins() {
        let image = assemble(":A NOOP\n:A KILL\n").unwrap();
        assert_eq!(image.lookup("A"), Some(1));
    }

    #[test]
    fn a_trailing_label_points_past_the_code() {
        let image = assemble("NOOP\n:END\n").unwrap();
        assert_eq!(image.lookup("END"), Some(1));
        assert_eq!(image.code.len(), 1);
    }

    #[test]
    fn operand_bases() {
        let image = assemble("PUSH 0x1F\nPUSH 010\nPUSH 0b101\nPUSH 0o17\nPUSH -1\n").unwrap();
        let operands : Vec<u32> = image.code.iter().map(|&w| opcode::decode(w).1).collect();
        assert_eq!(operands, vec![31, 8, 5, 15, 0xFFFFFF]);
    }

    #[test]
    fn top_keyword_and_its_numeric_twin() {
        let image = assemble("JMP TOP\nPUSH 16777215\n").unwrap();
        assert_eq!(opcode::decode(image.code[0]).1, TOP);
        assert_eq!(opcode::decode(image.code[1]).1, TOP);
    }

    #[test]
    fn a_label_named_top_shadows_the_sentinel() {
        let image = assemble(":TOP NOOP\nJMP TOP\n").unwrap();
        assert_eq!(opcode::decode(image.code[1]).1, 0);
    }

    #[test]
    fn oversized_operands_are_rejected() {
        let err = assemble("PUSH 16777216\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.kind, AssembleErrorKind::ExceedsOperandSize("16777216".into()));
        assert_eq!(err.to_string(), "error in line 1: 16777216 exceeds operand size");

        let err = assemble("NOOP\nPUSH 4294967295\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn unknown_mnemonics_and_operands_are_rejected() {
        let err = assemble("FROB 1\n").unwrap_err();
        assert_eq!(err.kind, AssembleErrorKind::OpCodeNotFound("FROB".into()));
        assert_eq!(err.to_string(), "error in line 1: OpCode 'FROB' not found");

        let err = assemble("PUSH %WAT\n").unwrap_err();
        assert_eq!(err.kind, AssembleErrorKind::UnknownOperand("%WAT".into()));
    }

    #[test]
    fn error_lines_count_comments_and_blanks() {
        let err = assemble("; comment\n\nNOOP\nPUSH 16777216\n").unwrap_err();
        assert_eq!(err.line, 4);
    }

    #[test]
    fn junk_after_an_operand_is_ignored() {
        let image = assemble("PUSH 2 these tokens do nothing\n").unwrap();
        assert_eq!(image.code, vec![opcode::encode(opcode::PUSH, 2)]);
    }

    #[test]
    fn a_stray_second_token_is_treated_as_an_operand() {
        // there are no trailing comments; this one lands in the operand slot
        let err = assemble("NOOP ; not a comment\n").unwrap_err();
        assert_eq!(err.kind, AssembleErrorKind::UnknownOperand(";".into()));
    }

    #[test]
    fn empty_sources_make_empty_images() {
        let image = assemble("").unwrap();
        assert!(image.code.is_empty());
        assert!(image.labels.is_empty());
        let image = assemble("\n   \n; nothing here\n").unwrap();
        assert!(image.code.is_empty());
    }
}
