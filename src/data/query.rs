use std::cmp::Ordering;

use thiserror::Error;

use super::model::{CellValue, Column, Dataset};

// ---------------------------------------------------------------------------
// FilterError
// ---------------------------------------------------------------------------

/// Invalid or unsatisfiable row predicate. Surfaced to the user; the input
/// dataset is never touched on failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown column '{0}' in query")]
    UnknownColumn(String),
    #[error("query syntax error: {0}")]
    Syntax(String),
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Apply a boolean row predicate to the dataset.
///
/// The empty (or all-whitespace) query is the identity transform. Otherwise
/// the text is parsed as comparisons over column references combined with
/// `and` / `or` / `not`, and a row is retained when the predicate does not
/// evaluate to false — comparisons touching a missing value are unknown,
/// and unknown keeps the row.
pub fn apply(dataset: &Dataset, text: &str) -> Result<Dataset, FilterError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(dataset.clone());
    }

    let expr = parse(text)?;
    bind_columns(&expr, dataset)?;

    let keep: Vec<usize> = (0..dataset.n_rows())
        .filter(|&row| eval(&expr, dataset, row) != Truth::False)
        .collect();

    log::debug!("query '{text}': kept {} of {} rows", keep.len(), dataset.n_rows());
    Ok(dataset.take_rows(&keep))
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Bool(bool),
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    return Err(FilterError::Syntax("use '==' for equality".into()));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    return Err(FilterError::Syntax("single '&', expected '&&'".into()));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    return Err(FilterError::Syntax("single '|', expected '||'".into()));
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != quote {
                    j += 1;
                }
                if j == chars.len() {
                    return Err(FilterError::Syntax("unterminated string literal".into()));
                }
                tokens.push(Token::Str(chars[start..j].iter().collect()));
                i = j + 1;
            }
            _ if c.is_ascii_digit()
                || c == '.'
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit() || *n == '.')) =>
            {
                let start = i;
                i += 1; // sign or first digit
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || chars[i] == 'e'
                        || chars[i] == 'E'
                        || ((chars[i] == '+' || chars[i] == '-')
                            && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| FilterError::Syntax(format!("bad number '{text}'")))?;
                tokens.push(Token::Number(value));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    _ => Token::Ident(word),
                });
            }
            _ => {
                return Err(FilterError::Syntax(format!("unexpected character '{c}'")));
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser (recursive descent: or → and → not → comparison)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Column(String),
    Number(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Cmp(Operand, CmpOp, Operand),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn parse(input: &str) -> Result<Expr, FilterError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    if let Some(tok) = parser.peek() {
        return Err(FilterError::Syntax(format!("trailing input at {tok:?}")));
    }
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn or_expr(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.not_expr()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let rhs = self.not_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, FilterError> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, FilterError> {
        if self.peek() == Some(&Token::LParen) {
            self.next();
            let inner = self.or_expr()?;
            match self.next() {
                Some(Token::RParen) => return Ok(inner),
                _ => return Err(FilterError::Syntax("expected ')'".into())),
            }
        }

        let lhs = self.operand()?;
        let op = match self.next() {
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Ne) => CmpOp::Ne,
            other => {
                return Err(FilterError::Syntax(format!(
                    "expected comparison operator, got {other:?}"
                )))
            }
        };
        let rhs = self.operand()?;
        Ok(Expr::Cmp(lhs, op, rhs))
    }

    fn operand(&mut self) -> Result<Operand, FilterError> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(Operand::Column(name)),
            Some(Token::Number(v)) => Ok(Operand::Number(v)),
            Some(Token::Str(s)) => Ok(Operand::Str(s)),
            Some(Token::Bool(b)) => Ok(Operand::Bool(b)),
            other => Err(FilterError::Syntax(format!(
                "expected column or literal, got {other:?}"
            ))),
        }
    }
}

/// Reject queries naming columns the dataset does not have, before any row
/// is evaluated.
fn bind_columns(expr: &Expr, dataset: &Dataset) -> Result<(), FilterError> {
    match expr {
        Expr::Cmp(lhs, _, rhs) => {
            for operand in [lhs, rhs] {
                if let Operand::Column(name) = operand {
                    if dataset.column(name).is_none() {
                        return Err(FilterError::UnknownColumn(name.clone()));
                    }
                }
            }
            Ok(())
        }
        Expr::And(a, b) | Expr::Or(a, b) => {
            bind_columns(a, dataset)?;
            bind_columns(b, dataset)
        }
        Expr::Not(inner) => bind_columns(inner, dataset),
    }
}

// ---------------------------------------------------------------------------
// Three-valued evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

fn eval(expr: &Expr, dataset: &Dataset, row: usize) -> Truth {
    match expr {
        Expr::Cmp(lhs, op, rhs) => {
            let a = resolve(lhs, dataset, row);
            let b = resolve(rhs, dataset, row);
            compare(&a, &b, *op)
        }
        Expr::And(a, b) => eval(a, dataset, row).and(eval(b, dataset, row)),
        Expr::Or(a, b) => eval(a, dataset, row).or(eval(b, dataset, row)),
        Expr::Not(inner) => eval(inner, dataset, row).not(),
    }
}

fn resolve(operand: &Operand, dataset: &Dataset, row: usize) -> CellValue {
    match operand {
        // Column existence was checked at bind time.
        Operand::Column(name) => dataset
            .column(name)
            .map(|c: &Column| c.values[row].clone())
            .unwrap_or(CellValue::Null),
        Operand::Number(v) => CellValue::Float(*v),
        Operand::Str(s) => CellValue::Str(s.clone()),
        Operand::Bool(b) => CellValue::Bool(*b),
    }
}

/// Compare two cells. Nulls, NaNs and cross-type comparisons are unknown.
fn compare(a: &CellValue, b: &CellValue, op: CmpOp) -> Truth {
    let ord = match (a, b) {
        (CellValue::Null, _) | (_, CellValue::Null) => None,
        (CellValue::Str(x), CellValue::Str(y)) => Some(x.cmp(y)),
        (CellValue::Bool(x), CellValue::Bool(y)) => Some(x.cmp(y)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    };

    let Some(ord) = ord else {
        return Truth::Unknown;
    };

    let result = match op {
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
    };
    if result {
        Truth::True
    } else {
        Truth::False
    }
}
