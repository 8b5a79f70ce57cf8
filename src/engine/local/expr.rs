//! Arithmetic formula language evaluated column-wise over trials.
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary (('*' | '/' | '%') unary)*
//! unary := ('-' | '+')* power
//! power := atom (('**' | '^') unary)?
//! atom  := number | name | name '(' args ')' | '(' expr ')'
//! ```
//!
//! `-x ** 2` parses as `-(x ** 2)` and `2 ** 3 ** 2` as `2 ** (3 ** 2)`.
//! Function names may carry an `np.` prefix.
//!
//! Lexing is done by logos, parsing by chumsky over the token slice. Names
//! that are not plain identifiers (`Unit Cost`, `Cost ($)`) are matched
//! against the known columns before lexing, leftmost and then longest first,
//! and only where no identifier character touches either end.

use std::fmt;

use chumsky::prelude::*;
use indexmap::IndexMap;
use logos::Logos;
use thiserror::Error;

/// Deepest parenthesis nesting accepted.
pub const MAX_NESTING: usize = 32;
/// Longest formula accepted, in tokens.
pub const MAX_TOKENS: usize = 2048;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("parentheses nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("expression longer than {0} tokens")]
    TooLong(usize),
    #[error("name '{0}' is not defined")]
    UnknownName(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("{func}() takes {expected} argument(s), got {got}")]
    Arity {
        func: &'static str,
        expected: usize,
        got: usize,
    },
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Num(f64),
    #[regex(r"(np\.)?[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    /// Known column matched before lexing; never produced by logos.
    Column(usize),
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("**")]
    StarStar,
    #[token("^")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Num(n) => write!(f, "number {n}"),
            Token::Ident(s) => write!(f, "name '{s}'"),
            Token::Column(idx) => write!(f, "variable #{idx}"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::Percent => f.write_str("'%'"),
            Token::StarStar => f.write_str("'**'"),
            Token::Caret => f.write_str("'^'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(is_ident_char)
}

/// Lex `src[offset..end]` with logos. Positions in errors are byte offsets into `src`.
fn lex_segment(src: &str, offset: usize, end: usize, tokens: &mut Vec<Token>) -> Result<(), ExprError> {
    let mut lexer = Token::lexer(&src[offset..end]);
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => {
                let pos = offset + lexer.span().start;
                let c = src[pos..].chars().next().unwrap_or_default();
                return Err(ExprError::UnexpectedChar(c, pos));
            }
        }
    }
    Ok(())
}

/// Tokenize `src`, turning occurrences of the non-identifier names in
/// `columns` into [`Token::Column`]. Plain identifiers are left to the lexer.
fn tokenize<V>(src: &str, columns: &IndexMap<String, V>) -> Result<Vec<Token>, ExprError> {
    let mut spaced: Vec<(usize, &str)> = columns
        .keys()
        .enumerate()
        .filter(|(_, name)| !name.is_empty() && !is_plain_ident(name))
        .map(|(idx, name)| (idx, name.as_str()))
        .collect();
    spaced.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut tokens = Vec::new();
    let mut gap = 0;
    let mut pos = 0;
    let mut prev: Option<char> = None;

    while pos < src.len() {
        let rest = &src[pos..];
        let matched = if prev.is_some_and(is_ident_char) {
            None
        } else {
            spaced.iter().find(|&&(_, name)| {
                rest.starts_with(name) && !rest[name.len()..].starts_with(is_ident_char)
            })
        };

        match matched {
            Some(&(idx, name)) => {
                lex_segment(src, gap, pos, &mut tokens)?;
                tokens.push(Token::Column(idx));
                pos += name.len();
                gap = pos;
                prev = name.chars().next_back();
            }
            None => {
                let Some(c) = rest.chars().next() else { break };
                pos += c.len_utf8();
                prev = Some(c);
            }
        }
    }
    lex_segment(src, gap, src.len(), &mut tokens)?;
    Ok(tokens)
}

fn check_size(tokens: &[Token]) -> Result<(), ExprError> {
    let mut depth = 0usize;
    for token in tokens {
        match token {
            Token::LParen => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(ExprError::TooDeep(MAX_NESTING));
                }
            }
            Token::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if tokens.len() > MAX_TOKENS {
        return Err(ExprError::TooLong(MAX_TOKENS));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinaryOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            // floored modulo, sign follows the divisor
            BinaryOp::Rem => a - b * (a / b).floor(),
            BinaryOp::Pow => a.powf(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Func {
    Abs,
    Sqrt,
    Exp,
    Log,
    Log10,
    Sin,
    Cos,
    Tan,
    Floor,
    Ceil,
    Round,
    Min,
    Max,
    Pow,
}

impl Func {
    fn lookup(name: &str) -> Option<Func> {
        let name = name.strip_prefix("np.").unwrap_or(name);
        Some(match name {
            "abs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "log" => Func::Log,
            "log10" => Func::Log10,
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "round" => Func::Round,
            "min" | "minimum" => Func::Min,
            "max" | "maximum" => Func::Max,
            "pow" | "power" => Func::Pow,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Func::Abs => "abs",
            Func::Sqrt => "sqrt",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Log10 => "log10",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Round => "round",
            Func::Min => "min",
            Func::Max => "max",
            Func::Pow => "pow",
        }
    }

    fn arity(self) -> usize {
        match self {
            Func::Min | Func::Max | Func::Pow => 2,
            _ => 1,
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            Func::Abs => args[0].abs(),
            Func::Sqrt => args[0].sqrt(),
            Func::Exp => args[0].exp(),
            Func::Log => args[0].ln(),
            Func::Log10 => args[0].log10(),
            Func::Sin => args[0].sin(),
            Func::Cos => args[0].cos(),
            Func::Tan => args[0].tan(),
            Func::Floor => args[0].floor(),
            Func::Ceil => args[0].ceil(),
            // half to even, like numpy
            Func::Round => {
                let r = args[0].round();
                if (args[0] - args[0].trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
                    r - args[0].signum()
                } else {
                    r
                }
            }
            Func::Min => args[0].min(args[1]),
            Func::Max => args[0].max(args[1]),
            Func::Pow => args[0].powf(args[1]),
        }
    }
}

/// Syntax tree before names and functions are resolved.
#[derive(Debug, Clone, PartialEq)]
enum Ast {
    Num(f64),
    Name(String),
    Column(usize),
    Neg(Box<Ast>),
    Binary {
        op: BinaryOp,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    Call {
        name: String,
        args: Vec<Ast>,
    },
}

impl Ast {
    fn binary(op: BinaryOp, lhs: Ast, rhs: Ast) -> Ast {
        Ast::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Sign {
    Neg,
    Pos,
}

impl Sign {
    fn apply(self, operand: Ast) -> Ast {
        match self {
            Sign::Neg => Ast::Neg(Box::new(operand)),
            Sign::Pos => operand,
        }
    }
}

fn expr_parser<'src>() -> impl Parser<'src, &'src [Token], Ast, extra::Err<Rich<'src, Token>>> + Clone {
    recursive(|expr| {
        let number = select! { Token::Num(n) => Ast::Num(n) };
        let column = select! { Token::Column(idx) => Ast::Column(idx) };

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));
        let name_or_call = select! { Token::Ident(name) => name }
            .then(args.or_not())
            .map(|(name, args)| match args {
                Some(args) => Ast::Call { name, args },
                None => Ast::Name(name),
            });

        let parens = expr.delimited_by(just(Token::LParen), just(Token::RParen));
        let atom = choice((number, column, name_or_call, parens));

        let sign = choice((
            just(Token::Minus).to(Sign::Neg),
            just(Token::Plus).to(Sign::Pos),
        ));

        // Right-associative; each exponent may carry its own signs, so
        // `2 ** -3 ** 2` is `2 ** -(3 ** 2)`.
        let pow_op = choice((just(Token::StarStar), just(Token::Caret)));
        let power = atom
            .clone()
            .then(
                pow_op
                    .ignore_then(sign.clone().repeated().collect::<Vec<_>>().then(atom))
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(base, rest)| {
                let mut exponent: Option<Ast> = None;
                for (signs, operand) in rest.into_iter().rev() {
                    let operand = match exponent.take() {
                        Some(rhs) => Ast::binary(BinaryOp::Pow, operand, rhs),
                        None => operand,
                    };
                    exponent = Some(signs.into_iter().rev().fold(operand, |acc, s| s.apply(acc)));
                }
                match exponent {
                    Some(rhs) => Ast::binary(BinaryOp::Pow, base, rhs),
                    None => base,
                }
            });

        let unary = sign.repeated().foldr(power, |sign, operand| sign.apply(operand));

        let mul_op = choice((
            just(Token::Star).to(BinaryOp::Mul),
            just(Token::Slash).to(BinaryOp::Div),
            just(Token::Percent).to(BinaryOp::Rem),
        ));
        let term = unary
            .clone()
            .foldl_with(mul_op.then(unary).repeated(), |lhs, (op, rhs), _e| {
                Ast::binary(op, lhs, rhs)
            });

        let add_op = choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ));
        term.clone()
            .foldl_with(add_op.then(term).repeated(), |lhs, (op, rhs), _e| {
                Ast::binary(op, lhs, rhs)
            })
    })
}

fn syntax_error(errors: Vec<Rich<'_, Token>>) -> ExprError {
    match errors.first().and_then(|e| e.found()) {
        Some(token) => ExprError::UnexpectedToken(token.to_string()),
        None => ExprError::UnexpectedEnd,
    }
}

/// Compiled formula. Names are already resolved to column indices.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Column(usize),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Parse `src` and resolve its names against `columns`.
    ///
    /// Column indices follow `columns` order. `pi` and `e` resolve to
    /// constants unless a column shadows them.
    pub fn compile<V>(src: &str, columns: &IndexMap<String, V>) -> Result<Expr, ExprError> {
        let tokens = tokenize(src, columns)?;
        if tokens.is_empty() {
            return Err(ExprError::UnexpectedEnd);
        }
        check_size(&tokens)?;

        let ast = expr_parser()
            .then_ignore(end())
            .parse(tokens.as_slice())
            .into_result()
            .map_err(syntax_error)?;
        Self::resolve(ast, columns)
    }

    fn resolve<V>(ast: Ast, columns: &IndexMap<String, V>) -> Result<Expr, ExprError> {
        Ok(match ast {
            Ast::Num(n) => Expr::Num(n),
            Ast::Column(idx) => Expr::Column(idx),
            Ast::Name(name) => match columns.get_index_of(&name) {
                Some(idx) => Expr::Column(idx),
                None => match name.strip_prefix("np.").unwrap_or(&name) {
                    "pi" => Expr::Num(std::f64::consts::PI),
                    "e" => Expr::Num(std::f64::consts::E),
                    _ => return Err(ExprError::UnknownName(name)),
                },
            },
            Ast::Neg(inner) => Expr::Neg(Box::new(Self::resolve(*inner, columns)?)),
            Ast::Binary { op, lhs, rhs } => Expr::Binary {
                op,
                lhs: Box::new(Self::resolve(*lhs, columns)?),
                rhs: Box::new(Self::resolve(*rhs, columns)?),
            },
            Ast::Call { name, args } => {
                let func = Func::lookup(&name).ok_or(ExprError::UnknownFunction(name))?;
                if args.len() != func.arity() {
                    return Err(ExprError::Arity {
                        func: func.name(),
                        expected: func.arity(),
                        got: args.len(),
                    });
                }
                Expr::Call {
                    func,
                    args: args
                        .into_iter()
                        .map(|a| Self::resolve(a, columns))
                        .collect::<Result<_, _>>()?,
                }
            }
        })
    }

    /// Value at trial `i`.
    pub fn eval_at(&self, columns: &[&[f64]], i: usize) -> f64 {
        match self {
            Expr::Num(n) => *n,
            Expr::Column(idx) => columns[*idx][i],
            Expr::Neg(inner) => -inner.eval_at(columns, i),
            Expr::Binary { op, lhs, rhs } => op.apply(lhs.eval_at(columns, i), rhs.eval_at(columns, i)),
            Expr::Call { func, args } => {
                let values: Vec<f64> = args.iter().map(|a| a.eval_at(columns, i)).collect();
                func.apply(&values)
            }
        }
    }

    /// Evaluate over `trials` trials against the compiled columns.
    pub fn eval_columns(&self, columns: &[&[f64]], trials: usize) -> Vec<f64> {
        (0..trials).map(|i| self.eval_at(columns, i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> Result<Expr, ExprError> {
        let cols: IndexMap<String, Vec<f64>> = IndexMap::new();
        Expr::compile(src, &cols)
    }

    fn eval(src: &str) -> f64 {
        compile(src).unwrap().eval_at(&[], 0)
    }

    fn columns(entries: &[(&str, Vec<f64>)]) -> IndexMap<String, Vec<f64>> {
        entries
            .iter()
            .map(|(name, values)| (name.to_string(), values.clone()))
            .collect()
    }

    fn eval_with(src: &str, cols: &IndexMap<String, Vec<f64>>) -> Vec<f64> {
        let expr = Expr::compile(src, cols).unwrap();
        let data: Vec<&[f64]> = cols.values().map(Vec::as_slice).collect();
        let trials = data.first().map_or(1, |c| c.len());
        expr.eval_columns(&data, trials)
    }

    #[test]
    fn test_lexer_tokens() {
        let tokens: Vec<_> = Token::lexer("np.max(x_1, 2.5e-1) ** .5")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("np.max".into()),
                Token::LParen,
                Token::Ident("x_1".into()),
                Token::Comma,
                Token::Num(0.25),
                Token::RParen,
                Token::StarStar,
                Token::Num(0.5),
            ]
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("2 ** 3 ** 2"), 512.0);
        assert_eq!(eval("-2 ** 2"), -4.0);
        assert_eq!(eval("2 ^ -1"), 0.5);
        assert_eq!(eval("2 ** -1 ** 2"), 0.5);
        assert_eq!(eval("10 - 4 - 3"), 3.0);
        assert_eq!(eval("--3 + +2"), 5.0);
        assert_eq!(eval("-7 % 3"), 2.0);
        assert_eq!(eval("1.5e2 + .5"), 150.5);
        assert_eq!(eval("1e3 / 4."), 250.0);
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(eval("max(2, 5) - min(2, 5)"), 3.0);
        assert_eq!(eval("np.maximum(1, 4)"), 4.0);
        assert_eq!(eval("sqrt(16) + abs(-1)"), 5.0);
        assert_eq!(eval("round(2.5) + round(3.5)"), 6.0);
        assert!((eval("cos(pi)") + 1.0).abs() < 1e-12);
        assert!((eval("np.e") - std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn test_columns() {
        let cols = columns(&[("Revenue", vec![10.0, 20.0]), ("Cost", vec![4.0, 5.0])]);
        assert_eq!(eval_with("Revenue - Cost * 2", &cols), vec![2.0, 10.0]);
    }

    #[test]
    fn test_column_shadows_constant() {
        let cols = columns(&[("e", vec![3.0])]);
        assert_eq!(eval_with("e * 2", &cols), vec![6.0]);
    }

    #[test]
    fn test_names_with_spaces_and_punctuation() {
        let cols = columns(&[
            ("Unit", vec![100.0]),
            ("Unit Cost", vec![2.0]),
            ("Cost ($)", vec![7.0]),
        ]);
        assert_eq!(eval_with("Unit Cost * 3", &cols), vec![6.0]);
        assert_eq!(eval_with("Unit - Unit Cost", &cols), vec![98.0]);
        assert_eq!(eval_with("(Cost ($) + 1) / Unit Cost", &cols), vec![4.0]);
        assert_eq!(eval_with("max(Unit Cost,Cost ($))", &cols), vec![7.0]);
    }

    #[test]
    fn test_spaced_name_needs_boundaries() {
        let cols = columns(&[("Unit Cost", vec![2.0])]);
        // glued to identifier characters, so not the column
        assert_eq!(
            Expr::compile("XUnit Cost", &cols),
            Err(ExprError::UnexpectedToken("name 'Cost'".into()))
        );
        assert_eq!(
            Expr::compile("Unit Costs", &cols),
            Err(ExprError::UnexpectedToken("name 'Costs'".into()))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(compile("Revenue * 2"), Err(ExprError::UnknownName("Revenue".into())));
        assert_eq!(compile(""), Err(ExprError::UnexpectedEnd));
        assert_eq!(compile("1 +"), Err(ExprError::UnexpectedEnd));
        assert_eq!(compile("1 $ 2"), Err(ExprError::UnexpectedChar('$', 2)));
        assert_eq!(compile("(1 + 2"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(compile("1 2"), Err(ExprError::UnexpectedToken(_))));
        assert_eq!(
            compile("frobnicate(1)"),
            Err(ExprError::UnknownFunction("frobnicate".into()))
        );
        assert!(matches!(
            compile("max(1)"),
            Err(ExprError::Arity { func: "max", expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(eval(&ok), 1.0);

        let deep = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert_eq!(compile(&deep), Err(ExprError::TooDeep(MAX_NESTING)));

        // must fail cleanly instead of exhausting the stack
        let huge = "(".repeat(200_000);
        assert_eq!(compile(&huge), Err(ExprError::TooDeep(MAX_NESTING)));
        let nested_calls = "abs(".repeat(200_000);
        assert_eq!(compile(&nested_calls), Err(ExprError::TooDeep(MAX_NESTING)));
    }

    #[test]
    fn test_length_limit() {
        assert_eq!(compile(&"-".repeat(200_000)), Err(ExprError::TooLong(MAX_TOKENS)));
        assert!(matches!(
            compile(&vec!["1"; 100_000].join(" + ")),
            Err(ExprError::TooLong(MAX_TOKENS))
        ));
        let long = vec!["1"; 500].join(" + ");
        assert_eq!(eval(&long), 500.0);
    }
}
