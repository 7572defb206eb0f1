//! Edge-condition expression evaluator.
//!
//! Conditions are small boolean expressions over the scalars in
//! `FlowState.edges_var`, e.g.
//! `intent == 'record_blood_pressure' && confidence >= 0.8`.
//!
//! Grammar, loosest to tightest binding:
//!
//! ```text
//! or_expr  := and_expr (("||" | "or") and_expr)*
//! and_expr := not_expr (("&&" | "and") not_expr)*
//! not_expr := ("!" | "not")* cmp_expr
//! cmp_expr := primary (("==" | "!=" | "<" | "<=" | ">" | ">=") primary)?
//! primary  := number | string | boolean | identifier | "(" or_expr ")"
//! ```
//!
//! Booleans are case-insensitive (`true`/`True`/`TRUE`). Strings take single
//! or double quotes. Identifiers resolve from `edges_var`; a missing or null
//! identifier gets a sentinel default by name so never-set variables read
//! naturally instead of failing:
//!
//! - `*_success` → `false`
//! - `*_type` → `""`
//! - `confidence` → `0.0`
//! - `need_clarification` → `false`
//! - `intent` → `""`
//! - anything else → `""`
//!
//! Evaluation NEVER panics or raises to callers: syntax errors, non-scalar
//! variables, and type-mismatched comparisons evaluate to `false` with a
//! warning. Non-boolean results coerce via truthiness (non-zero number,
//! non-empty string).

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Scalar value domain of condition expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum CondValue {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl CondValue {
    fn truthy(&self) -> bool {
        match self {
            CondValue::Bool(b) => *b,
            CondValue::Num(n) => *n != 0.0,
            CondValue::Str(s) => !s.is_empty(),
        }
    }
}

/// Internal evaluation failure; always recovered to `false` at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionError(String);

impl fmt::Display for ConditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

type CondResult<T> = std::result::Result<T, ConditionError>;

fn err<T>(msg: impl Into<String>) -> CondResult<T> {
    Err(ConditionError(msg.into()))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Bool(bool),
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> CondResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    return err(format!("Unexpected '&' at offset {i}"));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    return err(format!("Unexpected '|' at offset {i}"));
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    return err(format!("Unexpected '=' at offset {i}; did you mean '=='?"));
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
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => return err("Unterminated string literal"),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '0'..='9' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                match text.parse::<f64>() {
                    Ok(n) => tokens.push(Token::Num(n)),
                    Err(_) => return err(format!("Invalid number literal '{text}'")),
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.to_lowercase().as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            other => return err(format!("Unexpected character '{other}' at offset {i}")),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(CondValue),
    Ident(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse(mut self) -> CondResult<Expr> {
        let expr = self.or_expr()?;
        if let Some(extra) = self.peek() {
            return err(format!("Unexpected trailing token {extra:?}"));
        }
        Ok(expr)
    }

    fn or_expr(&mut self) -> CondResult<Expr> {
        let mut left = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> CondResult<Expr> {
        let mut left = self.not_expr()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> CondResult<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let inner = self.not_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.cmp_expr()
    }

    fn cmp_expr(&mut self) -> CondResult<Expr> {
        let left = self.primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Ne) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.primary()?;
        Ok(Expr::Cmp(op, Box::new(left), Box::new(right)))
    }

    fn primary(&mut self) -> CondResult<Expr> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(Expr::Literal(CondValue::Num(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(CondValue::Str(s))),
            Some(Token::Bool(b)) => Ok(Expr::Literal(CondValue::Bool(b))),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => err("Expected ')'"),
                }
            }
            other => err(format!("Expected a value, got {other:?}")),
        }
    }
}

/// Sentinel default for a missing or null variable, by name.
fn default_for(name: &str) -> CondValue {
    if name.ends_with("_success") {
        CondValue::Bool(false)
    } else if name.ends_with("_type") {
        CondValue::Str(String::new())
    } else {
        match name {
            "confidence" => CondValue::Num(0.0),
            "need_clarification" => CondValue::Bool(false),
            "intent" => CondValue::Str(String::new()),
            _ => CondValue::Str(String::new()),
        }
    }
}

fn resolve(name: &str, vars: &HashMap<String, Value>) -> CondResult<CondValue> {
    match vars.get(name) {
        None | Some(Value::Null) => Ok(default_for(name)),
        Some(Value::Bool(b)) => Ok(CondValue::Bool(*b)),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(CondValue::Num)
            .ok_or_else(|| ConditionError(format!("Variable '{name}' is not a finite number"))),
        Some(Value::String(s)) => Ok(CondValue::Str(s.clone())),
        Some(other) => err(format!(
            "Variable '{name}' is not a scalar (found {})",
            match other {
                Value::Array(_) => "array",
                Value::Object(_) => "object",
                _ => "unsupported value",
            }
        )),
    }
}

fn compare(op: CmpOp, left: &CondValue, right: &CondValue) -> CondResult<bool> {
    use CondValue::*;
    match op {
        CmpOp::Eq => Ok(values_equal(left, right)),
        CmpOp::Ne => Ok(!values_equal(left, right)),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = match (left, right) {
                (Num(a), Num(b)) => a.partial_cmp(b),
                (Str(a), Str(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return err(format!("Cannot order {left:?} against {right:?}"));
            };
            Ok(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            })
        }
    }
}

fn values_equal(left: &CondValue, right: &CondValue) -> bool {
    use CondValue::*;
    match (left, right) {
        (Bool(a), Bool(b)) => a == b,
        (Num(a), Num(b)) => a == b,
        (Str(a), Str(b)) => a == b,
        _ => false,
    }
}

fn eval(expr: &Expr, vars: &HashMap<String, Value>) -> CondResult<CondValue> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => resolve(name, vars),
        Expr::Not(inner) => Ok(CondValue::Bool(!eval(inner, vars)?.truthy())),
        Expr::And(a, b) => {
            if !eval(a, vars)?.truthy() {
                return Ok(CondValue::Bool(false));
            }
            Ok(CondValue::Bool(eval(b, vars)?.truthy()))
        }
        Expr::Or(a, b) => {
            if eval(a, vars)?.truthy() {
                return Ok(CondValue::Bool(true));
            }
            Ok(CondValue::Bool(eval(b, vars)?.truthy()))
        }
        Expr::Cmp(op, a, b) => {
            let left = eval(a, vars)?;
            let right = eval(b, vars)?;
            Ok(CondValue::Bool(compare(*op, &left, &right)?))
        }
    }
}

/// Public evaluator facade.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate `condition` against `edges_var`.
    ///
    /// Any failure (empty condition, syntax error, non-scalar variable,
    /// unorderable comparison) evaluates to `false` and logs a warning.
    pub fn evaluate(condition: &str, edges_var: &HashMap<String, Value>) -> bool {
        if condition.trim().is_empty() {
            tracing::warn!("Empty edge condition evaluates to false");
            return false;
        }

        match Self::try_evaluate(condition, edges_var) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(condition, error = %e, "Condition evaluation failed, treating as false");
                false
            }
        }
    }

    fn try_evaluate(condition: &str, edges_var: &HashMap<String, Value>) -> CondResult<bool> {
        let tokens = tokenize(condition)?;
        let expr = Parser::new(tokens).parse()?;
        Ok(eval(&expr, edges_var)?.truthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn equality_and_conjunction() {
        let v = vars(&[
            ("intent", json!("record_blood_pressure")),
            ("confidence", json!(0.92)),
        ]);
        assert!(ConditionEvaluator::evaluate(
            "intent == 'record_blood_pressure' && confidence >= 0.8",
            &v
        ));
        assert!(!ConditionEvaluator::evaluate(
            "intent == 'query_blood_pressure' && confidence >= 0.8",
            &v
        ));
    }

    #[test]
    fn threshold_is_inclusive() {
        let v = vars(&[("confidence", json!(0.8))]);
        assert!(ConditionEvaluator::evaluate("confidence >= 0.8", &v));
        assert!(!ConditionEvaluator::evaluate("confidence > 0.8", &v));
    }

    #[test]
    fn missing_identifier_never_raises() {
        let v = HashMap::new();
        assert!(!ConditionEvaluator::evaluate("foo == 'bar'", &v));
        // Sentinel defaults make natural-reading conditions work unset.
        assert!(ConditionEvaluator::evaluate("intent == ''", &v));
        assert!(ConditionEvaluator::evaluate("confidence < 0.5", &v));
        assert!(!ConditionEvaluator::evaluate("need_clarification", &v));
        assert!(!ConditionEvaluator::evaluate("save_success", &v));
        assert!(ConditionEvaluator::evaluate("event_type == ''", &v));
    }

    #[test]
    fn null_values_use_sentinel_defaults() {
        let v = vars(&[("confidence", Value::Null), ("intent", Value::Null)]);
        assert!(ConditionEvaluator::evaluate("confidence <= 0.0", &v));
        assert!(ConditionEvaluator::evaluate("intent == ''", &v));
    }

    #[test]
    fn python_style_operators() {
        let v = vars(&[("intent", json!("greeting")), ("need_clarification", json!(true))]);
        assert!(ConditionEvaluator::evaluate(
            "intent == 'greeting' or need_clarification == True",
            &v
        ));
        assert!(ConditionEvaluator::evaluate(
            "not (intent == 'farewell')",
            &v
        ));
    }

    #[test]
    fn case_insensitive_booleans() {
        let v = vars(&[("need_clarification", json!(true))]);
        assert!(ConditionEvaluator::evaluate("need_clarification == TRUE", &v));
        assert!(ConditionEvaluator::evaluate("need_clarification != false", &v));
    }

    #[test]
    fn parentheses_change_grouping() {
        let v = vars(&[("a_success", json!(true)), ("b_success", json!(false))]);
        assert!(ConditionEvaluator::evaluate(
            "a_success && (b_success || true)",
            &v
        ));
        assert!(!ConditionEvaluator::evaluate(
            "(a_success && b_success) || false",
            &v
        ));
    }

    #[test]
    fn syntax_errors_are_false() {
        let v = HashMap::new();
        assert!(!ConditionEvaluator::evaluate("intent == ", &v));
        assert!(!ConditionEvaluator::evaluate("intent = 'x'", &v));
        assert!(!ConditionEvaluator::evaluate("(intent == 'x'", &v));
        assert!(!ConditionEvaluator::evaluate("intent == 'x' extra", &v));
        assert!(!ConditionEvaluator::evaluate("", &v));
        assert!(!ConditionEvaluator::evaluate("   ", &v));
    }

    #[test]
    fn cross_type_equality_is_false_not_error() {
        let v = vars(&[("confidence", json!(0.9))]);
        assert!(!ConditionEvaluator::evaluate("confidence == 'high'", &v));
        assert!(ConditionEvaluator::evaluate("confidence != 'high'", &v));
    }

    #[test]
    fn cross_type_ordering_is_false() {
        let v = vars(&[("intent", json!("greeting"))]);
        assert!(!ConditionEvaluator::evaluate("intent > 3", &v));
    }

    #[test]
    fn non_scalar_variable_is_false() {
        let v = vars(&[("keywords", json!(["a", "b"]))]);
        assert!(!ConditionEvaluator::evaluate("keywords == 'a'", &v));
    }

    #[test]
    fn truthiness_coerces_bare_values() {
        let v = vars(&[("count", json!(2)), ("name", json!("x")), ("zero", json!(0))]);
        assert!(ConditionEvaluator::evaluate("count", &v));
        assert!(ConditionEvaluator::evaluate("name", &v));
        assert!(!ConditionEvaluator::evaluate("zero", &v));
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        let v = vars(&[("stage", json!("b"))]);
        assert!(ConditionEvaluator::evaluate("stage > 'a'", &v));
        assert!(ConditionEvaluator::evaluate("stage < 'c'", &v));
    }
}
