//! A safe, side-effect-free recursive-descent evaluator for a `"CEL"`
//! dialect subset: literals, dotted variable paths, comparison, logical and
//! arithmetic operators.
//!
//! This is *not* a full implementation of the real CEL grammar (see
//! DESIGN.md) -- it is grounded on
//! `original_source/CentralGraphEngine/condition_evaluator.py`, which itself
//! evaluates expressions with Python's `simpleeval` against a plain name
//! dictionary. The subset here covers exactly what that file exercises.

use serde_json::Value;
use tracing::debug;

use super::EvalError;
use agentgraph_types::Condition;

/// Evaluates edge [`Condition`]s against a task's result document.
#[derive(Debug, Clone, Default)]
pub struct PredicateEvaluator;

impl PredicateEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// `evaluate(condition?, context) -> bool`. Absent condition is an
    /// unconditional edge (`true`). Any evaluation error -- parse failure,
    /// unbound identifier, type mismatch, unsupported dialect -- yields
    /// `false`, never propagates.
    pub fn evaluate(&self, condition: Option<&Condition>, context: &Value) -> bool {
        let Some(condition) = condition else {
            return true;
        };

        if condition.evaluator != "CEL" {
            debug!(evaluator = %condition.evaluator, "unsupported evaluator dialect, predicate is false");
            return false;
        }

        match self.eval_expression(&condition.expression, context) {
            Ok(value) => truthy(&value),
            Err(err) => {
                debug!(expression = %condition.expression, error = %err, "predicate evaluation failed, defaulting to false");
                false
            }
        }
    }

    fn eval_expression(&self, expression: &str, raw_context: &Value) -> Result<Value, EvalError> {
        let context = build_context(raw_context);
        let tokens = tokenize(expression)?;
        let mut parser = Parser::new(&tokens);
        let ast = parser.parse_expr(0)?;
        parser.expect_end()?;
        eval_node(&ast, &context)
    }
}

/// If `context` lacks a top-level `result` key, bind the whole document as
/// `result` in addition to exposing its keys at top level -- so both
/// `result.field` and `field` resolve.
fn build_context(context: &Value) -> Value {
    let mut obj = match context {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("result".to_string(), other.clone());
            return Value::Object(map);
        }
    };
    if !obj.contains_key("result") {
        obj.insert("result".to_string(), Value::Object(obj.clone()));
    }
    Value::Object(obj)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ---------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
            continue;
        }
        if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
            continue;
        }
        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != quote {
                i += 1;
            }
            if i >= chars.len() {
                return Err(EvalError::Parse("unterminated string literal".into()));
            }
            tokens.push(Token::Str(chars[start..i].iter().collect()));
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            let mut is_float = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                if chars[i] == '.' {
                    is_float = true;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            if is_float {
                let v: f64 = text
                    .parse()
                    .map_err(|_| EvalError::Parse(format!("bad number literal: {text}")))?;
                tokens.push(Token::Float(v));
            } else {
                let v: i64 = text
                    .parse()
                    .map_err(|_| EvalError::Parse(format!("bad number literal: {text}")))?;
                tokens.push(Token::Int(v));
            }
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        // operators, longest-match first
        let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        match two.as_str() {
            "==" | "!=" | "<=" | ">=" | "&&" | "||" => {
                tokens.push(Token::Op(match two.as_str() {
                    "==" => "==",
                    "!=" => "!=",
                    "<=" => "<=",
                    ">=" => ">=",
                    "&&" => "&&",
                    "||" => "||",
                    _ => unreachable!(),
                }));
                i += 2;
                continue;
            }
            _ => {}
        }
        let op = match c {
            '<' => "<",
            '>' => ">",
            '!' => "!",
            '+' => "+",
            '-' => "-",
            '*' => "*",
            '/' => "/",
            other => return Err(EvalError::Parse(format!("unexpected character: {other}"))),
        };
        tokens.push(Token::Op(op));
        i += 1;
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------
// Parser (Pratt-style precedence climbing) and AST
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Var(String),
    Unary(&'static str, Box<Node>),
    Binary(&'static str, Box<Node>, Box<Node>),
    /// `in` / `has` -- parsed but unsupported; evaluating one always errs.
    Unsupported(&'static str),
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expect_end(&self) -> Result<(), EvalError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(EvalError::Parse("trailing tokens after expression".into()))
        }
    }

    /// Binding power table, lowest to highest: `||`, `&&`, comparisons,
    /// `+ -`, `* /`.
    fn binding_power(op: &str) -> Option<(u8, u8)> {
        match op {
            "||" => Some((1, 2)),
            "&&" => Some((3, 4)),
            "==" | "!=" | "<" | "<=" | ">" | ">=" | "in" | "has" => Some((5, 6)),
            "+" | "-" => Some((7, 8)),
            "*" | "/" => Some((9, 10)),
            _ => None,
        }
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Node, EvalError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek() {
                Some(Token::Op(op)) => *op,
                Some(Token::Ident(word)) if word == "in" || word == "has" => {
                    // leaked into identifier token stream; treat as operator
                    let word: &'static str = if word == "in" { "in" } else { "has" };
                    word
                }
                _ => break,
            };
            let Some((l_bp, r_bp)) = Self::binding_power(op) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();
            if op == "in" || op == "has" {
                // consume the rhs to keep parsing well-formed, but `in`/`has`
                // are unsupported operators.
                let _ = self.parse_expr(r_bp)?;
                lhs = Node::Unsupported(op);
                continue;
            }
            let rhs = self.parse_expr(r_bp)?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Node, EvalError> {
        match self.advance().cloned() {
            Some(Token::Op("!")) => Ok(Node::Unary("!", Box::new(self.parse_expr(11)?))),
            Some(Token::Op("-")) => Ok(Node::Unary("-", Box::new(self.parse_expr(11)?))),
            Some(Token::LParen) => {
                let inner = self.parse_expr(0)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(EvalError::Parse("expected closing paren".into())),
                }
            }
            Some(Token::Int(n)) => Ok(Node::Int(n)),
            Some(Token::Float(f)) => Ok(Node::Float(f)),
            Some(Token::Str(s)) => Ok(Node::Str(s)),
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Node::Bool(true)),
                "false" => Ok(Node::Bool(false)),
                _ => Ok(Node::Var(word)),
            },
            other => Err(EvalError::Parse(format!("unexpected token: {other:?}"))),
        }
    }
}

// ---------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------

fn eval_node(node: &Node, context: &Value) -> Result<Value, EvalError> {
    match node {
        Node::Bool(b) => Ok(Value::Bool(*b)),
        Node::Int(n) => Ok(Value::Number((*n).into())),
        Node::Float(f) => Ok(serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        Node::Str(s) => Ok(Value::String(s.clone())),
        Node::Var(path) => resolve_path(context, path)
            .cloned()
            .ok_or_else(|| EvalError::UnboundIdentifier(path.clone())),
        Node::Unsupported(op) => Err(EvalError::Unsupported((*op).to_string())),
        Node::Unary("!", inner) => Ok(Value::Bool(!truthy(&eval_node(inner, context)?))),
        Node::Unary("-", inner) => {
            let v = eval_node(inner, context)?;
            let n = as_f64(&v)?;
            Ok(serde_json::Number::from_f64(-n)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        Node::Unary(op, _) => Err(EvalError::Unsupported(format!("unary {op}"))),
        Node::Binary(op, lhs, rhs) => eval_binary(op, lhs, rhs, context),
    }
}

fn eval_binary(op: &str, lhs: &Node, rhs: &Node, context: &Value) -> Result<Value, EvalError> {
    match op {
        "&&" => {
            let l = eval_node(lhs, context)?;
            if !truthy(&l) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&eval_node(rhs, context)?)))
        }
        "||" => {
            let l = eval_node(lhs, context)?;
            if truthy(&l) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&eval_node(rhs, context)?)))
        }
        "==" => Ok(Value::Bool(values_equal(
            &eval_node(lhs, context)?,
            &eval_node(rhs, context)?,
        ))),
        "!=" => Ok(Value::Bool(!values_equal(
            &eval_node(lhs, context)?,
            &eval_node(rhs, context)?,
        ))),
        "<" | "<=" | ">" | ">=" => {
            let l = as_f64(&eval_node(lhs, context)?)?;
            let r = as_f64(&eval_node(rhs, context)?)?;
            let result = match op {
                "<" => l < r,
                "<=" => l <= r,
                ">" => l > r,
                ">=" => l >= r,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        "+" | "-" | "*" | "/" => {
            let l = as_f64(&eval_node(lhs, context)?)?;
            let r = as_f64(&eval_node(rhs, context)?)?;
            let result = match op {
                "+" => l + r,
                "-" => l - r,
                "*" => l * r,
                "/" => {
                    if r == 0.0 {
                        return Err(EvalError::TypeMismatch("division by zero".into()));
                    }
                    l / r
                }
                _ => unreachable!(),
            };
            Ok(serde_json::Number::from_f64(result)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        other => Err(EvalError::Unsupported(other.to_string())),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x == y;
    }
    a == b
}

fn as_f64(value: &Value) -> Result<f64, EvalError> {
    value
        .as_f64()
        .ok_or_else(|| EvalError::TypeMismatch(format!("expected number, got {value}")))
}

/// Walk a dotted path (`result.data.score`) from the root of `context`.
fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = context;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cond(expr: &str) -> Condition {
        Condition {
            evaluator: "CEL".to_string(),
            expression: expr.to_string(),
        }
    }

    #[test]
    fn no_condition_is_true() {
        let ev = PredicateEvaluator::new();
        assert!(ev.evaluate(None, &json!({})));
    }

    #[test]
    fn unsupported_dialect_is_false() {
        let ev = PredicateEvaluator::new();
        let c = Condition {
            evaluator: "JSONPath".to_string(),
            expression: "true".to_string(),
        };
        assert!(!ev.evaluate(Some(&c), &json!({})));
    }

    #[test]
    fn dotted_path_and_top_level_both_resolve() {
        let ev = PredicateEvaluator::new();
        let ctx = json!({"success": true, "data": {"temp": 25}});
        assert!(ev.evaluate(Some(&cond("result.success == true")), &ctx));
        assert!(ev.evaluate(Some(&cond("success == true")), &ctx));
    }

    #[test]
    fn comparison_and_logical_operators() {
        let ev = PredicateEvaluator::new();
        let ctx = json!({"score": 42, "ok": true});
        assert!(ev.evaluate(Some(&cond("score > 10 && ok")), &ctx));
        assert!(!ev.evaluate(Some(&cond("score > 100 || !ok")), &ctx));
        assert!(ev.evaluate(Some(&cond("score != 0")), &ctx));
    }

    #[test]
    fn arithmetic() {
        let ev = PredicateEvaluator::new();
        let ctx = json!({"score": 10});
        assert!(ev.evaluate(Some(&cond("score * 2 == 20")), &ctx));
        assert!(ev.evaluate(Some(&cond("(score + 5) / 3 == 5")), &ctx));
    }

    #[test]
    fn parse_error_is_false() {
        let ev = PredicateEvaluator::new();
        assert!(!ev.evaluate(Some(&cond("score >>> 10")), &json!({"score": 1})));
    }

    #[test]
    fn unbound_identifier_is_false() {
        let ev = PredicateEvaluator::new();
        assert!(!ev.evaluate(Some(&cond("result.nonexistent.field == 1")), &json!({})));
    }

    #[test]
    fn missing_result_evaluates_against_empty_object() {
        let ev = PredicateEvaluator::new();
        // Unconditional edges still fire when there's no result at all.
        assert!(ev.evaluate(None, &json!(null)));
    }

    #[test]
    fn membership_operators_unsupported_yield_false() {
        let ev = PredicateEvaluator::new();
        assert!(!ev.evaluate(Some(&cond("'a' in result.tags")), &json!({"tags": ["a"]})));
    }

    #[test]
    fn nested_field_condition_holds_on_success() {
        let ev = PredicateEvaluator::new();
        let ctx = json!({"success": true, "data": {"temp": 25}});
        assert!(ev.evaluate(Some(&cond("result.success == true")), &ctx));
    }

    #[test]
    fn nested_field_condition_blocks_on_failure() {
        let ev = PredicateEvaluator::new();
        let ctx = json!({"success": false});
        assert!(!ev.evaluate(Some(&cond("result.success == true")), &ctx));
    }
}
