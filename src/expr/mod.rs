//! Filter expressions
//!
//! An index input node carries an optional expression that pins its scan to
//! a value. The expression is evaluated once per stream against the
//! transaction and the query parameters.

mod errors;

pub use errors::{EvalError, EvalResult};

use std::fmt;

use crate::database::Transaction;
use crate::document::{Value, ValueBuffer};

/// A query parameter, bound by position or by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub value: Value,
}

impl Param {
    pub fn positional(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

/// State an expression is evaluated against
pub struct EvalContext<'a> {
    pub tx: Option<&'a Transaction<'a>>,
    pub params: &'a [Param],
}

impl<'a> EvalContext<'a> {
    pub fn new(tx: Option<&'a Transaction<'a>>, params: &'a [Param]) -> Self {
        Self { tx, params }
    }

    /// Context with parameters only
    pub fn with_params(params: &'a [Param]) -> Self {
        Self { tx: None, params }
    }
}

/// An evaluable expression.
pub trait Expr: fmt::Debug + fmt::Display {
    fn eval(&self, ctx: &EvalContext<'_>) -> EvalResult<Value>;
}

/// A constant value
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralValue(pub Value);

impl Expr for LiteralValue {
    fn eval(&self, _ctx: &EvalContext<'_>) -> EvalResult<Value> {
        Ok(self.0.clone())
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `?` parameter, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionalParam(pub usize);

impl Expr for PositionalParam {
    fn eval(&self, ctx: &EvalContext<'_>) -> EvalResult<Value> {
        if self.0 == 0 {
            return Err(EvalError::ZeroPositional);
        }
        ctx.params
            .get(self.0 - 1)
            .map(|p| p.value.clone())
            .ok_or(EvalError::PositionalOutOfRange {
                index: self.0,
                count: ctx.params.len(),
            })
    }
}

impl fmt::Display for PositionalParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?")
    }
}

/// `$name` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedParam(pub String);

impl Expr for NamedParam {
    fn eval(&self, ctx: &EvalContext<'_>) -> EvalResult<Value> {
        ctx.params
            .iter()
            .find(|p| p.name.as_deref() == Some(self.0.as_str()))
            .map(|p| p.value.clone())
            .ok_or_else(|| EvalError::ParamNotFound(self.0.clone()))
    }
}

impl fmt::Display for NamedParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// `[e1, e2, ...]`, evaluates to an Array
#[derive(Debug)]
pub struct ArrayExpr(pub Vec<Box<dyn Expr>>);

impl Expr for ArrayExpr {
    fn eval(&self, ctx: &EvalContext<'_>) -> EvalResult<Value> {
        let mut vb = ValueBuffer::new();
        for e in &self.0 {
            vb.push(e.eval(ctx)?);
        }
        Ok(Value::from(vb))
    }
}

impl fmt::Display for ArrayExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_params_are_one_based() {
        let params = [Param::positional(10i64), Param::positional("x")];
        let ctx = EvalContext::with_params(&params);
        assert_eq!(PositionalParam(1).eval(&ctx).unwrap(), Value::Integer(10));
        assert_eq!(PositionalParam(2).eval(&ctx).unwrap(), Value::from("x"));
        assert_eq!(
            PositionalParam(3).eval(&ctx).unwrap_err(),
            EvalError::PositionalOutOfRange { index: 3, count: 2 }
        );
        assert_eq!(PositionalParam(0).eval(&ctx).unwrap_err(), EvalError::ZeroPositional);
    }

    #[test]
    fn test_named_params() {
        let params = [Param::named("age", 30i64)];
        let ctx = EvalContext::with_params(&params);
        assert_eq!(NamedParam("age".into()).eval(&ctx).unwrap(), Value::Integer(30));
        assert!(matches!(
            NamedParam("name".into()).eval(&ctx),
            Err(EvalError::ParamNotFound(_))
        ));
    }

    #[test]
    fn test_array_expr() {
        let params = [Param::positional(5i64)];
        let ctx = EvalContext::with_params(&params);
        let e = ArrayExpr(vec![
            Box::new(LiteralValue(Value::Integer(1))),
            Box::new(PositionalParam(1)),
        ]);
        let v = e.eval(&ctx).unwrap();
        assert_eq!(
            v,
            Value::from(ValueBuffer::new().with(1i64).with(5i64))
        );
        assert_eq!(e.to_string(), "[1, ?]");
    }

    #[test]
    fn test_eval_error_maps_to_eval_code() {
        let err: crate::errors::DbError = EvalError::ParamNotFound("x".into()).into();
        assert!(err.is(crate::errors::ErrorCode::EvalError));
    }
}
