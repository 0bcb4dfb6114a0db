//! Statement macros wrapped around translated statements.
//!
//! The scanning engine emits calls such as `s0(t2,t4)`; each call site is
//! bound to its statement through a function-like macro whose parameters
//! are the space iterators.

use crate::utils::errors::{CompileError, CompileResult};
use regex::Regex;

/// Replace every whole-token occurrence of `names` using `replacement`,
/// where `${0}` is the matched token.
fn wrap_tokens(statement: &str, names: &[&str], replacement: &str) -> CompileResult<String> {
    if names.is_empty() {
        return Ok(statement.to_string());
    }
    let alternatives: Vec<String> = names.iter().map(|name| regex::escape(name)).collect();
    let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
    let re = Regex::new(&pattern)
        .map_err(|e| CompileError::structural(format!("bad token pattern {}: {}", pattern, e)))?;
    Ok(re.replace_all(statement, replacement).into_owned())
}

/// Parenthesize every whole-token occurrence of an iterator.
///
/// `inp[i + 1]` with iterator `i` becomes `inp[(i) + 1]`; the `i` inside
/// `inp` is left alone.
pub fn protect_iterators(statement: &str, iterators: &[&str]) -> CompileResult<String> {
    wrap_tokens(statement, iterators, "(${0})")
}

/// Dereference written scalar fields, which are passed as pointers.
pub fn dereference_scalars(statement: &str, scalars: &[&str]) -> CompileResult<String> {
    wrap_tokens(statement, scalars, "(*${0})")
}

/// `#define s<index>(<iterators>) { <statement>; }`
///
/// `pointers` names the written scalars of the statement's computation.
pub fn define(index: usize, iterators: &[&str], pointers: &[&str], statement: &str) -> CompileResult<String> {
    let statement = dereference_scalars(statement, pointers)?;
    Ok(format!(
        "#define s{}({}) {{ {}; }}",
        index,
        iterators.join(", "),
        protect_iterators(&statement, iterators)?
    ))
}

pub fn undef(index: usize) -> String {
    format!("#undef s{}", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define() {
        let text = define(0, &["i", "j"], &[], "y[i] += A[i, j] * x[j]").unwrap();
        assert_eq!(text, "#define s0(i, j) { y[(i)] += A[(i), (j)] * x[(j)]; }");
    }

    #[test]
    fn test_whole_tokens_only() {
        let text = protect_iterators("out[i] = inp[i + 1] + i2 + pi", &["i"]).unwrap();
        assert_eq!(text, "out[(i)] = inp[(i) + 1] + i2 + pi");
    }

    #[test]
    fn test_written_scalars_dereferenced() {
        let text = define(0, &["i"], &["sum"], "sum += x[i] * summand").unwrap();
        assert_eq!(text, "#define s0(i) { (*sum) += x[(i)] * summand; }");
    }

    #[test]
    fn test_no_iterators() {
        assert_eq!(protect_iterators("x = 1", &[]).unwrap(), "x = 1");
        assert_eq!(undef(3), "#undef s3");
    }
}
