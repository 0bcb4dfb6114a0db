//! Code generation from computations to C text.
//!
//! For every computation the generator renders its space for the scanning
//! engine, wraps each body statement in a `s<k>` macro, asks the engine for
//! the loop nest, and assembles the function around it:
//!
//! ```text
//! #define s0(i, j) { y[(i)] += A[(i), (j)] * x[(j)]; }
//!
//! void dmv(const int N, const int M, float *y, const float *A, const float *x) {
//!   int t2, t4;
//! <loop nest>
//! }
//! ```

pub mod c;
pub mod macros;
pub mod relation;
pub mod schedule;

pub use c::StatementTranslator;
pub use relation::{RelationRenderer, SetForm};

use crate::ir::{Computation, Field};
use crate::omega::{scan, ScanRequest, ScanningEngine};
use crate::utils::errors::CompileResult;
use crate::CompileConfig;
use indexmap::IndexMap;
use log::debug;

/// Generates C for computations through a scanning engine.
pub struct CodeGenerator<'e, E: ScanningEngine + ?Sized> {
    engine: &'e E,
    config: CompileConfig,
}

impl<'e, E: ScanningEngine + ?Sized> CodeGenerator<'e, E> {
    pub fn new(engine: &'e E, config: CompileConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// Generate every computation; units are separated by a blank line.
    pub fn generate(&self, computations: &[Computation]) -> CompileResult<String> {
        let several = computations.len() > 1;
        let units = computations
            .iter()
            .map(|comp| self.generate_unit(comp, several))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(units.join("\n\n"))
    }

    /// Generate one function. With `undef`, the statement macros are
    /// undefined after it so the next unit can reuse their names.
    pub fn generate_unit(&self, computation: &Computation, undef: bool) -> CompileResult<String> {
        let space = &computation.space;
        let iterators = space.iterator_names();

        let mut renderer = RelationRenderer::new();
        let relation = renderer.engine_form(space);
        let constants = renderer.constants();

        let defines = self.macros(computation)?;
        let schedules = schedule::build(&space.name, &iterators, computation.body.len());
        let constraints = if self.config.assume_positive {
            constants.iter().map(|c| format!("{} >= 1", c)).collect()
        } else {
            Vec::new()
        };

        let request = ScanRequest::single(&space.name, relation, schedules, constraints);
        let code = scan(self.engine, &request)?;
        let body = if self.config.strip_guard {
            strip_guard(&code)
        } else {
            code.trim().to_string()
        };

        // A zero-dimensional domain has no loop temporaries to declare
        let temps = temporaries(iterators.len());
        let declaration = if temps.is_empty() {
            String::new()
        } else {
            format!("  {} {};\n", self.config.index_type, temps.join(", "))
        };
        let mut text = format!(
            "{}\n\nvoid {}({}) {{\n{}{}\n}}",
            defines.join("\n"),
            space.name,
            self.parameters(&constants, &computation.fields).join(", "),
            declaration,
            body
        );
        if undef {
            for k in 0..computation.body.len() {
                text.push('\n');
                text.push_str(&macros::undef(k));
            }
        }
        Ok(text)
    }

    /// One `#define` per body statement.
    pub fn macros(&self, computation: &Computation) -> CompileResult<Vec<String>> {
        let iterators = computation.space.iterator_names();
        let pointers = written_scalars(&computation.fields);
        let mut translator = StatementTranslator::new();
        computation
            .body
            .iter()
            .enumerate()
            .map(|(k, stmt)| {
                macros::define(k, &iterators, &pointers, &translator.translate_stmt(stmt)?)
            })
            .collect()
    }

    /// Constants first, then fields in first-seen order.
    pub fn parameters(&self, constants: &[String], fields: &IndexMap<String, Field>) -> Vec<String> {
        let elem = &self.config.elem_type;
        let mut params: Vec<String> = constants
            .iter()
            .map(|c| format!("const {} {}", self.config.index_type, c))
            .collect();
        for field in fields.values() {
            let param = match (field.is_scalar(), field.is_read_only()) {
                (true, true) => format!("const {} {}", elem, field.name),
                (false, true) => format!("const {} *{}", elem, field.name),
                (_, false) => format!("{} *{}", elem, field.name),
            };
            params.push(param);
        }
        params
    }
}

/// Scalar fields that are written, and so passed by pointer.
pub fn written_scalars(fields: &IndexMap<String, Field>) -> Vec<&str> {
    fields
        .values()
        .filter(|field| field.is_scalar() && !field.is_read_only())
        .map(|field| field.name.as_str())
        .collect()
}

/// Loop temporaries `t2, t4, ...`, one per iterator.
pub fn temporaries(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("t{}", 2 * n)).collect()
}

/// Remove a single enclosing `if (...) { ... }` from engine output.
///
/// The guard restates the positivity assumptions already sent as
/// constraints; the emitted body is the text between the first `{` and the
/// last `}`.
pub fn strip_guard(code: &str) -> String {
    let trimmed = code.trim();
    if !trimmed.starts_with("if") {
        return trimmed.to_string();
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(open), Some(close)) if open < close => {
            debug!("Stripping outer guard from engine output");
            trimmed[open + 1..close].trim().to_string()
        }
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend;
    use crate::ir::lower_program;

    fn computations(source: &str) -> Vec<Computation> {
        lower_program(&frontend::parse(source).unwrap()).unwrap()
    }

    fn loop_engine(
        _: &IndexMap<String, String>,
        _: &IndexMap<String, Vec<String>>,
        _: &[String],
        _: &[String],
    ) -> String {
        "for(t2 = 0; t2 <= N-1; t2++) {\n  s0(t2);\n}".to_string()
    }

    #[test]
    fn test_temporaries() {
        assert_eq!(temporaries(3), vec!["t2", "t4", "t6"]);
        assert!(temporaries(0).is_empty());
    }

    #[test]
    fn test_strip_guard() {
        let guarded = "if (N >= 1) {\n  for(t2 = 0; t2 <= N-1; t2++) {\n    s0(t2);\n  }\n}\n";
        assert_eq!(strip_guard(guarded), "for(t2 = 0; t2 <= N-1; t2++) {\n    s0(t2);\n  }");
        assert_eq!(strip_guard("\ns0(0);\n"), "s0(0);");
    }

    #[test]
    fn test_parameters() {
        let comps = computations("s = {[i]: 0 <= i < N}\ny[i] = alpha * x[i] + beta\nz = y[i]");
        let generator = CodeGenerator::new(&loop_engine, CompileConfig::default());
        assert_eq!(
            generator.parameters(&["N".to_string()], &comps[0].fields),
            vec![
                "const int N",
                "float *y",
                "const float alpha",
                "const float *x",
                "const float beta",
                "float *z",
            ]
        );
        assert_eq!(
            generator.macros(&comps[0]).unwrap()[1],
            "#define s1(i) { (*z) = y[(i)]; }"
        );
    }

    #[test]
    fn test_written_scalar_is_dereferenced() {
        let comps = computations("s = {[i]: 0 <= i < N}\nsum += x[i] * w");
        let text = CodeGenerator::new(&loop_engine, CompileConfig::default())
            .generate(&comps)
            .unwrap();
        assert!(text.starts_with("#define s0(i) { (*sum) += x[(i)] * w; }\n\n"));
        assert!(text.contains("void s(const int N, float *sum, const float *x, const float w) {"));
    }

    #[test]
    fn test_zero_dimensional_domain_declares_no_temporaries() {
        let comps = computations("s = {[]: 0 <= N}\ny[0] = 1");
        let engine = |_: &IndexMap<String, String>,
                      _: &IndexMap<String, Vec<String>>,
                      _: &[String],
                      _: &[String]| "s0();".to_string();
        let text = CodeGenerator::new(&engine, CompileConfig::default())
            .generate(&comps)
            .unwrap();
        assert_eq!(text, "#define s0() { y[0] = 1; }\n\nvoid s(const int N, float *y) {\ns0();\n}");
    }

    #[test]
    fn test_element_type_from_config() {
        let comps = computations("s = {[i]: 0 <= i < N}\ny[i] = x[i]");
        let config = CompileConfig::default().with_elem_type("double").with_index_type("long");
        let generator = CodeGenerator::new(&loop_engine, config);
        let text = generator.generate(&comps).unwrap();
        assert!(text.contains("void s(const long N, double *y, const double *x) {\n  long t2;\n"));
    }

    #[test]
    fn test_constraints_follow_config() {
        let comps = computations("s = {[i]: 0 <= i < N}\ny[i] = x[i]");
        let engine = |_: &IndexMap<String, String>,
                      _: &IndexMap<String, Vec<String>>,
                      _: &[String],
                      constraints: &[String]| format!("s0(0); // {}", constraints.len());
        let positive = CodeGenerator::new(&engine, CompileConfig::default());
        assert!(positive.generate(&comps).unwrap().contains("// 1"));
        let config = CompileConfig { assume_positive: false, ..CompileConfig::default() };
        let unconstrained = CodeGenerator::new(&engine, config);
        assert!(unconstrained.generate(&comps).unwrap().contains("// 0"));
    }

    #[test]
    fn test_units_undefine_their_macros() {
        let comps = computations("a = {[i]: 0 <= i < N}\nx[i] = 0\nb = {[i]: 0 <= i < N}\ny[i] = 1");
        let text = CodeGenerator::new(&loop_engine, CompileConfig::default())
            .generate(&comps)
            .unwrap();
        assert_eq!(text.matches("#define s0(i)").count(), 2);
        assert_eq!(text.matches("#undef s0").count(), 2);
        assert!(text.contains("}\n#undef s0\n\n#define s0(i) { y[(i)] = 1; }"));
    }
}
