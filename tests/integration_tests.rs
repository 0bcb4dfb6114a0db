//! Integration tests for the generation pipeline.
//!
//! The scanning engine is stubbed with closures returning the loop nests the
//! Omega calculator produces for each domain.

use indexmap::IndexMap;
use omegagen::prelude::*;
use omegagen::{compile, lower, parse};

fn canned(
    text: &'static str,
) -> impl Fn(&IndexMap<String, String>, &IndexMap<String, Vec<String>>, &[String], &[String]) -> String {
    move |_: &IndexMap<String, String>, _: &IndexMap<String, Vec<String>>, _: &[String], _: &[String]| {
        text.to_string()
    }
}

fn generate(source: &str, loops: &'static str) -> String {
    compile(source, &canned(loops), &CompileConfig::default()).expect("compilation failed")
}

fn compile_error(source: &str) -> CompileError {
    let err = compile(source, &canned("s0();"), &CompileConfig::default()).unwrap_err();
    match err.downcast::<CompileError>() {
        Ok(e) => e,
        Err(other) => panic!("expected a compile error, got {:?}", other),
    }
}

fn field_names(computation: &Computation) -> Vec<&str> {
    computation.fields.keys().map(|k| k.as_str()).collect()
}

#[test]
fn test_dmv_pipeline() {
    let source = "dmv = {[i, j]: 0 <= i < N ^ 0 <= j < M}\ny[i] += A[i, j] * x[j]";
    let engine = |relations: &IndexMap<String, String>,
                  schedules: &IndexMap<String, Vec<String>>,
                  names: &[String],
                  constraints: &[String]| {
        assert_eq!(relations["dmv"], "dmv = {[i, j] : 0 <= i < N && 0 <= j < M}");
        assert_eq!(schedules["dmv"], vec!["r0dmv := {[i,j] -> [0, i, 0, j, 0]}".to_string()]);
        assert_eq!(names, ["dmv".to_string()]);
        assert_eq!(constraints, ["N >= 1".to_string(), "M >= 1".to_string()]);
        "for(t2 = 0; t2 <= N-1; t2++) {\n  for(t4 = 0; t4 <= M-1; t4++) {\n    s0(t2,t4);\n  }\n}\n".to_string()
    };

    let code = compile(source, &engine, &CompileConfig::default()).unwrap();
    assert_eq!(
        code,
        "#define s0(i, j) { y[(i)] += A[(i), (j)] * x[(j)]; }\n\n\
         void dmv(const int N, const int M, float *y, const float *A, const float *x) {\n  int t2, t4;\n\
         for(t2 = 0; t2 <= N-1; t2++) {\n  for(t4 = 0; t4 <= M-1; t4++) {\n    s0(t2,t4);\n  }\n}\n}"
    );
}

#[test]
fn test_matmul_pipeline() {
    let source = "matmul = {[i, j, k]: 0 <= i < N ^ 0 <= j < M ^ 0 <= k < K}\nC[i, j] += A[i, k] * B[k, j]";
    let computations = lower(source).unwrap();
    assert_eq!(field_names(&computations[0]), vec!["C", "A", "B"]);

    let code = generate(
        source,
        "for(t2 = 0; t2 <= N-1; t2++) {\n  for(t4 = 0; t4 <= M-1; t4++) {\n    for(t6 = 0; t6 <= K-1; t6++) {\n      s0(t2,t4,t6);\n    }\n  }\n}",
    );
    assert_eq!(
        code,
        "#define s0(i, j, k) { C[(i), (j)] += A[(i), (k)] * B[(k), (j)]; }\n\n\
         void matmul(const int N, const int M, const int K, float *C, const float *A, const float *B) {\n  int t2, t4, t6;\n\
         for(t2 = 0; t2 <= N-1; t2++) {\n  for(t4 = 0; t4 <= M-1; t4++) {\n    for(t6 = 0; t6 <= K-1; t6++) {\n      s0(t2,t4,t6);\n    }\n  }\n}\n}"
    );
}

#[test]
fn test_spmv_guard_is_stripped() {
    let source = "spmv = {[i, n, j]: 0 <= i < N ^ rp(i) <= n < rp(i + 1) ^ j == col(n)}\ny[i] += A[n] * x[j]";
    let code = generate(
        source,
        "if (N >= 1) {\n  for(t2 = 0; t2 <= N-1; t2++) {\n    for(t4 = rp(t2); t4 <= rp1(t2)-1; t4++) {\n      t6=col(t2,t4);\n      s0(t2,t4,t6);\n    }\n  }\n}\n",
    );
    assert_eq!(
        code,
        "#define s0(i, n, j) { y[(i)] += A[(n)] * x[(j)]; }\n\n\
         void spmv(const int N, float *y, const float *A, const float *x) {\n  int t2, t4, t6;\n\
         for(t2 = 0; t2 <= N-1; t2++) {\n    for(t4 = rp(t2); t4 <= rp1(t2)-1; t4++) {\n      t6=col(t2,t4);\n      s0(t2,t4,t6);\n    }\n  }\n}"
    );
}

#[test]
fn test_guard_kept_when_configured() {
    let source = "s = {[i]: 0 <= i < N}\ny[i] = x[i]";
    let config = CompileConfig::default().with_strip_guard(false);
    let code = compile(source, &canned("if (N >= 1) {\n  s0(0);\n}"), &config).unwrap();
    assert!(code.ends_with("int t2;\nif (N >= 1) {\n  s0(0);\n}\n}"));
}

#[test]
fn test_spmv_coo_pipeline() {
    let source = "spmv = {[n, i, j]: 0 <= n < M ^ i == row(n) ^ j == col(n)}\ny[i] += A[n] * x[j]";
    let code = generate(
        source,
        "for(t2 = 0; t2 <= M-1; t2++) {\n  t4=row(t2);\n  t6=col(t2);\n  s0(t2,t4,t6);\n}",
    );
    assert_eq!(
        code,
        "#define s0(n, i, j) { y[(i)] += A[(n)] * x[(j)]; }\n\n\
         void spmv(const int M, float *y, const float *A, const float *x) {\n  int t2, t4, t6;\n\
         for(t2 = 0; t2 <= M-1; t2++) {\n  t4=row(t2);\n  t6=col(t2);\n  s0(t2,t4,t6);\n}\n}"
    );
}

#[test]
fn test_krp_pipeline() {
    let source = "krp = {[n, i, j, k, r]: 0 <= n < M ^ i == ind0(n) ^ j == ind1(n) ^ k == ind2(n) ^ 0 <= r < R}\n\
                  A[i, r] += X[n] * C[k, r] * B[j, r]";
    let computations = lower(source).unwrap();
    assert_eq!(computations[0].space.relations.len(), 5);
    assert_eq!(field_names(&computations[0]), vec!["A", "X", "C", "B"]);

    let code = generate(
        source,
        "for(t2 = 0; t2 <= M-1; t2++) {\n  t4=ind0(t2);\n  t6=ind1(t2);\n  t8=ind2(t2);\n  for(t10 = 0; t10 <= R-1; t10++) {\n    s0(t2,t4,t6,t8,t10);\n  }\n}",
    );
    assert_eq!(
        code,
        "#define s0(n, i, j, k, r) { A[(i), (r)] += X[(n)] * C[(k), (r)] * B[(j), (r)]; }\n\n\
         void krp(const int M, const int R, float *A, const float *X, const float *C, const float *B) {\n  int t2, t4, t6, t8, t10;\n\
         for(t2 = 0; t2 <= M-1; t2++) {\n  t4=ind0(t2);\n  t6=ind1(t2);\n  t8=ind2(t2);\n  for(t10 = 0; t10 <= R-1; t10++) {\n    s0(t2,t4,t6,t8,t10);\n  }\n}\n}"
    );
}

#[test]
fn test_lap_pipeline() {
    let source = "lap = {[i, j, k]: 0 <= i < I ^ 0 <= j < J ^ 0 <= k < K}\n\
                  out[i, j, k] = -4.0 * inp[i, j, k] + inp[i + 1, j, k] + inp[i - 1, j, k] + inp[i, j - 1, k] + inp[i, j + 1, k]";
    let code = generate(
        source,
        "for(t2 = 0; t2 <= I-1; t2++) {\n  for(t4 = 0; t4 <= J-1; t4++) {\n    for(t6 = 0; t6 <= K-1; t6++) {\n      s0(t2,t4,t6);\n    }\n  }\n}",
    );
    assert_eq!(
        code,
        "#define s0(i, j, k) { out[(i), (j), (k)] = -4.0 * inp[(i), (j), (k)] + inp[(i) + 1, (j), (k)] + inp[(i) - 1, (j), (k)] + inp[(i), (j) - 1, (k)] + inp[(i), (j) + 1, (k)]; }\n\n\
         void lap(const int I, const int J, const int K, float *out, const float *inp) {\n  int t2, t4, t6;\n\
         for(t2 = 0; t2 <= I-1; t2++) {\n  for(t4 = 0; t4 <= J-1; t4++) {\n    for(t6 = 0; t6 <= K-1; t6++) {\n      s0(t2,t4,t6);\n    }\n  }\n}\n}"
    );
}

#[test]
fn test_corners_constants_deduplicated() {
    let source = "dom = {[i, j, k]: 0 <= i < N ^ 0 <= j < N ^ 0 <= k < K ^ i == N - 1 ^ j == 0}\n\
                  out[i, j, k] = inp[0, j + 5, 0]";
    let code = generate(source, "for(t6 = 0; t6 <= K-1; t6++) {\n  s0(N-1,0,t6);\n}");
    assert_eq!(
        code,
        "#define s0(i, j, k) { out[(i), (j), (k)] = inp[0, (j) + 5, 0]; }\n\n\
         void dom(const int N, const int K, float *out, const float *inp) {\n  int t2, t4, t6;\n\
         for(t6 = 0; t6 <= K-1; t6++) {\n  s0(N-1,0,t6);\n}\n}"
    );
}

#[test]
fn test_engine_error_is_surfaced_verbatim() {
    let source = "dmv = {[i, j]: 0 <= i < N ^ 0 <= j < M}\ny[i] += A[i, j] * x[j]";
    let err = compile(source, &canned("error: infeasible"), &CompileConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), "error: infeasible");
    assert!(matches!(
        err.downcast_ref::<CompileError>(),
        Some(CompileError::EngineReported(text)) if text == "error: infeasible"
    ));
}

#[test]
fn test_macro_hygiene() {
    let source = "st = {[i]: 1 <= i < N - 1}\nout[i] = inp[i - 1] + inp[i + 1] + pi";
    let code = generate(source, "for(t2 = 1; t2 <= N-2; t2++) {\n  s0(t2);\n}");
    assert!(code.starts_with("#define s0(i) { out[(i)] = inp[(i) - 1] + inp[(i) + 1] + pi; }\n"));
    assert!(code.contains("void st(const int N, float *out, const float *inp, const float pi)"));
}

#[test]
fn test_field_constness() {
    let source = "s = {[i]: 0 <= i < N}\ntmp[i] = x[i] * 2\ny[i] = tmp[i] + x[i]";
    let computations = lower(source).unwrap();
    let fields = &computations[0].fields;
    assert!(!fields["tmp"].is_read_only());
    assert!(fields["x"].is_read_only());
    assert!(!fields["y"].is_read_only());

    let code = generate(source, "for(t2 = 0; t2 <= N-1; t2++) {\n  s0(t2);\n  s1(t2);\n}");
    assert!(code.contains("void s(const int N, float *tmp, const float *x, float *y)"));
    assert!(code.contains("#define s1(i) { y[(i)] = tmp[(i)] + x[(i)]; }"));
}

#[test]
fn test_constant_order_is_stable() {
    let source = "c = {[i, j]: 0 <= i < P ^ Q <= j < P + Q}\nz[i, j] = 0";
    let space = &lower(source).unwrap()[0].space;

    let mut first = RelationRenderer::new();
    let mut second = RelationRenderer::new();
    assert_eq!(first.engine_form(space), second.engine_form(space));
    assert_eq!(first.constants(), vec!["P", "Q"]);
    assert_eq!(first.constants(), second.constants());
}

#[test]
fn test_relation_rendering_round_trip() {
    let header = "spmv = {[i, n, j]: 0 <= i < N ^ rp(i) <= n < rp(i + 1) ^ j == col(n)}";
    let space = omegagen::ir::parse_space(&parse(header).unwrap().body[0]).unwrap();

    let source = RelationRenderer::new().source_form(&space);
    assert_eq!(source, header);

    for text in [source, RelationRenderer::new().engine_form(&space)] {
        let reparsed = omegagen::ir::parse_space(&parse(&text).unwrap().body[0]).unwrap();
        assert_eq!(reparsed.name, space.name);
        assert_eq!(reparsed.iterator_names(), space.iterator_names());
        assert_eq!(reparsed.relations.len(), space.relations.len());
        for (a, b) in reparsed.relations.iter().zip(&space.relations) {
            assert_eq!(a.left_op, b.left_op);
            assert_eq!(a.right_op, b.right_op);
            assert_eq!(a.is_bounded(), b.is_bounded());
        }
    }
}

#[test]
fn test_chained_comparison_split() {
    let source = "spmv = {[i, n, j]: 0 <= i < N ^ rp(i) <= n < rp(i + 1) ^ j == col(n)}\ny[i] += A[n] * x[j]";
    let computations = lower(source).unwrap();
    let space = &computations[0].space;
    assert_eq!(space.iterator_names(), vec!["i", "n", "j"]);
    assert_eq!(space.relations.len(), 3);
    assert!(space.relations[0].is_bounded());
    assert!(space.relations[1].is_bounded());
    assert!(!space.relations[2].is_bounded());
}

#[test]
fn test_unsupported_index_operator() {
    let err = compile_error("s = {[i]: 0 <= i < N}\ny[i << 1] = x[i]");
    assert!(matches!(err, CompileError::UnsupportedOperator(ref op) if op == "<<"));
    assert!(err.to_string().contains("<<"));
}

#[test]
fn test_matrix_multiply_operator_is_fatal() {
    let err = compile_error("s = {[i]: 0 <= i < N}\ny[i] = A[i] @ x[i]");
    assert!(matches!(err, CompileError::UnsupportedConstruct(_)));
}

#[test]
fn test_multi_target_assignment_rejected() {
    let err = compile_error("s = {[i]: 0 <= i < N}\ny[i] = z[i] = x[i]");
    assert!(matches!(err, CompileError::UnsupportedConstruct(_)));
}

#[test]
fn test_missing_header_rejected() {
    let err = compile_error("y[i] = x[i]");
    assert!(matches!(err, CompileError::StructuralAssertion(_)));
}

#[test]
fn test_multiple_computations() {
    let source = "a = {[i]: 0 <= i < N}\nx[i] = 0\nb = {[i, j]: 0 <= i < N ^ 0 <= j < M}\ny[i] += A[i, j] * x[j]";
    let computations = lower(source).unwrap();
    assert_eq!(computations.len(), 2);
    assert_eq!(computations[1].name(), "b");

    let engine = |_: &IndexMap<String, String>,
                  _: &IndexMap<String, Vec<String>>,
                  names: &[String],
                  _: &[String]| format!("{}();", names[0]);
    let code = compile(source, &engine, &CompileConfig::default()).unwrap();
    assert_eq!(
        code,
        "#define s0(i) { x[(i)] = 0; }\n\nvoid a(const int N, float *x) {\n  int t2;\na();\n}\n#undef s0\n\n\
         #define s0(i, j) { y[(i)] += A[(i), (j)] * x[(j)]; }\n\n\
         void b(const int N, const int M, float *y, const float *A, const float *x) {\n  int t2, t4;\nb();\n}\n#undef s0"
    );
}
