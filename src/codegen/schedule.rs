//! Schedules in the engine's affine-map syntax.
//!
//! Statement `k` of space `s` with iterators `[i, j]` is scheduled as
//!
//! ```text
//! r<k>s := {[i,j] -> [0, i, 0, j, k]}
//! ```
//!
//! so statements run in textual order at every point of the shared domain.

/// Name of the schedule for statement `index` of `space`.
pub fn name(index: usize, space: &str) -> String {
    format!("r{}{}", index, space)
}

/// One schedule per statement, in statement order.
pub fn build(space: &str, iterators: &[&str], statements: usize) -> Vec<String> {
    (0..statements.max(1))
        .map(|k| {
            let mut target: Vec<String> = Vec::with_capacity(iterators.len() * 2 + 1);
            for it in iterators {
                target.push("0".to_string());
                target.push(it.to_string());
            }
            target.push(k.to_string());
            format!(
                "{} := {{[{}] -> [{}]}}",
                name(k, space),
                iterators.join(","),
                target.join(", ")
            )
        })
        .collect()
}
