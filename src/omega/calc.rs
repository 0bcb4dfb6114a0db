//! Driving an installed Omega calculator (`omegacalc`).
//!
//! The request is written out as a calculator script:
//!
//! ```text
//! symbolic N, rp(1), rp1(1), col(2);
//! spmv := {[i,n,j] : 0 <= i < N && rp(i) <= n < rp1(i) && j = col(i,n)};
//! r0spmv := {[i,n,j] -> [0, i, 0, n, 0, j, 0]};
//! codegen r0spmv:spmv given {[i,n,j] : N >= 1};
//! ```
//!
//! The calculator only accepts uninterpreted functions applied to a prefix
//! of the input tuple, so every call is rewritten to take the iterators up
//! to the furthest one its arguments mention. A call whose argument list
//! differs from the first one seen (`rp(i + 1)` after `rp(i)`) becomes a
//! separate function (`rp1`).

use crate::omega::{ScanRequest, ScanningEngine};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use regex::Regex;
use std::io::Write;
use std::process::{Command, Stdio};

/// Default calculator binary.
pub const DEFAULT_BINARY: &str = "omegacalc";

const KEYWORDS: &[&str] = &[
    "exists", "union", "intersection", "complement", "compose", "inverse", "domain", "range",
    "hull", "codegen", "farkas", "forall", "given", "and", "or", "not", "within", "subsetof",
    "supersetof", "symbolic",
];

fn is_binary_available(binary: &str) -> bool {
    Command::new(binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// A relation split into its parts.
#[derive(Debug, Clone, PartialEq)]
struct SetText {
    iterators: Vec<String>,
    conditions: String,
}

impl SetText {
    /// Parse `name = {[i, j] : conditions}` (the name part is optional).
    fn parse(text: &str) -> Option<Self> {
        let open = text.find('{')?;
        let close = text.rfind('}')?;
        let body = text.get(open + 1..close)?.trim();
        let tuple_end = body.find(']')?;
        let iterators = body
            .get(1..tuple_end)?
            .split(',')
            .map(|it| it.trim().to_string())
            .filter(|it| !it.is_empty())
            .collect();
        let rest = body.get(tuple_end + 1..)?.trim();
        let conditions = rest.strip_prefix(':').unwrap_or(rest).trim().to_string();
        Some(Self { iterators, conditions })
    }
}

/// An uninterpreted function as the calculator will see it.
#[derive(Debug, Clone, PartialEq)]
struct UninterpFunc {
    name: String,
    args: Vec<String>,
}

impl UninterpFunc {
    fn declaration(&self) -> String {
        format!("{}({})", self.name, self.args.len())
    }

    fn call(&self) -> String {
        format!("{}({})", self.name, self.args.join(","))
    }
}

/// Symbols declared to the calculator.
#[derive(Debug, Default)]
struct Symbols {
    constants: IndexSet<String>,
    functions: IndexMap<String, UninterpFunc>,
}

/// Scanning engine backed by the Omega calculator.
#[derive(Debug, Clone)]
pub struct OmegaCalc {
    binary: String,
}

impl Default for OmegaCalc {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl OmegaCalc {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn is_available(&self) -> bool {
        is_binary_available(&self.binary)
    }

    /// Build the calculator script for a request.
    pub fn script(&self, request: &ScanRequest) -> String {
        let call_re = Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\(([^()]*)\)");
        let word_re = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*");
        let (call_re, word_re) = match (call_re, word_re) {
            (Ok(c), Ok(w)) => (c, w),
            _ => return String::new(),
        };

        let mut symbols = Symbols::default();
        let mut definitions = Vec::new();
        let mut codegen_args = Vec::new();
        let mut widest: Vec<String> = Vec::new();

        let names: Vec<&String> = if request.names.is_empty() {
            request.relations.keys().collect()
        } else {
            request.names.iter().collect()
        };

        for name in names {
            let Some(set) = request.relations.get(name).and_then(|text| SetText::parse(text)) else {
                warn!("Relation '{}' is missing or malformed, skipped", name);
                continue;
            };

            let conditions = Self::rewrite_calls(&set, &call_re, &mut symbols);
            for found in word_re.find_iter(&conditions) {
                let word = found.as_str();
                let is_call = conditions[found.end()..].starts_with('(');
                if is_call
                    || set.iterators.iter().any(|it| it == word)
                    || KEYWORDS.contains(&word.to_lowercase().as_str())
                {
                    continue;
                }
                symbols.constants.insert(word.to_string());
            }

            let tuple = set.iterators.join(",");
            if conditions.is_empty() {
                definitions.push(format!("{} := {{[{}]}};", name, tuple));
            } else {
                definitions.push(format!("{} := {{[{}] : {}}};", name, tuple, conditions));
            }
            for schedule in request.schedules.get(name).into_iter().flatten() {
                definitions.push(format!("{};", schedule));
                if let Some(sched_name) = schedule.split_whitespace().next() {
                    codegen_args.push(format!("{}:{}", sched_name, name));
                }
            }
            if set.iterators.len() > widest.len() {
                widest = set.iterators.clone();
            }
        }

        let mut script = String::new();
        let declared: Vec<String> = symbols
            .constants
            .iter()
            .cloned()
            .chain(symbols.functions.values().map(UninterpFunc::declaration))
            .collect();
        if !declared.is_empty() {
            script.push_str(&format!("symbolic {};\n", declared.join(", ")));
        }
        for line in definitions {
            script.push_str(&line);
            script.push('\n');
        }
        script.push_str(&format!("codegen {}", codegen_args.join(",")));
        if !request.constraints.is_empty() {
            script.push_str(&format!(
                " given {{[{}] : {}}}",
                widest.join(","),
                request.constraints.join(" && ")
            ));
        }
        script.push_str(";\n");
        script
    }

    /// Rewrite calls into prefix form and `==` into `=`.
    fn rewrite_calls(set: &SetText, call_re: &Regex, symbols: &mut Symbols) -> String {
        let rewritten = call_re.replace_all(&set.conditions, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            let args: Vec<String> = caps[2].split(',').map(|a| a.trim().to_string()).collect();

            // Iterators reach up to the furthest one any argument mentions
            let reach = set
                .iterators
                .iter()
                .rposition(|it| args.iter().any(|arg| mentions(arg, it)));
            let prefix: Vec<String> = match reach {
                Some(pos) => set.iterators[..=pos].to_vec(),
                None => args.clone(),
            };

            let func = Self::variant(symbols, name, &caps[2], prefix);
            func.call()
        });
        rewritten.replace("==", "=")
    }

    /// The function standing for `name(raw_args)`, registering it if new.
    fn variant(symbols: &mut Symbols, name: &str, raw_args: &str, args: Vec<String>) -> UninterpFunc {
        let key = format!("{}({})", name, raw_args.replace(' ', ""));
        if let Some(existing) = symbols.functions.get(&key) {
            return existing.clone();
        }
        let siblings = symbols
            .functions
            .keys()
            .filter(|k| k.split('(').next() == Some(name))
            .count();
        let func_name = if siblings == 0 {
            name.to_string()
        } else if name.ends_with(|c: char| c.is_ascii_digit()) {
            format!("{}_{}", name, siblings)
        } else {
            format!("{}{}", name, siblings)
        };
        let func = UninterpFunc { name: func_name, args };
        symbols.functions.insert(key, func.clone());
        func
    }

    /// Keep only the generated code: drop echoed input and blank lines at
    /// either end.
    pub fn filter_output(output: &str) -> String {
        output
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n")
            .trim_matches('\n')
            .to_string()
    }

    fn run(&self, script: &str) -> std::io::Result<std::process::Output> {
        let mut child = Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes())?;
        }
        child.wait_with_output()
    }
}

fn mentions(arg: &str, iterator: &str) -> bool {
    arg.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| word == iterator)
}

impl ScanningEngine for OmegaCalc {
    fn codegen(
        &self,
        relations: &IndexMap<String, String>,
        schedules: &IndexMap<String, Vec<String>>,
        names: &[String],
        constraints: &[String],
    ) -> String {
        let request = ScanRequest {
            relations: relations.clone(),
            schedules: schedules.clone(),
            names: names.to_vec(),
            constraints: constraints.to_vec(),
        };
        let script = self.script(&request);
        debug!("Omega script:\n{}", script);

        // Failures are reported as text so the caller's error check sees them
        match self.run(&script) {
            Ok(output) if output.status.success() => {
                Self::filter_output(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => format!(
                "error: {} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => format!("error: failed to run {}: {}", self.binary, e),
        }
    }
}
