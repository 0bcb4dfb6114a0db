//! Boundary to the polyhedral scanning engine.
//!
//! The engine turns a set of relations and schedules into a loop nest. It
//! only speaks text: failures come back as output containing the word
//! `error`. [`scan`] is the single place that text is inspected, turning it
//! into a [`CompileError::EngineReported`].
//!
//! Any closure with the [`ScanningEngine::codegen`] signature is an engine,
//! which is how tests and embedders substitute canned output:
//!
//! ```
//! use indexmap::IndexMap;
//! use omegagen::omega::{scan, ScanRequest};
//!
//! let engine = |_: &IndexMap<String, String>,
//!               _: &IndexMap<String, Vec<String>>,
//!               _: &[String],
//!               _: &[String]| "s0(t2);".to_string();
//! let request = ScanRequest::default();
//! assert_eq!(scan(&engine, &request).unwrap(), "s0(t2);");
//! ```

pub mod calc;

pub use calc::OmegaCalc;

use crate::utils::errors::{CompileError, CompileResult};
use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// A loop-nest generator.
pub trait ScanningEngine {
    /// Generate the loop nest scanning every named relation under its
    /// schedules. `constraints` are assumptions on the symbolic constants.
    fn codegen(
        &self,
        relations: &IndexMap<String, String>,
        schedules: &IndexMap<String, Vec<String>>,
        names: &[String],
        constraints: &[String],
    ) -> String;
}

impl<F> ScanningEngine for F
where
    F: Fn(&IndexMap<String, String>, &IndexMap<String, Vec<String>>, &[String], &[String]) -> String,
{
    fn codegen(
        &self,
        relations: &IndexMap<String, String>,
        schedules: &IndexMap<String, Vec<String>>,
        names: &[String],
        constraints: &[String],
    ) -> String {
        self(relations, schedules, names, constraints)
    }
}

/// Everything sent to the engine for one space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Space name to rendered relation text
    pub relations: IndexMap<String, String>,
    /// Space name to its statement schedules
    pub schedules: IndexMap<String, Vec<String>>,
    pub names: Vec<String>,
    pub constraints: Vec<String>,
}

impl ScanRequest {
    /// A request for a single space.
    pub fn single(name: &str, relation: String, schedules: Vec<String>, constraints: Vec<String>) -> Self {
        let mut request = Self::default();
        request.relations.insert(name.to_string(), relation);
        request.schedules.insert(name.to_string(), schedules);
        request.names.push(name.to_string());
        request.constraints = constraints;
        request
    }
}

/// Whether engine output reports a failure.
pub fn reports_error(output: &str) -> bool {
    output.to_lowercase().contains("error")
}

/// Run the engine and check its output.
pub fn scan<E: ScanningEngine + ?Sized>(engine: &E, request: &ScanRequest) -> CompileResult<String> {
    debug!(
        "Scanning {:?}: {} relation(s), {} constraint(s)",
        request.names,
        request.relations.len(),
        request.constraints.len()
    );
    trace!("Scan request: {:?}", request);

    let output = engine.codegen(
        &request.relations,
        &request.schedules,
        &request.names,
        &request.constraints,
    );
    debug!("Engine returned {} bytes", output.len());

    if reports_error(&output) {
        return Err(CompileError::EngineReported(output));
    }
    Ok(output)
}
