//! Snakemake dry-run adapter
//!
//! Runs the planner with `--dryrun --reason` and reads its job listing:
//!
//! ```text
//! Job 2: Executing R code in code/b.Rmd, outputting to report/out_md/code/b.md
//! Reason: Input files updated by another job: report/out_md/code/a.md
//! Job 3: Converting report/out_md/code/b.md to report/out_html/code/b.html
//! Reason: Updated input files: report/out_md/code/b.md
//! ```
//!
//! Each `Reason:` line belongs to the most recent `Job` line and holds
//! `; `-separated clauses whose file lists are `, `-separated. This module
//! is the only place that knows the text format.

use std::path::Path;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::planner::{Planner, PlannerError, PlannerFacts};
use crate::domain::{DocumentGraph, ResolvedDocument};
use crate::storage::PlannerConfig;

/// Environment variable carrying the resolved graph as JSON
pub const GRAPH_ENV: &str = "SK_GRAPH";

static JOB_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Job \d+: (.*)$").expect("job pattern is valid"));
static REASON_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Reason: (.*)$").expect("reason pattern is valid"));
static EXECUTE_JOB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Executing R code in (.*), outputting to (.*)$").expect("execute pattern is valid")
});
static CONVERT_JOB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Converting .* to (.*)\.html$").expect("convert pattern is valid")
});

/// What a job does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    /// Executes a document into its rendered artifact
    Execute { source: String, output: String },
    /// Builds a presentation page (path without `.html`)
    Present { page: String },
    /// Any other rule (site layout, copies, ...)
    Other(String),
}

/// One job of the dry run with its reasons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJob {
    pub action: JobAction,
    pub missing_outputs: Vec<String>,
    pub updated_inputs: Vec<String>,
    pub upstream_inputs: Vec<String>,
}

impl PlannedJob {
    fn new(description: &str) -> Self {
        let action = if let Some(caps) = EXECUTE_JOB.captures(description) {
            JobAction::Execute {
                source: caps[1].trim().to_string(),
                output: caps[2].trim().to_string(),
            }
        } else if let Some(caps) = CONVERT_JOB.captures(description) {
            JobAction::Present {
                page: caps[1].trim().to_string(),
            }
        } else {
            JobAction::Other(description.trim().to_string())
        };

        Self {
            action,
            missing_outputs: Vec::new(),
            updated_inputs: Vec::new(),
            upstream_inputs: Vec::new(),
        }
    }

    fn add_reason(&mut self, reason: &str) {
        for clause in reason.split("; ") {
            let Some((label, files)) = clause.split_once(": ") else {
                continue;
            };
            let target = match label.trim() {
                "Missing output files" => &mut self.missing_outputs,
                "Updated input files" => &mut self.updated_inputs,
                "Input files updated by another job" => &mut self.upstream_inputs,
                _ => continue,
            };
            target.extend(
                files
                    .split(", ")
                    .map(|f| f.trim().trim_end_matches(';'))
                    .filter(|f| !f.is_empty())
                    .map(str::to_string),
            );
        }
    }
}

/// Parses the job listing of a dry run. Lines other than `Job` and
/// `Reason` lines are ignored; a `Reason` line with no job before it is
/// malformed output.
pub fn parse_dry_run(output: &str) -> Result<Vec<PlannedJob>, PlannerError> {
    let mut jobs: Vec<PlannedJob> = Vec::new();

    for (number, line) in output.lines().enumerate() {
        let line = line.trim_end();
        if let Some(caps) = JOB_LINE.captures(line) {
            jobs.push(PlannedJob::new(&caps[1]));
        } else if let Some(caps) = REASON_LINE.captures(line) {
            let job = jobs.last_mut().ok_or_else(|| PlannerError::Malformed {
                line: number + 1,
                reason: "Reason line without a preceding Job line".to_string(),
            })?;
            job.add_reason(&caps[1]);
        }
    }

    Ok(jobs)
}

/// Converts parsed jobs into facts about declared documents. Jobs whose
/// subject is not a known document contribute only missing outputs.
pub fn collect_facts(jobs: &[PlannedJob], graph: &DocumentGraph) -> PlannerFacts {
    let mut facts = PlannerFacts::new();

    for job in jobs {
        for file in &job.missing_outputs {
            facts.missing(file.as_str());
        }

        let document = match &job.action {
            JobAction::Execute { source, .. } => graph.resolve(source).ok(),
            JobAction::Present { page } => graph
                .resolve(&format!("{}.html", page))
                .ok(),
            JobAction::Other(description) => {
                tracing::debug!(job = %description, "ignoring planner job");
                None
            }
        };
        let Some(artifacts) = document else {
            continue;
        };
        let source = artifacts.source.as_str();

        match job.action {
            JobAction::Execute { .. } => {
                facts.schedule(source);
            }
            JobAction::Present { .. } => {
                facts.present(source);
            }
            JobAction::Other(_) => {}
        }
        for file in &job.updated_inputs {
            facts.updated_input(source, file.as_str());
        }
        for file in &job.upstream_inputs {
            facts.upstream_update(source, file.as_str());
        }
    }

    facts
}

#[derive(Serialize)]
struct GraphPayload<'a> {
    artifact_root: &'a str,
    documents: Vec<ResolvedDocument>,
}

/// Runs a Snakemake-style planner as a subprocess
pub struct SnakemakePlanner {
    program: String,
    args: Vec<String>,
}

impl SnakemakePlanner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self::new(config.program.clone(), config.dry_run_args())
    }
}

impl Planner for SnakemakePlanner {
    fn plan(&self, graph: &DocumentGraph, root: &Path) -> Result<PlannerFacts, PlannerError> {
        let payload = GraphPayload {
            artifact_root: graph.artifact_root(),
            documents: graph.resolved()?,
        };
        let payload =
            serde_json::to_string(&payload).map_err(|e| PlannerError::Graph(e.to_string()))?;

        tracing::debug!(program = %self.program, args = ?self.args, "querying planner");
        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(root)
            .env(GRAPH_ENV, payload)
            .output()
            .map_err(|source| PlannerError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PlannerError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let jobs = parse_dry_run(&stdout)?;
        tracing::debug!(jobs = jobs.len(), "planner reported jobs");
        Ok(collect_facts(&jobs, graph))
    }
}
