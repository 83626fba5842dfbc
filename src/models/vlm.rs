//! Stability derivatives from an external vortex-lattice solver.
//!
//! The solver is a separate executable run in a working directory. It writes
//! a results file listing the 18 stability and control derivatives as
//! `<name> = <value>` fields, in the order of [`STABILITY_DERIVATIVE_NAMES`].
//! The file may carry other text (headers, reference values) between fields;
//! only the derivative names are read.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{debug, info};

use crate::{AssemblyError, Inputs, Node, NodeInterface, Options, Outputs, Result};

/// Derivative names in the order they appear in the results file.
pub const STABILITY_DERIVATIVE_NAMES: [&str; 18] = [
    "CLa", "CYa", "Cla", "Cma", "Cna", "CLb", "CYb", "Clb", "Cmb", "Cnb", "CYp", "Clp", "Cnp", "CLq", "Cmq", "CYr",
    "Clr", "Cnr",
];

/// Errors raised while running the external solver or reading its results.
#[derive(Error, Debug)]
pub enum ExternalToolError {
    #[error("Cannot read results file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot start {executable}: {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{executable} failed with {status}")]
    SolverFailed { executable: PathBuf, status: ExitStatus },

    #[error("Results are missing derivative '{0}'")]
    MissingDerivative(&'static str),

    #[error("Derivative '{name}' listed twice (line {line})")]
    DuplicateDerivative { name: String, line: usize },

    #[error("Derivative '{found}' out of order at line {line}, expected '{expected}'")]
    OutOfOrder { expected: &'static str, found: String, line: usize },

    #[error("Invalid value '{value}' for derivative '{name}' at line {line}")]
    InvalidValue { name: String, value: String, line: usize },
}

/// The 18 derivatives of one solver run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityDerivatives {
    values: [f64; 18],
}

impl StabilityDerivatives {
    pub fn get(&self, name: &str) -> Option<f64> {
        STABILITY_DERIVATIVE_NAMES.iter().position(|n| *n == name).map(|i| self.values[i])
    }

    /// (name, value) pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        STABILITY_DERIVATIVE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

/// Parses the text of a results file.
///
/// Every derivative must appear exactly once, in file order. Names are
/// case sensitive (`Cla` is the rolling moment, `CLa` the lift). Text after
/// the last derivative (`Cnr`) is not read.
///
/// # Examples
///
/// ```
/// use aerograph::models::parse_stability_derivatives;
///
/// let text = "CLa = 5.1  CYa = 0.0  Cla = 0.0  Cma = -1.2  Cna = 0.0\n\
///             CLb = 0.0  CYb = -0.3 Clb = -0.05 Cmb = 0.0  Cnb = 0.08\n\
///             CYp = 0.0  Clp = -0.5 Cnp = -0.02\n\
///             CLq = 7.0  Cmq = -15.0\n\
///             CYr = 0.2  Clr = 0.1  Cnr = -0.1\n";
/// let derivatives = parse_stability_derivatives(text).unwrap();
/// assert_eq!(derivatives.get("Cma"), Some(-1.2));
/// assert_eq!(derivatives.get("Cnr"), Some(-0.1));
/// ```
pub fn parse_stability_derivatives(text: &str) -> std::result::Result<StabilityDerivatives, ExternalToolError> {
    let mut values = [f64::NAN; 18];
    let mut next = 0;

    'lines: for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let spaced = line.replace('=', " = ");
        let tokens: Vec<&str> = spaced.split_whitespace().collect();

        for window in tokens.windows(3) {
            let [name, equals, value] = [window[0], window[1], window[2]];
            if equals != "=" {
                continue;
            }
            let Some(position) = STABILITY_DERIVATIVE_NAMES.iter().position(|n| *n == name) else {
                continue;
            };

            if position < next {
                return Err(ExternalToolError::DuplicateDerivative { name: name.to_string(), line: line_number });
            }
            if position > next {
                return Err(ExternalToolError::OutOfOrder {
                    expected: STABILITY_DERIVATIVE_NAMES[next],
                    found: name.to_string(),
                    line: line_number,
                });
            }

            values[position] = value.parse().map_err(|_| ExternalToolError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
                line: line_number,
            })?;
            next += 1;
            // Anything after the last derivative is summary text
            if next == STABILITY_DERIVATIVE_NAMES.len() {
                break 'lines;
            }
        }
    }

    if next < STABILITY_DERIVATIVE_NAMES.len() {
        return Err(ExternalToolError::MissingDerivative(STABILITY_DERIVATIVE_NAMES[next]));
    }
    Ok(StabilityDerivatives { values })
}

pub fn read_stability_derivatives(path: &Path) -> std::result::Result<StabilityDerivatives, ExternalToolError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ExternalToolError::Io { path: path.to_path_buf(), source })?;
    parse_stability_derivatives(&text)
}

/// Blocking invocation of the solver executable.
#[derive(Debug, Clone)]
pub struct VlmRunner {
    pub executable: PathBuf,
    pub working_dir: PathBuf,
}

impl VlmRunner {
    pub fn new(executable: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        VlmRunner { executable: executable.into(), working_dir: working_dir.into() }
    }

    /// Runs the solver to completion in the working directory.
    ///
    /// No timeout: the call returns when the process exits.
    pub fn run(&self, args: &[String]) -> std::result::Result<(), ExternalToolError> {
        info!(executable = %self.executable.display(), dir = %self.working_dir.display(), "Running VLM solver");

        let status = Command::new(&self.executable)
            .args(args)
            .current_dir(&self.working_dir)
            .status()
            .map_err(|source| ExternalToolError::Spawn { executable: self.executable.clone(), source })?;

        if !status.success() {
            return Err(ExternalToolError::SolverFailed { executable: self.executable.clone(), status });
        }
        Ok(())
    }
}

/// Stability derivatives at the cruise point.
///
/// Options:
/// - `run_solver` (bool, default true): run the executable before reading
///   results. When false, an existing results file is read as is.
/// - `executable` (string): solver path, required when `run_solver` is set.
/// - `working_directory` (string, default "."): where the solver runs and
///   where the results file is looked up.
/// - `results_file` (string, default "results.st"): relative to the working
///   directory.
/// - `arguments` (string): whitespace-separated arguments, with `{mach}` and
///   `{alpha}` replaced by the current inputs.
///
/// Outputs `aerodynamics.stability.<name>`; angle derivatives are per radian,
/// rate derivatives are dimensionless.
#[derive(Debug, Clone)]
pub struct ComputeStabilityDerivativesVlm {
    runner: Option<VlmRunner>,
    working_dir: PathBuf,
    results_file: PathBuf,
    arguments: String,
}

impl ComputeStabilityDerivativesVlm {
    pub const DEFAULT_RESULTS_FILE: &'static str = "results.st";

    pub fn from_options(options: &Options) -> Result<Self> {
        let working_dir = PathBuf::from(options.get_str("working_directory")?.unwrap_or("."));
        let results_file = PathBuf::from(options.get_str("results_file")?.unwrap_or(Self::DEFAULT_RESULTS_FILE));
        let arguments = options.get_str("arguments")?.unwrap_or("").to_string();

        let runner = if options.get_bool("run_solver", true)? {
            let executable = options
                .get_str("executable")?
                .ok_or_else(|| AssemblyError::MissingOption("executable".to_string()))?;
            Some(VlmRunner::new(executable, &working_dir))
        } else {
            None
        };

        Ok(ComputeStabilityDerivativesVlm { runner, working_dir, results_file, arguments })
    }

    /// Reads an existing results file in `working_dir` without running anything.
    pub fn results_only(working_dir: impl Into<PathBuf>) -> Self {
        ComputeStabilityDerivativesVlm {
            runner: None,
            working_dir: working_dir.into(),
            results_file: PathBuf::from(Self::DEFAULT_RESULTS_FILE),
            arguments: String::new(),
        }
    }

    pub fn runs_solver(&self) -> bool {
        self.runner.is_some()
    }

    pub fn results_path(&self) -> PathBuf {
        self.working_dir.join(&self.results_file)
    }

    fn solver_args(&self, mach: f64, alpha: f64) -> Vec<String> {
        self.arguments
            .split_whitespace()
            .map(|arg| arg.replace("{mach}", &mach.to_string()).replace("{alpha}", &alpha.to_string()))
            .collect()
    }

    fn output_key(name: &str) -> String {
        format!("aerodynamics.stability.{}", name)
    }
}

fn derivative_unit(name: &str) -> &'static str {
    if name.ends_with('a') || name.ends_with('b') { "rad**-1" } else { "" }
}

impl Node for ComputeStabilityDerivativesVlm {
    fn setup(&self, interface: &mut NodeInterface) {
        interface.add_input("mission.cruise.mach", "");
        interface.add_input("aerodynamics.cruise.alpha", "deg").with_default(0.0);
        for name in STABILITY_DERIVATIVE_NAMES {
            interface.add_output(&Self::output_key(name), derivative_unit(name));
        }
    }

    fn compute(&self, inputs: &Inputs, outputs: &mut Outputs) -> Result<()> {
        if let Some(runner) = &self.runner {
            let mach = inputs.scalar("mission.cruise.mach")?;
            let alpha = inputs.scalar("aerodynamics.cruise.alpha")?;
            runner.run(&self.solver_args(mach, alpha))?;
        }

        let path = self.results_path();
        let derivatives = read_stability_derivatives(&path)?;
        debug!(path = %path.display(), "Read stability derivatives");

        for (name, value) in derivatives.iter() {
            outputs.set(&Self::output_key(name), value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, evaluate_node, interface_of};

    fn results_text() -> String {
        let mut text = String::from(" Stability-axis derivatives...\n\n");
        for (i, name) in STABILITY_DERIVATIVE_NAMES.iter().enumerate() {
            text.push_str(&format!("  {} ={:>12.6}", name, i as f64 * 0.5 - 4.0));
            if i % 3 == 2 {
                text.push('\n');
            }
        }
        text
    }

    #[test]
    fn test_parse_all_derivatives() {
        let derivatives = parse_stability_derivatives(&results_text()).unwrap();
        assert_eq!(derivatives.iter().count(), 18);
        assert!((derivatives.get("CLa").unwrap() + 4.0).abs() < 1e-12);
        assert!((derivatives.get("Cnr").unwrap() - 4.5).abs() < 1e-12);
        assert_eq!(derivatives.get("Cxx"), None);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let derivatives = parse_stability_derivatives(&results_text()).unwrap();
        assert_ne!(derivatives.get("CLa"), derivatives.get("Cla"));
    }

    #[test]
    fn test_missing_derivative() {
        let text = results_text().replace("Cnr", "Cxx");
        assert!(matches!(parse_stability_derivatives(&text), Err(ExternalToolError::MissingDerivative("Cnr"))));
    }

    #[test]
    fn test_out_of_order() {
        let text = "CYa = 0.1\n";
        match parse_stability_derivatives(text) {
            Err(ExternalToolError::OutOfOrder { expected, found, line }) => {
                assert_eq!(expected, "CLa");
                assert_eq!(found, "CYa");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_duplicate() {
        let text = "CLa = 5.0\nCLa = 5.1\n";
        assert!(matches!(
            parse_stability_derivatives(text),
            Err(ExternalToolError::DuplicateDerivative { line: 2, .. })
        ));
    }

    #[test]
    fn test_summary_after_last_derivative_is_ignored() {
        let summary = "  Clb Cnr / Clr Cnb  =    0.4521    (  > 1 if spirally stable )";
        let text = format!("{}\n\n{}\n", results_text(), summary);
        let derivatives = parse_stability_derivatives(&text).unwrap();
        assert!((derivatives.get("Cnb").unwrap() - 0.5).abs() < 1e-12);
        assert!((derivatives.get("Cnr").unwrap() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_value() {
        let text = "CLa = ***\n";
        assert!(matches!(parse_stability_derivatives(text), Err(ExternalToolError::InvalidValue { .. })));
    }

    #[test]
    fn test_node_reads_existing_results() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("results.st"), results_text()).unwrap();

        let options = Options::new()
            .with("run_solver", false)
            .with("working_directory", dir.path().to_str().unwrap());
        let node = ComputeStabilityDerivativesVlm::from_options(&options).unwrap();
        assert!(!node.runs_solver());

        let outputs = evaluate_node(&node, &Inputs::new().with("mission.cruise.mach", 0.2)).unwrap();
        assert!((outputs.scalar("aerodynamics.stability.Clp").unwrap() - 1.5).abs() < 1e-12);

        let interface = interface_of(&node);
        assert_eq!(interface.output("aerodynamics.stability.Cnb").unwrap().unit, "rad**-1");
        assert_eq!(interface.output("aerodynamics.stability.Cmq").unwrap().unit, "");
    }

    #[test]
    fn test_missing_results_file() {
        let dir = tempfile::tempdir().unwrap();
        let node = ComputeStabilityDerivativesVlm::results_only(dir.path());
        let result = evaluate_node(&node, &Inputs::new().with("mission.cruise.mach", 0.2));
        assert!(matches!(result, Err(Error::ExternalTool(ExternalToolError::Io { .. }))));
    }

    #[test]
    fn test_running_requires_executable() {
        match ComputeStabilityDerivativesVlm::from_options(&Options::new()) {
            Err(Error::Assembly(AssemblyError::MissingOption(key))) => assert_eq!(key, "executable"),
            other => panic!("unexpected {:?}", other),
        }

        // A non-string executable is a type error, not a missing option
        let options = Options::new().with("executable", 3.0);
        assert!(matches!(
            ComputeStabilityDerivativesVlm::from_options(&options),
            Err(Error::Assembly(AssemblyError::OptionType { .. }))
        ));
    }

    #[test]
    fn test_argument_substitution() {
        let options = Options::new()
            .with("run_solver", false)
            .with("arguments", "-m {mach} -a {alpha} case.avl");
        let node = ComputeStabilityDerivativesVlm::from_options(&options).unwrap();
        assert_eq!(node.solver_args(0.5, 2.0), vec!["-m", "0.5", "-a", "2", "case.avl"]);
    }

    #[test]
    fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = VlmRunner::new(dir.path().join("no-such-solver"), dir.path());
        assert!(matches!(runner.run(&[]), Err(ExternalToolError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_solver_failure_status() {
        let dir = tempfile::tempdir().unwrap();
        let runner = VlmRunner::new("sh", dir.path());
        let args = vec!["-c".to_string(), "exit 3".to_string()];
        assert!(matches!(runner.run(&args), Err(ExternalToolError::SolverFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_solver_writes_results() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("printf '{}' > results.st", results_text().replace('\n', "\\n"));
        let runner = VlmRunner::new("sh", dir.path());
        runner.run(&["-c".to_string(), script]).unwrap();

        let derivatives = read_stability_derivatives(&dir.path().join("results.st")).unwrap();
        assert!((derivatives.get("CLa").unwrap() + 4.0).abs() < 1e-12);
    }
}
