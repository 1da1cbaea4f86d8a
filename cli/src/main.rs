//! The pipeline driver CLI (spec §6): loads a standalone plain-text contour
//! collection, builds an ordered operation sequence from the command line, and
//! dispatches it against a Drover.

mod prompt;

use clap::Parser;
use dicomaton_core::loader::{self, Loader, TabularDvhLoader, TextContourLoader, TreatmentPlanLoader};
use dicomaton_core::operation::{FilenameLex, InvocationMetadata, Operation, OperationArgPkg};
use dicomaton_core::pipeline::{self, Step};
use dicomaton_core::{CoreError, Drover};
use std::process::ExitCode;

/// Sequential dispatch of operations over a Drover built from a standalone
/// contour-collection file.
///
/// `--operation`, `--parameter`, `--disregard`, `--ignore`, `--start-children`,
/// and `--stop-children` are order-sensitive and are re-scanned from the raw
/// argument vector rather than from clap's derived fields, since their
/// relative order determines the pipeline sequence.
#[derive(Parser, Debug, Clone)]
#[command(version)]
struct Args {
    /// The standalone contour-collection file or directory to load.
    standalone: Option<String>,

    /// Emit the catalogue of operation argument schemas and exit.
    #[arg(long, default_value_t = false)]
    detailed_usage: bool,

    /// Path to a lexicon file (passed through to operations opaquely).
    #[arg(long, value_name = "PATH")]
    lexicon: Option<String>,

    /// `K=V` invocation-metadata entries, repeatable.
    #[arg(long = "metadata", value_name = "K=V")]
    metadata: Vec<String>,

    /// Suppress missing-input checks before dispatch.
    #[arg(long, default_value_t = false)]
    virtual_data: bool,

    #[arg(long, default_value_t = false)]
    verbose: bool,
    /// Enable logging at DEBUG level.
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// Enable logging at TRACE level.
    #[arg(long, default_value_t = false)]
    trace: bool,
}

/// Parses the order-sensitive pipeline flags directly from the raw argument
/// vector: `--operation NAME[:k=v...]`, `--parameter k=v` (amends the most
/// recent operation), `--disregard` (drops the following operation),
/// `--ignore` (drops the following parameter), `--start-children` /
/// `--stop-children` (scope brackets).
fn parse_pipeline_steps(raw_args: &[String]) -> Result<Vec<Step>, String> {
    let mut steps = Vec::new();
    let mut disregard_next_operation = false;
    let mut ignore_next_parameter = false;

    let mut i = 0;
    while i < raw_args.len() {
        let arg = raw_args[i].as_str();
        match arg {
            "--disregard" => disregard_next_operation = true,
            "--ignore" => ignore_next_parameter = true,
            "--start-children" => steps.push(Step::StartChildren),
            "--stop-children" => steps.push(Step::StopChildren),
            "--operation" => {
                i += 1;
                let spec = raw_args
                    .get(i)
                    .ok_or_else(|| "--operation requires a value".to_string())?;
                let take = !std::mem::replace(&mut disregard_next_operation, false);
                if take {
                    let (name, args) = OperationArgPkg::parse(spec, None)
                        .map_err(|e| format!("malformed --operation value '{spec}': {e}"))?;
                    let name = name.ok_or_else(|| format!("--operation value '{spec}' is missing a name"))?;
                    steps.push(Step::Invoke { name, args });
                }
            }
            "--parameter" => {
                i += 1;
                let kv = raw_args
                    .get(i)
                    .ok_or_else(|| "--parameter requires a k=v value".to_string())?;
                let take = !std::mem::replace(&mut ignore_next_parameter, false);
                if take {
                    let (k, v) = kv
                        .split_once('=')
                        .ok_or_else(|| format!("malformed --parameter value '{kv}', expected k=v"))?;
                    match steps.iter_mut().rev().find_map(|s| match s {
                        Step::Invoke { args, .. } => Some(args),
                        _ => None,
                    }) {
                        Some(args) => args.set(k, v),
                        None => return Err("--parameter given with no preceding --operation".to_string()),
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    Ok(steps)
}

fn print_catalogue(catalogue: &[Operation<f64>]) {
    for op in catalogue {
        println!("{}", op.name);
        for arg in &op.args {
            println!("  {} (required={}): {}", arg.name, arg.required, arg.description);
        }
    }
}

/// Splits the argument vector into the order-sensitive pipeline tokens (left
/// untouched, for [`parse_pipeline_steps`]) and the remainder clap can parse
/// into [`Args`] — clap rejects any flag it doesn't know about, and the
/// pipeline flags are deliberately not declared on [`Args`].
fn split_clap_args(raw_args: &[String]) -> Vec<String> {
    const NO_VALUE: &[&str] = &["--disregard", "--ignore", "--start-children", "--stop-children"];
    const TAKES_VALUE: &[&str] = &["--operation", "--parameter"];

    let mut out = Vec::new();
    let mut i = 0;
    while i < raw_args.len() {
        let arg = raw_args[i].as_str();
        if NO_VALUE.contains(&arg) {
            i += 1;
            continue;
        }
        if TAKES_VALUE.contains(&arg) {
            i += 2;
            continue;
        }
        out.push(raw_args[i].clone());
        i += 1;
    }
    out
}

/// `--standalone` accepts a single file or a directory; a directory expands
/// to the paths of its direct entries, handed to the loader chain together.
fn expand_standalone_path(path: &str) -> Result<Vec<String>, String> {
    let meta = std::fs::metadata(path).map_err(|e| format!("failed to read '{path}': {e}"))?;
    if !meta.is_dir() {
        return Ok(vec![path.to_string()]);
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(path).map_err(|e| format!("failed to read directory '{path}': {e}"))? {
        let entry = entry.map_err(|e| format!("failed to read directory '{path}': {e}"))?;
        out.push(entry.path().to_string_lossy().into_owned());
    }
    Ok(out)
}

fn run() -> Result<(), String> {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = Args::parse_from(split_clap_args(&raw_args));
    let level = dicomaton_common::get_log_level!(args);
    tracing_subscriber::fmt().with_target(true).with_max_level(level).init();

    let catalogue: Vec<Operation<f64>> = Vec::new();
    if args.detailed_usage {
        print_catalogue(&catalogue);
        return Ok(());
    }

    let steps = parse_pipeline_steps(&raw_args)?;

    let mut metadata = InvocationMetadata::default();
    metadata.write("Invocation", raw_args.join(" "));
    for kv in &args.metadata {
        let (k, v) = kv
            .split_once('=')
            .ok_or_else(|| format!("malformed --metadata value '{kv}', expected K=V"))?;
        metadata.write(k, v);
    }
    let lex = FilenameLex(args.lexicon.clone().unwrap_or_default());

    let mut drover: Drover<f64> = Drover::new();
    let standalone_path = match &args.standalone {
        Some(path) => Some(path.clone()),
        None if args.virtual_data => None,
        None => Some(prompt::ask_question(
            "no standalone input given on the command line; enter a contour-collection file path",
        )),
    };
    if let Some(path) = standalone_path {
        let mut input_paths = expand_standalone_path(&path)?;
        let chain: Vec<&dyn Loader<f64>> = vec![&TextContourLoader, &TabularDvhLoader, &TreatmentPlanLoader];
        loader::run_chain(&chain, &mut drover, &mut metadata, &lex, &mut input_paths)
            .map_err(|e: CoreError| e.to_string())?;
    }

    pipeline::run(&mut drover, &catalogue, &steps, &mut metadata, &lex)
        .map_err(|e: CoreError| e.to_string())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
