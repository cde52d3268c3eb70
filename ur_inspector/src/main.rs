//! # Reporting Engine Inspector
//!
//! Loads a form definition and its data, runs the initial generation and one
//! generation per recorded event, and prints the committed data together
//! with the per-node diagnostics.

use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use ur_engine::api::{EngineConfig, GenerationReport, NodeDiagnostic, ReportingEngine};
use ur_engine::model::{Event, Field, Representation};
use ur_engine::query::InMemoryQueryPort;
use ur_expression::logging::{self, FacadeLogger, LoggingService};
use ur_expression::{log_error, log_info, RuntimeConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ur-inspector")]
#[command(about = "Run reporting engine generations and inspect the dependency graph")]
#[command(version)]
struct Cli {
    /// JSON array of field definitions
    #[arg(long)]
    fields: PathBuf,

    /// JSON array of representations
    #[arg(long)]
    representations: Option<PathBuf>,

    /// Initial data tree
    #[arg(long)]
    data: PathBuf,

    /// JSON array of events, one generation each
    #[arg(long)]
    events: Option<PathBuf>,

    /// Query fixtures: `{"queries": {...}, "namedExpressions": {...}}`
    #[arg(long)]
    queries: Option<PathBuf>,

    /// TOML preferences with `[engine]` and `[logging]` sections
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Generate `id-1`, `id-2`, ... instead of random UUIDs
    #[arg(long)]
    sequential_ids: bool,
}

/// One generation as printed in JSON mode
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationView<'a> {
    report: &'a GenerationReport,
    data: &'a Value,
    diagnostics: Vec<NodeDiagnostic>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let runtime = match &cli.config {
        Some(path) => RuntimeConfig::load_from_file(path)?,
        None => RuntimeConfig::default(),
    };
    init_logging(&runtime)?;

    let fields: Vec<Field> = load_json(&cli.fields)?;
    let representations: Vec<Representation> = match &cli.representations {
        Some(path) => load_json(path)?,
        None => Vec::new(),
    };
    let data: Value = load_json(&cli.data)?;
    let events: Vec<Event> = match &cli.events {
        Some(path) => load_json(path)?,
        None => Vec::new(),
    };

    let mut config = EngineConfig::from_runtime(&runtime);
    if cli.sequential_ids {
        config = config.with_sequential_ids("id");
    }

    let mut engine = ReportingEngine::new(fields, representations, data, config)?;
    if let Some(path) = &cli.queries {
        engine = engine.with_query_port(Arc::new(InMemoryQueryPort::load_from_file(path)?));
    }

    for cycle in engine.cycles() {
        eprintln!("warning: declaration cycle: {}", cycle.join(" -> "));
    }
    log_info!("Inspector starting", "events" => events.len());

    generation(&mut engine, cli.format)?;
    for event in events {
        engine.submit(event);
        generation(&mut engine, cli.format)?;
    }
    Ok(())
}

fn init_logging(runtime: &RuntimeConfig) -> Result<(), Box<dyn Error>> {
    logging::config::init_runtime_preferences(runtime.logging.clone())?;
    let service = LoggingService::new(
        Arc::new(FacadeLogger),
        runtime.logging.min_log_level,
    );
    logging::init_global_logging_with_service(Arc::new(service))?;
    Ok(())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let value = serde_json::from_str(&source)
        .map_err(|e| format!("failed to parse '{}': {}", path.display(), e))?;
    Ok(value)
}

fn generation(engine: &mut ReportingEngine, format: OutputFormat) -> Result<(), Box<dyn Error>> {
    let report = match engine.run_generation() {
        Ok(report) => report,
        Err(e) => {
            log_error!(e.error_code(), "Generation failed", "generation" => engine.generation());
            if format == OutputFormat::Table {
                print_diagnostics(&engine.diagnostics());
            }
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Json => {
            let view = GenerationView {
                report: &report,
                data: engine.data(),
                diagnostics: engine.diagnostics(),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputFormat::Table => {
            println!("== generation {} ==", report.generation);
            println!("{}", summary_line(&report));
            for rejected in &report.rejected_writes {
                println!("rejected {}: {}", rejected.target, rejected.reason);
            }
            println!("{}", serde_json::to_string_pretty(engine.data())?);
            print_diagnostics(&engine.diagnostics());
            println!();
        }
    }
    Ok(())
}

fn summary_line(report: &GenerationReport) -> String {
    format!(
        "iterations={} evaluated={} writes={} materialized={} removed={} errors={} ignored={}",
        report.iterations,
        report.nodes_evaluated,
        report.writes_committed,
        report.nodes_materialized,
        report.nodes_removed,
        report.nodes_in_error.len(),
        report.events_ignored
    )
}

fn print_diagnostics(diagnostics: &[NodeDiagnostic]) {
    for line in diagnostic_rows(diagnostics) {
        println!("{}", line);
    }
}

fn diagnostic_rows(diagnostics: &[NodeDiagnostic]) -> Vec<String> {
    let width = diagnostics
        .iter()
        .map(|d| d.target.len())
        .max()
        .unwrap_or(0)
        .max("TARGET".len());

    let mut rows = vec![format!(
        "{:<width$}  {:<8}  {:<6}  {}",
        "TARGET", "KIND", "STATUS", "DEPENDENCIES"
    )];
    for diagnostic in diagnostics {
        let mut deps = diagnostic.expression_deps.clone();
        deps.extend(diagnostic.child_deps.iter().cloned());
        rows.push(format!(
            "{:<width$}  {:<8}  {:<6}  {}",
            diagnostic.target,
            format!("{:?}", diagnostic.kind),
            format!("{:?}", diagnostic.status),
            deps.join(", ")
        ));
        for error in &diagnostic.expression_errors {
            rows.push(format!("{:<width$}    [{}] {}", "", error.code, error.message));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use ur_engine::model::FieldDefinition;
    use ur_expression::Expression;

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::parse_from([
            "ur-inspector",
            "--fields",
            "f.json",
            "--data",
            "d.json",
            "--format",
            "json",
            "--sequential-ids",
        ]);
        assert_eq!(cli.fields, PathBuf::from("f.json"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.sequential_ids);
        assert!(cli.events.is_none());
    }

    #[test]
    fn test_load_json_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"broken\": ").unwrap();
        let error = load_json::<Value>(file.path()).unwrap_err();
        assert!(error.to_string().contains("failed to parse"));

        let missing = load_json::<Value>(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(missing.to_string().contains("failed to read"));
    }

    #[test]
    fn test_diagnostic_table() {
        let field = Field::new(
            "total",
            FieldDefinition::number().with_automatic_value(Expression::self_path("net")),
        );
        let mut engine = ReportingEngine::new(
            vec![field],
            vec![],
            json!({"net": 3}),
            EngineConfig::default().with_sequential_ids("id"),
        )
        .unwrap();
        engine.run_generation().unwrap();

        let rows = diagnostic_rows(&engine.diagnostics());
        assert!(rows[0].starts_with("TARGET"));
        assert!(rows
            .iter()
            .any(|row| row.starts_with("data.total") && row.contains("data.net")));
    }
}
