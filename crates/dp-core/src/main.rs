//! Decision Programming Core - influence diagrams to MILP
//!
//! The main entry point for dp-core, handling:
//! - Diagram validation
//! - Model compilation and LP export
//! - Solving small models with the bundled enumerator
//! - Analysis of external solutions

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use dp_config::{
    load_settings, resolve_settings, validate_diagram_file, ConfigSnapshot, DiagramFile,
    ObjectiveKind, Settings, ValidationError, CONFIG_SCHEMA_VERSION,
};
use dp_core::analysis::{SolveReport, REPORT_SCHEMA_VERSION};
use dp_core::diagram::InfluenceDiagram;
use dp_core::error::{DiagramError, ModelError};
use dp_core::exit_codes::ExitCode;
use dp_core::loader::build_diagram;
use dp_core::log_event;
use dp_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use dp_core::model::{write_lp, BruteForceSolver, Solution, Solver, SolverError};
use dp_core::pipeline::{analyze, compile, CheckReport, CompiledModel, RunInfo};
use dp_core::schema;
use serde::Serialize;

/// Decision Programming Core - solve decision problems on influence diagrams
#[derive(Parser)]
#[command(name = "dp-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Settings file (solver limits, risk levels)
    #[arg(long, global = true, env = "DP_SETTINGS")]
    settings: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Short human-readable summary
    Summary,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a diagram file and report the size of its model
    Check(DiagramArgs),

    /// Build the decision model and write it in LP format
    Compile(CompileArgs),

    /// Solve with the bundled enumerating solver and report the strategy
    Solve(DiagramArgs),

    /// Report on a solution produced by an external solver
    Analyze(AnalyzeArgs),

    /// Print JSON Schemas of input files and reports
    Schema(SchemaArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct DiagramArgs {
    /// Diagram definition file (.json or .toml)
    diagram: PathBuf,
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// Diagram definition file (.json or .toml)
    diagram: PathBuf,

    /// Write the LP model here instead of stdout
    #[arg(long)]
    lp: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Diagram definition file (.json or .toml)
    diagram: PathBuf,

    /// Solution file with one `name value` pair per line
    #[arg(long)]
    solution: PathBuf,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Type to print
    name: Option<String>,

    /// List available types
    #[arg(long)]
    list: bool,

    /// Print every schema
    #[arg(long, conflicts_with = "name")]
    all: bool,

    /// Single-line JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Args, Debug)]
struct CompletionsArgs {
    shell: Shell,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let cli_level = LogLevel::from_flags(cli.global.verbose, cli.global.quiet);
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let ctx = LogContext::new(generate_run_id());
    let _run = ctx.span().entered();
    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_STARTED,
        Stage::Init,
        "run started",
        version = env!("CARGO_PKG_VERSION")
    );
    let result = match &cli.command {
        Commands::Check(args) => run_check(&cli.global, &ctx, args),
        Commands::Compile(args) => run_compile(&cli.global, &ctx, args),
        Commands::Solve(args) => run_solve(&cli.global, &ctx, args),
        Commands::Analyze(args) => run_analyze(&cli.global, &ctx, args),
        Commands::Schema(args) => run_schema(args),
        Commands::Completions(args) => {
            clap_complete::generate(args.shell, &mut Cli::command(), "dp-core", &mut std::io::stdout());
            Ok(())
        }
        Commands::Version => print_version(&cli.global),
    };

    let exit_code = match result {
        Ok(()) => {
            log_event!(ctx, DEBUG, event_names::RUN_FINISHED, Stage::Init, "run finished");
            ExitCode::Clean
        }
        Err(err) => {
            let event = if err.exit.is_internal_error() {
                event_names::INTERNAL_ERROR
            } else if err.exit == ExitCode::ConfigError || err.exit == ExitCode::VersionError {
                event_names::CONFIG_ERROR
            } else {
                event_names::RUN_FINISHED
            };
            log_event!(
                ctx,
                ERROR,
                event,
                Stage::Init,
                err.message.as_str(),
                code = err.code,
                exit_code = err.exit.as_i32()
            );
            err.report(cli.global.format);
            err.exit
        }
    };
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Errors
// ============================================================================

/// A failed command: exit code, structured code and message.
struct CliError {
    exit: ExitCode,
    code: u32,
    message: String,
}

impl CliError {
    fn new(exit: ExitCode, code: u32, message: impl Into<String>) -> Self {
        Self {
            exit,
            code,
            message: message.into(),
        }
    }

    fn io(path: &Path, err: std::io::Error) -> Self {
        Self::new(ExitCode::IoError, 0, format!("{}: {}", path.display(), err))
    }

    fn report(&self, format: OutputFormat) {
        match format {
            OutputFormat::Json => {
                let body = serde_json::json!({
                    "schema_version": REPORT_SCHEMA_VERSION,
                    "status": "error",
                    "error": {
                        "exit_code": self.exit.as_i32(),
                        "code_name": self.exit.code_name(),
                        "code": self.code,
                        "message": self.message,
                    },
                });
                println!("{}", body);
            }
            OutputFormat::Summary => eprintln!("error: {} [{}]", self.message, self.exit),
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        Self::new(ExitCode::from(&err), err.code(), err.to_string())
    }
}

impl From<DiagramError> for CliError {
    fn from(err: DiagramError) -> Self {
        Self::new(ExitCode::from(&err), err.code(), err.to_string())
    }
}

impl From<ModelError> for CliError {
    fn from(err: ModelError) -> Self {
        Self::new(ExitCode::from(&err), err.code(), err.to_string())
    }
}

impl From<SolverError> for CliError {
    fn from(err: SolverError) -> Self {
        Self::new(ExitCode::from(&err), err.code(), err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ExitCode::InternalError, 0, err.to_string())
    }
}

type CliResult = Result<(), CliError>;

// ============================================================================
// Loading
// ============================================================================

/// A diagram file with its settings, built and generated.
struct Loaded {
    file: DiagramFile,
    diagram: InfluenceDiagram,
    settings: Settings,
    config_id: String,
}

fn load(global: &GlobalOpts, ctx: &LogContext, path: &Path) -> Result<Loaded, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let file = if is_toml {
        DiagramFile::from_toml_str(&text)?
    } else {
        DiagramFile::from_json_str(&text)?
    };
    validate_diagram_file(&file)?;

    if let Some(explicit) = global.settings.as_deref() {
        if !explicit.is_file() {
            return Err(CliError::new(
                ExitCode::IoError,
                0,
                format!("settings file not found: {}", explicit.display()),
            ));
        }
    }
    let resolved = resolve_settings(global.settings.as_deref());
    let (settings, settings_text) = load_settings(&resolved)?;
    match &resolved.path {
        Some(p) => {
            let shown = p.display().to_string();
            let source = resolved.source.to_string();
            log_event!(
                ctx,
                INFO,
                event_names::CONFIG_LOADED,
                Stage::Init,
                "settings loaded",
                path = shown.as_str(),
                source = source.as_str()
            )
        }
        None => log_event!(
            ctx,
            DEBUG,
            event_names::CONFIG_DEFAULT_USED,
            Stage::Init,
            "using default settings"
        ),
    }

    let snapshot = ConfigSnapshot::new(&file, &text, Some(path), &resolved, settings_text.as_deref());
    let config_id = snapshot.short_id().to_string();
    log_event!(
        ctx,
        INFO,
        event_names::DIAGRAM_LOADED,
        Stage::Assemble,
        "diagram file loaded",
        nodes = file.nodes.len() as u64,
        config_id = config_id.as_str()
    );

    let diagram = build_diagram(&file)?;
    log_event!(
        ctx,
        INFO,
        event_names::DIAGRAM_GENERATED,
        Stage::Assemble,
        "diagram generated",
        translation = diagram.translation()
    );
    Ok(Loaded {
        file,
        diagram,
        settings,
        config_id,
    })
}

fn compile_logged(ctx: &LogContext, loaded: &Loaded) -> Result<CompiledModel, CliError> {
    let compiled = compile(&loaded.file, &loaded.diagram)?;
    let summary = compiled.summary();
    log_event!(
        ctx,
        INFO,
        event_names::MODEL_COMPILED,
        Stage::Compile,
        "model compiled",
        variables = summary.variables as u64,
        constraints = summary.constraints as u64,
        objective = compiled.objective.name()
    );
    Ok(compiled)
}

fn emit<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn run_check(global: &GlobalOpts, ctx: &LogContext, args: &DiagramArgs) -> CliResult {
    let loaded = load(global, ctx, &args.diagram)?;
    let compiled = compile_logged(ctx, &loaded)?;
    let report = CheckReport::new(&loaded.diagram, &compiled, loaded.config_id.clone());
    match global.format {
        OutputFormat::Json => emit(&report),
        OutputFormat::Summary => {
            println!(
                "ok: {} chance, {} decision, {} value nodes",
                report.chance_nodes, report.decision_nodes, report.value_nodes
            );
            println!(
                "model: {} variables ({} binary), {} constraints",
                report.model.variables, report.model.binaries, report.model.constraints
            );
            Ok(())
        }
    }
}

fn run_compile(global: &GlobalOpts, ctx: &LogContext, args: &CompileArgs) -> CliResult {
    let loaded = load(global, ctx, &args.diagram)?;
    let compiled = compile_logged(ctx, &loaded)?;

    let Some(out) = &args.lp else {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        write_lp(&compiled.model, &mut lock)
            .and_then(|()| lock.flush())
            .map_err(|e| CliError::new(ExitCode::IoError, 0, e.to_string()))?;
        return Ok(());
    };

    let file = std::fs::File::create(out).map_err(|e| CliError::io(out, e))?;
    let mut writer = std::io::BufWriter::new(file);
    write_lp(&compiled.model, &mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| CliError::io(out, e))?;
    let shown = out.display().to_string();
    log_event!(
        ctx,
        INFO,
        event_names::LP_WRITTEN,
        Stage::Export,
        "LP model written",
        path = shown.as_str()
    );

    match global.format {
        OutputFormat::Json => emit(&serde_json::json!({
            "schema_version": REPORT_SCHEMA_VERSION,
            "config_id": loaded.config_id,
            "lp_path": out.display().to_string(),
            "objective": compiled.objective.name(),
            "model": compiled.summary(),
        })),
        OutputFormat::Summary => {
            println!("wrote {}", out.display());
            Ok(())
        }
    }
}

fn run_solve(global: &GlobalOpts, ctx: &LogContext, args: &DiagramArgs) -> CliResult {
    let loaded = load(global, ctx, &args.diagram)?;
    let compiled = compile_logged(ctx, &loaded)?;
    if compiled.objective.kind() == ObjectiveKind::ConditionalValueAtRisk {
        return Err(SolverError::Unsupported(
            "the CVaR objective needs a MILP solver; export it with `dp-core compile --lp` \
             and read the result back with `dp-core analyze --solution`"
                .to_string(),
        )
        .into());
    }

    let mut solver = BruteForceSolver::from_settings(&loaded.settings.solver);
    log_event!(
        ctx,
        INFO,
        event_names::SOLVE_STARTED,
        Stage::Solve,
        "solving",
        solver = solver.name()
    );
    let solution = solver.solve(&compiled.model)?;
    log_event!(
        ctx,
        INFO,
        event_names::SOLVE_FINISHED,
        Stage::Solve,
        "solved",
        objective = solution.objective()
    );

    let report = analyze_logged(ctx, &loaded, &compiled, &solution, solver.name())?;
    output_report(global, ctx, &report)
}

fn run_analyze(global: &GlobalOpts, ctx: &LogContext, args: &AnalyzeArgs) -> CliResult {
    let loaded = load(global, ctx, &args.diagram)?;
    let compiled = compile_logged(ctx, &loaded)?;
    let text = std::fs::read_to_string(&args.solution).map_err(|e| CliError::io(&args.solution, e))?;
    let solution = Solution::from_sol(&compiled.model, &text)?;
    let shown = args.solution.display().to_string();
    log_event!(
        ctx,
        INFO,
        event_names::SOLUTION_LOADED,
        Stage::Extract,
        "solution loaded",
        path = shown.as_str()
    );
    let report = analyze_logged(ctx, &loaded, &compiled, &solution, "external")?;
    output_report(global, ctx, &report)
}

fn analyze_logged(
    ctx: &LogContext,
    loaded: &Loaded,
    compiled: &CompiledModel,
    solution: &Solution,
    solver: &str,
) -> Result<SolveReport, CliError> {
    let strategy = compiled.strategy(solution)?;
    log_event!(
        ctx,
        DEBUG,
        event_names::STRATEGY_EXTRACTED,
        Stage::Extract,
        "strategy extracted",
        decisions = strategy.locals().len() as u64
    );
    let report = analyze(
        &loaded.diagram,
        compiled,
        solution,
        &loaded.settings.analysis,
        RunInfo {
            run_id: ctx.run_id.clone(),
            config_id: loaded.config_id.clone(),
            solver: solver.to_string(),
        },
    )?;
    log_event!(
        ctx,
        INFO,
        event_names::ANALYSIS_FINISHED,
        Stage::Analyze,
        "analysis finished",
        objective = report.objective.value,
        outcomes = report.utility.outcomes.len() as u64
    );
    Ok(report)
}

fn output_report(global: &GlobalOpts, ctx: &LogContext, report: &SolveReport) -> CliResult {
    log_event!(
        ctx,
        DEBUG,
        event_names::REPORT_WRITTEN,
        Stage::Export,
        "writing report",
        format = if global.format == OutputFormat::Json { "json" } else { "summary" }
    );
    match global.format {
        OutputFormat::Json => emit(report),
        OutputFormat::Summary => {
            println!("{} = {}", report.objective.kind, report.objective.value);
            for decision in &report.strategy.decisions {
                for rule in &decision.rules {
                    if rule.information_state.is_empty() {
                        println!("{}: {}", decision.node, rule.choice);
                    } else {
                        println!(
                            "{} | {}: {}",
                            decision.node,
                            rule.information_state.join(", "),
                            rule.choice
                        );
                    }
                }
            }
            for point in &report.utility.outcomes {
                println!("  P(U = {}) = {}", point.utility, point.probability);
            }
            Ok(())
        }
    }
}

fn run_schema(args: &SchemaArgs) -> CliResult {
    let to_text = |value: &serde_json::Value| {
        if args.compact {
            serde_json::to_string(value)
        } else {
            serde_json::to_string_pretty(value)
        }
    };

    if args.list {
        for (name, description) in schema::available_schemas() {
            println!("{name:<24} {description}");
        }
        return Ok(());
    }
    if args.all {
        let all = serde_json::to_value(schema::generate_all_schemas())?;
        println!("{}", to_text(&all)?);
        return Ok(());
    }
    let Some(name) = args.name.as_deref() else {
        return Err(CliError::new(
            ExitCode::ArgsError,
            0,
            "give a type name, --list or --all",
        ));
    };
    let Some(value) = schema::generate_schema(name) else {
        return Err(CliError::new(
            ExitCode::ArgsError,
            0,
            format!("unknown schema type: {name}"),
        ));
    };
    println!("{}", to_text(&value)?);
    Ok(())
}

fn print_version(global: &GlobalOpts) -> CliResult {
    match global.format {
        OutputFormat::Json => emit(&serde_json::json!({
            "dp_core_version": env!("CARGO_PKG_VERSION"),
            "report_schema_version": REPORT_SCHEMA_VERSION,
            "config_schema_version": CONFIG_SCHEMA_VERSION,
        })),
        OutputFormat::Summary => {
            println!("dp-core {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
