//! Verificador CLI: verify a live web page from the command line
//!
//! ## Usage
//!
//! ```bash
//! verificador run                         # all scenarios against verifica.yaml
//! verificador run --only theme-toggle     # one scenario
//! verificador init                        # write a default verifica.yaml
//! ```
//!
//! Exit status is 0 when every scenario passes, 1 when any fails and 2 for
//! usage, configuration or infrastructure errors.

use chrono::Utc;
use clap::Parser;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use uuid::Uuid;
use verifica::{VerificaConfig, DEFAULT_CONFIG_FILE};
use verificador::{
    init_logging, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands, ConfigArgs,
    InitArgs, JsonReport, ListArgs, OutputFormat, Overrides, RunArgs, RunProgress,
    ScenarioRunner, TextReport, Verbosity,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);

    let json_logs = matches!(&cli.command, Commands::Run(args) if args.format == OutputFormat::Json);
    init_logging(config.verbosity, json_logs);

    match cli.command {
        Commands::Run(args) => run_scenarios(&config, &args),
        Commands::List(args) => run_list(&args),
        Commands::Init(args) => run_init(&config, &args),
        Commands::Config(args) => run_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(ColorChoice::from(cli.color.clone()))
}

fn load(path: Option<&Path>, overrides: &Overrides) -> CliResult<VerificaConfig> {
    let mut config = VerificaConfig::load(path)?;
    overrides.apply(&mut config);
    Ok(config)
}

fn run_scenarios(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let overrides = Overrides {
        url: args.url.clone(),
        headed: args.headed,
        fail_fast: args.fail_fast,
    };
    let runner = ScenarioRunner::new(load(args.config.as_deref(), &overrides)?)?;
    runner.check_filter(&args.only)?;

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let progress = RunProgress::start(
        &format!("verifying {}", runner.config().base_url),
        config.verbosity.is_quiet() || args.format == OutputFormat::Json,
    );
    let results = rt.block_on(runner.run(&args.only));
    progress.finish();
    let results = results?;

    let report = match args.format {
        OutputFormat::Text => {
            TextReport::new(config.color.should_color() && args.output.is_none(), config.verbosity)
                .render(&results)
        }
        OutputFormat::Json => {
            let mut json = JsonReport::new(&results, run_id, started_at).render()?;
            json.push('\n');
            json
        }
    };
    print!("{report}");
    if let Some(ref path) = args.output {
        fs::write(path, &report)?;
    }

    if results.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: results.failed_count(),
            total: results.total(),
        })
    }
}

fn run_list(args: &ListArgs) -> CliResult<()> {
    let runner = ScenarioRunner::new(load(args.config.as_deref(), &Overrides::default())?)?;
    for scenario in runner.scenarios()? {
        println!("{:<18} {}", scenario.name(), scenario.description());
    }
    Ok(())
}

fn run_init(config: &CliConfig, args: &InitArgs) -> CliResult<()> {
    if !args.path.exists() {
        fs::create_dir_all(&args.path)?;
    }
    let target = args.path.join(DEFAULT_CONFIG_FILE);
    if target.exists() && !args.force {
        return Err(CliError::config(format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        )));
    }

    let yaml = VerificaConfig::default().to_yaml()?;
    fs::write(&target, yaml)?;
    if !config.verbosity.is_quiet() {
        println!("Wrote {}", target.display());
    }
    Ok(())
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let overrides = Overrides {
        url: args.url.clone(),
        ..Overrides::default()
    };
    let config = load(args.config.as_deref(), &overrides)?;
    if args.check {
        config.validate()?;
        println!("Configuration OK");
    } else {
        print!("{}", config.to_yaml()?);
    }
    Ok(())
}
