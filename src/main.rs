//! keyforge: validator key provisioning CLI.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use keyforge::config;
use keyforge::constants;
use keyforge::deps;
use keyforge::env;
use keyforge::models;
use keyforge::orchestrator;
use keyforge::process;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;

use cli::args::{Cli, Command, ConfigArgs, OutputFormat, SortDepsArgs};
use config::Config;
use env::Env;
use models::{Password, ProvisionReport, RoundReport};
use orchestrator::Provisioner;
use process::SystemRunner;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose, cli.quiet);

    let output = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Provision(args) => {
            let mut config = load_config(&args.run.config)?;
            args.apply(&mut config);
            run_provision(config, args.run.password_file.as_deref(), args.skip_build, output).await
        }
        Command::Generate(args) => {
            let mut config = load_config(&args.config)?;
            args.apply(&mut config);
            run_generate(config, args.password_file.as_deref(), output).await
        }
        Command::Insert(args) => {
            let mut config = load_config(&args.config)?;
            args.apply(&mut config);
            run_insert(config, args.password_file.as_deref(), output).await
        }
        Command::Check(args) => run_check(load_config(&args)?),
        Command::SortDeps(args) => run_sort_deps(args),
        Command::Version => run_version(),
    }
}

/// Where and how the final report is printed.
#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn print(self, report: &ProvisionReport) {
        if self.quiet && self.format == OutputFormat::Terminal {
            return;
        }
        print!("{}", self.format.render(report));
        if self.format == OutputFormat::Json {
            println!();
        }
    }
}

/// Print detailed version and build information.
fn run_version() -> Result<ExitCode> {
    println!(
        "{} {}",
        constants::APP_NAME.bold(),
        constants::VERSION.green().bold()
    );
    println!("{}     {}", "target:".dimmed(), constants::TARGET);
    Ok(ExitCode::SUCCESS)
}

/// Load layered config from the working directory and validate it.
fn load_config(args: &ConfigArgs) -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    let config = Config::load(args.config.as_deref(), Some(&cwd), &Env::real())
        .context("failed to load configuration")?;
    Ok(config)
}

fn password(password_file: Option<&std::path::Path>) -> Result<Password> {
    config::resolve_password(password_file, &Env::real(), true)
        .context("failed to obtain keystore password")
}

fn provisioner(config: &Config, quiet: bool) -> Result<Provisioner> {
    config.validate()?;
    let mut runner = SystemRunner::new()
        .quiet(quiet)
        .with_timeout(config.command_timeout());
    if let Some(ref dir) = config.node.working_dir {
        runner = runner.with_working_dir(dir);
    }
    Ok(Provisioner::new(Arc::new(runner), config, Env::real()).quiet(quiet))
}

async fn run_provision(
    config: Config,
    password_file: Option<&std::path::Path>,
    skip_build: bool,
    output: Output,
) -> Result<ExitCode> {
    let provisioner = provisioner(&config, output.quiet)?.skip_build(skip_build);
    // Fail on missing tools before prompting for anything.
    provisioner.check_tools()?;
    let password = password(password_file)?;

    let report = provisioner
        .provision(&password)
        .await
        .context("provisioning failed")?;
    output.print(&report);
    Ok(ExitCode::SUCCESS)
}

async fn run_generate(
    config: Config,
    password_file: Option<&std::path::Path>,
    output: Output,
) -> Result<ExitCode> {
    let provisioner = provisioner(&config, output.quiet)?;
    let password = password(password_file)?;

    let generate = provisioner
        .generate(&password)
        .await
        .context("key generation failed")?;
    output.print(&ProvisionReport {
        built: false,
        rounds: vec![RoundReport {
            round: 1,
            generate: Some(generate),
            insert: None,
        }],
    });
    Ok(ExitCode::SUCCESS)
}

async fn run_insert(
    config: Config,
    password_file: Option<&std::path::Path>,
    output: Output,
) -> Result<ExitCode> {
    let key_file = config.key_file_path();
    if !key_file.exists() {
        bail!(
            "key file {} not found; run `{} generate` first",
            key_file.display(),
            constants::APP_NAME
        );
    }
    let provisioner = provisioner(&config, output.quiet)?;
    let password = password(password_file)?;

    let insert = provisioner
        .insert(&password)
        .await
        .context("key insertion failed")?;
    output.print(&ProvisionReport {
        built: false,
        rounds: vec![RoundReport {
            round: 1,
            generate: None,
            insert: Some(insert),
        }],
    });
    Ok(ExitCode::SUCCESS)
}

/// Report availability of every required tool.
fn run_check(config: Config) -> Result<ExitCode> {
    let provisioner = provisioner(&config, true)?;
    let env = Env::real();
    let mut missing = 0;

    for tool in provisioner.required_tools() {
        if process::command_exists(&tool, &env) {
            println!("  {} {}", "✔".green().bold(), tool);
        } else {
            println!("  {} {} {}", "✖".red().bold(), tool, "not found in PATH".red());
            missing += 1;
        }
    }

    let node_binary = config.node_binary_path();
    if process::command_exists(&node_binary, &env) {
        println!("  {} {}", "✔".green().bold(), node_binary);
    } else {
        println!(
            "  {} {} {}",
            "⚠".yellow().bold(),
            node_binary,
            "not built yet".dimmed()
        );
    }

    if missing > 0 {
        bail!("{missing} required tool(s) missing");
    }
    Ok(ExitCode::SUCCESS)
}

/// Sort (or check) a manifest's dependency table.
fn run_sort_deps(args: SortDepsArgs) -> Result<ExitCode> {
    let outcome = deps::sort_manifest_file(&args.manifest, args.check)?;
    let path = args.manifest.display();

    match (outcome.changed, args.check) {
        (false, _) => {
            println!("  {} {path} dependencies already sorted", "✔".green().bold());
            Ok(ExitCode::SUCCESS)
        }
        (true, true) => {
            println!("  {} {path} dependencies are not sorted", "✖".red().bold());
            Ok(ExitCode::FAILURE)
        }
        (true, false) => {
            println!(
                "  {} sorted {} dependencies in {path}",
                "✔".green().bold(),
                outcome.entries
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
