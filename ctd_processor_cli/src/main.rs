//! # ctd_processor_cli
//!
//! Part of the ctd_processor crate family.
//!
//! Command line front end for configuring PSA files and running the SBE Data Processing tools
//! over a set of raw CTD casts.
//!
//! ## Use
//!
//! ```bash
//! # Build a configuration by scanning directories
//! ctd_processor_cli scan -p run.yaml --config-dir psa --exe-dir sbe --output-dir out --raw raw/*.hex
//! # Point the PSA files at the raw files and output directory
//! ctd_processor_cli update
//! # Run the enabled steps in order
//! ctd_processor_cli run
//! ```
//!
//! Without `--path` the last used configuration (recorded in `last_used_config.yaml`) is used.
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use simplelog::{
    ColorChoice, CombinedLogger, LevelFilter, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use libctd_processor::config::{LastUsed, RunConfig};
use libctd_processor::error::ConfigError;
use libctd_processor::launcher::ProcessLauncher;
use libctd_processor::planner::RunOptions;
use libctd_processor::session::Session;
use libctd_processor::step::StepOrder;

const LOG_FILE: &str = "ctd_processor.log";

fn make_template_config(path: &Path) -> Result<(), ConfigError> {
    RunConfig::default().write_config_file(path)
}

fn path_arg() -> Arg {
    Arg::new("path")
        .short('p')
        .long("path")
        .global(true)
        .value_parser(value_parser!(PathBuf))
        .help("Path to the run configuration file")
}

fn dir_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn step_arg() -> Arg {
    Arg::new("step")
        .short('s')
        .long("step")
        .required(true)
        .help("PSA file name of the step")
}

fn build_cli() -> Command {
    Command::new("ctd_processor_cli")
        .arg_required_else_help(true)
        .arg(path_arg())
        .arg(
            Arg::new("pointer")
                .long("pointer")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Location of the last used configuration pointer file"),
        )
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("scan")
                .about("Build a configuration by scanning the PSA and executable directories")
                .arg(dir_arg("config-dir", "Directory containing the .psa files"))
                .arg(dir_arg("exe-dir", "Directory containing the executables"))
                .arg(dir_arg("output-dir", "Directory for the processed output"))
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf))
                        .help("Raw .hex files"),
                ),
        )
        .subcommand(Command::new("update").about("Update the PSA files for the raw files"))
        .subcommand(
            Command::new("run")
                .about("Run the enabled steps for every raw file")
                .arg(
                    Arg::new("update")
                        .long("update")
                        .action(ArgAction::SetTrue)
                        .help("Update each step's PSA file for the raw file before running it"),
                ),
        )
        .subcommand(
            Command::new("edit")
                .about("Open a step's PSA file in its tool")
                .arg(step_arg()),
        )
        .subcommand(
            Command::new("set")
                .about("Change the settings of a step and save the configuration")
                .arg(step_arg())
                .arg(
                    Arg::new("exe")
                        .long("exe")
                        .conflicts_with("clear-exe")
                        .help("Executable name (or path) to run the step with"),
                )
                .arg(
                    Arg::new("clear-exe")
                        .long("clear-exe")
                        .action(ArgAction::SetTrue)
                        .help("Unselect the step's executable"),
                )
                .arg(Arg::new("order").long("order").help("Order of the step"))
                .arg(
                    Arg::new("enable")
                        .long("enable")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("disable"),
                )
                .arg(Arg::new("disable").long("disable").action(ArgAction::SetTrue)),
        )
        .subcommand(Command::new("show").about("Print the loaded configuration"))
}

/// Terminal logging plus a log file, routed through the progress bars
fn init_logging(pb_manager: &MultiProgress) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        LevelFilter::Info,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    match File::create(LOG_FILE) {
        Ok(file) => loggers.push(WriteLogger::new(
            LevelFilter::Debug,
            simplelog::Config::default(),
            file,
        )),
        Err(e) => eprintln!("Could not create log file {LOG_FILE}: {e}"),
    }

    LogWrapper::new(pb_manager.clone(), CombinedLogger::new(loggers))
        .try_init()
        .expect("Could not create logging/progress!");
    log::set_max_level(LevelFilter::Debug);
}

/// Load the configuration given on the command line, or the last used one
fn load_session(matches: &ArgMatches, pointer_path: PathBuf) -> Option<Session> {
    let mut session = Session::new(pointer_path);
    if let Some(path) = matches.get_one::<PathBuf>("path") {
        log::info!("Loading config from {}...", path.display());
        return match session.load(path) {
            Ok(()) => Some(session),
            Err(e) => {
                log::error!("Failed to load configuration: {e}");
                None
            }
        };
    }

    match session.load_last_used() {
        Ok(true) => {
            if let Some(path) = session.config_path() {
                log::info!("Loaded last used config from {}", path.display());
            }
            Some(session)
        }
        Ok(false) => {
            log::warn!(
                "No last used config file found. Please select a configuration file with --path."
            );
            None
        }
        Err(e) => {
            log::error!("Failed to load configuration from last used file: {e}");
            None
        }
    }
}

fn log_config(config: &RunConfig) {
    log::info!("PSA directory: {}", config.config_dir.display());
    log::info!("Executables directory: {}", config.executables_dir.display());
    log::info!("Output directory: {}", config.output_dir.display());
    for raw in config.raw_files.iter() {
        log::info!("Raw file: {}", raw.display());
    }
    for step in config.steps.iter() {
        log::info!(
            "Step {} -- executable: {} order: {} run: {}",
            step.config_file,
            step.executable
                .as_ref()
                .map(|e| e.name())
                .unwrap_or_else(|| String::from("None")),
            step.order,
            step.enabled
        );
    }
}

fn scan(matches: &ArgMatches, pointer_path: PathBuf) -> ExitCode {
    let Some(config_path) = matches.get_one::<PathBuf>("path") else {
        log::error!("scan needs --path to know where to save the configuration");
        return ExitCode::FAILURE;
    };
    let mut session = Session::new(pointer_path);
    let dir = |name: &str| matches.get_one::<PathBuf>(name).cloned().unwrap_or_default();

    if let Err(e) = session.scan_config_dir(&dir("config-dir")) {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = session.register_executables(&dir("exe-dir")) {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }
    session.set_output_dir(dir("output-dir"));
    session.set_raw_files(
        matches
            .get_many::<PathBuf>("raw")
            .map(|raws| raws.cloned().collect())
            .unwrap_or_default(),
    );
    let assigned = session.auto_assign_executables();
    log::info!(
        "Assigned executables to {} of {} steps",
        assigned,
        session.config().steps.len()
    );
    log_config(session.config());

    match session.save(config_path) {
        Ok(()) => {
            log::info!("Your configuration has been saved to {}", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to save configuration: {e}");
            ExitCode::FAILURE
        }
    }
}

fn update(session: &Session) -> ExitCode {
    let report = match session.update_config_files() {
        Ok(r) => r,
        Err(e) => {
            log::error!("PSA Update Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if !report.updated.is_empty() {
        log::info!("The following PSA files were updated:");
        for path in report.updated.iter() {
            log::info!("  {}", path.display());
        }
    }
    if report.has_failures() {
        log::error!("The following errors occurred:");
        for (path, msg) in report.failures.iter() {
            log::error!("  {}: {}", path.display(), msg);
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(session: &Session, matches: &ArgMatches, pb_manager: &MultiProgress) -> ExitCode {
    let options = RunOptions {
        rewrite_configs: matches.get_flag("update"),
    };
    let pb = pb_manager.add(ProgressBar::new(100));
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let result = session.run(&options, &mut ProcessLauncher, |status| {
        pb.set_position((status.progress * 100.0) as u64);
        pb.set_message(format!(
            "raw file {}/{} - {}",
            (status.raw_index + 1).min(status.raw_total),
            status.raw_total,
            status.step_name
        ));
    });
    pb.finish();

    match result {
        Ok(report) if report.has_failures() => {
            log::error!(
                "Processing complete with {} failed step(s) and {} successful step(s):",
                report.failures.len(),
                report.succeeded
            );
            for failure in report.failures.iter() {
                log::error!("  {failure}");
            }
            ExitCode::FAILURE
        }
        Ok(report) => {
            log::info!(
                "Processing complete. {} step(s) ran successfully.",
                report.succeeded
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn edit(session: &Session, matches: &ArgMatches) -> ExitCode {
    let step = matches.get_one::<String>("step").cloned().unwrap_or_default();
    match session.open_step_in_tool(&step, &mut ProcessLauncher) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn set(mut session: Session, matches: &ArgMatches) -> ExitCode {
    let step = matches.get_one::<String>("step").cloned().unwrap_or_default();
    let mut result = Ok(());
    if let Some(exe) = matches.get_one::<String>("exe") {
        result = result.and_then(|_| session.select_executable(&step, exe));
    }
    if matches.get_flag("clear-exe") {
        result = result.and_then(|_| session.clear_executable(&step));
    }
    if let Some(order) = matches.get_one::<String>("order") {
        result = result.and_then(|_| session.set_order(&step, StepOrder::from(order.as_str())));
    }
    if matches.get_flag("enable") {
        result = result.and_then(|_| session.set_enabled(&step, true));
    }
    if matches.get_flag("disable") {
        result = result.and_then(|_| session.set_enabled(&step, false));
    }
    let Some(config_path) = session.config_path().map(Path::to_path_buf) else {
        log::error!("No configuration file to save to");
        return ExitCode::FAILURE;
    };
    match result.and_then(|_| session.save(&config_path)) {
        Ok(()) => {
            log::info!("Updated step {} in {}", step, config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    // Create a cli
    let matches = build_cli().get_matches();

    // Initialize feedback
    let pb_manager = MultiProgress::new();
    init_logging(&pb_manager);

    let pointer_path = matches
        .get_one::<PathBuf>("pointer")
        .cloned()
        .unwrap_or_else(LastUsed::default_path);

    let exit = match matches.subcommand() {
        Some(("new", _)) => {
            let Some(config_path) = matches.get_one::<PathBuf>("path") else {
                log::error!("new needs --path for the template file");
                return ExitCode::FAILURE;
            };
            log::info!("Making a template config at {}...", config_path.display());
            match make_template_config(config_path) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    log::error!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
        Some(("scan", sub)) => scan(sub, pointer_path),
        Some((name, sub)) => {
            let Some(session) = load_session(&matches, pointer_path) else {
                return ExitCode::FAILURE;
            };
            log::info!("Config successfully loaded.");
            match name {
                "update" => update(&session),
                "run" => run(&session, sub, &pb_manager),
                "edit" => edit(&session, sub),
                "set" => set(session, sub),
                _ => {
                    log_config(session.config());
                    ExitCode::SUCCESS
                }
            }
        }
        None => ExitCode::SUCCESS,
    };

    log::info!("Done.");
    exit
}
