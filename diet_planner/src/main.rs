use std::env;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use getopts::{Matches, Options};
use log::{debug, error, info, warn, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

use diet_plan::{validate_input, write_diet_plan, PlanManager, PlanSession, PlannerConfig, Profile};
use flow_client::ApiKey;

mod form;

use form::Prompter;

const LOG_CONFIG: &str = "log4rs.yml";

// usage and startup problems vs. a failed submission
const EXIT_CONFIG: u8 = 1;
const EXIT_REQUEST: u8 = 2;

fn print_usage(program: &str, opts: &Options) {
    let brief = format!(
        "Usage: {} [options]\n\nCreate your personalized diet plan based on your goals and preferences.\nMissing values are asked for interactively.",
        program
    );
    print!("{}", opts.usage(&brief));
}

/// Parses everything after the program name; bad options are a startup problem.
fn parse_options(opts: &Options, args: &[String]) -> std::result::Result<Matches, u8> {
    opts.parse(args).map_err(|e| {
        eprintln!("{}", e);
        EXIT_CONFIG
    })
}

fn init_logging() {
    // log4rs.yml is optional, fall back to warnings on stderr
    if log4rs::init_file(LOG_CONFIG, Default::default()).is_err() {
        let stderr = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} {t} - {m}{n}")))
            .build();
        let config = LogConfig::builder()
            .appender(Appender::builder().build("stderr", Box::new(stderr)))
            .build(Root::builder().appender("stderr").build(LevelFilter::Warn));
        match config {
            Ok(config) => {
                if let Err(e) = log4rs::init_config(config) {
                    eprintln!("Unable to configure logging: {}", e);
                }
            }
            Err(e) => eprintln!("Unable to configure logging: {}", e),
        }
    }
}

/// Everything that has to succeed before the form is shown. Any error here
/// is fatal, including a missing API key.
fn startup(matches: &Matches) -> Result<(PlannerConfig, PlanManager)> {
    let settings = matches.opt_str("config");
    let mut config = PlannerConfig::load(settings.as_deref()).context("Unable to load settings")?;

    if let Some(version) = matches.opt_str("flow-version") {
        config.flow.version = version;
    }
    if let Some(dir) = matches.opt_str("output-dir") {
        config.file.output_dir = dir;
    }
    if matches.opt_present("no-save") {
        config.file.save_to_file = false;
    }
    debug!("Using config: {:?}", config);

    let api_key = ApiKey::from_env().context("Unable to configure the flow client")?;
    let manager = PlanManager::from_config(&config, api_key);
    info!("Configured diet flow version {}", manager.version());
    Ok((config, manager))
}

/// One submission: collect, validate, request, show, export.
async fn run(
    matches: &Matches,
    config: &PlannerConfig,
    manager: &PlanManager,
    session: &mut PlanSession,
) -> Result<()> {
    let interactive = !matches.opt_present("non-interactive");
    let stdin = io::stdin();
    let form = Prompter::new(stdin.lock(), io::stdout(), interactive).collect(matches)?;

    let fields = validate_input(form.into_fields())?;
    let profile = Profile::from_fields(&fields)?;
    debug!("Submitting profile: {:?}", profile);

    println!("Creating your personalized diet plan...");
    let plan = manager.get_diet_plan(&fields, manager.version()).await?;
    let plan = session.record(plan);

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "\nYour personalized diet plan has been generated successfully!\n")?;
    writeln!(stdout, "Your Diet Plan\n--------------\n")?;
    writeln!(stdout, "{}", plan.result())?;
    stdout.flush()?;

    if let Some(path) = write_diet_plan(plan, &config.file)? {
        println!("\nSaved diet plan to {}", path.display());
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args
        .first()
        .cloned()
        .unwrap_or_else(|| String::from("diet_planner"));

    let opts = form::options();
    let matches = match parse_options(&opts, args.get(1..).unwrap_or_default()) {
        Ok(m) => m,
        Err(code) => {
            print_usage(&program, &opts);
            return ExitCode::from(code);
        }
    };
    if matches.opt_present("help") {
        print_usage(&program, &opts);
        return ExitCode::SUCCESS;
    }

    init_logging();

    let (config, manager) = match startup(&matches) {
        Ok(ready) => ready,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Fatal: {:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let mut session = PlanSession::new();
    match run(&matches, &config, &manager, &mut session).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            warn!("Submission failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_REQUEST)
        }
    }
}
