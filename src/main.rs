use anyhow::Context;
use cipdb::env::ProcessEnv;
use cipdb::evaluator::GateConfig;
use cipdb::launcher::{self, EnvPlan, LaunchOptions, StatusReport};
use clap::Parser;
use dotenv::dotenv;

const EXAMPLES: &str = "\
Examples:
  cipdb ./target/debug/app                      Run with all breakpoints enabled
  cipdb --id validate ./target/debug/app        Run with a specific breakpoint ID
  cipdb --ids validate,save ./target/debug/app  Run with several breakpoint IDs
  cipdb --env DEBUG=true ./target/debug/app     Set an environment variable
  cipdb --disable ./target/debug/app            Run with breakpoints disabled
  cipdb --status                                Show current status
  cipdb --id x -- ./target/debug/app --id y     Pass cipdb's own flags through to the program

Flags after PROGRAM that cipdb also accepts are read by cipdb itself.
Put `--` before PROGRAM to hand everything after it to the program.";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run a program with cipdb conditional breakpoints configured",
    long_about = None,
    after_help = EXAMPLES
)]
struct Args {
    /// Set CIPDB_ID to run a specific breakpoint
    #[arg(long, value_name = "ID")]
    id: Option<String>,

    /// Set CIPDB_IDS to run several breakpoints (comma-separated)
    #[arg(long, value_name = "IDS")]
    ids: Option<String>,

    /// Set an environment variable (KEY=value, or KEY for "true")
    #[arg(short, long = "env", visible_alias = "environment", value_name = "KEY[=VALUE]")]
    env: Vec<String>,

    /// Disable all cipdb breakpoints in the program
    #[arg(long, conflicts_with = "enable")]
    disable: bool,

    /// Enable cipdb breakpoints even if CIPDB disables them
    #[arg(long)]
    enable: bool,

    /// Show cipdb status and environment variables
    #[arg(long)]
    status: bool,

    /// Print the status report as JSON
    #[arg(long, requires = "status")]
    json: bool,

    /// Program to run
    #[arg(required_unless_present = "status")]
    program: Option<String>,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let plan = EnvPlan::from_options(&LaunchOptions {
        id: args.id,
        ids: args.ids,
        env: args.env,
        disable: args.disable,
        enable: args.enable,
    });

    if args.status {
        let report = StatusReport::collect(&plan.overlay(ProcessEnv), GateConfig::default());
        if args.json {
            println!("{}", report.to_json()?);
        } else {
            report.render(&mut std::io::stdout().lock())?;
        }
        return Ok(());
    }

    let program = args
        .program
        .context("PROGRAM is required unless using --status")?;
    log::info!(
        "Launching {} ({} variables set, {} removed)",
        program,
        plan.assignments().len(),
        plan.removals().len()
    );

    let code = launcher::launch(&program, &args.args, &plan)
        .with_context(|| format!("failed to run '{program}'"))?;
    std::process::exit(code);
}
