use clap::{Parser, Subcommand};

use duplex::fixture::FixtureService;
use duplex::{dlog, Config, Pipeline, Result};

/// Duplex - build-and-test orchestrator for dual-target client libraries
#[derive(Parser, Debug)]
#[command(name = "duplex")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    DUPLEX_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.duplex/duplex.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Orchestrator commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Build the server artifact and both browser bundle variants
    Build,

    /// Run the declaration check, server tests, and browser matrix
    Test,

    /// Run only the named browser engine's test pass
    TestBrowser {
        /// Engine name; must be in the configured engine set
        #[arg(long)]
        engine: String,
    },

    /// Stamp the version placeholder in the designated source file
    SetVersion {
        /// Semantic version to stamp
        #[arg(long)]
        version: String,
    },

    /// Rebuild whenever a source file changes
    Watch,

    /// Manage the integration-test fixture service
    Fixture {
        #[command(subcommand)]
        action: FixtureAction,
    },
}

/// Fixture service lifecycle
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum FixtureAction {
    /// Start the fixture service detached
    Start,
    /// Stop the recorded fixture service
    Stop,
    /// Report whether the fixture service is running
    Status,
}

fn main() {
    let cli = Cli::parse();
    duplex::log::init_with_debug(cli.debug);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    dlog!("Duplex starting: {:?}", cli.command);

    let root = std::env::current_dir()?;
    let config = Config::load(&root)?;
    let pipeline = Pipeline::new(config);
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Command::Build => {
            rt.block_on(pipeline.build())?;
            println!("build complete");
            Ok(0)
        }
        Command::Test => {
            let report = rt.block_on(pipeline.test())?;
            print!("{}", report.render());
            Ok(if report.ok() { 0 } else { 1 })
        }
        Command::TestBrowser { engine } => {
            let report = rt.block_on(pipeline.test_browser(&engine))?;
            print!("{}", report.render());
            Ok(if report.ok() { 0 } else { 1 })
        }
        Command::SetVersion { version } => {
            pipeline.set_version(&version)?;
            println!(
                "stamped {} with {}",
                pipeline.config().project.version_file.display(),
                version
            );
            Ok(0)
        }
        Command::Watch => {
            rt.block_on(pipeline.watch())?;
            Ok(0)
        }
        Command::Fixture { action } => {
            let service = FixtureService::new(pipeline.config());
            match action {
                FixtureAction::Start => {
                    let pid = rt.block_on(service.start())?;
                    println!("fixture started (pid {})", pid);
                }
                FixtureAction::Stop => {
                    if rt.block_on(service.stop())? {
                        println!("fixture stopped");
                    } else {
                        println!("fixture was not running");
                    }
                }
                FixtureAction::Status => match service.status()? {
                    Some(pid) => println!("fixture running (pid {})", pid),
                    None => println!("fixture not running"),
                },
            }
            Ok(0)
        }
    }
}
