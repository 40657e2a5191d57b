#![deny(clippy::unwrap_used, clippy::expect_used)]

use clap::Parser;
use contact_sheet::{
    configuration::RunConfiguration, error::ContextError, fetcher::ImageFetcher, logging,
    person::PeopleDocument, pipeline::generate_contact_sheet,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    #[arg(
        long = "input",
        value_name = "json_file",
        default_value = "response.json",
        help = "Path to the JSON document with the list of people"
    )]
    input_path: PathBuf,
    #[arg(
        long = "output-root",
        value_name = "directory",
        default_value = ".",
        help = "Directory where the output and logs directories are created"
    )]
    output_root: PathBuf,
    #[arg(long = "verbosity", value_enum, default_value_t = Verbosity::Debug)]
    verbosity: Verbosity,
}

#[derive(Debug, Copy, Clone, clap::ValueEnum)]
enum Verbosity {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<Verbosity> for log::LevelFilter {
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Error => log::LevelFilter::Error,
            Verbosity::Warn => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
            Verbosity::Trace => log::LevelFilter::Trace,
        }
    }
}

fn main() {
    if let Err(error) = fallible_main() {
        if log::max_level() == log::LevelFilter::Off {
            // The logger could not be installed
            eprintln!("{}", error);
        } else {
            log::error!("{}", error);
        }
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    let run = RunConfiguration::new(&arguments.output_root)?;
    logging::initialize_logger(&run.log_path, arguments.verbosity.into())?;
    logging::log_system_info();
    log::debug!("{:?}", arguments);

    run.create_directories()?;
    let people_document = PeopleDocument::from_path(&arguments.input_path)?;
    log::info!("Loaded {} people", people_document.people.len());

    let fetcher = ImageFetcher::new()?;
    let run_summary = generate_contact_sheet(&people_document, &run, &fetcher)?;
    println!(
        "PDF generated successfully as '{}'",
        run_summary.pdf_path.display()
    );

    Ok(())
}
