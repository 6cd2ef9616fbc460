mod cli;

use serde::Serialize;
use syncr::documents::{ConfigDocuments, Format};
use syncr::reconcile::{FunctionInfo, PlanProvider};
use syncr::registry::Section;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("SYNCR_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Check(check_cli) => check(check_cli),
        cli::Command::Plan(plan_cli) => plan(plan_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn check(cli: cli::CheckCommand) -> anyhow::Result<()> {
    let sections = normalise(&cli.input)?;
    output(&cli.output, &sections)?;
    Ok(())
}

pub fn plan(cli: cli::PlanCommand) -> anyhow::Result<()> {
    let sections = normalise(&cli.input)?;

    let format = Format::of(&cli.state)
        .ok_or_else(|| anyhow::anyhow!("Unsupported state file {}", cli.state.display()))?;
    let state = std::fs::read_to_string(&cli.state)?;
    let observed: Vec<FunctionInfo> = match format {
        Format::Yaml => serde_yaml::from_str(&state)?,
        Format::Json => serde_json::from_str(&state)?,
        Format::Hcl => anyhow::bail!("State must be yaml or json"),
    };

    let mut provider = PlanProvider::new(observed);
    for section in &sections {
        match section {
            Section::Lambda(lambdas) => {
                syncr::reconcile::sync_all(&mut provider, lambdas)?;
            }
        }
    }

    output(&cli.output, provider.planned())?;
    Ok(())
}

fn normalise(input: &cli::InputArgs) -> anyhow::Result<Vec<Section>> {
    let documents = load(input)?;
    let tree = documents
        .merged()
        .with_environment(input.environment.clone(), input.location.clone());

    Ok(syncr::registry::normalise_all(&tree)?)
}

fn load(input: &cli::InputArgs) -> anyhow::Result<ConfigDocuments> {
    let mut documents = ConfigDocuments::default();

    if input.workdir || (input.files.is_empty() && input.directories.is_empty()) {
        documents.load_directory(&std::env::current_dir()?)?;
    }

    for file_path in &input.files {
        documents.load_file(file_path)?;
    }

    for dir_path in &input.directories {
        documents.load_directory(dir_path)?;
    }

    anyhow::ensure!(documents.source_count() > 0, "No files loaded");

    Ok(documents)
}

fn output(output: &cli::OutputArgs, value: &(impl Serialize + ?Sized)) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}
