use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use porter::cli::{Cli, Commands, commands, theme};
use porter::config::Settings;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    theme::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", theme::error("Error:"), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> porter::Result<bool> {
    let mut settings = Settings::load_or_default(cli.settings.as_deref())?;
    cli.apply_overrides(&mut settings);
    settings.ensure_dirs_exist()?;

    let registry = commands::build_registry(&settings)?;

    match cli.command {
        Commands::Descriptors => {
            commands::list_descriptors(&registry);
            Ok(true)
        }

        Commands::Export {
            transfer,
            out,
            force,
        } => {
            let out_dir = out.unwrap_or_else(|| settings.export_dir.clone());
            commands::export(&settings, &registry, &transfer, &out_dir, force)
        }

        Commands::Import { transfer, file } => {
            commands::import(&settings, &registry, &transfer, &file)
        }
    }
}
