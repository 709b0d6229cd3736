use clap::Parser;
use oncecall::cli::{commands, Cli, Commands};
use oncecall::types::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let config = if cli.config.exists() {
        Config::load(&cli.config).unwrap_or_else(|_| Config::default_config())
    } else {
        Config::default_config()
    };

    // Determine log level: CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        format!("oncecall={}", log_level)
            .parse()
            .unwrap_or_else(|_| "oncecall=info".parse().expect("fallback directive is valid")),
    );

    let registry = tracing_subscriber::registry().with(filter);
    if config.general.log_format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    let result = match cli.command {
        Commands::Init { path } => commands::init(path),
        Commands::Inspect {
            file,
            function,
            limit,
        } => commands::inspect(file, function.as_deref(), limit, &config),
        Commands::Stats { file } => commands::stats(file, &config),
        Commands::Check { file } => commands::check(file, &config),
        Commands::Rewrite { file, pretty } => commands::rewrite(file, pretty, &config),
        Commands::Version => {
            commands::version();
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(commands::exit_code(&e));
    }
}
