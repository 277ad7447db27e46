use std::{error::Error, path::Path, process::ExitCode};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ngsite::{
    cli::{CertCommand, Cli, Commands, parse_args},
    config::load_config,
    manager::NginxManager,
    site::SiteMode,
};

fn main() -> ExitCode {
    let args = parse_args();
    init_logging(&args);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(args.config.as_deref())?;
    let manager = NginxManager::from_config(&config);

    match args.command {
        Commands::List { json } => {
            let domains = manager.list_domains()?;
            let enabled = manager.enabled_domains()?;
            if json {
                let entries: Vec<_> = domains
                    .iter()
                    .map(|domain| {
                        serde_json::json!({
                            "domain": domain,
                            "enabled": enabled.contains(domain),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if domains.is_empty() {
                println!("No domains configured");
            } else {
                for (idx, domain) in domains.iter().enumerate() {
                    let marker = if enabled.contains(domain) { "" } else { " (disabled)" };
                    println!("{}. {domain}{marker}", idx + 1);
                }
            }
        }
        Commands::Add {
            domain,
            mode,
            target,
        } => {
            if mode == SiteMode::Static && !Path::new(&target).is_dir() {
                warn!("Static root {target} does not exist yet");
            }
            manager.add_domain(&domain, mode, &target)?;
            println!("Added domain {domain}");
        }
        Commands::Delete { domain } => {
            manager.delete_domain(&domain)?;
            println!("Deleted domain {domain}");
        }
        Commands::Show { domain } => {
            let text = manager.view_domain_config(&domain)?;
            println!("Configuration for domain {domain}:");
            println!("{text}");
        }
        Commands::Subroute {
            domain,
            segment,
            mode,
            target,
        } => {
            if mode == SiteMode::Static && !Path::new(&target).is_dir() {
                warn!("Sub-route directory {target} does not exist yet");
            }
            manager.add_subroute(&domain, &segment, mode, &target)?;
            println!("Added sub-route /{segment} for domain {domain}");
        }
        Commands::Cert { action } => match action {
            CertCommand::Issue { domain } => {
                manager.issue_certificate(&domain)?;
                println!("Installed SSL for domain {domain}");
            }
            CertCommand::Renew => {
                manager.renew_certificates()?;
                println!("Renewed SSL certificates");
            }
        },
        Commands::Version => {
            if !manager.is_installed() {
                warn!("nginx was not found on PATH");
            }
            let version = manager.version()?;
            info!("Detected {version}");
            println!("{version}");
        }
    }

    Ok(())
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
