//! bumpscout - find newer versions of package.json dependencies
//!
//! Reads package.json (or the global install listing), queries npm or yarn,
//! prints the recommended specifiers and optionally writes them back.

use bumpscout::cancel::cancel_pair;
use bumpscout::cli::CliArgs;
use bumpscout::config::RcConfig;
use bumpscout::domain::ResolutionResult;
use bumpscout::manifest::{global_declarations, PackageJson};
use bumpscout::orchestrator::{Orchestrator, RunOptions, DEFAULT_CONCURRENCY};
use bumpscout::output::{create_formatter, Report};
use bumpscout::registry::{
    create_client, Backend, FetchOptions, NpmConfig, RegistryConfig, DEFAULT_TIMEOUT,
};
use bumpscout::update::{VersionSelector, DEFAULT_PEER_ITERATIONS};
use clap::Parser;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.log_level());

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the level chosen by the flags
fn init_tracing(level: &str) {
    let default = level.parse().unwrap_or(LevelFilter::WARN);
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Main application logic
async fn run(mut args: CliArgs) -> anyhow::Result<ExitCode> {
    if let Some(rc) = RcConfig::load(&args.cwd, args.config.as_deref())? {
        args.merge(rc)?;
    }
    args.validate()?;

    let backend = args
        .package_manager
        .unwrap_or_else(|| Backend::detect(&args.cwd));
    let timeout = args
        .timeout
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TIMEOUT);
    debug!("Using {} in {}", backend, args.cwd.display());

    let mut npm = NpmConfig {
        timeout,
        ..NpmConfig::default()
    };
    if let Some(retries) = args.retry {
        npm.retries = retries;
    }
    if let Some(url) = &args.registry {
        npm = npm.with_registry_url(url);
    }
    let registry = RegistryConfig {
        npm,
        ..RegistryConfig::default()
    };
    let client = create_client(backend, &registry)?;

    let fetch = FetchOptions::new(&args.cwd)
        .with_timeout(timeout)
        .with_global(args.global);

    let mut manifest = None;
    let mut declarations = if args.global {
        Vec::new()
    } else {
        let package_json = if args.stdin {
            PackageJson::from_content(io::read_to_string(io::stdin())?)
        } else {
            PackageJson::read(&args.cwd)?
        };
        let declarations = package_json.declarations()?;
        manifest = Some(package_json);
        declarations
    };

    let show_progress = !args.quiet && !args.is_machine_output() && io::stderr().is_terminal();
    let options = RunOptions::new(fetch)
        .with_policy(args.policy()?)
        .with_peer(args.peer)
        .with_concurrency(args.concurrency.unwrap_or(DEFAULT_CONCURRENCY))
        .with_peer_iterations(args.peer_iterations.unwrap_or(DEFAULT_PEER_ITERATIONS))
        .with_tolerate_conflicts(args.tolerate_conflicts)
        .with_progress(show_progress);

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let selector = VersionSelector::new(args.filter());
    let mut orchestrator = Orchestrator::new(client, selector, options).with_cancel(signal);

    let result = if args.global {
        match orchestrator.list_installed().await? {
            Some(installed) => {
                declarations = global_declarations(&installed);
                orchestrator = orchestrator.with_installed(installed);
                orchestrator.run(&declarations).await?
            }
            None => ResolutionResult::cancelled(),
        }
    } else {
        orchestrator.run(&declarations).await?
    };

    let mut written = false;
    if args.upgrade && result.has_changes() {
        if let Some(package_json) = manifest.as_mut() {
            let count = package_json.apply(&result)?;
            package_json.write()?;
            debug!("Rewrote {} specifiers in {}", count, package_json.display_path().display());
            written = true;
        }
    }

    let config = args.output().with_color(io::stdout().is_terminal());
    let formatter = create_formatter(&config);
    let report = Report {
        result: &result,
        declarations: &declarations,
        written,
        install_command: backend.install_command(),
    };
    let mut stdout = io::stdout().lock();
    formatter.format(&report, &mut stdout)?;
    stdout.flush()?;

    if result.has_errors() || result.partial {
        Ok(ExitCode::from(2))
    } else if args.error_level >= 2 && result.has_changes() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
