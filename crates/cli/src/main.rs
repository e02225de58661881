//! tern CLI: runs the reference snapshot-isolation scenarios.
//!
//! ```text
//! tern run [simple|rollback|never-ending|all] [--json] [-v]
//! tern config check <FILE>
//! tern config default
//! ```

mod commands;
mod scenarios;

use std::process;

use anyhow::{Context, Result};
use clap::ArgMatches;
use terndb::{Tern, TernConfig};
use tracing_subscriber::EnvFilter;

use commands::build_cli;

fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_count("verbose"));

    match dispatch(&matches) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "terndb=debug,tern_concurrency=debug,tern_cli=info",
        _ => "trace",
    };
    let filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    } else {
        EnvFilter::new(default)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<TernConfig> {
    match matches.get_one::<String>("config") {
        Some(path) => TernConfig::from_file(path).with_context(|| format!("loading {}", path)),
        None => Ok(TernConfig::default()),
    }
}

fn dispatch(matches: &ArgMatches) -> Result<i32> {
    let json = matches.get_flag("json");
    match matches.subcommand() {
        Some(("run", sub)) => {
            let config = load_config(matches)?;
            let which = sub
                .get_one::<String>("scenario")
                .map(String::as_str)
                .unwrap_or("all");
            run_scenarios(which, config, json)
        }
        Some(("config", sub)) => match sub.subcommand() {
            Some(("check", check)) => {
                let path = check
                    .get_one::<String>("file")
                    .context("missing configuration file")?;
                let config = TernConfig::from_file(path)
                    .with_context(|| format!("invalid configuration {}", path))?;
                if json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "valid": true,
                            "initial_version": config.oracle.initial_version,
                            "auto_compact_every": config.compaction.auto_compact_every,
                        })
                    );
                } else {
                    println!("{}: ok", path);
                }
                Ok(0)
            }
            Some(("default", _)) => {
                print!("{}", TernConfig::default().to_toml_string()?);
                Ok(0)
            }
            _ => anyhow::bail!("unknown config subcommand"),
        },
        _ => anyhow::bail!("no command given"),
    }
}

fn run_scenarios(which: &str, config: TernConfig, json: bool) -> Result<i32> {
    let names: Vec<&str> = if which == "all" {
        scenarios::ALL.to_vec()
    } else {
        vec![which]
    };
    let open = move || -> Result<Tern> { Ok(Tern::builder().config(config.clone()).open()?) };

    let mut failed = 0;
    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        let report = scenarios::run(name, &open)?;
        if !report.passed() {
            failed += 1;
        }
        reports.push(report);
    }

    if json {
        let out: Vec<_> = reports.iter().map(|r| r.to_json()).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for report in &reports {
            println!(
                "{} {}",
                if report.passed() { "PASS" } else { "FAIL" },
                report.name
            );
            for check in &report.checks {
                let mark = if check.passed { "ok  " } else { "FAIL" };
                println!("  [{}] {}", mark, check.description);
            }
            println!(
                "  started={} committed={} rolled_back={} active={}",
                report.metrics.started,
                report.metrics.committed,
                report.metrics.rolled_back,
                report.metrics.active
            );
        }
    }

    Ok(if failed == 0 { 0 } else { 1 })
}
