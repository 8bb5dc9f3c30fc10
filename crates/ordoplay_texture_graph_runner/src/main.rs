// SPDX-License-Identifier: MIT OR Apache-2.0
//! `texgraph`: headless driver for texture graphs.
//!
//! Usage: `texgraph <script.ron> [--settings <settings.ron>]`
//!
//! Without `--settings`, a `texture_graph.ron` next to the script is used when
//! present, otherwise the defaults.

mod error;
mod run;
mod script;

use error::{Result, RunnerError};
use ordoplay_texture_graph::settings::SETTINGS_FILE_NAME;
use ordoplay_texture_graph::EvaluatorSettings;
use script::GraphScript;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const USAGE: &str = "usage: texgraph <script.ron> [--settings <settings.ron>]";

/// Parsed command line
#[derive(Debug, PartialEq)]
struct Args {
    script: PathBuf,
    settings: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut script = None;
    let mut settings = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                let path = args
                    .next()
                    .ok_or_else(|| RunnerError::Usage(format!("--settings needs a path\n{USAGE}")))?;
                settings = Some(PathBuf::from(path));
            }
            "-h" | "--help" => return Err(RunnerError::Usage(USAGE.to_string())),
            _ if script.is_none() => script = Some(PathBuf::from(arg)),
            _ => return Err(RunnerError::Usage(format!("unexpected argument '{arg}'\n{USAGE}"))),
        }
    }

    let script = script.ok_or_else(|| RunnerError::Usage(USAGE.to_string()))?;
    Ok(Args { script, settings })
}

fn load_settings(args: &Args) -> Result<EvaluatorSettings> {
    if let Some(path) = &args.settings {
        return Ok(EvaluatorSettings::load(path)?);
    }
    let beside_script = args
        .script
        .parent()
        .map(|dir| dir.join(SETTINGS_FILE_NAME))
        .filter(|path| path.is_file());
    match beside_script {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using settings next to script");
            Ok(EvaluatorSettings::load(&path)?)
        }
        None => Ok(EvaluatorSettings::default()),
    }
}

fn execute(args: &Args) -> Result<()> {
    let settings = load_settings(args)?;
    let script = GraphScript::load(&args.script)?;
    tracing::info!(graph = %script.name, nodes = script.nodes.len(), passes = script.passes, "loaded script");

    let summary = run::run(&script, settings)?;
    let failures: usize = summary.reports.iter().map(|r| r.failures.len()).sum();
    for export in &summary.exports {
        let computed = export.outputs.iter().flatten().count();
        tracing::debug!(node = %export.key, computed, total = export.outputs.len(), "exported outputs");
    }
    tracing::info!(passes = summary.reports.len(), failures, "run finished");
    Ok(())
}

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("texgraph=info,ordoplay_texture_graph=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting texgraph v{}", env!("CARGO_PKG_VERSION"));

    let result = parse_args(std::env::args().skip(1)).and_then(|args| execute(&args));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunnerError::Usage(message)) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("texgraph failed: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(ToString::to_string))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(
            args(&["graph.ron"]).unwrap(),
            Args {
                script: PathBuf::from("graph.ron"),
                settings: None,
            }
        );
        assert_eq!(
            args(&["graph.ron", "--settings", "s.ron"]).unwrap().settings,
            Some(PathBuf::from("s.ron"))
        );
        assert!(matches!(args(&[]), Err(RunnerError::Usage(_))));
        assert!(matches!(args(&["a.ron", "b.ron"]), Err(RunnerError::Usage(_))));
        assert!(matches!(args(&["a.ron", "--settings"]), Err(RunnerError::Usage(_))));
    }

    #[test]
    fn test_settings_beside_script() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("graph.ron");
        let parsed = Args {
            script,
            settings: None,
        };
        assert_eq!(load_settings(&parsed).unwrap(), EvaluatorSettings::default());

        let settings = EvaluatorSettings {
            memoization: false,
            ..Default::default()
        };
        settings.save(&dir.path().join(SETTINGS_FILE_NAME)).unwrap();
        assert_eq!(load_settings(&parsed).unwrap(), settings);
    }

    #[test]
    fn test_execute_sample_script() {
        let sample = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/sample.ron");
        let parsed = Args {
            script: sample,
            settings: None,
        };
        execute(&parsed).unwrap();
    }
}
