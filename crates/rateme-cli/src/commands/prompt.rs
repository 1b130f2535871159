use std::path::Path;

use rateme_core::{Decision, RatePrompt, SqliteStore, Thresholds};
use serde::Serialize;

use super::load_config;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn open(config_path: Option<&Path>) -> Result<RatePrompt<SqliteStore>, Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    Ok(RatePrompt::from_config(&config)?)
}

fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn launch(config_path: Option<&Path>, fresh_start: bool) -> CmdResult {
    let prompt = open(config_path)?;
    match prompt.on_application_start(fresh_start)? {
        Some(snapshot) => print_json(&snapshot),
        None => {
            println!("resumed session, launch not counted");
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct CheckOutput {
    show: bool,
    decision: Decision,
    thresholds: Thresholds,
}

pub fn check(
    config_path: Option<&Path>,
    min_days: Option<u32>,
    min_launches: Option<u32>,
) -> CmdResult {
    let prompt = open(config_path)?;
    let defaults = prompt.thresholds();
    let thresholds = Thresholds::new(
        min_days.unwrap_or(defaults.min_install_days),
        min_launches.unwrap_or(defaults.min_launch_times),
    );
    let decision = prompt.decide(thresholds)?;
    print_json(&CheckOutput {
        show: decision.should_show(),
        decision,
        thresholds,
    })
}

pub fn status(config_path: Option<&Path>) -> CmdResult {
    let prompt = open(config_path)?;
    print_json(&prompt.snapshot()?)
}

pub fn opt_out(config_path: Option<&Path>, opted_out: bool) -> CmdResult {
    let prompt = open(config_path)?;
    prompt.set_opt_out(opted_out)?;
    println!("ok");
    Ok(())
}

pub fn rated(config_path: Option<&Path>) -> CmdResult {
    let prompt = open(config_path)?;
    prompt.mark_rated()?;
    println!("ok");
    Ok(())
}

pub fn clear(config_path: Option<&Path>) -> CmdResult {
    let prompt = open(config_path)?;
    prompt.clear_launch_data()?;
    println!("launch data cleared");
    Ok(())
}
