//! `approval-mediator doctor` - configuration diagnostics.
//!
//! Validates the config file and the resolved configuration so that
//! misconfigured swap routing shows up before requests start flowing.

use std::path::Path;

use crate::config::MediatorConfig;
use crate::settings::Settings;

/// Run diagnostic checks and print results.
pub fn run_doctor_command(config_path: Option<&Path>, strict: bool) -> anyhow::Result<()> {
    println!("Approval Mediator Doctor");
    println!("========================\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_toml_path);
    check(
        "Config file",
        check_config_file(&path, config_path.is_some()),
        &mut passed,
        &mut failed,
    );

    let config = MediatorConfig::from_env_with_toml(config_path);
    check(
        "Resolved configuration",
        match &config {
            Ok(_) => CheckResult::Pass("all values valid".to_string()),
            Err(e) => CheckResult::Fail(e.to_string()),
        },
        &mut passed,
        &mut failed,
    );

    if let Ok(config) = &config {
        check(
            "Swap routing",
            check_swap_routing(config),
            &mut passed,
            &mut failed,
        );
        check(
            "Selected account",
            check_selected_address(config),
            &mut passed,
            &mut failed,
        );
        check(
            "Token list",
            check_token_list(config),
            &mut passed,
            &mut failed,
        );
    }

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        println!("\n  Some checks failed. Run `approval-mediator config init` for a fresh file.");
        if strict {
            anyhow::bail!("doctor strict mode failed with {failed} check(s)");
        }
    }

    Ok(())
}

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

#[derive(Debug)]
enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn check_config_file(path: &Path, explicit: bool) -> CheckResult {
    match Settings::load_toml(path) {
        Ok(Some(_)) => CheckResult::Pass(format!("{} parsed", path.display())),
        Ok(None) if explicit => CheckResult::Fail(format!("{} not found", path.display())),
        Ok(None) => CheckResult::Skip(format!("{} not found, using defaults", path.display())),
        Err(e) => CheckResult::Fail(e),
    }
}

fn check_swap_routing(config: &MediatorConfig) -> CheckResult {
    let Some(origin) = config.swap_origin.as_deref() else {
        return CheckResult::Skip("SWAPS_ORIGIN not set, swaps always need approval".to_string());
    };
    match config.swap_contract(config.chain_id) {
        Some(contract) => CheckResult::Pass(format!(
            "origin {origin} auto-signs calls to {contract} on chain {}",
            config.chain_id
        )),
        None => CheckResult::Fail(format!(
            "no swap contract configured for chain {}",
            config.chain_id
        )),
    }
}

fn check_selected_address(config: &MediatorConfig) -> CheckResult {
    match config.selected_address {
        Some(address) => CheckResult::Pass(address.to_string()),
        None if config.swap_origin.is_some() => CheckResult::Fail(
            "MEDIATOR_SELECTED_ADDRESS not set, swap outcomes cannot be measured".to_string(),
        ),
        None => CheckResult::Skip("not set".to_string()),
    }
}

fn check_token_list(config: &MediatorConfig) -> CheckResult {
    if config.tokens.is_empty() && config.token_registry.is_empty() {
        return CheckResult::Skip("no tokens configured, metadata comes from the chain".to_string());
    }
    CheckResult::Pass(format!(
        "{} user tokens, {} registry entries",
        config.tokens.len(),
        config.token_registry.len()
    ))
}
