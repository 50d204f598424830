use super::Context;
use crate::output::{print_json, print_yaml};
use anyhow::Context as _;
use clap::Subcommand;
use dgroup_core::config::{ReconcileConfig, WarnLevel};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective settings
    Show,

    /// Check the settings for common mistakes
    Validate,
}

pub fn run(ctx: &Context, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    let cfg = ReconcileConfig::load_or_default(ctx.config.as_deref())
        .context("failed to load settings")?;
    match subcmd {
        ConfigSubcommand::Show => {
            if ctx.json {
                print_json(&cfg)
            } else {
                print_yaml(&cfg)
            }
        }
        ConfigSubcommand::Validate => validate(&cfg, ctx.json),
    }
}

fn validate(cfg: &ReconcileConfig, json: bool) -> anyhow::Result<()> {
    let warnings = cfg.validate();

    if json {
        print_json(&warnings)?;
    } else if warnings.is_empty() {
        println!("Settings OK.");
    } else {
        for w in &warnings {
            let label = match w.level {
                WarnLevel::Error => "error",
                WarnLevel::Warning => "warning",
            };
            println!("[{label}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("settings have errors");
    }
    Ok(())
}
