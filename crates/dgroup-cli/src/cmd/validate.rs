use super::{load_desired, Context};
use crate::output::{print_json, print_yaml};
use dgroup_core::builder::group_to_display;
use std::path::Path;

pub fn run(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let cfg = ctx.load_config()?;
    let group = load_desired(file, &cfg)?;

    if ctx.json {
        return print_json(&serde_json::json!({
            "valid": true,
            "identity": group.identity,
        }));
    }

    println!("{}: ok", group.identity);
    print_yaml(&group_to_display(&group))
}
