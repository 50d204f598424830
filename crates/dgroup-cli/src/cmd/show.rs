use super::Context;
use crate::output::{print_attributes, print_json, print_yaml};
use crate::store::FileStore;
use dgroup_core::attributes;
use dgroup_core::builder::group_to_display;
use dgroup_core::reconcile::Reconciler;
use dgroup_core::types::GroupIdentity;

pub fn run(ctx: &Context, app: &str, group: &str) -> anyhow::Result<()> {
    let cfg = ctx.load_config()?;
    let store = FileStore::new(&ctx.store);
    let identity = GroupIdentity::new(app, group);

    let observed = ctx
        .runtime()?
        .block_on(Reconciler::new(&store, &cfg).observe(&identity))?
        .ok_or_else(|| anyhow::anyhow!("deployment group {identity} does not exist"))?;
    let attrs = attributes::flatten(&observed);

    if ctx.json {
        return print_json(&serde_json::json!({
            "group": group_to_display(&observed),
            "attributes": attrs,
        }));
    }

    print_yaml(&group_to_display(&observed))?;
    println!();
    print_attributes(&attrs);
    Ok(())
}
