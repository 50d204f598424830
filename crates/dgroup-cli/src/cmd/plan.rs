use super::{load_desired, Context};
use crate::output::print_json;
use crate::store::FileStore;
use dgroup_core::reconcile::{PlannedAction, Reconciler};
use std::path::Path;

pub fn run(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let cfg = ctx.load_config()?;
    let desired = load_desired(file, &cfg)?;
    let store = FileStore::new(&ctx.store);

    let planned = ctx
        .runtime()?
        .block_on(Reconciler::new(&store, &cfg).plan(&desired))?;

    if ctx.json {
        return print_json(&planned);
    }

    let id = &desired.identity;
    match planned {
        PlannedAction::Create { .. } => println!("{id}: will be created"),
        PlannedAction::Update { request } => {
            println!("{id}: will be updated");
            for field in request.changed_fields() {
                println!("  ~ {field}");
            }
        }
        PlannedAction::Replace { field, from, to } => {
            println!("{id}: must be replaced ({field}: {from:?} -> {to:?})")
        }
        PlannedAction::NoOp => println!("{id}: no changes"),
    }
    Ok(())
}
