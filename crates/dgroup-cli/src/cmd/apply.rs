use super::{load_desired, Context};
use crate::output::{print_attributes, print_json};
use crate::store::FileStore;
use dgroup_core::reconcile::{ReconcileOutcome, Reconciler};
use std::path::Path;

pub fn run(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let cfg = ctx.load_config()?;
    let desired = load_desired(file, &cfg)?;
    let store = FileStore::new(&ctx.store);

    let report = ctx
        .runtime()?
        .block_on(Reconciler::new(&store, &cfg).reconcile(&desired))?;

    if ctx.json {
        return print_json(&report);
    }

    let id = &report.identity;
    match &report.outcome {
        ReconcileOutcome::Created => println!("{id}: created"),
        ReconcileOutcome::Updated { fields } => {
            let names: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
            println!("{id}: updated ({})", names.join(", "));
        }
        ReconcileOutcome::Unchanged => println!("{id}: unchanged"),
        ReconcileOutcome::ReplaceRequired { field, from, to } => {
            anyhow::bail!(
                "{id}: {field} cannot change in place ({from:?} -> {to:?}); destroy and re-apply"
            )
        }
    }
    if !report.attributes.is_empty() {
        println!();
        print_attributes(&report.attributes);
    }
    Ok(())
}
