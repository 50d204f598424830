use super::Context;
use crate::output::print_json;
use crate::store::FileStore;
use dgroup_core::reconcile::{DestroyOutcome, Reconciler};
use dgroup_core::types::GroupIdentity;
use std::time::Duration;

pub fn run(ctx: &Context, app: &str, group: &str, timeout: Option<u64>) -> anyhow::Result<()> {
    let cfg = ctx.load_config()?;
    let store = FileStore::new(&ctx.store);
    let identity = GroupIdentity::new(app, group);

    let outcome = ctx.runtime()?.block_on(async {
        let deadline = timeout.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
        Reconciler::new(&store, &cfg).destroy(&identity, deadline).await
    })?;

    if ctx.json {
        return print_json(&outcome);
    }

    match outcome {
        DestroyOutcome::Deleted { report } => {
            println!("{identity}: deleted ({} checks)", report.checks)
        }
        DestroyOutcome::AlreadyAbsent => println!("{identity}: already absent"),
        DestroyOutcome::Pending { report } => println!(
            "{identity}: delete requested, still visible after {}s",
            report.elapsed.as_secs()
        ),
        DestroyOutcome::Cancelled { report } => println!(
            "{identity}: stopped waiting after {}s, deletion not yet confirmed",
            report.elapsed.as_secs()
        ),
    }
    Ok(())
}
