//! In-process tasks that tag some of their lines with another label
//!
//! Run with: cargo run --example tagged_output

use anyhow::Result;
use muxrun::{codec, CancellationToken, ProcessContext, ProcessDescriptor, RunOptions, Scheduler, TerminalSurface};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    println!("🧪 Tagged output demo\n");

    let host = ProcessDescriptor::new("host", |mut ctx: ProcessContext| async move {
        ctx.stdout.write_line("loading extensions");
        for name in ["git-lens", "spell-check"] {
            tokio::time::sleep(Duration::from_millis(150)).await;
            ctx.stdout.write_line(&codec::encode(name, "activated"));
        }
        ctx.stderr.write_line(&codec::encode("spell-check", "dictionary missing, using en-US"));
        Ok::<_, anyhow::Error>(())
    });

    let ticker = ProcessDescriptor::new("ticker", |mut ctx: ProcessContext| async move {
        for tick in 1..=5 {
            tokio::select! {
                _ = ctx.cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
            // partial writes are held until the newline arrives
            ctx.stdout.write_str("tick ");
            ctx.stdout.write_str(&format!("{}\n", tick));
        }
        Ok::<_, anyhow::Error>(())
    });

    let options = RunOptions {
        prefix_column_size: Some(11),
        keep_running_after_processes_resolve: false,
    };
    let handle = Scheduler::new(TerminalSurface::stdout())
        .with_options(options)
        .run(vec![host, ticker], CancellationToken::new());

    handle.wait().await?;
    println!("\n✅ Done");

    Ok(())
}
