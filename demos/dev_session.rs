//! Run a few shell commands side by side, like a small dev environment
//!
//! Run with: cargo run --example dev_session

use anyhow::Result;
use muxrun::{CancellationToken, CommandSpec, EventHub, EventKind, RunEvent, Scheduler, TerminalSurface};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    println!("🚀 Starting muxrun dev session\n");

    let processes = vec![
        CommandSpec::new("database", "for i in 1 2 3; do echo \"migration $i applied\"; sleep 0.2; done"),
        CommandSpec::new("backend", "sleep 0.3; echo listening on :3000; echo 'slow query' 1>&2"),
        CommandSpec::new("frontend", "echo compiling; sleep 0.5; echo ready in 512ms"),
    ];

    let events = EventHub::new();
    let _started = events.on(EventKind::ProcessStarted, |event| {
        if let RunEvent::ProcessStarted { label } = event {
            eprintln!("  ⚙  {} started", label);
        }
    });
    let _settled = events.on(EventKind::ProcessSettled, |event| {
        if let RunEvent::ProcessSettled { label, error } = event {
            match error {
                None => eprintln!("  ✓  {} finished", label),
                Some(e) => eprintln!("  ✗  {} failed: {}", label, e),
            }
        }
    });

    let handle = Scheduler::new(TerminalSurface::stdout())
        .with_events(events)
        .run(
            processes.into_iter().map(CommandSpec::into_descriptor).collect(),
            CancellationToken::new(),
        );

    match handle.wait().await {
        Ok(()) => println!("\n✅ All processes finished"),
        Err(e) => println!("\n❌ {} failed: {}", e.label(), e),
    }

    Ok(())
}
