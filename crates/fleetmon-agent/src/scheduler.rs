use crate::assembler::MetricsAssembler;
use crate::delivery::DeliveryClient;
use fleetmon_common::types::{DeliveryPayload, NetworkCheck};
use futures::FutureExt;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drives assemble → send → sleep cycles.
///
/// Cycles never overlap. Cancellation is observed between cycles and while
/// sleeping, so an in-flight delivery always completes.
pub struct Scheduler {
    assembler: MetricsAssembler,
    delivery: DeliveryClient,
    interval: Duration,
}

impl Scheduler {
    pub fn new(assembler: MetricsAssembler, delivery: DeliveryClient, interval: Duration) -> Self {
        Self {
            assembler,
            delivery,
            interval,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!(
            agent_id = %self.assembler.agent_id(),
            interval_secs = self.interval.as_secs(),
            endpoint = %self.delivery.endpoint(),
            "Starting collection loop"
        );

        let mut cycles: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                break;
            }

            cycles += 1;
            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(true) => tracing::debug!(cycle = cycles, "Cycle completed"),
                Ok(false) => tracing::warn!(cycle = cycles, "Cycle ended without delivery"),
                Err(_) => tracing::error!(cycle = cycles, "Collection cycle panicked"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(cycles, "Collection loop stopped");
    }

    /// One assemble → send pass. `true` iff the payload was acknowledged.
    pub async fn run_cycle(&mut self) -> bool {
        let payload = self.assembler.assemble().await.ok();
        self.delivery.send(payload.as_ref()).await
    }

    /// Collect `iterations` times without delivering, writing a report of
    /// each payload to `out`. Sleeps between iterations but not after the
    /// last. Returns the number of successful collections.
    pub async fn run_local<W: Write>(
        &mut self,
        iterations: u32,
        out: &mut W,
    ) -> std::io::Result<u32> {
        tracing::info!(iterations, "Running in local test mode");
        let rule = "=".repeat(60);
        let mut collected = 0;

        for i in 1..=iterations {
            writeln!(out, "\n{rule}\nCollection #{i}/{iterations}\n{rule}")?;
            match self.assembler.assemble().await {
                Ok(payload) => {
                    collected += 1;
                    write_report(out, &payload)?;
                }
                Err(e) => writeln!(out, "\nCollection failed: {e}")?,
            }

            if i < iterations {
                writeln!(out, "\nWaiting {} seconds...", self.interval.as_secs())?;
                out.flush()?;
                tokio::time::sleep(self.interval).await;
            }
        }

        writeln!(out, "\n{rule}\nLocal test completed!\n{rule}")?;
        out.flush()?;
        Ok(collected)
    }
}

fn write_report<W: Write>(out: &mut W, payload: &DeliveryPayload) -> std::io::Result<()> {
    let sys = &payload.system;
    writeln!(out, "\nAgent: {} ({})", payload.agent_name, payload.agent_id)?;
    writeln!(
        out,
        "Time: {}",
        fleetmon_common::types::format_timestamp(&payload.timestamp)
    )?;
    writeln!(out, "\nSystem Metrics:")?;
    writeln!(out, "  CPU: {}%", sys.cpu_percent)?;
    writeln!(out, "  Memory: {}%", sys.memory.percent)?;
    writeln!(out, "  Disk: {}%", sys.disk.percent)?;
    writeln!(out, "\nNetwork Checks:")?;
    for check in &payload.network {
        writeln!(out, "  {}", check_line(check))?;
    }
    Ok(())
}

fn check_line(check: &NetworkCheck) -> String {
    let latency = check
        .latency_ms()
        .map(|ms| format!("{ms}ms"))
        .unwrap_or_else(|| "N/A".to_string());
    match check.error() {
        Some(err) => format!("{} - {} ({latency}, {err})", check.target(), check.status()),
        None => format!("{} - {} ({latency})", check.target(), check.status()),
    }
}
