use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use sequencer::config::read_json;
use sequencer::engine::ReplayPool;
use sequencer::{AdmissionController, BlockReport};
use tracing::info;
use zk_tracer::{ColumnarTrace, ModuleId};

use self::block_builder::*;
mod block_builder {
    pub mod cli;
}

/// Checks that emitting the block fills every module with exactly the rows
/// its counter announced.
fn check_emission(report: &BlockReport) -> Result<()> {
    let mut columns = ColumnarTrace::new();
    report
        .trace
        .emit(&mut columns)
        .with_context(|| format!("Failed to emit the trace of block {}", report.block_number))?;
    for id in ModuleId::all() {
        let counted = report.module_counts.get(&id).copied().unwrap_or_default();
        anyhow::ensure!(
            columns.height(id) == counted,
            "block {}: {id} holds {} rows, {} counted",
            report.block_number,
            columns.height(id),
            counted
        );
    }
    info!("block {}: emitted trace matches module counts", report.block_number);
    Ok(())
}

fn main() -> Result<()> {
    sequencer::tracing::init();
    let args = cli::Cli::parse();

    let policy = args.policy.load()?;
    let pool: ReplayPool = read_json(&args.pool_path)?;
    let (first_block, transactions, mut engine) = pool.into_parts();
    info!(
        "building blocks from {} candidates, starting at block {}",
        transactions.len(),
        first_block.number
    );

    let controller = AdmissionController::from_config(policy);
    let reports = controller.drain_pool(transactions, &mut engine, first_block)?;
    if args.emit_traces {
        for report in &reports {
            check_emission(report)?;
        }
    }

    let summaries: Vec<_> = reports.iter().map(BlockReport::summary).collect();
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &summaries)?;
    writeln!(stdout)?;
    Ok(())
}
