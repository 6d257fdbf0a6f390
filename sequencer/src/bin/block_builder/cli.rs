use std::path::PathBuf;

use clap::{Parser, ValueHint};
use sequencer::cli::CliPolicyConfig;

#[derive(Parser)]
#[command(version, about = "Builds capacity-bounded blocks from a recorded candidate pool")]
pub(crate) struct Cli {
    /// JSON file holding the first block's context and the candidates, in
    /// priority order, each with its recorded execution.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub(crate) pool_path: PathBuf,
    /// Emit the trace of every block and check each module's height against
    /// its row counter.
    #[arg(long, default_value_t = false)]
    pub(crate) emit_traces: bool,
    #[clap(flatten)]
    pub(crate) policy: CliPolicyConfig,
}
