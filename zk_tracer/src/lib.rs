//! Arithmetization of EVM execution into capacity-bounded trace modules.
//!
//! An execution engine reports every step of a transaction to a [`Hub`],
//! which turns each step into [`TraceFragment`]s and counts their rows in the
//! module that owns them. The row counts let a block builder check, before
//! committing a transaction, that the block still fits in every module.

pub mod arithmetic;
pub mod columns;
pub mod error;
pub mod fragment;
pub mod hub;
pub mod module;
pub mod opcode;
pub mod step;
pub mod testing_utils;
pub mod trace;
pub mod transaction;

pub use error::{StepError, TraceError};
pub use fragment::TraceFragment;
pub use hub::{BlockTrace, Hub, HubPhase, TransactionTrace};
pub use module::{LimitsError, ModuleCounts, ModuleId, ModuleLimits};
pub use step::{CallMarker, Step, StepTracer, TxOutcome};
pub use trace::{ColumnarTrace, TraceSink};
pub use transaction::{BlockContext, Transaction};
pub use zk_tracer_common::{Denylist, EncodedWord};

/// Like `#[serde(with = "::hex")]`, but tolerates and emits leading `0x`
/// prefixes
mod hex {
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer, T>(data: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: hex::ToHex,
    {
        let s = data.encode_hex::<String>();
        serializer.serialize_str(&format!("0x{}", s))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T>(deserializer: D) -> Result<T, D::Error>
    where
        T: hex::FromHex,
        T::Error: std::fmt::Display,
    {
        let s = String::deserialize(deserializer)?;
        match s.strip_prefix("0x") {
            Some(rest) => T::from_hex(rest),
            None => T::from_hex(&*s),
        }
        .map_err(D::Error::custom)
    }
}
