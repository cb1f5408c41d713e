//! Error taxonomy for the engine.
//!
//! Only [`EngineError::TransportFatal`] and [`EngineError::Cancelled`] are
//! allowed to escape the driver's per-message loop; everything else is
//! caught, logged, and the loop continues.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("process error in {subsystem}: {source}")]
    Process {
        subsystem: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("transport fatal: {0}")]
    TransportFatal(String),

    #[error("shutdown requested")]
    Cancelled,
}
