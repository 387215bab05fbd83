//! Process exit codes

use ratchet_build::GraphError;
use ratchet_core::{ConfigError, RatchetError};
use ratchet_gate::GateError;

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration, argument or gate definition error
pub const CONFIG_ERROR: i32 = 2;

/// A gate run aborted
pub const ABORTED: i32 = 3;

/// Map a command failure to an exit code
pub fn for_error(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(gate) = cause.downcast_ref::<GateError>() {
            return match gate {
                e if e.is_configuration() => CONFIG_ERROR,
                GateError::Aborted(_) => ABORTED,
                _ => ERROR,
            };
        }
        if cause.is::<ConfigError>() || cause.is::<RatchetError>() || cause.is::<GraphError>() {
            return CONFIG_ERROR;
        }
    }
    ERROR
}
