//! System-call surface (`spec.md` §4.H, §6).
//!
//! Every entry point here validates its arguments and delegates to a
//! kernel-internal operation, collapsing whatever it returns onto the
//! `0`/payload-on-success, `-1`-on-failure convention `spec.md` §4.H
//! mandates for this surface.

pub mod sys_proc;
pub mod sys_sync;

use crate::proc::process::ProcessError;

/// Argument-validation and process-lifecycle failures this surface can
/// produce before collapsing them to `-1` (`SPEC_FULL.md` §10.4).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SchedError {
    InvalidArgument,
    NoChildren,
    Killed,
    ResourceExhausted,
    Fault,
}
impl From<ProcessError> for SchedError {
    fn from(e: ProcessError) -> SchedError {
        match e {
            ProcessError::MaxProcesses | ProcessError::Allocation => {
                SchedError::ResourceExhausted
            }
            ProcessError::NoChildren => SchedError::NoChildren,
            ProcessError::Killed => SchedError::Killed,
            ProcessError::PageError => SchedError::Fault,
        }
    }
}
