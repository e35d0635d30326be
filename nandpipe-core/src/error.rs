/// Internal error codes.
/// Never crosses the mailbox: the sequencer turns each one into a single status message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdmaError {
    /// Ready/Busy or codec poll ran out
    Timeout,
    /// Program status fail bit
    ProgramFailed,
    /// Erase status fail bit
    EraseFailed,
    /// Codec did not report done for the requested operation
    CodecNotReady,
    /// INIT parameters out of range
    InvalidConfig,
}
