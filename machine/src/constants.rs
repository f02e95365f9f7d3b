/// Machine word. Signed and wide enough that the intermediate products a
/// program computes never overflow silently.
pub type Word = i64;

/// Index into the machine memory.
pub type Address = usize;

/// Slot read back after a run for answer extraction.
pub const RESULT: Address = 0;

/// First conventional patch slot.
pub const NOUN: Address = 1;

/// Second conventional patch slot.
pub const VERB: Address = 2;
