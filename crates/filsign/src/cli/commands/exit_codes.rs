//! Process exit codes.
//!
//! Every command maps its outcome onto one of these.

/// Successful operation, or a preview without `--really-do-it`.
pub const EXIT_SUCCESS: i32 = 0;

/// The operation was refused by a precondition or an authorization check.
///
/// Insufficient funds, an unauthorized signer, no matching worker proposal,
/// or a worker change whose epoch has not been reached.
pub const EXIT_REFUSED: i32 = 1;

/// Any other failure (configuration, vault, node, invalid input, etc.).
pub const EXIT_ERROR: i32 = 2;
