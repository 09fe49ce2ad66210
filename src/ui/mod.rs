//! Terminal output for the gorun binaries
//!
//! Everything here writes to stderr: the client's stdout belongs to the
//! program it resolves. Uses `cliclack` when attached to a terminal and
//! plain tagged lines otherwise.

mod context;
mod output;
mod prompts;

pub use context::UiContext;
pub use output::{step_info, step_ok, step_warn};
pub use prompts::confirm;
