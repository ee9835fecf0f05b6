//! Entrypoint redirection.
//!
//! Every step is rewritten to run the helper binary, which waits for the previous
//! step's post file, runs the original entrypoint and then writes its own post file.
//! The [`Chain`] models those barriers; the [`EntrypointCache`] supplies entrypoints
//! for steps that rely on their image's default command.
mod cache;
pub use cache::EntrypointCache;

mod chain;
pub use chain::{Barrier, Chain, Link};

/// Directory the helper binary and barrier files live in.
pub const TOOLS_DIR: &str = "/builder/tools";

/// Path of the helper binary inside every step.
pub const ENTRYPOINT_BIN: &str = "/builder/tools/entrypoint";

/// Shell script run by the tool-placement init container.
pub const PLACE_TOOLS_SCRIPT: &str = "if [[ -d /ko-app ]]; then cp /ko-app/entrypoint /builder/tools/entrypoint; else cp /ko-app /builder/tools/entrypoint;  fi;";
