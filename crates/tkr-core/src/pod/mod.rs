//! Execution-unit construction.
mod builder;
pub use builder::{
    CREDS_INIT_COMMAND, HOME_DIR, NOP_CONTAINER, NOP_ENTRYPOINT, PodBuilder, STEP_PREFIX,
};

pub mod credentials;
pub use credentials::Credentials;
