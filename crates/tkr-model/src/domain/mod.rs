mod env;
pub use env::{Env, EnvVar};

mod labels;
pub use labels::Labels;

mod duration;
pub use duration::GoDuration;

mod constants;
pub use constants::{
    ANNOTATION_SIDECAR_INJECT, API_VERSION, KIND_PIPELINE_RUN, KIND_TASK_RUN, LABEL_TASK,
    LABEL_TASK_RUN,
};
