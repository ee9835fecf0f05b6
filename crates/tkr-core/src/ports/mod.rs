//! Boundaries between the reconciler and the outside world.
//!
//! Everything the core needs from the cluster, the wall clock, the image registry or a
//! source of randomness goes through one of these traits, so tests can swap in
//! deterministic implementations.
mod client;
pub use client::ClusterClient;

mod clock;
pub use clock::{Clock, FixedClock, SystemClock};

mod inspector;
pub use inspector::ImageInspector;

mod names;
pub use names::{
    NAME_ALPHABET, NameGenerator, RandomNames, SequenceNames, restrict_length_with_prefix,
    restrict_length_with_suffix,
};
