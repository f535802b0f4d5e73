pub mod domain;
pub mod ports;

pub use domain::{
    sort_for_display, AuthProvider, FeedbackEntry, FeedbackKind, Identity, Trick, TrickDraft,
    TrickLevel, TrickPatch,
};
pub use ports::{Clock, KeyValueStore, PortError, PortResult, SystemClock, TrickRepository};
