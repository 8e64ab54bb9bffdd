pub mod bar;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod reconcile;
pub mod screen;
pub mod screen_eval;
pub mod snapshot;
pub mod window;
