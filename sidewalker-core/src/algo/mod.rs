pub mod contrast;
pub mod reconcile;

pub use contrast::DuplicateDetector;
pub use reconcile::{ReconcileStats, Reconciler};
