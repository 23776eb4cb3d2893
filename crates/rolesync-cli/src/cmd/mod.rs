pub mod check;
pub mod reconcile;
pub mod serve;
