mod generic;
mod sync;

pub use generic::GenericError;
pub use sync::SyncError;
