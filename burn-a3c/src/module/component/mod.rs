mod abc;
pub use abc::*;
