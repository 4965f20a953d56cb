pub mod parameter_store;
pub mod state;

pub use parameter_store::{
    GradientSyncMode, ParameterStore, ParameterStoreConfig, SyncStatistics, UpdateSession,
};
pub use state::{SharedTrainingState, SharedTrainingStateHandle};
