mod batch_recall_service;

pub use batch_recall_service::{
    BatchRecallService, BatchRecallServiceDependencies, HistoryFetchPolicy,
};
