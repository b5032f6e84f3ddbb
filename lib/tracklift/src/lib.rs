pub mod config;
pub mod error;
pub mod ledger;
pub mod runner;
pub mod sanitize;
pub mod scheduler;
pub mod services;
pub mod spotify;
pub mod traits;
pub mod worker;
pub mod ytdlp;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::RunConfig;
pub use ledger::FailureLedger;
pub use runner::PlaylistRunner;
pub use scheduler::BatchScheduler;
pub use services::{Services, ServicesBuilder};
pub use traits::{AudioFetcher, CatalogResolver, FetchOutput};
pub use worker::AcquisitionWorker;
