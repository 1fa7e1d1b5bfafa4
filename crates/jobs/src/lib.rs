pub mod cache_reaper;
pub mod interface_watch;
pub mod runner;

pub use cache_reaper::CacheReaperJob;
pub use interface_watch::InterfaceWatchJob;
pub use runner::JobRunner;
