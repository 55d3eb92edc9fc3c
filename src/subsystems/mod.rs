pub mod action_server;
pub mod crawler;
pub mod persister;

pub use action_server::ActionServerSubsystem;
pub use crawler::CrawlerSubsystem;
pub use persister::PersistSubsystem;
