//! Business logic services for the Food Cost Management engine

pub mod catalog;
pub mod deletion;
pub mod duplication;
pub mod editing;
pub mod financial;
pub mod import;
pub mod ledger;
pub mod live_score;
pub mod merge;
pub mod propagation;

pub use catalog::CatalogService;
pub use deletion::DeletionService;
pub use duplication::DuplicationService;
pub use editing::EditingService;
pub use financial::FinancialService;
pub use import::ImportService;
pub use ledger::LedgerService;
pub use live_score::LiveScoreService;
pub use merge::MergeService;
pub use propagation::PropagationService;
