pub mod config;
pub mod cutover;
pub mod error;
pub mod facade;
pub mod merge;
pub mod normalize;
pub mod report;
pub mod source;
pub mod vocabulary;

pub use error::ReportError;
pub use facade::ReportFacade;
