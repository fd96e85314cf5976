pub mod legacy;
pub mod next_gen;
pub mod service_client;

pub use legacy::LegacyReportClient;
pub use next_gen::NextGenReportClient;
pub use service_client::ServiceClient;
