pub mod loaders;
pub mod quote;
pub mod stage;

pub use loaders::{load_all_requests, load_request_file};
pub use quote::{
    ApplicantType, BuildingValuation, FixedAnswers, Occupancy, OwnerBuilding, QuoteRequest,
    QuoteSummary, RawFields, ResolvedFieldSet,
};
pub use stage::{Field, Stage};
