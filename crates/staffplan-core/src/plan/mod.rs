//! Plan management: plan terms, plan file parsing, service layer,
//! materialization.

pub mod materialize;
pub mod parser;
pub mod service;
pub mod terms;
pub mod toml_format;

pub use materialize::{materialize_plan, render_plan_toml};
pub use parser::{PlanParseError, parse_plan_file};
pub use service::{
    AllocationProjection, PlanProjection, create_plan_from_file, delete_plan,
    get_plan_with_allocations, project_plan_file,
};
pub use terms::{PlanTerms, PlanTermsError, PlanTermsPatch};
pub use toml_format::{AllocationToml, PlanFile, PlanMeta};
