//! Tools
//!
//! Named, schema-constrained capabilities the reasoning loop can invoke.
//! `ToolSet` holds an agent's capabilities as an ordered, collision-free
//! composition; the concrete tools live in the submodules.

mod culinary;
mod market;
mod media;
mod set;
mod site;
mod types;

pub use culinary::{EstimateNutritionTool, FormatRecipeTool, QuotePricingTool};
pub use market::{SearchListingsTool, SearchOrganizationsTool, SearchProvidersTool};
pub use media::{GenerateDocumentTool, GenerateImageTool, GenerateVideoTool};
pub use set::ToolSet;
pub use site::GenerateSiteTool;
pub use types::{
    ConstraintViolation, FieldKind, FieldSpec, InputConstraints, Tool, ToolContext, ToolOutput,
};
