//! Base culinary tools
//!
//! The text-only capabilities every agent tier carries: recipe
//! formatting, nutrition estimation and pricing quotes. All three render
//! through the text-generation collaborator; a collaborator failure
//! degrades to a fallback message instead of an error, so the reasoning
//! loop treats failed and successful invocations uniformly.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::clients::TextGenerator;
use crate::error::Result;

use super::types::{FieldKind, FieldSpec, InputConstraints, Tool, ToolContext, ToolOutput};

fn str_field<'a>(input: &'a Value, name: &str) -> &'a str {
    input.get(name).and_then(Value::as_str).unwrap_or_default()
}

/// Formats a rough recipe into a clean, stepwise presentation.
pub struct FormatRecipeTool {
    generator: Arc<dyn TextGenerator>,
}

impl FormatRecipeTool {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for FormatRecipeTool {
    fn name(&self) -> &str {
        "format_recipe"
    }

    fn description(&self) -> &str {
        "Format a raw recipe into a clean presentation with ingredients and numbered steps"
    }

    fn constraints(&self) -> InputConstraints {
        InputConstraints::new(vec![
            FieldSpec {
                name: "recipe",
                kind: FieldKind::String,
                required: true,
                description: "The raw recipe text to format",
            },
            FieldSpec {
                name: "style",
                kind: FieldKind::String,
                required: false,
                description: "Presentation style, e.g. 'card' or 'long-form'",
            },
        ])
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let recipe = str_field(&input, "recipe");
        let style = str_field(&input, "style");
        let prompt = if style.is_empty() {
            format!(
                "Format this recipe with an ingredient list and numbered steps:\n\n{}",
                recipe
            )
        } else {
            format!(
                "Format this recipe in {} style with an ingredient list and numbered steps:\n\n{}",
                style, recipe
            )
        };
        match self.generator.generate_text(&prompt).await {
            Ok(text) => Ok(ToolOutput::text(text)),
            Err(e) => {
                warn!(tool = self.name(), error = %e, "text generation failed");
                Ok(ToolOutput::fallback(
                    "The recipe could not be formatted right now; here it is as provided:\n\n"
                        .to_string()
                        + recipe,
                ))
            }
        }
    }
}

/// Estimates per-serving nutrition facts for an ingredient list.
pub struct EstimateNutritionTool {
    generator: Arc<dyn TextGenerator>,
}

impl EstimateNutritionTool {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for EstimateNutritionTool {
    fn name(&self) -> &str {
        "estimate_nutrition"
    }

    fn description(&self) -> &str {
        "Estimate calories and macronutrients per serving from an ingredient list"
    }

    fn constraints(&self) -> InputConstraints {
        InputConstraints::new(vec![
            FieldSpec {
                name: "ingredients",
                kind: FieldKind::String,
                required: true,
                description: "Ingredient list with quantities",
            },
            FieldSpec {
                name: "servings",
                kind: FieldKind::Integer,
                required: false,
                description: "Number of servings the quantities cover (default 1)",
            },
        ])
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let ingredients = str_field(&input, "ingredients");
        let servings = input.get("servings").and_then(Value::as_i64).unwrap_or(1);
        let prompt = format!(
            "Estimate calories, protein, carbohydrates and fat per serving \
             ({} servings total) for:\n\n{}",
            servings, ingredients
        );
        match self.generator.generate_text(&prompt).await {
            Ok(text) => Ok(ToolOutput::text(text)),
            Err(e) => {
                warn!(tool = self.name(), error = %e, "text generation failed");
                Ok(ToolOutput::fallback(
                    "Nutrition facts are unavailable right now. Please try again shortly.",
                ))
            }
        }
    }
}

/// Produces an indicative price quote for a list of items.
pub struct QuotePricingTool {
    generator: Arc<dyn TextGenerator>,
}

impl QuotePricingTool {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for QuotePricingTool {
    fn name(&self) -> &str {
        "quote_pricing"
    }

    fn description(&self) -> &str {
        "Produce an indicative price quote for a list of items or services"
    }

    fn constraints(&self) -> InputConstraints {
        InputConstraints::new(vec![
            FieldSpec {
                name: "items",
                kind: FieldKind::String,
                required: true,
                description: "Items or services to quote, one per line",
            },
            FieldSpec {
                name: "region",
                kind: FieldKind::String,
                required: false,
                description: "Market region the quote applies to",
            },
        ])
    }

    async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let items = str_field(&input, "items");
        let region = str_field(&input, "region");
        let prompt = if region.is_empty() {
            format!("Give an indicative price quote, itemized, for:\n\n{}", items)
        } else {
            format!(
                "Give an indicative price quote, itemized, for the {} market:\n\n{}",
                region, items
            )
        };
        match self.generator.generate_text(&prompt).await {
            Ok(text) => Ok(ToolOutput::text(text)),
            Err(e) => {
                warn!(tool = self.name(), error = %e, "text generation failed");
                Ok(ToolOutput::fallback(
                    "Pricing is unavailable right now. Please try again shortly.",
                ))
            }
        }
    }
}
