//! Agent definitions and registry
//!
//! Three fixed tiers, each a superset of the one below:
//!
//! - `sous` — culinary text tools only
//! - `studio` — sous plus media and site generation
//! - `market` — studio plus marketplace search
//!
//! Tier composition is a static union expression over tool sets, built
//! once at startup; a name collision anywhere in a union aborts startup.
//! Agents whose collaborators are not configured are excluded from the
//! registry with an error log and resolve like unknown ids.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use crate::clients::{ListingSearch, MediaGenerator, SitePublisher, TextGenerator};
use crate::config::Config;
use crate::error::{Result, SavoraError};
use crate::tools::{
    EstimateNutritionTool, FormatRecipeTool, GenerateDocumentTool, GenerateImageTool,
    GenerateSiteTool, GenerateVideoTool, QuotePricingTool, SearchListingsTool,
    SearchOrganizationsTool, SearchProvidersTool, ToolSet,
};

/// Collaborator handles shared by every agent, created once at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub text: Arc<dyn TextGenerator>,
    pub media: Arc<dyn MediaGenerator>,
    pub sites: Arc<dyn SitePublisher>,
    pub search: Arc<dyn ListingSearch>,
}

/// One agent: an id, a standing instruction and a fixed tool set.
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub instruction: String,
    pub tools: ToolSet,
}

/// Static, resolve-only agent table.
pub struct AgentRegistry {
    agents: Vec<AgentDefinition>,
    index: HashMap<String, usize>,
}

fn base_tools(c: &Collaborators) -> Result<ToolSet> {
    ToolSet::from_tools(vec![
        Arc::new(FormatRecipeTool::new(c.text.clone())),
        Arc::new(EstimateNutritionTool::new(c.text.clone())),
        Arc::new(QuotePricingTool::new(c.text.clone())),
    ])
}

fn creative_tools(c: &Collaborators) -> Result<ToolSet> {
    ToolSet::from_tools(vec![
        Arc::new(GenerateImageTool::new(c.media.clone())),
        Arc::new(GenerateVideoTool::new(c.media.clone())),
        Arc::new(GenerateDocumentTool::new(c.media.clone())),
        Arc::new(GenerateSiteTool::new(c.sites.clone())),
    ])
}

fn marketplace_tools(c: &Collaborators, max_results: usize) -> Result<ToolSet> {
    ToolSet::from_tools(vec![
        Arc::new(SearchListingsTool::new(c.search.clone(), max_results)),
        Arc::new(SearchOrganizationsTool::new(c.search.clone(), max_results)),
        Arc::new(SearchProvidersTool::new(c.search.clone(), max_results)),
    ])
}

const SOUS_INSTRUCTION: &str = "You are a culinary assistant. Help with recipes, \
nutrition and pricing. Use your tools for anything they cover instead of answering \
from memory.";

const STUDIO_INSTRUCTION: &str = "You are a culinary studio assistant. Besides \
recipes, nutrition and pricing you can generate images, video clips, documents and \
one-page sites. Use your tools for anything they cover instead of answering from \
memory.";

const MARKET_INSTRUCTION: &str = "You are a culinary marketplace assistant. Besides \
recipes, nutrition, pricing and media generation you can search marketplace \
listings, organizations and service providers. Use your tools for anything they \
cover instead of answering from memory.";

impl AgentRegistry {
    /// Build the registry from configuration.
    ///
    /// Tool-name collisions in a tier union are fatal. Missing collaborator
    /// credentials are not: the affected tiers are excluded and logged.
    pub fn build(config: &Config, collaborators: &Collaborators) -> Result<Self> {
        let mut agents = Vec::new();

        if !config.model_serviceable() {
            error!("model API key missing; no agents are serviceable");
            return Ok(Self::from_agents(agents));
        }

        let base = base_tools(collaborators)?;
        agents.push(AgentDefinition {
            id: "sous".to_string(),
            name: "Sous".to_string(),
            description: "Recipes, nutrition and pricing".to_string(),
            instruction: SOUS_INSTRUCTION.to_string(),
            tools: base.clone(),
        });

        if config.generation_serviceable() {
            let creative = base.union(&creative_tools(collaborators)?)?;
            agents.push(AgentDefinition {
                id: "studio".to_string(),
                name: "Studio".to_string(),
                description: "Sous plus media and site generation".to_string(),
                instruction: STUDIO_INSTRUCTION.to_string(),
                tools: creative.clone(),
            });

            let market = creative.union(&marketplace_tools(
                collaborators,
                config.marketplace.max_results,
            )?)?;
            agents.push(AgentDefinition {
                id: "market".to_string(),
                name: "Market".to_string(),
                description: "Studio plus marketplace search".to_string(),
                instruction: MARKET_INSTRUCTION.to_string(),
                tools: market,
            });
        } else {
            error!("generation API key missing; excluding agents: studio, market");
        }

        info!(
            agents = agents.len(),
            "agent registry built: {}",
            agents
                .iter()
                .map(|a| a.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self::from_agents(agents))
    }

    fn from_agents(agents: Vec<AgentDefinition>) -> Self {
        let index = agents
            .iter()
            .enumerate()
            .map(|(i, agent)| (agent.id.clone(), i))
            .collect();
        Self { agents, index }
    }

    /// Look up an agent by id.
    pub fn resolve(&self, id: &str) -> Result<&AgentDefinition> {
        self.index
            .get(id)
            .map(|&i| &self.agents[i])
            .ok_or_else(|| SavoraError::AgentNotFound(id.to_string()))
    }

    /// All serviceable agents, in tier order.
    pub fn list(&self) -> &[AgentDefinition] {
        &self.agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{
        MockListingSearch, MockMediaGenerator, MockSitePublisher, MockTextGenerator,
    };

    fn mock_collaborators() -> Collaborators {
        Collaborators {
            text: Arc::new(MockTextGenerator::new()),
            media: Arc::new(MockMediaGenerator::new()),
            sites: Arc::new(MockSitePublisher::new()),
            search: Arc::new(MockListingSearch::new()),
        }
    }

    fn full_config() -> Config {
        let mut config = Config::default();
        config.model.api_key = Some("mk".to_string());
        config.generation.api_key = Some("gk".to_string());
        config
    }

    #[test]
    fn test_tiers_nest() {
        let registry = AgentRegistry::build(&full_config(), &mock_collaborators()).unwrap();
        let sous = registry.resolve("sous").unwrap();
        let studio = registry.resolve("studio").unwrap();
        let market = registry.resolve("market").unwrap();

        assert_eq!(sous.tools.len(), 3);
        assert_eq!(studio.tools.len(), 7);
        assert_eq!(market.tools.len(), 10);
        for name in sous.tools.names() {
            assert!(studio.tools.has(name));
            assert!(market.tools.has(name));
        }
        for name in studio.tools.names() {
            assert!(market.tools.has(name));
        }
    }

    #[test]
    fn test_union_preserves_base_order() {
        let registry = AgentRegistry::build(&full_config(), &mock_collaborators()).unwrap();
        let market = registry.resolve("market").unwrap();
        let names = market.tools.names();
        assert_eq!(names[0], "format_recipe");
        assert_eq!(names[3], "generate_image");
        assert_eq!(names[9], "search_providers");
    }

    #[test]
    fn test_unknown_agent_not_found() {
        let registry = AgentRegistry::build(&full_config(), &mock_collaborators()).unwrap();
        assert!(matches!(
            registry.resolve("chef"),
            Err(SavoraError::AgentNotFound(_))
        ));
    }

    #[test]
    fn test_missing_generation_key_excludes_upper_tiers() {
        let mut config = full_config();
        config.generation.api_key = None;
        let registry = AgentRegistry::build(&config, &mock_collaborators()).unwrap();
        assert!(registry.resolve("sous").is_ok());
        assert!(registry.resolve("studio").is_err());
        assert!(registry.resolve("market").is_err());
    }

    #[test]
    fn test_missing_model_key_empties_registry() {
        let mut config = full_config();
        config.model.api_key = None;
        let registry = AgentRegistry::build(&config, &mock_collaborators()).unwrap();
        assert!(registry.list().is_empty());
    }
}
