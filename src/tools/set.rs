//! Ordered tool set
//!
//! An agent owns an ordered, name-unique collection of tools. Unlike a
//! replace-on-collision registry, inserting a duplicate name here is an
//! error: tier composition must fail fast at startup, because a silent
//! collision would make the reasoning loop's tool selection ambiguous.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SavoraError};
use crate::model::ToolSchema;

use super::{Tool, ToolContext, ToolOutput};

/// An ordered set of tools with unique names.
///
/// Order is insertion order and is preserved through unions, so the schema
/// list sent to the model is stable and auditable.
///
/// # Example
///
/// ```
/// use savora::tools::ToolSet;
/// # use async_trait::async_trait;
/// # use serde_json::Value;
/// # use savora::tools::{Tool, ToolContext, ToolOutput, InputConstraints};
/// # use savora::error::Result;
/// # struct PingTool;
/// # #[async_trait]
/// # impl Tool for PingTool {
/// #     fn name(&self) -> &str { "ping" }
/// #     fn description(&self) -> &str { "Replies with pong" }
/// #     fn constraints(&self) -> InputConstraints { InputConstraints::none() }
/// #     async fn invoke(&self, _input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
/// #         Ok(ToolOutput::text("pong"))
/// #     }
/// # }
///
/// let mut set = ToolSet::new();
/// set.insert(std::sync::Arc::new(PingTool)).unwrap();
/// assert!(set.has("ping"));
/// // Re-inserting the same name fails instead of silently replacing
/// assert!(set.insert(std::sync::Arc::new(PingTool)).is_err());
/// ```
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

// Derive can't see through `dyn Tool`; the names are what matter anyway.
impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}

impl ToolSet {
    /// Create a new empty tool set.
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a tool, rejecting duplicate names.
    pub fn insert(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(SavoraError::Composition(format!(
                "duplicate tool name: {}",
                name
            )));
        }
        debug!(tool = %name, "Adding tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Build a set from a list of tools, failing on any duplicate name.
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        let mut set = Self::new();
        for tool in tools {
            set.insert(tool)?;
        }
        Ok(set)
    }

    /// Compose `base ∪ extra`, preserving relative order (base first).
    ///
    /// Fails if the union contains two tools with the same name. This is the
    /// tier-composition primitive: capability escalation between agent tiers
    /// is this one expression.
    pub fn union(&self, extra: &ToolSet) -> Result<ToolSet> {
        let mut merged = self.clone();
        for tool in &extra.tools {
            merged.insert(Arc::clone(tool))?;
        }
        Ok(merged)
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Check if a tool with the given name exists.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Number of tools in the set.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterate over the tools in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    /// Render the tool schemas for the model client, in set order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.constraints().to_schema(),
            })
            .collect()
    }

    /// Validate `input` for the named tool without invoking it.
    ///
    /// Returns the violation list so the reasoning loop can inform the model
    /// precisely which constraint failed.
    pub fn validate(
        &self,
        name: &str,
        input: &Value,
    ) -> std::result::Result<(), Vec<super::ConstraintViolation>> {
        match self.get(name) {
            Some(tool) => tool.constraints().validate(input),
            None => Err(vec![super::ConstraintViolation {
                field: "<tool>".to_string(),
                message: format!("unknown tool: {}", name),
            }]),
        }
    }

    /// Invoke the named tool. The caller is expected to have validated input.
    ///
    /// Unknown tool names degrade to a fallback output rather than an error:
    /// from the loop's perspective a model hallucinating a tool name is the
    /// same shape as a tool that could not produce its real result.
    pub async fn invoke(&self, name: &str, input: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let tool = match self.get(name) {
            Some(t) => t,
            None => {
                return Ok(ToolOutput::fallback(format!(
                    "The capability \"{}\" is not available.",
                    name
                )));
            }
        };

        let start = std::time::Instant::now();
        let result = tool.invoke(input, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(output) => {
                debug!(
                    tool = name,
                    duration_ms,
                    fallback = output.is_fallback,
                    "Tool invoked"
                );
            }
            Err(e) => {
                tracing::error!(tool = name, duration_ms, error = %e, "Tool invocation failed");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{InputConstraints, FieldKind, FieldSpec};
    use async_trait::async_trait;
    use serde_json::json;

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn constraints(&self) -> InputConstraints {
            InputConstraints::new(vec![FieldSpec {
                name: "query",
                kind: FieldKind::String,
                required: true,
                description: "q",
            }])
        }
        async fn invoke(&self, input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
            Ok(ToolOutput::text(format!(
                "{}: {}",
                self.0,
                input["query"].as_str().unwrap_or("")
            )))
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut set = ToolSet::new();
        set.insert(Arc::new(NamedTool("alpha"))).unwrap();
        set.insert(Arc::new(NamedTool("beta"))).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.has("alpha"));
        assert!(set.get("beta").is_some());
        assert!(set.get("gamma").is_none());
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let mut set = ToolSet::new();
        set.insert(Arc::new(NamedTool("alpha"))).unwrap();
        let err = set.insert(Arc::new(NamedTool("alpha"))).unwrap_err();
        assert!(matches!(err, SavoraError::Composition(_)));
        assert!(err.to_string().contains("alpha"));
        // The set is unchanged
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_order_preserved() {
        let set = ToolSet::from_tools(vec![
            Arc::new(NamedTool("c")),
            Arc::new(NamedTool("a")),
            Arc::new(NamedTool("b")),
        ])
        .unwrap();
        assert_eq!(set.names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_union_preserves_order() {
        let base = ToolSet::from_tools(vec![
            Arc::new(NamedTool("one")) as Arc<dyn Tool>,
            Arc::new(NamedTool("two")),
        ])
        .unwrap();
        let extra = ToolSet::from_tools(vec![Arc::new(NamedTool("three")) as Arc<dyn Tool>]).unwrap();

        let merged = base.union(&extra).unwrap();
        assert_eq!(merged.names(), vec!["one", "two", "three"]);
        // Inputs untouched
        assert_eq!(base.len(), 2);
        assert_eq!(extra.len(), 1);
    }

    #[test]
    fn test_union_duplicate_fails() {
        let base = ToolSet::from_tools(vec![Arc::new(NamedTool("search")) as Arc<dyn Tool>]).unwrap();
        let extra =
            ToolSet::from_tools(vec![Arc::new(NamedTool("search")) as Arc<dyn Tool>]).unwrap();

        let err = base.union(&extra).unwrap_err();
        assert!(matches!(err, SavoraError::Composition(_)));
        assert!(err.to_string().contains("search"));
    }

    #[test]
    fn test_debug_shows_tool_names() {
        let set = ToolSet::from_tools(vec![
            Arc::new(NamedTool("alpha")) as Arc<dyn Tool>,
            Arc::new(NamedTool("beta")),
        ])
        .unwrap();
        let rendered = format!("{:?}", set);
        assert!(rendered.contains("alpha"));
        assert!(rendered.contains("beta"));
    }

    #[test]
    fn test_schemas_in_order() {
        let set = ToolSet::from_tools(vec![
            Arc::new(NamedTool("z")) as Arc<dyn Tool>,
            Arc::new(NamedTool("a")),
        ])
        .unwrap();
        let schemas = set.schemas();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].name, "z");
        assert_eq!(schemas[1].name, "a");
        assert_eq!(schemas[0].input_schema["type"], "object");
    }

    #[test]
    fn test_validate_known_and_unknown() {
        let set = ToolSet::from_tools(vec![Arc::new(NamedTool("alpha")) as Arc<dyn Tool>]).unwrap();

        assert!(set.validate("alpha", &json!({"query": "x"})).is_ok());
        assert!(set.validate("alpha", &json!({})).is_err());

        let violations = set.validate("missing", &json!({})).unwrap_err();
        assert!(violations[0].message.contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_invoke() {
        let set = ToolSet::from_tools(vec![Arc::new(NamedTool("alpha")) as Arc<dyn Tool>]).unwrap();
        let out = set
            .invoke("alpha", json!({"query": "soup"}), &ToolContext::new())
            .await
            .unwrap();
        assert_eq!(out.text, "alpha: soup");
    }

    #[tokio::test]
    async fn test_invoke_unknown_is_fallback() {
        let set = ToolSet::new();
        let out = set
            .invoke("ghost", json!({}), &ToolContext::new())
            .await
            .unwrap();
        assert!(out.is_fallback);
        assert!(out.text.contains("ghost"));
    }
}
