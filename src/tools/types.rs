//! Tool types for Savora
//!
//! Defines the `Tool` trait that all tools implement, the declared input
//! constraints a tool's arguments are validated against before invocation,
//! and the `ToolContext` passed through from the request.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// The primitive type a tool input field must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl FieldKind {
    /// JSON Schema type name for this kind.
    pub fn schema_type(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Boolean => value.is_boolean(),
        }
    }
}

/// One declared input field of a tool.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name as it appears in the input object
    pub name: &'static str,
    /// Primitive type the field must carry
    pub kind: FieldKind,
    /// Whether the field must be present
    pub required: bool,
    /// Description surfaced to the reasoning model
    pub description: &'static str,
}

/// A violated input constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// The offending field
    pub field: String,
    /// What went wrong
    pub message: String,
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The closed, explicit input schema of one tool.
///
/// Validation is a pure function from an input value to either unit or the
/// list of violated constraints; it never touches the tool itself, so a call
/// that fails validation is never invoked.
///
/// # Example
///
/// ```
/// use savora::tools::{InputConstraints, FieldSpec, FieldKind};
/// use serde_json::json;
///
/// let constraints = InputConstraints::new(vec![FieldSpec {
///     name: "query",
///     kind: FieldKind::String,
///     required: true,
///     description: "Search query",
/// }]);
///
/// assert!(constraints.validate(&json!({"query": "rye bread"})).is_ok());
/// assert!(constraints.validate(&json!({})).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct InputConstraints {
    fields: Vec<FieldSpec>,
}

impl InputConstraints {
    /// Create a constraint set from its field specs.
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// An empty constraint set (tool takes no arguments).
    pub fn none() -> Self {
        Self { fields: Vec::new() }
    }

    /// The declared fields.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Validate an input value against the declared fields.
    ///
    /// Unknown fields are tolerated (forward compatibility with a model that
    /// over-specifies); missing required fields and type mismatches are not.
    pub fn validate(&self, input: &Value) -> std::result::Result<(), Vec<ConstraintViolation>> {
        let mut violations = Vec::new();

        let obj = match input.as_object() {
            Some(obj) => obj,
            None => {
                return Err(vec![ConstraintViolation {
                    field: "<input>".to_string(),
                    message: "expected a JSON object".to_string(),
                }]);
            }
        };

        for spec in &self.fields {
            match obj.get(spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        violations.push(ConstraintViolation {
                            field: spec.name.to_string(),
                            message: "required field is missing".to_string(),
                        });
                    }
                }
                Some(value) => {
                    if !spec.kind.matches(value) {
                        violations.push(ConstraintViolation {
                            field: spec.name.to_string(),
                            message: format!("expected {}", spec.kind.schema_type()),
                        });
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Render the constraints as a JSON Schema object for the model client.
    pub fn to_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for spec in &self.fields {
            properties.insert(
                spec.name.to_string(),
                serde_json::json!({
                    "type": spec.kind.schema_type(),
                    "description": spec.description,
                }),
            );
            if spec.required {
                required.push(Value::String(spec.name.to_string()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// The text result of one tool invocation.
///
/// Tools absorb their own collaborator failures: an invocation that cannot
/// produce its real output returns a user-presentable fallback text instead
/// of an error, so downstream stages treat success and failure uniformly.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// The rendered output text; may embed marker blocks for structured
    /// payloads (images, sites, listings, ...)
    pub text: String,
    /// Whether this is a degraded fallback rather than the real result
    pub is_fallback: bool,
}

impl ToolOutput {
    /// A successful result.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            is_fallback: false,
        }
    }

    /// A user-presentable fallback after an internal failure.
    pub fn fallback(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            is_fallback: true,
        }
    }
}

/// Trait that all tools implement.
///
/// Tools are named, schema-constrained functions the reasoning loop can
/// invoke. They own no cross-request state; collaborators they need are
/// injected at construction and used exclusively for the duration of one
/// invocation.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use savora::tools::{Tool, ToolContext, ToolOutput, InputConstraints};
/// use savora::error::Result;
///
/// struct PingTool;
///
/// #[async_trait]
/// impl Tool for PingTool {
///     fn name(&self) -> &str { "ping" }
///     fn description(&self) -> &str { "Replies with pong" }
///     fn constraints(&self) -> InputConstraints { InputConstraints::none() }
///     async fn invoke(&self, _input: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
///         Ok(ToolOutput::text("pong"))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool name, unique within its owning agent.
    fn name(&self) -> &str;

    /// Description sent to the reasoning model.
    fn description(&self) -> &str;

    /// The declared input constraints, validated before invocation.
    fn constraints(&self) -> InputConstraints;

    /// Execute the tool with validated input.
    ///
    /// Implementations should only return `Err` for programming errors;
    /// collaborator failures are absorbed into `ToolOutput::fallback`.
    async fn invoke(&self, input: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// Context provided to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The agent handling the request
    pub agent_id: Option<String>,
    /// The conversation thread the request belongs to
    pub thread_id: Option<String>,
}

impl ToolContext {
    /// Create a new empty tool context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the agent and thread identifiers.
    ///
    /// # Example
    /// ```
    /// use savora::tools::ToolContext;
    ///
    /// let ctx = ToolContext::new().with_request("market", "web:visitor-1");
    /// assert_eq!(ctx.agent_id.as_deref(), Some("market"));
    /// assert_eq!(ctx.thread_id.as_deref(), Some("web:visitor-1"));
    /// ```
    pub fn with_request(mut self, agent_id: &str, thread_id: &str) -> Self {
        self.agent_id = Some(agent_id.to_string());
        self.thread_id = Some(thread_id.to_string());
        self
    }
}
