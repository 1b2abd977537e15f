//! Orchestration core
//!
//! - `OrchestrationLoop`: drives one user request through reasoning and tool
//!   dispatch rounds until a final answer, the iteration budget or cancellation
//! - system prompt rendering with the database schema as context

mod orchestrator;

pub use orchestrator::{LoopState, OrchestrationLoop};

use tera::{Context, Tera};

/// Built-in system prompt for the data analyst
///
/// Rendered as a Tera template; `schema` holds the schema snapshot text and is
/// empty when schema context is disabled or unavailable.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert in data analysis. You will provide valuable insights for business users based on their requests.
Before responding, ensure the user's query pertains to data analysis on the provided schema, else decline.
If a user requests data, you will build an SQL query based on the user's request for the PostgreSQL database and call the `query_db` tool to fetch data from the database with the correct/relevant query that gives the correct result.
You have access to tools to inspect the database (`list_tables`, `describe_table`, `sample_rows`, `describe_schema`) and to visualize results (`plot_chart`).
Follow these guidelines:
- If you need certain inputs to proceed or are not sure about anything, ask questions, but try to use your intelligence to understand user intention.
- Provide a business-friendly response without technical jargon.
- Provide rich Markdown responses, using tables for data and clear formatting.
- Limit top N queries to 5 and inform the user of the limit.
- Limit results to 10 when users request all records and inform them.
- Ensure SQL queries cast date and numeric columns into readable formats.
{% if schema %}
The database schema is:
{{ schema }}
{% endif %}"#;

/// Render a system prompt template with the schema context
///
/// Templates without any placeholder are returned as-is. Falls back to the raw
/// template if rendering fails.
pub fn render_system_prompt(template: &str, schema: Option<&str>) -> String {
    if !template.contains("{{") && !template.contains("{%") {
        return template.to_string();
    }

    let mut context = Context::new();
    context.insert("schema", schema.unwrap_or(""));

    match Tera::one_off(template, &context, false) {
        Ok(rendered) => rendered.trim_end().to_string(),
        Err(e) => {
            tracing::warn!("Failed to render system prompt template: {}", e);
            template.to_string()
        }
    }
}
