//! Prompt rendering for the agent's stdin.
//!
//! The rendered text is the agent's whole task description, so it must be a
//! pure function of its inputs.

use std::path::Path;

use minijinja::{Environment, context};

use crate::error::{Error, Result, SchemaRole};

const AGENT_TEMPLATE: &str = include_str!("prompts/agent.md");

/// Inputs for [`render`].
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    pub system_prompt: Option<&'a str>,
    pub input_path: &'a Path,
    pub input_schema: &'a str,
    pub output_path: &'a Path,
    pub output_schema: &'a str,
    /// Advisory model preference; never enforced.
    pub model_hint: Option<&'a str>,
}

/// Render the I/O instructions for an agent.
pub fn render(request: &PromptRequest<'_>) -> Result<String> {
    if request.input_schema.trim().is_empty() {
        return Err(Error::SchemaEmpty {
            role: SchemaRole::Input,
        });
    }
    if request.output_schema.trim().is_empty() {
        return Err(Error::SchemaEmpty {
            role: SchemaRole::Output,
        });
    }

    let mut env = Environment::new();
    env.add_template("agent", AGENT_TEMPLATE)?;
    let template = env.get_template("agent")?;
    let rendered = template.render(context! {
        system_prompt => request.system_prompt.map(str::trim).filter(|s| !s.is_empty()),
        input_path => request.input_path.display().to_string(),
        input_schema => request.input_schema,
        output_path => request.output_path.display().to_string(),
        output_schema => request.output_schema,
        model => request.model_hint.map(str::trim).filter(|s| !s.is_empty()),
    })?;
    Ok(rendered)
}
