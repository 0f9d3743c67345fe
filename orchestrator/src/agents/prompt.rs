//! Prompt rendering for chat agents.

use anyhow::Result;
use minijinja::{Environment, context};

const DECOMPOSE_TEMPLATE: &str = include_str!("prompts/decompose.md");
const COMPLEXITY_TEMPLATE: &str = include_str!("prompts/complexity.md");
const STEP_TEMPLATE: &str = include_str!("prompts/step.md");

/// Marker that precedes the task description in step prompts.
pub const STEP_MARKER: &str = "Current task to complete:";

/// Template engine wrapper around minijinja.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("decompose", DECOMPOSE_TEMPLATE)?;
        env.add_template("complexity", COMPLEXITY_TEMPLATE)?;
        env.add_template("step", STEP_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render_decompose(&self, description: &str) -> Result<String> {
        let template = self.env.get_template("decompose")?;
        Ok(template.render(context! { description => description.trim() })?)
    }

    pub fn render_complexity(&self, query: &str) -> Result<String> {
        let template = self.env.get_template("complexity")?;
        Ok(template.render(context! { query => query.trim() })?)
    }

    pub fn render_step(&self, description: &str) -> Result<String> {
        let template = self.env.get_template("step")?;
        Ok(template.render(context! { description => description.trim() })?)
    }
}
