//! Prompt construction for question generation.

use crate::config::Prompts;
use crate::domain::GenerationRequest;
use crate::util::fill_template;

/// Render the generation prompt. Values are embedded verbatim: no escaping, no truncation.
pub fn build_prompt(prompts: &Prompts, req: &GenerationRequest) -> String {
  let difficulty = req.difficulty.to_string();
  let count = req.count.to_string();
  fill_template(
    &prompts.generation_template,
    &[
      ("num_questions", count.as_str()),
      ("text", req.text.as_str()),
      ("subject", req.subject.as_str()),
      ("tone", difficulty.as_str()),
      ("response_format", prompts.response_format.as_str()),
    ],
  )
}
