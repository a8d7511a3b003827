// Resume-to-vacancy matching: request validation, prompt text and the output boundary.
// All model calls go through llm_client — no direct provider calls here.

pub mod handlers;
pub mod prompts;
pub mod result;
