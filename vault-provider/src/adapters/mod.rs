/// Gemini-backed [`ModelClient`](vault_extraction::model::ModelClient).
pub mod gemini;
