//! Background prompt for a post.

use crate::llms::{EngineKind, EngineSelection, GenerationChain, GenerationMode};
use crate::utilities::prompts::image_prompt_request;

const MOOD: &str = "dark, mysterious, moody lighting, cinematic, no text";

/// Scene keyed by words in the post; the philosopher is the default.
pub fn scene_for(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if has(&["chess", "checkmate", "gambit", "pawn"]) {
        "chess match"
    } else if has(&["battle", "war ", "army", "siege"]) {
        "battle scene"
    } else if has(&["soldier", "marine", "mission"]) {
        "modern soldier"
    } else if has(&["warrior", "sparta", "spartan", "shield", "spear"]) {
        "greek warrior"
    } else {
        "greek philosopher"
    }
}

/// Keyword-built prompt used when no model wrote one.
pub fn template_prompt(text: &str) -> String {
    format!("{}, {}", scene_for(text), MOOD)
}

/// Ask the generation chain for one concise SDXL prompt matching `post_text`.
/// Canned fallback output is not an image prompt, so the template is used
/// instead.
pub async fn build_background_prompt(
    chain: &GenerationChain,
    post_text: &str,
    selection: EngineSelection,
) -> String {
    let generation = chain
        .with_max_length(275)
        .generate(&image_prompt_request(post_text), selection, GenerationMode::Tweet)
        .await;
    if generation.engine == EngineKind::Fallback || generation.text.trim().is_empty() {
        return template_prompt(post_text);
    }
    generation.text.lines().next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::llms::TextEngine;

    #[test]
    fn test_scene_keywords() {
        assert_eq!(scene_for("Control the center of the chess board"), "chess match");
        assert_eq!(scene_for("The Spartan shield wall"), "greek warrior");
        assert_eq!(scene_for("Win the war before the battle"), "battle scene");
        assert_eq!(scene_for("Be tolerant with others"), "greek philosopher");
    }

    #[tokio::test]
    async fn test_fallback_engine_uses_template() {
        let chain = GenerationChain::new(Vec::<Arc<dyn TextEngine>>::new(), 220);
        let prompt = build_background_prompt(&chain, "A pawn is a queen in waiting.", EngineSelection::Auto).await;
        assert_eq!(prompt, "chess match, dark, mysterious, moody lighting, cinematic, no text");
    }
}
