//! Prompt text for the generation engines.

/// Phrase every fact post must start with.
pub const FACT_LEADING_PHRASE: &str = "Fun fact:";

/// System prompt for general tweet copy.
pub fn tweet_system_prompt() -> &'static str {
    "You are a social media copywriter. Write a single high-quality tweet \
     under 240 characters, clear, actionable, no hashtags, no emojis."
}

/// System prompt for fact posts.
pub fn fact_system_prompt() -> String {
    format!(
        "You write short, surprising and strictly true facts for social media. \
         Reply with exactly one sentence under 220 characters that begins with \
         \"{}\". No hashtags, no emojis, no preamble.",
        FACT_LEADING_PHRASE
    )
}

/// User prompt asking for one fact about `subject`.
pub fn fact_prompt(subject: &str) -> String {
    format!(
        "Share one little-known, verifiable fact about {}.",
        subject.trim()
    )
}

/// Single-turn transcript used by completion-style endpoints.
pub fn transcript(system: &str, prompt: &str) -> String {
    format!("{}\n\nUser: {}\nAssistant:", system, prompt.trim())
}

/// Instruction asking an engine for an image-model prompt matching a post.
pub fn image_prompt_request(post_text: &str) -> String {
    format!(
        "Give ONE concise SDXL image prompt (<=50 tokens). \
         Match this tweet's idea with ONE of: greek philosopher, greek warrior, \
         modern soldier, battle scene, chess match. \
         Vibe: dark, mysterious, moody lighting. NO TEXT IN IMAGE. \
         Return ONLY the prompt, no quotes, no commentary.\n\nTweet: {}",
        post_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_prompts_mention_subject_and_phrase() {
        assert!(fact_prompt("  octopuses ").ends_with("about octopuses."));
        assert!(fact_system_prompt().contains(FACT_LEADING_PHRASE));
    }

    #[test]
    fn test_transcript_shape() {
        let t = transcript("SYS", " hello ");
        assert_eq!(t, "SYS\n\nUser: hello\nAssistant:");
    }
}
