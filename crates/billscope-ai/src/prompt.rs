//! Prompt templates for personalised bill analysis.

use billscope_core::{Chunk, ReaderProfile};

pub const SYSTEM_PROMPT: &str = "\
You are a legislative analyst who explains how a bill personally affects one specific reader.

You are given the bill as numbered paragraphs, each introduced by its id in square brackets \
(for example [p-3]), a JSON profile describing the reader, and optional recent commentary.

Respond ONLY with a JSON array. No markdown fences, no explanation, just raw JSON:
[
  {
    \"category\": \"one of Healthcare, Taxation, Education, Employment, Business, Social Security, Housing, Veterans, General\",
    \"impact\": \"positive\" | \"negative\" | \"neutral\",
    \"severity\": \"low\" | \"medium\" | \"high\",
    \"title\": \"a short headline, under 10 words\",
    \"description\": \"one or two sentences addressed to the reader\",
    \"details\": [\"concrete supporting points\"],
    \"source_chunk_id\": \"the id of the paragraph this finding is drawn from, e.g. p-3\"
  }
]

Only report impacts that plausibly apply to this reader's profile. Cite exactly one paragraph id \
per finding, copied from the input. Return at most 8 findings. \
If nothing in the bill affects the reader, return a single finding with category \"General\".";

/// Result of rendering the user prompt under a size budget.
pub struct UserPrompt {
    pub text: String,
    /// Number of chunks that fit in the budget.
    pub chunks_included: usize,
}

/// Render the user prompt.
///
/// Chunks are appended in order until adding the next one would exceed
/// `max_chars`; at least one chunk is always included.
pub fn build_user_prompt(
    title: &str,
    chunks: &[Chunk],
    profile: &ReaderProfile,
    context: &[String],
    max_chars: usize,
) -> UserPrompt {
    let profile_json = serde_json::to_string_pretty(profile).unwrap_or_else(|_| "{}".to_string());

    let context_block = if context.is_empty() {
        "none".to_string()
    } else {
        context
            .iter()
            .map(|snippet| format!("- {}", snippet.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut text = format!(
        "Bill: {title}\n\
         \n\
         Reader profile:\n\
         {profile_json}\n\
         \n\
         Recent commentary:\n\
         {context_block}\n\
         \n\
         Bill text:\n"
    );

    let mut used = text.chars().count();
    let mut chunks_included = 0;
    for chunk in chunks {
        let block = format!("\n[{}]\n{}\n", chunk.id, chunk.content);
        let block_chars = block.chars().count();
        if chunks_included > 0 && used + block_chars > max_chars {
            break;
        }
        text.push_str(&block);
        used += block_chars;
        chunks_included += 1;
    }

    if chunks_included < chunks.len() {
        text.push_str(&format!(
            "\n[{} further paragraphs omitted for length]\n",
            chunks.len() - chunks_included
        ));
    }

    UserPrompt {
        text,
        chunks_included,
    }
}
