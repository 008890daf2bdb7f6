//! Post copy and image prompt generation.

use tracing::{error, info, warn};

use crate::ingest::truncate_chars;
use crate::ingest::types::Article;
use crate::oracle::TextOracle;

const MAX_CONTEXT_ARTICLES: usize = 5;
const CONTEXT_SUMMARY_CHARS: usize = 200;
const IMAGE_PROMPT_POST_CHARS: usize = 500;

pub const IMAGE_PROMPT_SUFFIX: &str = " | Full-bleed edge-to-edge composition, no borders, no white background, immersive cinematic quality, professional LinkedIn banner style.";

pub fn build_post_prompt(topic: &str, articles: &[Article], hashtags: &[String]) -> String {
    let article_summaries = articles
        .iter()
        .take(MAX_CONTEXT_ARTICLES)
        .map(|a| format!("- {}: {}", a.title, truncate_chars(&a.summary, CONTEXT_SUMMARY_CHARS)))
        .collect::<Vec<_>>()
        .join("\n");
    let hashtags = hashtags.join(" ");

    format!(
        "You are an AI thought leader and technical influencer on LinkedIn. Create an engaging, technical post about the latest AI innovation.

Topic: {topic}

Recent technical developments and research:
{article_summaries}

Create a LinkedIn post that:
- Starts with a compelling hook about the technical breakthrough or innovation
- Explains the core technical concept in an accessible way (without dumbing it down)
- Highlights why this innovation matters (real-world implications, potential applications)
- Includes 2-3 specific technical insights or key findings
- Demonstrates deep understanding while remaining engaging
- Ends with a thought-provoking question to encourage discussion
- Uses these hashtags: {hashtags}
- Length: 250-350 words
- Tone: Expert thought leader sharing insights with peers

Focus on NEW research, breakthroughs and innovations with technical depth and a forward-looking perspective.
Avoid event announcements, marketing content, hype without substance and excessive emojis.

Write in first person, as if you're sharing exciting findings with your professional network."
    )
}

/// Ask the oracle for the post body. `None` when it yields nothing usable.
pub async fn generate_post(
    oracle: &dyn TextOracle,
    topic: &str,
    articles: &[Article],
    hashtags: &[String],
) -> Option<String> {
    let prompt = build_post_prompt(topic, articles, hashtags);
    match oracle.generate(&prompt).await {
        Some(text) if !text.trim().is_empty() => {
            let text = text.trim().to_string();
            info!(chars = text.chars().count(), "post generated");
            Some(text)
        }
        _ => {
            error!(provider = oracle.provider_name(), "failed to generate post content");
            None
        }
    }
}

pub fn build_image_prompt_request(topic: &str, post: &str) -> String {
    let post = truncate_chars(post, IMAGE_PROMPT_POST_CHARS);
    format!(
        "You are an expert at creating LinkedIn-optimized image generation prompts for AI and technology content that drives professional engagement.

Given this LinkedIn post topic and content, create a detailed, specific image generation prompt that will produce a compelling, business-professional visual that enhances understanding of the concept.

Topic: {topic}

Post Content:
{post}

Requirements:
- Full-frame 16:9 composition with NO borders, NO white backgrounds, NO frames
- Visual metaphors and abstract structures that illustrate the core AI concept
- Sophisticated palette: deep navy, professional blue, silver and white with strategic accents
- Corporate presentation quality with a clean visual hierarchy
- NO text, words, letters or typography

Create an image that a business executive would proudly share, that visually explains {topic} through sophisticated conceptual illustration.

Return ONLY the optimized image generation prompt."
    )
}

pub fn fallback_image_prompt(topic: &str) -> String {
    format!(
        "A stunning hyperrealistic 3D render representing {topic}.
Full-frame composition with edge-to-edge content, NO white background, NO borders.
Futuristic scene with glowing neural network patterns and neon data streams.
Vibrant cyan, magenta, and purple colors with dramatic cinematic lighting.
Ultra-sharp detail, octane render quality.
Professional tech illustration suitable for LinkedIn banner.
NO text, NO people, NO frames, immersive full-bleed composition."
    )
}

/// Image prompt derived from the post; falls back to a fixed template.
pub async fn image_prompt(oracle: &dyn TextOracle, topic: &str, post: &str) -> String {
    let request = build_image_prompt_request(topic, post);
    match oracle.generate(&request).await {
        Some(text) if !text.trim().is_empty() => {
            let out = format!("{}{}", text.trim(), IMAGE_PROMPT_SUFFIX);
            info!(prompt = truncate_chars(&out, 150), "generated image prompt");
            out
        }
        _ => {
            warn!("image prompt generation failed, using fallback prompt");
            fallback_image_prompt(topic)
        }
    }
}
