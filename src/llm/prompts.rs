//! LLM prompts for pairwise judgments.

/// Collection of prompts used by the evaluator.
pub struct Prompts;

impl Prompts {
    /// Fixed system instruction establishing the assistant identity.
    pub fn system_identity() -> &'static str {
        "You are ChatGPT, a large language model trained by OpenAI, based on the GPT-3.5 architecture."
    }

    /// Prompt asking which of two texts is more suitable as training data.
    pub fn render_pairwise(lang: &str, text1: &str, text2: &str) -> String {
        format!(
            r#"Evaluate which of the two given {lang} texts([Text 1] and [Text 2]) is more suitable for training a language model. The text should be neatly formatted, locally fluent and logical, although it doesn't have to be fully self-contained and can consist of multiple subparts. It is important to ensure the absence of any toxic content. Besides, personally sensitive information is acceptable.  This is my basic requirement but you have certain freedom to judge its suitability based on your own knowledge.

Please only answer "Text 1" or "Text 2" or "Tied" without offering any explanation. "Tied" means the two text given comparable quality.

[Text 1]
{text1}

[Text 2]
{text2}
"#
        )
    }
}
