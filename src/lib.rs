//! Pairwise Judge - LLM-judged text-quality comparison for training corpora.
//!
//! Two independent tools live here:
//!
//! 1. A **pairwise evaluator** that asks an OpenAI-compatible model which of
//!    two texts is better suited as language-model training data, rotating
//!    through a pool of API keys when one gets rate limited.
//! 2. A **corpus dumper** that normalizes raw `.txt` files and heterogeneous
//!    `.jsonl` files into a single JSON-lines stream of `{text, source}` records.
//!
//! # Quick Start
//!
//! ```no_run
//! use pairwise_judge::{
//!     config::Config,
//!     evaluator::{PairwiseEvaluator, TextPair},
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let mut evaluator = PairwiseEvaluator::from_config(&config)?;
//!     let pairs = vec![TextPair::new("Hello World!", "H3ll0 W0rld!!", "English")];
//!
//!     let tally = evaluator
//!         .evaluate_pairwise_pairs(pairs, None, Some(Path::new("reports")))
//!         .await?;
//!     println!("judged {} pairs", tally.total());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **LlmClient**: OpenAI-compatible client behind the `ChatService` trait
//! - **CredentialPool**: ordered API-key handles with a rotating cursor
//! - **PairwiseEvaluator**: prompt rendering, retry/rotation, report writing
//! - **dumper**: best-effort JSON-lines corpus conversion

pub mod config;
pub mod credentials;
pub mod dumper;
pub mod error;
pub mod evaluator;
pub mod llm;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::Config;
pub use credentials::CredentialPool;
pub use dumper::{dump_jsonl, dump_jsonl_files, dump_raw_text_files, CorpusInput, WriteMode};
pub use error::{JudgeError, Result, ServiceError};
pub use evaluator::{Evaluation, Outcome, PairwiseEvaluator, Tally, TextPair};
pub use llm::{ChatService, LlmClient};
