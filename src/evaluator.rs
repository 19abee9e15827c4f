//! Pairwise text-quality evaluation.
//!
//! Each pair of texts is rendered into a judgment prompt and sent to the
//! inference service through a rotating [`CredentialPool`]. Batches are
//! processed strictly in input order, one request at a time, and every
//! judgment is appended to a `pairwise_report_<timestamp>.jsonl` file.

use crate::config::{Config, EvaluatorConfig};
use crate::credentials::CredentialPool;
use crate::error::{JudgeError, Result, ServiceError};
use crate::llm::{ChatRequest, ChatService, LlmClient, LlmResponse, Message, Prompts};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Label recorded when the rendered prompt is too long to send.
pub const TOO_LONG_LABEL: &str = "too long to evaluate";

/// Label recorded when the service rejected the request.
pub const UNKNOWN_ERROR_LABEL: &str = "unknown error";

/// Language assumed when a pair does not name one.
pub const DEFAULT_LANG: &str = "Chinese";

/// Retries allowed per pair never drop below this.
const MIN_RETRY_LIMIT: usize = 3;

/// Result of judging one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Lower-cased model reply. Usually "text 1", "text 2" or "tied", but
    /// any reply is accepted as-is.
    Judged(String),
    /// Prompt reached the length limit; nothing was sent.
    TooLong,
    /// The service rejected the request as malformed.
    UnknownError,
}

impl Outcome {
    /// The label persisted in `evaluate_ans` and counted in the tally.
    pub fn label(&self) -> &str {
        match self {
            Outcome::Judged(answer) => answer.as_str(),
            Outcome::TooLong => TOO_LONG_LABEL,
            Outcome::UnknownError => UNKNOWN_ERROR_LABEL,
        }
    }
}

/// An outcome plus the raw response it came from, when there was one.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub outcome: Outcome,
    pub response: Option<LlmResponse>,
}

impl Evaluation {
    fn without_response(outcome: Outcome) -> Self {
        Self {
            outcome,
            response: None,
        }
    }
}

/// One input pair. Unknown fields are carried through to the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPair {
    pub text1: String,
    pub text2: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

impl TextPair {
    pub fn new(text1: impl Into<String>, text2: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            text1: text1.into(),
            text2: text2.into(),
            lang: lang.into(),
            extra: Map::new(),
        }
    }
}

/// Persisted report line: the input pair with `evaluate_ans` set to `label`.
///
/// An `evaluate_ans` already carried by the pair is replaced in place.
fn report_record(pair: &TextPair, label: &str) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("text1".to_string(), Value::from(pair.text1.as_str()));
    record.insert("text2".to_string(), Value::from(pair.text2.as_str()));
    record.insert("lang".to_string(), Value::from(pair.lang.as_str()));
    for (key, value) in &pair.extra {
        record.insert(key.clone(), value.clone());
    }
    record.insert("evaluate_ans".to_string(), Value::from(label));
    record
}

/// Count of outcomes per label across a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: BTreeMap<String, usize>,
}

impl Tally {
    /// Count one occurrence of `label`.
    pub fn record(&mut self, label: &str) {
        *self.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Occurrences of `label` (zero if never seen).
    pub fn get(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Sum over all labels.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(label, count)| (label.as_str(), *count))
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (label, count)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}: {}", label, count)?;
        }
        write!(f, "}}")
    }
}

/// LLM judge comparing two texts at a time.
pub struct PairwiseEvaluator<S = LlmClient> {
    pool: CredentialPool<S>,
    model: String,
    max_prompt_chars: usize,
    max_retries: usize,
    output_dir: PathBuf,
}

impl PairwiseEvaluator<LlmClient> {
    /// Build an evaluator with one client per configured API key.
    pub fn from_config(config: &Config) -> Result<Self> {
        let clients: Vec<LlmClient> = config
            .llm
            .api_keys
            .iter()
            .map(|key| key.trim())
            .filter(|key| !key.is_empty())
            .map(|key| LlmClient::new(config.llm.api_base.clone(), key))
            .collect();

        let pool = CredentialPool::new(clients)?;
        Ok(Self::new(pool, config.llm.model.clone(), &config.evaluator))
    }
}

impl<S: ChatService> PairwiseEvaluator<S> {
    /// Create an evaluator over an existing credential pool.
    pub fn new(pool: CredentialPool<S>, model: impl Into<String>, settings: &EvaluatorConfig) -> Self {
        let max_retries = MIN_RETRY_LIMIT.max(pool.len());
        Self {
            pool,
            model: model.into(),
            max_prompt_chars: settings.max_prompt_chars,
            max_retries,
            output_dir: settings.output_dir.clone(),
        }
    }

    pub fn pool(&self) -> &CredentialPool<S> {
        &self.pool
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Rate-limit signals tolerated for a single pair.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Directory that receives batch reports.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Judge which of two texts is better training data.
    ///
    /// Oversized prompts short-circuit to [`Outcome::TooLong`] without a
    /// request. Rate limits rotate to the next credential and retry until
    /// [`max_retries`](Self::max_retries) signals have been seen, at which
    /// point [`JudgeError::RetryLimitExceeded`] is returned. A malformed
    /// request yields [`Outcome::UnknownError`]; other service failures
    /// are returned as errors.
    pub async fn evaluate_single_pair(
        &mut self,
        text1: &str,
        text2: &str,
        lang: &str,
        model: &str,
    ) -> Result<Evaluation> {
        let prompt = Prompts::render_pairwise(lang, text1, text2);
        let prompt_chars = prompt.chars().count();

        if prompt_chars >= self.max_prompt_chars {
            debug!(
                prompt_chars,
                limit = self.max_prompt_chars,
                "prompt too long, skipping request"
            );
            return Ok(Evaluation::without_response(Outcome::TooLong));
        }

        let request = ChatRequest::new(
            model,
            vec![
                Message::system(Prompts::system_identity()),
                Message::user(prompt),
            ],
        );

        let mut retries = 0;
        loop {
            let reply = self.pool.current().chat(&request).await;
            match reply {
                Ok(response) => {
                    let answer = response.content.to_lowercase();
                    return Ok(Evaluation {
                        outcome: Outcome::Judged(answer),
                        response: Some(response),
                    });
                }
                Err(ServiceError::RateLimited(message)) => {
                    self.pool.rotate();
                    retries += 1;
                    debug!(
                        retries,
                        key_index = self.pool.cursor(),
                        %message,
                        "rate limited, rotating API key"
                    );
                    if retries >= self.max_retries {
                        return Err(JudgeError::RetryLimitExceeded {
                            attempts: retries,
                            limit: self.max_retries,
                        });
                    }
                }
                Err(ServiceError::MalformedRequest(message)) => {
                    warn!(%message, "request rejected by service");
                    return Ok(Evaluation::without_response(Outcome::UnknownError));
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Judge every pair and write one report line per pair.
    ///
    /// `input_path`, when given and non-empty, replaces `pairs` with the
    /// JSON-lines records read from that file. `output_path`, when given
    /// and non-empty, becomes the
    /// evaluator's output directory for this and later batches. The final
    /// tally is printed and returned. A retry-limit or unclassified service
    /// error aborts the batch; lines already written stay on disk.
    pub async fn evaluate_pairwise_pairs(
        &mut self,
        pairs: Vec<TextPair>,
        input_path: Option<&Path>,
        output_path: Option<&Path>,
    ) -> Result<Tally> {
        let input_path = input_path.filter(|p| !p.as_os_str().is_empty());
        let output_path = output_path.filter(|p| !p.as_os_str().is_empty());

        let pairs = match input_path {
            Some(path) => read_pairs(path)?,
            None => pairs,
        };

        if let Some(dir) = output_path {
            self.output_dir = dir.to_path_buf();
        }

        let (report_path, file) = create_report_file(&self.output_dir, unix_timestamp())?;
        let mut writer = BufWriter::new(file);
        info!(
            pairs = pairs.len(),
            report = %report_path.display(),
            "starting pairwise evaluation"
        );

        let model = self.model.clone();
        let mut tally = Tally::default();

        for (i, pair) in pairs.iter().enumerate() {
            let evaluation = self
                .evaluate_single_pair(&pair.text1, &pair.text2, &pair.lang, &model)
                .await?;
            let label = evaluation.outcome.label();
            tally.record(label);

            let line = serde_json::to_string(&report_record(pair, label))?;
            writeln!(writer, "{}", line).map_err(|e| JudgeError::io(&report_path, e))?;

            debug!(index = i + 1, total = pairs.len(), answer = label, "pair evaluated");
        }

        writer
            .flush()
            .map_err(|e| JudgeError::io(&report_path, e))?;

        info!(total = tally.total(), report = %report_path.display(), "evaluation finished");
        println!("{}", tally);

        Ok(tally)
    }
}

/// Read one [`TextPair`] per non-blank line.
pub fn read_pairs(path: &Path) -> Result<Vec<TextPair>> {
    let content = fs::read_to_string(path).map_err(|e| JudgeError::io(path, e))?;

    let mut pairs = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let pair = serde_json::from_str(line).map_err(|e| {
            JudgeError::Serialization(format!(
                "{}: line {}: {}",
                path.display(),
                line_num + 1,
                e
            ))
        })?;
        pairs.push(pair);
    }

    Ok(pairs)
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Create a fresh report file, never reusing an existing name.
fn create_report_file(dir: &Path, timestamp: u64) -> Result<(PathBuf, File)> {
    let mut suffix = 0usize;
    loop {
        let name = if suffix == 0 {
            format!("pairwise_report_{}.jsonl", timestamp)
        } else {
            format!("pairwise_report_{}_{}.jsonl", timestamp, suffix)
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => return Err(JudgeError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    type Reply = std::result::Result<LlmResponse, ServiceError>;

    /// Stub service: all handles share one script and log which handle was called.
    #[derive(Clone)]
    struct ScriptedService {
        id: usize,
        script: Arc<Mutex<VecDeque<Reply>>>,
        calls: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl ChatService for ScriptedService {
        async fn chat(&self, request: &ChatRequest) -> Reply {
            assert_eq!(request.n, 1);
            assert_eq!(request.messages.len(), 2);
            self.calls.lock().unwrap().push(self.id);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(LlmResponse::text("Tied")))
        }
    }

    fn rate_limited() -> Reply {
        Err(ServiceError::RateLimited("429".to_string()))
    }

    fn reply(text: &str) -> Reply {
        Ok(LlmResponse::text(text))
    }

    fn evaluator(
        pool_size: usize,
        script: Vec<Reply>,
        settings: &EvaluatorConfig,
    ) -> (PairwiseEvaluator<ScriptedService>, Arc<Mutex<Vec<usize>>>) {
        let script = Arc::new(Mutex::new(VecDeque::from(script)));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handles = (0..pool_size)
            .map(|id| ScriptedService {
                id,
                script: Arc::clone(&script),
                calls: Arc::clone(&calls),
            })
            .collect();
        let pool = CredentialPool::new(handles).unwrap();
        (PairwiseEvaluator::new(pool, "test-model", settings), calls)
    }

    fn report_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("pairwise_report_") && n.ends_with(".jsonl"))
            })
            .collect();
        files.sort();
        files
    }

    fn report_lines(dir: &Path) -> Vec<Value> {
        let files = report_files(dir);
        assert_eq!(files.len(), 1);
        fs::read_to_string(&files[0])
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_prompt_length_threshold() {
        let base = Prompts::render_pairwise("English", "", "").chars().count();
        let settings = EvaluatorConfig {
            max_prompt_chars: base + 10,
            ..Default::default()
        };
        let (mut eval, calls) = evaluator(1, vec![], &settings);

        let at_limit = "é".repeat(10);
        let result = eval
            .evaluate_single_pair(&at_limit, "", "English", "m")
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::TooLong);
        assert_eq!(result.outcome.label(), "too long to evaluate");
        assert!(result.response.is_none());
        assert!(calls.lock().unwrap().is_empty());

        let below_limit = "é".repeat(9);
        let result = eval
            .evaluate_single_pair(&below_limit, "", "English", "m")
            .await
            .unwrap();
        assert_eq!(result.outcome, Outcome::Judged("tied".to_string()));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_is_lowercased_verbatim() {
        let settings = EvaluatorConfig::default();
        let (mut eval, _) = evaluator(1, vec![reply("Text 1"), reply("Maybe Both")], &settings);

        let first = eval.evaluate_single_pair("a", "b", "English", "m").await.unwrap();
        assert_eq!(first.outcome.label(), "text 1");
        assert_eq!(first.response.unwrap().content, "Text 1");

        let second = eval.evaluate_single_pair("a", "b", "English", "m").await.unwrap();
        assert_eq!(second.outcome, Outcome::Judged("maybe both".to_string()));
    }

    #[tokio::test]
    async fn test_rate_limit_rotates_cyclically() {
        let settings = EvaluatorConfig::default();
        let (mut eval, calls) = evaluator(
            4,
            vec![rate_limited(), rate_limited(), reply("Text 2")],
            &settings,
        );
        assert_eq!(eval.max_retries(), 4);

        let result = eval.evaluate_single_pair("a", "b", "English", "m").await.unwrap();
        assert_eq!(result.outcome.label(), "text 2");
        assert_eq!(*calls.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(eval.pool().cursor(), 2);
    }

    #[tokio::test]
    async fn test_two_keys_recover_before_ceiling() {
        let settings = EvaluatorConfig::default();
        let (mut eval, calls) = evaluator(
            2,
            vec![rate_limited(), rate_limited(), reply("Text 2")],
            &settings,
        );
        assert_eq!(eval.max_retries(), 3);

        let result = eval.evaluate_single_pair("a", "b", "English", "m").await.unwrap();
        assert_eq!(result.outcome.label(), "text 2");
        assert_eq!(*calls.lock().unwrap(), vec![0, 1, 0]);
    }

    #[tokio::test]
    async fn test_retry_ceiling_is_fatal() {
        let settings = EvaluatorConfig::default();
        let (mut eval, calls) = evaluator(
            2,
            vec![rate_limited(), rate_limited(), rate_limited(), reply("Text 1")],
            &settings,
        );

        let err = eval
            .evaluate_single_pair("a", "b", "English", "m")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JudgeError::RetryLimitExceeded {
                attempts: 3,
                limit: 3
            }
        ));
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_retry_ceiling_scales_with_pool_size() {
        let settings = EvaluatorConfig::default();
        let (mut eval, _) = evaluator(5, (0..5).map(|_| rate_limited()).collect(), &settings);
        let err = eval
            .evaluate_single_pair("a", "b", "English", "m")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JudgeError::RetryLimitExceeded {
                attempts: 5,
                limit: 5
            }
        ));

        let mut script: Vec<Reply> = (0..4).map(|_| rate_limited()).collect();
        script.push(reply("Tied"));
        let (mut eval, _) = evaluator(5, script, &settings);
        let result = eval.evaluate_single_pair("a", "b", "English", "m").await.unwrap();
        assert_eq!(result.outcome.label(), "tied");
    }

    #[tokio::test]
    async fn test_single_key_retries_same_key() {
        let settings = EvaluatorConfig::default();
        let (mut eval, calls) = evaluator(
            1,
            vec![rate_limited(), rate_limited(), reply("Text 1")],
            &settings,
        );

        let result = eval.evaluate_single_pair("a", "b", "English", "m").await.unwrap();
        assert_eq!(result.outcome.label(), "text 1");
        assert_eq!(*calls.lock().unwrap(), vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn test_malformed_request_is_not_retried() {
        let settings = EvaluatorConfig::default();
        let (mut eval, calls) = evaluator(
            3,
            vec![
                rate_limited(),
                Err(ServiceError::MalformedRequest("policy".to_string())),
            ],
            &settings,
        );

        let result = eval.evaluate_single_pair("a", "b", "English", "m").await.unwrap();
        assert_eq!(result.outcome, Outcome::UnknownError);
        assert_eq!(result.outcome.label(), "unknown error");
        assert!(result.response.is_none());
        assert_eq!(*calls.lock().unwrap(), vec![0, 1]);
        assert_eq!(eval.pool().cursor(), 1);
    }

    #[tokio::test]
    async fn test_unclassified_failure_propagates() {
        let settings = EvaluatorConfig::default();
        let (mut eval, calls) = evaluator(
            2,
            vec![Err(ServiceError::Failed("HTTP 500".to_string()))],
            &settings,
        );

        let err = eval
            .evaluate_single_pair("a", "b", "English", "m")
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::Service(ServiceError::Failed(_))));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_writes_one_record_per_pair() {
        let dir = TempDir::new().unwrap();
        let settings = EvaluatorConfig::default();
        let (mut eval, _) = evaluator(
            2,
            vec![
                reply("Tied"),
                Err(ServiceError::MalformedRequest("bad".to_string())),
                reply("Text 1"),
            ],
            &settings,
        );

        let pairs = vec![
            TextPair::new("A", "A", "English"),
            TextPair::new("x", "y", "Chinese"),
            TextPair::new("good", "bad", "English"),
        ];
        let tally = eval
            .evaluate_pairwise_pairs(pairs, None, Some(dir.path()))
            .await
            .unwrap();

        assert_eq!(tally.total(), 3);
        assert_eq!(tally.get("tied"), 1);
        assert_eq!(tally.get("unknown error"), 1);
        assert_eq!(tally.get("text 1"), 1);
        assert_eq!(eval.output_dir(), dir.path());

        let lines = report_lines(dir.path());
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            serde_json::json!({"text1": "A", "text2": "A", "lang": "English", "evaluate_ans": "tied"})
        );
        assert_eq!(lines[1]["evaluate_ans"], "unknown error");
        assert_eq!(lines[2]["text1"], "good");
        assert_eq!(lines[2]["evaluate_ans"], "text 1");
    }

    #[tokio::test]
    async fn test_batch_reads_input_file_over_given_pairs() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("pairs.jsonl");
        fs::write(
            &input,
            "{\"text1\": \"a\", \"text2\": \"b\", \"lang\": \"English\", \"id\": 7}\n\n{\"text1\": \"c\", \"text2\": \"d\"}\n",
        )
        .unwrap();
        let out = dir.path().join("reports");
        fs::create_dir(&out).unwrap();

        let settings = EvaluatorConfig::default();
        let (mut eval, calls) = evaluator(1, vec![reply("Text 2")], &settings);

        let ignored = vec![TextPair::new("never", "sent", "English")];
        let tally = eval
            .evaluate_pairwise_pairs(ignored, Some(input.as_path()), Some(out.as_path()))
            .await
            .unwrap();

        assert_eq!(tally.total(), 2);
        assert_eq!(calls.lock().unwrap().len(), 2);

        let lines = report_lines(&out);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 7);
        assert_eq!(lines[0]["evaluate_ans"], "text 2");
        assert_eq!(lines[1]["lang"], "Chinese");
        assert_eq!(lines[1]["evaluate_ans"], "tied");
    }

    #[tokio::test]
    async fn test_batch_abort_keeps_earlier_records() {
        let dir = TempDir::new().unwrap();
        let settings = EvaluatorConfig::default();
        let (mut eval, _) = evaluator(
            1,
            vec![reply("Text 1"), rate_limited(), rate_limited(), rate_limited()],
            &settings,
        );

        let pairs = vec![
            TextPair::new("a", "b", "English"),
            TextPair::new("c", "d", "English"),
            TextPair::new("e", "f", "English"),
        ];
        let err = eval
            .evaluate_pairwise_pairs(pairs, None, Some(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, JudgeError::RetryLimitExceeded { .. }));

        let lines = report_lines(dir.path());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["evaluate_ans"], "text 1");
    }

    #[tokio::test]
    async fn test_empty_batch_creates_empty_report() {
        let dir = TempDir::new().unwrap();
        let settings = EvaluatorConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let (mut eval, calls) = evaluator(1, vec![], &settings);

        let tally = eval.evaluate_pairwise_pairs(Vec::new(), None, None).await.unwrap();
        assert!(tally.is_empty());
        assert!(calls.lock().unwrap().is_empty());
        assert!(report_lines(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_output_dir_persists_across_batches() {
        let first = TempDir::new().unwrap();
        let settings = EvaluatorConfig::default();
        let (mut eval, _) = evaluator(1, vec![], &settings);

        let pairs = vec![TextPair::new("a", "b", "English")];
        eval.evaluate_pairwise_pairs(pairs.clone(), None, Some(first.path()))
            .await
            .unwrap();
        eval.evaluate_pairwise_pairs(pairs, None, None).await.unwrap();

        assert_eq!(report_files(first.path()).len(), 2);
    }

    #[tokio::test]
    async fn test_rejudged_report_replaces_stale_answer() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("old_report.jsonl");
        fs::write(
            &input,
            "{\"id\": 1, \"text1\": \"a\", \"text2\": \"b\", \"lang\": \"English\", \"evaluate_ans\": \"text 1\", \"note\": \"x\"}\n",
        )
        .unwrap();
        let out = dir.path().join("reports");
        fs::create_dir(&out).unwrap();

        let settings = EvaluatorConfig::default();
        let (mut eval, _) = evaluator(1, vec![reply("Tied")], &settings);
        eval.evaluate_pairwise_pairs(Vec::new(), Some(input.as_path()), Some(out.as_path()))
            .await
            .unwrap();

        let files = report_files(&out);
        let raw = fs::read_to_string(&files[0]).unwrap();
        assert_eq!(raw.matches("\"evaluate_ans\"").count(), 1);
        assert_eq!(
            raw.trim_end(),
            r#"{"text1":"a","text2":"b","lang":"English","id":1,"evaluate_ans":"tied","note":"x"}"#
        );
    }

    #[tokio::test]
    async fn test_extra_fields_keep_input_order() {
        let dir = TempDir::new().unwrap();
        let mut pair = TextPair::new("a", "b", "English");
        pair.extra.insert("zeta".to_string(), Value::from(1));
        pair.extra.insert("alpha".to_string(), Value::from(2));

        let settings = EvaluatorConfig::default();
        let (mut eval, _) = evaluator(1, vec![reply("Text 2")], &settings);
        eval.evaluate_pairwise_pairs(vec![pair], None, Some(dir.path()))
            .await
            .unwrap();

        let files = report_files(dir.path());
        let raw = fs::read_to_string(&files[0]).unwrap();
        assert_eq!(
            raw.trim_end(),
            r#"{"text1":"a","text2":"b","lang":"English","zeta":1,"alpha":2,"evaluate_ans":"text 2"}"#
        );
    }

    #[tokio::test]
    async fn test_empty_paths_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = EvaluatorConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let (mut eval, calls) = evaluator(1, vec![], &settings);

        let pairs = vec![TextPair::new("a", "b", "English")];
        let tally = eval
            .evaluate_pairwise_pairs(pairs, Some(Path::new("")), Some(Path::new("")))
            .await
            .unwrap();

        assert_eq!(tally.total(), 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(eval.output_dir(), dir.path());
        assert_eq!(report_lines(dir.path()).len(), 1);
    }

    #[test]
    fn test_report_file_names_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let (first, _) = create_report_file(dir.path(), 1700000000).unwrap();
        let (second, _) = create_report_file(dir.path(), 1700000000).unwrap();

        assert_eq!(first.file_name().unwrap(), "pairwise_report_1700000000.jsonl");
        assert_eq!(second.file_name().unwrap(), "pairwise_report_1700000000_1.jsonl");
    }

    #[test]
    fn test_read_pairs_reports_bad_line() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("pairs.jsonl");
        fs::write(&input, "{\"text1\": \"a\", \"text2\": \"b\"}\nnot json\n").unwrap();

        match read_pairs(&input) {
            Err(JudgeError::Serialization(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected serialization error, got {:?}", other),
        }
    }

    #[test]
    fn test_tally_display() {
        let mut tally = Tally::default();
        tally.record("tied");
        tally.record("text 1");
        tally.record("tied");

        assert_eq!(tally.to_string(), r#"{"text 1": 1, "tied": 2}"#);
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.get("text 2"), 0);
    }
}
