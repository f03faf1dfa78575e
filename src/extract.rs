//! Best-effort facts pulled out of free-form repository and file names.
//!
//! Every function here is total: a name that does not match yields a
//! neutral value (0.0, the unchanged input, `false`, `None`) instead of an
//! error, so one odd name never stops a discovery run.

use regex::Regex;
use std::sync::LazyLock;

pub const QUANT_PLACEHOLDER: &str = "{quant}";

/// Quantization label that the representative file is chosen by.
pub const PREFERRED_QUANT: &str = "Q4_K_M";

static PARAM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*[Bb](?:illion)?(?:\b|_)").unwrap());

static QUANT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Q\d[._]?K?_?[A-Za-z0-9]*|IQ\d[._][A-Za-z0-9]*").unwrap()
});

static SHARD_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\d{5}-of-\d{5}").unwrap());

static DASH_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// Looser size pattern used by keyword search, applied to a lowercased id.
static LOOSE_SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)\s*b").unwrap());

static QUANT_LABEL_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"I?Q\d+_[A-Z0-9_]+").unwrap(),
        Regex::new(r"I?Q\d+_\d+").unwrap(),
        Regex::new(r"F16|F32|BF16").unwrap(),
    ]
});

/// Parameter count in billions, e.g. `Qwen3-8B-GGUF` -> 8.0.
///
/// Returns 0.0 when the name carries no size. Callers must read 0.0 as
/// "unknown" and skip any budget comparison.
pub fn parse_param_billions(name: &str) -> f64 {
    PARAM_PATTERN
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Replaces the first quantization label in `filename` with [`QUANT_PLACEHOLDER`].
///
/// ```text
/// Qwen3-8B-Q4_K_M.gguf -> Qwen3-8B-{quant}.gguf
/// noQuant.gguf         -> noQuant.gguf
/// ```
pub fn build_filename_template(filename: &str) -> String {
    match QUANT_PATTERN.find(filename) {
        Some(m) => format!(
            "{}{}{}",
            &filename[..m.start()],
            QUANT_PLACEHOLDER,
            &filename[m.end()..]
        ),
        None => filename.to_string(),
    }
}

// model-00001-of-00003.gguf
pub fn is_shard(filename: &str) -> bool {
    SHARD_PATTERN.is_match(filename)
}

pub fn repo_name(repo_id: &str) -> &str {
    repo_id.rsplit('/').next().unwrap_or(repo_id)
}

/// Short, URL- and CLI-safe identifier for a repository.
///
/// `meta-llama/Llama-3-8B-Instruct-GGUF` -> `llama-3-8b`
pub fn derive_identifier(repo_id: &str) -> String {
    let lowered = repo_name(repo_id).to_lowercase();
    let id = lowered.strip_suffix("-gguf").unwrap_or(&lowered);
    let id = id.replace("-instruct", "").replace(['.', '_'], "-");
    DASH_RUNS
        .replace_all(&id, "-")
        .trim_matches('-')
        .to_string()
}

pub fn display_name(repo_id: &str) -> String {
    repo_name(repo_id).replace("-GGUF", "").replace("-gguf", "")
}

pub fn format_popularity(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Memory needed to run a Q4_K_M build of a model, in GB with one decimal.
pub fn estimate_min_vram(billions: f64) -> f64 {
    ((billions * 0.6 + 0.5) * 10.0).round() / 10.0
}

/// Rough on-disk size of a Q4 build, in GB, guessed from a model id.
pub fn estimate_size_from_id(model_id: &str) -> Option<f64> {
    let name = model_id.to_lowercase();
    let caps = LOOSE_SIZE_PATTERN.captures(&name)?;
    let params: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some((params * 0.55 * 10.0).round() / 10.0)
}

/// Quantization label of a GGUF filename (`Q4_K_M`, `IQ4_XS`, `F16`, ...).
pub fn extract_quant_label(filename: &str) -> Option<String> {
    let upper = filename.to_uppercase();
    QUANT_LABEL_PATTERNS
        .iter()
        .find_map(|re| re.find(&upper))
        .map(|m| m.as_str().to_string())
}
