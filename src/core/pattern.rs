//! Search text → regular expression synthesis
//!
//! Word and symbol tokens are escaped; whitespace tokens become flexible
//! according to the whitespace config. Compiled patterns are cached in a
//! bounded `moka` cache keyed by variant, search text and config.

use moka::sync::Cache;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::core::error::{PatchError, PatchResultOf};
use crate::core::operation::WhitespaceConfig;
use crate::core::tokenize::tokenize;

/// Default cap on tokens accepted from one search string
pub const DEFAULT_MAX_PATTERN_TOKENS: usize = 4096;

/// Compiled program size limit for synthesized and user patterns
const REGEX_SIZE_LIMIT: usize = 1 << 21;

const ANY_LINE_ENDING: &str = r"(?:\r\n|\r|\n)";

/// Pattern synthesis limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig
{
    /// Most tokens accepted from one search string
    pub max_tokens: usize,
    /// Compiled patterns kept in the cache
    pub cache_capacity: u64,
}

impl Default for PatternConfig
{
    fn default() -> Self
    {
        Self { max_tokens: DEFAULT_MAX_PATTERN_TOKENS, cache_capacity: 1_024 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Variant
{
    Line,
    Block,
    Precompiled,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PatternKey
{
    variant: Variant,
    source: String,
    whitespace: Option<WhitespaceConfig>,
}

/// Builds and caches search patterns
#[derive(Clone)]
pub struct PatternSynthesizer
{
    max_tokens: usize,
    cache: Cache<PatternKey, Regex>,
}

impl std::fmt::Debug for PatternSynthesizer
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result
    {
        f.debug_struct("PatternSynthesizer")
            .field("max_tokens", &self.max_tokens)
            .field("cached", &self.cache.entry_count())
            .finish()
    }
}

impl Default for PatternSynthesizer
{
    fn default() -> Self
    {
        Self::from_config(&PatternConfig::default())
    }
}

impl PatternSynthesizer
{
    pub fn new(
        max_tokens: usize,
        cache_capacity: u64,
    ) -> Self
    {
        Self { max_tokens, cache: Cache::new(cache_capacity) }
    }

    pub fn from_config(config: &PatternConfig) -> Self
    {
        Self::new(config.max_tokens, config.cache_capacity)
    }

    /// Pattern matched against one line at a time
    pub fn line_pattern(
        &self,
        search: &str,
        config: &WhitespaceConfig,
    ) -> PatchResultOf<Regex>
    {
        self.cached(Variant::Line, search, Some(config), || {
            let source = self.synthesize(search, config, false)?;
            compile(&source, false)
        })
    }

    /// Pattern matched against the whole content, may span lines
    pub fn block_pattern(
        &self,
        search: &str,
        config: &WhitespaceConfig,
    ) -> PatchResultOf<Regex>
    {
        self.cached(Variant::Block, search, Some(config), || {
            let source = self.synthesize(search, config, true)?;
            compile(&source, true)
        })
    }

    /// Caller-supplied regular expression, compiled as-is
    pub fn precompiled(
        &self,
        pattern: &str,
    ) -> PatchResultOf<Regex>
    {
        if pattern.is_empty()
        {
            return Err(PatchError::invalid("pattern must not be empty"));
        }
        self.cached(Variant::Precompiled, pattern, None, || compile(pattern, false))
    }

    fn cached(
        &self,
        variant: Variant,
        source: &str,
        whitespace: Option<&WhitespaceConfig>,
        build: impl FnOnce() -> PatchResultOf<Regex>,
    ) -> PatchResultOf<Regex>
    {
        let key = PatternKey { variant, source: source.to_string(), whitespace: whitespace.cloned() };

        if let Some(re) = self
            .cache
            .get(&key)
        {
            return Ok(re);
        }

        let re = build()?;
        tracing::trace!(?variant, pattern = re.as_str(), "compiled search pattern");
        self.cache
            .insert(key, re.clone());
        Ok(re)
    }

    /// Regex source for `search` under `config`
    pub fn synthesize(
        &self,
        search: &str,
        config: &WhitespaceConfig,
        block: bool,
    ) -> PatchResultOf<String>
    {
        if search.is_empty()
        {
            return Err(PatchError::invalid("search text must not be empty"));
        }

        let tokens = tokenize(search);
        if tokens.len() > self.max_tokens
        {
            return Err(PatchError::invalid(format!(
                "search text has {} tokens, limit is {}",
                tokens.len(),
                self.max_tokens
            )));
        }

        let last = tokens.len() - 1;
        let mut source = String::with_capacity(search.len() * 2);
        for (i, token) in tokens
            .iter()
            .enumerate()
        {
            if !token.is_whitespace()
            {
                source.push_str(&regex::escape(token.text));
                continue;
            }

            let internal = i != 0 && i != last;
            if !config.preserve_indentation
            {
                source.push_str(r"\s*");
            }
            else if config.normalize_whitespace && internal
            {
                source.push_str(r"\s+");
            }
            else if block && !config.preserve_line_endings
            {
                source.push_str(&literal_with_flexible_endings(token.text));
            }
            else
            {
                source.push_str(&regex::escape(token.text));
            }
        }

        Ok(source)
    }
}

/// Escape a whitespace run, letting each line ending match any style
fn literal_with_flexible_endings(run: &str) -> String
{
    let mut out = String::new();
    let mut chars = run
        .chars()
        .peekable();
    while let Some(c) = chars.next()
    {
        match c
        {
            '\r' =>
            {
                if chars.peek() == Some(&'\n')
                {
                    chars.next();
                }
                out.push_str(ANY_LINE_ENDING);
            }
            '\n' => out.push_str(ANY_LINE_ENDING),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    out
}

fn compile(
    source: &str,
    multi_line: bool,
) -> PatchResultOf<Regex>
{
    RegexBuilder::new(source)
        .multi_line(multi_line)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| PatchError::invalid(format!("invalid search pattern: {e}")))
}
