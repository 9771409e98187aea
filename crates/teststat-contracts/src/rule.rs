//! Rule tokens, rules, aggregators, and validated rule lists.
//!
//! The registry declares every leaf field as an ordered token list:
//!
//! ```toml
//! resource = ["trim_as", "any", "not_empty", "match"]
//! ```
//!
//! Tokens before the aggregator are pre-filters, the aggregator is exactly
//! one of `all` / `any`, and the tokens after it are the comparison rules
//! whose verdicts the aggregator combines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One token of a rule list as written in the registry TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleToken {
    All,
    Any,
    TrimAs,
    NotEmpty,
    Include,
    IncludeKeys,
    Match,
    Compare,
}

impl FromStr for RuleToken {
    type Err = RuleListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(RuleToken::All),
            "any" => Ok(RuleToken::Any),
            "trim_as" => Ok(RuleToken::TrimAs),
            "not_empty" => Ok(RuleToken::NotEmpty),
            "include" => Ok(RuleToken::Include),
            "include_keys" => Ok(RuleToken::IncludeKeys),
            "match" => Ok(RuleToken::Match),
            "compare" => Ok(RuleToken::Compare),
            other => Err(RuleListError::UnknownToken {
                token: other.to_string(),
            }),
        }
    }
}

/// What a token means once classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Aggregator(Aggregator),
    Rule(Rule),
}

impl RuleToken {
    pub fn kind(self) -> TokenKind {
        match self {
            RuleToken::All => TokenKind::Aggregator(Aggregator::All),
            RuleToken::Any => TokenKind::Aggregator(Aggregator::Any),
            RuleToken::TrimAs => TokenKind::Rule(Rule::TrimAs),
            RuleToken::NotEmpty => TokenKind::Rule(Rule::NotEmpty),
            RuleToken::Include => TokenKind::Rule(Rule::Include),
            RuleToken::IncludeKeys => TokenKind::Rule(Rule::IncludeKeys),
            RuleToken::Match => TokenKind::Rule(Rule::Match),
            RuleToken::Compare => TokenKind::Rule(Rule::Compare),
        }
    }
}

/// A comparison or pre-filter rule applied to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Strip a leading `as` from the expected value (pre-filter).
    TrimAs,
    /// Expected is `notempty` and the actual value is non-empty.
    NotEmpty,
    /// Every comma-separated expected token is contained in the actual value.
    Include,
    /// Every comma-separated expected token is a key of the actual mapping.
    IncludeKeys,
    /// Expected equals the normalized actual value.
    Match,
    /// Expected is `>=N`, `>N`, `<=N`, or `<N` and the actual number satisfies it.
    Compare,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::TrimAs => "trim_as",
            Rule::NotEmpty => "not_empty",
            Rule::Include => "include",
            Rule::IncludeKeys => "include_keys",
            Rule::Match => "match",
            Rule::Compare => "compare",
        };
        f.write_str(name)
    }
}

/// How comparison verdicts are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    /// Every comparison rule must hold.
    All,
    /// At least one comparison rule must hold.
    Any,
}

impl Aggregator {
    /// Combine verdicts; `Any` short-circuits on the first `true`, `All` on
    /// the first `false`.
    pub fn combine<I>(self, verdicts: I) -> bool
    where
        I: IntoIterator<Item = bool>,
    {
        let mut verdicts = verdicts.into_iter();
        match self {
            Aggregator::All => verdicts.all(|v| v),
            Aggregator::Any => verdicts.any(|v| v),
        }
    }
}

/// A validated rule list: `[prefilter…, aggregator, comparison…]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleList {
    prefilters: Vec<Rule>,
    aggregator: Aggregator,
    comparisons: Vec<Rule>,
}

impl RuleList {
    /// Build a rule list from raw tokens.
    ///
    /// Fails unless exactly one aggregator token is present.
    pub fn from_tokens(tokens: &[RuleToken]) -> Result<Self, RuleListError> {
        let mut prefilters = Vec::new();
        let mut comparisons = Vec::new();
        let mut aggregator = None;

        for token in tokens {
            match token.kind() {
                TokenKind::Aggregator(found) => {
                    if aggregator.is_some() {
                        return Err(RuleListError::MultipleAggregators {
                            tokens: tokens.to_vec(),
                        });
                    }
                    aggregator = Some(found);
                }
                TokenKind::Rule(rule) if aggregator.is_none() => prefilters.push(rule),
                TokenKind::Rule(rule) => comparisons.push(rule),
            }
        }

        let aggregator = aggregator.ok_or_else(|| RuleListError::MissingAggregator {
            tokens: tokens.to_vec(),
        })?;

        Ok(Self {
            prefilters,
            aggregator,
            comparisons,
        })
    }

    pub fn prefilters(&self) -> &[Rule] {
        &self.prefilters
    }

    pub fn aggregator(&self) -> Aggregator {
        self.aggregator
    }

    pub fn comparisons(&self) -> &[Rule] {
        &self.comparisons
    }
}

/// Why a token list could not become a `RuleList`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleListError {
    #[error("rule list {tokens:?} has no aggregator (expected exactly one of all/any)")]
    MissingAggregator { tokens: Vec<RuleToken> },

    #[error("rule list {tokens:?} has more than one aggregator")]
    MultipleAggregators { tokens: Vec<RuleToken> },

    #[error("unknown rule token '{token}'")]
    UnknownToken { token: String },
}
