//! Ranking tunables.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ScoringError;
use crate::constants::{
    DEFAULT_BOOST_CEILING, DEFAULT_CATEGORY_BONUS, DEFAULT_KEYWORD_MAX_SCORE,
    DEFAULT_SCORE_THRESHOLD,
};

/// Text appended to a query when any trigger occurs in it (case-insensitive substring).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExpansion {
    pub triggers: Vec<String>,
    pub append: String,
}

impl QueryExpansion {
    fn new(triggers: &[&str], append: &str) -> Self {
        Self {
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            append: append.to_string(),
        }
    }
}

/// Everything the ranker can be tuned with. Missing JSON fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Term -> bonus, applied when the term occurs in both query and document.
    pub boost_terms: BTreeMap<String, f32>,
    /// Upper bound on the summed boost.
    pub boost_ceiling: f32,
    /// Embedding matches scoring below this are dropped.
    pub threshold: f32,
    /// Bonus when the category hint equals the document's category.
    pub category_bonus: f32,
    /// Group name -> member terms for the keyword pass.
    pub keyword_groups: BTreeMap<String, Vec<String>>,
    /// Weight of a matched term that equals its group name.
    pub keyword_primary_score: f32,
    /// Weight of any other matched term.
    pub keyword_secondary_score: f32,
    /// Highest score the keyword pass may assign.
    pub keyword_max_score: f32,
    /// Fill remaining slots with keyword-unmatched documents at score 0.
    pub keyword_fill_unmatched: bool,
    pub query_expansions: Vec<QueryExpansion>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        let boost_terms = [
            ("fraction", 0.15),
            ("cell", 0.15),
            ("supermarket", 0.15),
            ("pirate", 0.15),
            ("market", 0.10),
            ("pricing", 0.10),
            ("mural", 0.10),
            ("shop", 0.10),
        ]
        .into_iter()
        .map(|(term, bonus)| (term.to_string(), bonus))
        .collect();

        let keyword_groups = [
            (
                "mathematics",
                &["mathematics", "numbers", "fraction", "sums", "calculation"][..],
            ),
            (
                "science",
                &["science", "natural", "cell", "experiment", "research"][..],
            ),
            (
                "market",
                &["market", "shop", "shopping", "money", "pricing", "commerce"][..],
            ),
            ("geography", &["geography", "map", "region", "territory"][..]),
            ("pirates", &["pirate", "treasure", "adventure", "narrative"][..]),
            (
                "collaborative",
                &["collaborative", "group", "team", "cooperative"][..],
            ),
        ]
        .into_iter()
        .map(|(group, terms)| {
            (
                group.to_string(),
                terms.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
            )
        })
        .collect();

        let query_expansions = vec![
            QueryExpansion::new(
                &["mathematics", "numbers", "fraction", "sums"],
                "mathematics calculation operations",
            ),
            QueryExpansion::new(
                &["science", "natural", "experiment", "cell"],
                "natural science research scientific method",
            ),
            QueryExpansion::new(
                &["reading", "writing", "language", "texts"],
                "language communication texts",
            ),
            QueryExpansion::new(
                &["geography", "region", "territory", "map"],
                "geography territory location",
            ),
            QueryExpansion::new(
                &["collaborative", "group", "team", "together"],
                "collaborative teamwork cooperative groups",
            ),
            QueryExpansion::new(
                &["individual", "personal", "autonomous"],
                "individual autonomous personal work",
            ),
            QueryExpansion::new(
                &["creative", "design", "mural"],
                "creativity artistic visual design",
            ),
            QueryExpansion::new(
                &["supermarket", "shop", "money", "market"],
                "market commerce money transactions",
            ),
            QueryExpansion::new(
                &["pirate", "treasure", "adventure"],
                "pirates adventure treasure narrative",
            ),
        ];

        Self {
            boost_terms,
            boost_ceiling: DEFAULT_BOOST_CEILING,
            threshold: DEFAULT_SCORE_THRESHOLD,
            category_bonus: DEFAULT_CATEGORY_BONUS,
            keyword_groups,
            keyword_primary_score: 0.3,
            keyword_secondary_score: 0.1,
            keyword_max_score: DEFAULT_KEYWORD_MAX_SCORE,
            keyword_fill_unmatched: true,
            query_expansions,
        }
    }
}

impl RankingConfig {
    /// Loads and validates a JSON ranking table.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ScoringError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|source| ScoringError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// A config with no boosts, keywords or expansions: pure cosine ranking.
    pub fn plain() -> Self {
        Self {
            boost_terms: BTreeMap::new(),
            category_bonus: 0.0,
            keyword_groups: BTreeMap::new(),
            keyword_fill_unmatched: false,
            query_expansions: Vec::new(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        let unit = |name: &str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ScoringError::InvalidConfig {
                    reason: format!("{name} must be within [0, 1], got {value}"),
                })
            }
        };

        unit("threshold", self.threshold)?;
        unit("boost_ceiling", self.boost_ceiling)?;
        unit("keyword_max_score", self.keyword_max_score)?;

        let weights = self
            .boost_terms
            .iter()
            .map(|(term, bonus)| (term.as_str(), *bonus))
            .chain([
                ("category_bonus", self.category_bonus),
                ("keyword_primary_score", self.keyword_primary_score),
                ("keyword_secondary_score", self.keyword_secondary_score),
            ]);
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoringError::InvalidConfig {
                    reason: format!("weight for '{name}' must be a non-negative number"),
                });
            }
        }

        Ok(())
    }
}
