use serde::{Deserialize, Serialize};

/// Coarse algorithm family a problem is filed under, derived from its tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCategory {
    DynamicProgramming,
    Graph,
    DataStructure,
    Math,
    String,
    Greedy,
    Search,
    Implementation,
    Other,
}

impl ProblemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemCategory::DynamicProgramming => "dynamic_programming",
            ProblemCategory::Graph => "graph",
            ProblemCategory::DataStructure => "data_structure",
            ProblemCategory::Math => "math",
            ProblemCategory::String => "string",
            ProblemCategory::Greedy => "greedy",
            ProblemCategory::Search => "search",
            ProblemCategory::Implementation => "implementation",
            ProblemCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dynamic_programming" => Some(ProblemCategory::DynamicProgramming),
            "graph" => Some(ProblemCategory::Graph),
            "data_structure" => Some(ProblemCategory::DataStructure),
            "math" => Some(ProblemCategory::Math),
            "string" => Some(ProblemCategory::String),
            "greedy" => Some(ProblemCategory::Greedy),
            "search" => Some(ProblemCategory::Search),
            "implementation" => Some(ProblemCategory::Implementation),
            "other" => Some(ProblemCategory::Other),
            _ => None,
        }
    }
}

/// A stored practice problem, keyed by its numeric problem id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub problem_id: u32,
    pub title: String,
    /// Difficulty level as reported by the metadata API (0 = unrated).
    pub level: u32,
    pub accepted_user_count: u64,
    pub average_tries: f64,
    pub tags: Vec<String>,
    pub category: ProblemCategory,
    // Detail fields, crawled separately and null until then.
    pub description: Option<String>,
    pub input_description: Option<String>,
    pub output_description: Option<String>,
    /// Unix millis of the last write.
    pub updated_at: i64,
}

impl Problem {
    pub fn has_detail(&self) -> bool {
        self.description.is_some()
            && self.input_description.is_some()
            && self.output_description.is_some()
    }
}

/// Predicates selecting a work set out of the stored problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemFilter {
    All,
    /// Problems where any crawled detail field is still null.
    MissingDetail,
}
