//! The three collection job kinds, plus the tag classifier they share.

mod detail_backfill;
mod metadata_import;
mod reclassification;

pub use detail_backfill::DetailBackfillJob;
pub use metadata_import::MetadataImportJob;
pub use reclassification::ReclassificationJob;

use crate::problem_store::ProblemCategory;

/// Tag keys per category, checked top to bottom. The first category with a
/// matching tag wins, so more specific families come first.
const CATEGORY_RULES: &[(ProblemCategory, &[&str])] = &[
    (
        ProblemCategory::DynamicProgramming,
        &[
            "dp",
            "dynamic_programming",
            "knapsack",
            "lis",
            "dp_bitfield",
            "dp_tree",
            "dp_digit",
            "dp_connection_profile",
        ],
    ),
    (
        ProblemCategory::Graph,
        &[
            "graphs",
            "graph_theory",
            "graph_traversal",
            "shortest_path",
            "dijkstra",
            "floyd_warshall",
            "bellman_ford",
            "mst",
            "topological_sorting",
            "trees",
            "lca",
            "flow",
            "bipartite_matching",
            "scc",
        ],
    ),
    (
        ProblemCategory::DataStructure,
        &[
            "data_structures",
            "segtree",
            "lazyprop",
            "stack",
            "queue",
            "deque",
            "priority_queue",
            "hash_set",
            "tree_set",
            "disjoint_set",
            "fenwick_tree",
        ],
    ),
    (
        ProblemCategory::String,
        &["string", "strings", "kmp", "trie", "hashing", "parsing", "aho_corasick", "regex"],
    ),
    (
        ProblemCategory::Math,
        &[
            "math",
            "mathematics",
            "number_theory",
            "combinatorics",
            "arithmetic",
            "primality_test",
            "sieve",
            "geometry",
            "linear_algebra",
            "probability",
        ],
    ),
    (ProblemCategory::Greedy, &["greedy"]),
    (
        ProblemCategory::Search,
        &[
            "bfs",
            "dfs",
            "binary_search",
            "parametric_search",
            "bruteforcing",
            "brute_force",
            "backtracking",
            "two_pointer",
            "ternary_search",
        ],
    ),
    (
        ProblemCategory::Implementation,
        &["implementation", "simulation", "sorting", "case_work"],
    ),
];

fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Files a problem under a category from its tag keys.
pub fn classify(tags: &[String]) -> ProblemCategory {
    let normalized: Vec<String> = tags.iter().map(|t| normalize_tag(t)).collect();
    CATEGORY_RULES
        .iter()
        .find(|(_, keys)| normalized.iter().any(|t| keys.contains(&t.as_str())))
        .map(|(category, _)| *category)
        .unwrap_or(ProblemCategory::Other)
}
