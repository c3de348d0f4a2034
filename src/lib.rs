#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

// Modules for static analyses
pub mod analysis {
    // The syntax tree the checkers walk, with types and value facts attached
    pub mod ast {
        pub mod builder;
        pub mod node;
        pub mod scope;
        pub mod tree;
        pub mod value_fact;
        pub mod value_type;
    }
    // For error handling
    pub mod analysis_result;
    // The global state of the whole analysis process
    pub mod global_context;
    // Structural predicates shared by the checkers
    pub mod heuristics;
    // Bit intervals and the relation solver
    pub mod numerical {
        pub mod interval;
        pub mod probe;
        pub mod relation;
    }
    // Expression equivalence and mutation queries
    pub mod oracle {
        pub mod equivalence;
        pub mod mutation;
    }
    // Different kinds of analyses
    pub mod analyzer {
        pub mod analysis_trait;
        pub mod condition_analysis;
    }
    // Analysis options
    pub mod option;
    // Target type sizes
    pub mod platform;
    // The structure and helper functions for emitting diagnostics
    pub mod diagnostics;
}

// Modules for program property checkers
pub mod checker {
    pub mod assign_if_checker;
    pub mod bit_comparison_checker;
    pub mod checker_trait;
    pub mod condition_comparator;
    pub mod known_condition_checker;
    pub mod logic_operator_checker;
    pub mod overflow_test_checker;
    pub mod type_range_checker;
}

pub use analysis::analyzer::condition_analysis::check_translation_unit;
