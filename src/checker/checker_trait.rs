use crate::analysis::ast::node::NodeId;
use crate::analysis::ast::tree::Ast;
use crate::analysis::global_context::GlobalContext;
use crate::checker::assign_if_checker::AssignIfChecker;
use crate::checker::bit_comparison_checker::BitComparisonChecker;
use crate::checker::condition_comparator::ConditionComparator;
use crate::checker::known_condition_checker::KnownConditionChecker;
use crate::checker::logic_operator_checker::LogicOperatorChecker;
use crate::checker::overflow_test_checker::OverflowTestChecker;
use crate::checker::type_range_checker::TypeRangeChecker;

pub trait CheckerTrait<'ast, 'b> {
    fn new(context: &'b mut GlobalContext<'ast>) -> Self;

    /// Runs every check of this checker
    fn run(&mut self);
}

/// One entry of the check registry
pub struct CheckDescriptor {
    pub name: &'static str,
    pub run: fn(&mut GlobalContext<'_>),
}

/// All checks, in the order they run. Earlier checks win when two of them would
/// report the same condition.
pub static CHECKS: &[CheckDescriptor] = &[
    CheckDescriptor {
        name: "assignIf",
        run: |context| AssignIfChecker::new(context).run(),
    },
    CheckDescriptor {
        name: "badBitmaskCheck",
        run: |context| BitComparisonChecker::new(context).check_bad_bitmask(),
    },
    CheckDescriptor {
        name: "comparison",
        run: |context| BitComparisonChecker::new(context).check_comparison(),
    },
    CheckDescriptor {
        name: "duplicateCondition",
        run: |context| ConditionComparator::new(context).check_duplicate_condition(),
    },
    CheckDescriptor {
        name: "multiCondition",
        run: |context| ConditionComparator::new(context).check_else_if_chains(),
    },
    CheckDescriptor {
        name: "multiCondition2",
        run: |context| ConditionComparator::new(context).check_nested_conditions(),
    },
    CheckDescriptor {
        name: "checkIncorrectLogicOperator",
        run: |context| LogicOperatorChecker::new(context).run(),
    },
    CheckDescriptor {
        name: "checkInvalidTestForOverflow",
        run: |context| OverflowTestChecker::new(context).run(),
    },
    CheckDescriptor {
        name: "checkModuloAlwaysTrueFalse",
        run: |context| TypeRangeChecker::new(context).check_modulo(),
    },
    CheckDescriptor {
        name: "alwaysTrueFalse",
        run: |context| KnownConditionChecker::new(context).run(),
    },
    CheckDescriptor {
        name: "checkCompareValueOutOfTypeRange",
        run: |context| TypeRangeChecker::new(context).check_type_range(),
    },
];

/// Roots of the trees to scan, in source order: function bodies and free-standing nodes
pub fn scan_roots(ast: &Ast) -> Vec<NodeId> {
    ast.preorder()
        .iter()
        .copied()
        .filter(|id| ast.parent(*id).is_none())
        .collect()
}
