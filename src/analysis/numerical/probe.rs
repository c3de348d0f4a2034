//! Decides combinations of two relations on the same expression by evaluating them at
//! five representative values. Both relations are constant between consecutive
//! constants, so the probes cover every region of the number line.

use crate::analysis::numerical::relation::{Comparison, Number};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub always_true: bool,
    pub always_false: bool,
    /// Whenever the first operand holds, the second one does too
    pub first_is_sufficient: bool,
    /// Whenever the second operand holds, the first one does too
    pub second_is_sufficient: bool,
}

impl ProbeOutcome {
    fn undecided() -> Self {
        ProbeOutcome {
            always_true: false,
            always_false: false,
            first_is_sufficient: false,
            second_is_sufficient: false,
        }
    }
}

/// Below both constants, the first, one strictly between (when there is room),
/// the second, and above both
pub fn probe_values(v1: Number, v2: Number) -> Vec<Number> {
    match (v1, v2) {
        (Number::Int(a), Number::Int(b)) => {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let between = if hi - lo >= 2 { lo + (hi - lo) / 2 } else { lo + 1 };
            vec![lo - 1, a, between, b, hi + 1]
                .into_iter()
                .map(Number::Int)
                .collect()
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            vec![lo - 1.0, a, (a + b) / 2.0, b, hi + 1.0]
                .into_iter()
                .map(Number::Float)
                .collect()
        }
    }
}

/// Evaluates `first && second` (or `first || second`) at every probe.
/// Negative probes are skipped for unsigned bases.
pub fn probe(first: &Comparison, second: &Comparison, conjunction: bool, unsigned: bool) -> ProbeOutcome {
    let mut outcome = ProbeOutcome {
        always_true: true,
        always_false: true,
        first_is_sufficient: true,
        second_is_sufficient: true,
    };
    let mut evaluated = 0;
    for x in probe_values(first.relation.value, second.relation.value) {
        if unsigned && x.as_f64() < 0.0 {
            continue;
        }
        evaluated += 1;
        let r1 = first.is_true_for(x);
        let r2 = second.is_true_for(x);
        let combined = if conjunction { r1 && r2 } else { r1 || r2 };
        outcome.always_true &= combined;
        outcome.always_false &= !combined;
        outcome.first_is_sufficient &= !(r1 && !r2);
        outcome.second_is_sufficient &= !(r2 && !r1);
    }
    if evaluated == 0 {
        return ProbeOutcome::undecided();
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ast::node::NodeId;
    use crate::analysis::numerical::relation::{RelOp, Relation};

    fn cmp(op: RelOp, value: Number) -> Comparison {
        Comparison {
            base: NodeId(0),
            negated: false,
            relation: Relation::new(op, value),
            value_text: value.to_string(),
            explicit: true,
            inconclusive: false,
        }
    }

    #[test]
    fn test_probe_values() {
        let values = probe_values(Number::Int(1), Number::Int(3));
        assert_eq!(
            values,
            vec![
                Number::Int(0),
                Number::Int(1),
                Number::Int(2),
                Number::Int(3),
                Number::Int(4)
            ]
        );
        let values = probe_values(Number::Int(10), Number::Int(0));
        assert_eq!(values[2], Number::Int(5));
        let values = probe_values(Number::Float(1.0), Number::Float(2.0));
        assert_eq!(values[2], Number::Float(1.5));
    }

    #[test]
    fn test_disjunction_always_true() {
        let outcome = probe(
            &cmp(RelOp::Ne, Number::Int(1)),
            &cmp(RelOp::Ne, Number::Int(3)),
            false,
            false,
        );
        assert!(outcome.always_true);
        assert!(!outcome.always_false);
    }

    #[test]
    fn test_redundant_conjunction() {
        let outcome = probe(
            &cmp(RelOp::Gt, Number::Int(5)),
            &cmp(RelOp::Ne, Number::Int(1)),
            true,
            false,
        );
        assert!(!outcome.always_true && !outcome.always_false);
        assert!(outcome.first_is_sufficient);
        assert!(!outcome.second_is_sufficient);
    }

    #[test]
    fn test_unsigned_skips_negative_probes() {
        // For unsigned x, `x >= 0 || x == 3` is always true only without negative probes
        let first = cmp(RelOp::Ge, Number::Int(0));
        let second = cmp(RelOp::Eq, Number::Int(3));
        assert!(!probe(&first, &second, false, false).always_true);
        assert!(probe(&first, &second, false, true).always_true);
    }

    #[test]
    fn test_probes_agree_with_dense_sample() {
        let ops = [RelOp::Eq, RelOp::Ne, RelOp::Lt, RelOp::Le, RelOp::Gt, RelOp::Ge];
        for op1 in ops.iter() {
            for op2 in ops.iter() {
                for v1 in -2..3 {
                    for v2 in -2..3 {
                        let first = cmp(*op1, Number::Int(v1));
                        let second = cmp(*op2, Number::Int(v2));
                        for conjunction in [true, false].iter() {
                            let outcome = probe(&first, &second, *conjunction, false);
                            let mut always_true = true;
                            let mut always_false = true;
                            for x in -10..10 {
                                let r1 = first.is_true_for(Number::Int(x));
                                let r2 = second.is_true_for(Number::Int(x));
                                let r = if *conjunction { r1 && r2 } else { r1 || r2 };
                                always_true &= r;
                                always_false &= !r;
                            }
                            assert_eq!(outcome.always_true, always_true);
                            assert_eq!(outcome.always_false, always_false);
                        }
                    }
                }
            }
        }
    }
}
