use super::node::NodeId;
use std::fmt;

/// What the value-flow producer knows about a value
#[derive(Clone, Debug, PartialEq)]
pub enum FactPayload {
    Int(i64),
    Float(f64),
    BufferSize(i64),
    Uninitialized,
    /// Value flow gave up tracking the value here
    Bailout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Certainty {
    Known,
    Possible,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    Possible,
    /// The value can never occur
    Impossible,
}

/// One step of the reasoning chain that led to a fact
#[derive(Clone, Debug, PartialEq)]
pub struct ProvenanceStep {
    pub node: NodeId,
    pub explanation: String,
}

/// A fact about the runtime value of a node, attached before the analysis starts
#[derive(Clone, Debug, PartialEq)]
pub struct ValueFact {
    pub payload: FactPayload,
    pub certainty: Certainty,
    pub polarity: Polarity,
    pub provenance: Vec<ProvenanceStep>,
}

impl ValueFact {
    pub fn known_int(value: i64) -> Self {
        Self {
            payload: FactPayload::Int(value),
            certainty: Certainty::Known,
            polarity: Polarity::Possible,
            provenance: Vec::new(),
        }
    }

    pub fn possible_int(value: i64) -> Self {
        Self {
            payload: FactPayload::Int(value),
            certainty: Certainty::Possible,
            polarity: Polarity::Possible,
            provenance: Vec::new(),
        }
    }

    pub fn impossible_int(value: i64) -> Self {
        Self {
            payload: FactPayload::Int(value),
            certainty: Certainty::Known,
            polarity: Polarity::Impossible,
            provenance: Vec::new(),
        }
    }

    pub fn bailout() -> Self {
        Self {
            payload: FactPayload::Bailout,
            certainty: Certainty::Possible,
            polarity: Polarity::Possible,
            provenance: Vec::new(),
        }
    }

    pub fn with_step(mut self, node: NodeId, explanation: &str) -> Self {
        self.provenance.push(ProvenanceStep {
            node,
            explanation: explanation.to_owned(),
        });
        self
    }

    pub fn is_known(&self) -> bool {
        self.certainty == Certainty::Known
    }

    pub fn is_impossible(&self) -> bool {
        self.polarity == Polarity::Impossible
    }

    /// The integer this fact pins the value to, if it is a known possible int
    pub fn known_int_value(&self) -> Option<i64> {
        match self.payload {
            FactPayload::Int(v) if self.is_known() && !self.is_impossible() => Some(v),
            _ => None,
        }
    }

    /// Truth value implied by the fact when the node is used as a condition
    pub fn truth(&self) -> Option<bool> {
        match (&self.payload, self.certainty, self.polarity) {
            (FactPayload::Int(v), Certainty::Known, Polarity::Possible) => Some(*v != 0),
            (FactPayload::Int(0), Certainty::Known, Polarity::Impossible) => Some(true),
            _ => None,
        }
    }
}

impl fmt::Display for ValueFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match (self.certainty, self.polarity) {
            (_, Polarity::Impossible) => "!",
            (Certainty::Known, _) => "=",
            (Certainty::Possible, _) => "~",
        };
        match &self.payload {
            FactPayload::Int(v) => write!(f, "{}{}", prefix, v),
            FactPayload::Float(v) => write!(f, "{}{}", prefix, v),
            FactPayload::BufferSize(v) => write!(f, "{}size({})", prefix, v),
            FactPayload::Uninitialized => write!(f, "{}uninit", prefix),
            FactPayload::Bailout => write!(f, "bailout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truth_of_facts() {
        assert_eq!(ValueFact::known_int(5).truth(), Some(true));
        assert_eq!(ValueFact::known_int(0).truth(), Some(false));
        assert_eq!(ValueFact::impossible_int(0).truth(), Some(true));
        assert_eq!(ValueFact::impossible_int(3).truth(), None);
        assert_eq!(ValueFact::possible_int(1).truth(), None);
        assert_eq!(ValueFact::bailout().truth(), None);
    }

    #[test]
    fn test_known_int_value_ignores_impossible() {
        assert_eq!(ValueFact::known_int(-2).known_int_value(), Some(-2));
        assert_eq!(ValueFact::impossible_int(0).known_int_value(), None);
    }
}
