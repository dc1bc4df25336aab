//! Control flow edge classification.

use crate::ir::Literal;

/// The kind of control flow an edge represents.
///
/// Edges are stored as plain successor lists on each block; the kind of the
/// i-th successor is derived from the block's terminator, see
/// [`IntermediaryCfg::edge_kinds`](crate::analysis::IntermediaryCfg::edge_kinds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgEdgeKind {
    /// Fall-through, `Goto` or return to the exit sentinel.
    Unconditional,

    /// The taken side of a `JumpIf`.
    ConditionalTrue,

    /// The fall-through side of a `JumpIf`.
    ConditionalFalse,

    /// A switch case edge.
    Switch {
        /// The case value, or `None` for the default target.
        case_value: Option<Literal>,
    },
}

impl CfgEdgeKind {
    /// Returns `true` for either side of a conditional branch.
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self, Self::ConditionalTrue | Self::ConditionalFalse)
    }

    /// Returns `true` for switch edges, including the default edge.
    #[must_use]
    pub const fn is_switch(&self) -> bool {
        matches!(self, Self::Switch { .. })
    }

    /// Short label used in DOT output.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            CfgEdgeKind::Unconditional => String::new(),
            CfgEdgeKind::ConditionalTrue => "true".to_string(),
            CfgEdgeKind::ConditionalFalse => "false".to_string(),
            CfgEdgeKind::Switch { case_value } => {
                case_value.map_or("default".to_string(), |v| format!("case {v}"))
            }
        }
    }

    /// Graphviz edge color.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            CfgEdgeKind::Unconditional => "black",
            CfgEdgeKind::ConditionalTrue => "green",
            CfgEdgeKind::ConditionalFalse => "red",
            CfgEdgeKind::Switch { .. } => "blue",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_predicates() {
        assert!(CfgEdgeKind::ConditionalTrue.is_conditional());
        assert!(CfgEdgeKind::ConditionalFalse.is_conditional());
        assert!(!CfgEdgeKind::Unconditional.is_conditional());
        assert!(CfgEdgeKind::Switch { case_value: None }.is_switch());
    }

    #[test]
    fn test_edge_labels() {
        assert_eq!(CfgEdgeKind::Unconditional.label(), "");
        assert_eq!(
            CfgEdgeKind::Switch {
                case_value: Some(Literal::Int(4))
            }
            .label(),
            "case 4"
        );
        assert_eq!(CfgEdgeKind::Switch { case_value: None }.label(), "default");
    }
}
