//! The structured statement tree produced from a control-flow graph.

use std::fmt;

use crate::{
    ir::{Instruction, ShaderType, Value, Variable},
    Result,
};

/// Label of a [`Node::Loop`] or [`Node::LabelledBlock`], named by the
/// [`Node::Break`] and [`Node::Continue`] statements that leave or restart it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructureId(pub u32);

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A statement of the structured tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A sequential instruction: an assignment or a call statement.
    Instruction(Instruction),
    /// Method return.
    Return(Option<Value>),
    /// Leave the labelled block or loop with the given id.
    Break(StructureId),
    /// Restart the loop with the given id.
    Continue(StructureId),
    /// One-sided conditional.
    If {
        /// Condition
        condition: Value,
        /// Statements run when the condition holds
        then: Vec<Node>,
    },
    /// Two-sided conditional.
    IfElse {
        /// Condition
        condition: Value,
        /// Statements run when the condition holds
        then: Vec<Node>,
        /// Statements run otherwise
        otherwise: Vec<Node>,
    },
    /// Infinite loop, left only through `Break` of an enclosing block or `Return`.
    Loop {
        /// Label
        id: StructureId,
        /// Body
        body: Vec<Node>,
    },
    /// A block whose end is the target of forward `Break`s.
    LabelledBlock {
        /// Label
        id: StructureId,
        /// Body
        body: Vec<Node>,
    },
}

impl Node {
    /// Returns `true` for statements after which control never reaches the
    /// next statement in the same sequence.
    #[must_use]
    pub fn is_jump(&self) -> bool {
        matches!(self, Node::Break(_) | Node::Continue(_) | Node::Return(_))
    }

    /// Returns the nested statement lists of a compound node.
    #[must_use]
    pub fn children(&self) -> Vec<&[Node]> {
        match self {
            Node::If { then, .. } => vec![then],
            Node::IfElse {
                then, otherwise, ..
            } => vec![then, otherwise],
            Node::Loop { body, .. } | Node::LabelledBlock { body, .. } => vec![body],
            _ => Vec::new(),
        }
    }

    /// Visits this node and every nested node, pre-order.
    pub fn walk<F: FnMut(&Node)>(&self, f: &mut F) {
        f(self);
        for list in self.children() {
            for node in list {
                node.walk(f);
            }
        }
    }
}

/// A structured method body.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Parameters, in declaration order
    pub parameters: Vec<Variable>,
    /// Return type
    pub return_type: ShaderType,
    /// Statements
    pub body: Vec<Node>,
}

impl Method {
    /// Visits every node, pre-order.
    pub fn walk<F: FnMut(&Node)>(&self, mut f: F) {
        for node in &self.body {
            node.walk(&mut f);
        }
    }

    /// Returns the number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(|_| count += 1);
        count
    }

    /// Checks that the tree is fit for emission.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InternalConsistency`](crate::Error::InternalConsistency)
    /// when a CFG-only instruction or a `Return` instruction survived as a
    /// sequential statement, when a `Break`/`Continue` names a construct that
    /// does not enclose it, when a `Continue` names a labelled block, or when
    /// two constructs share an id.
    pub fn verify(&self) -> Result<()> {
        let mut enclosing = Vec::new();
        let mut seen = Vec::new();
        verify_list(&self.body, &mut enclosing, &mut seen)
    }
}

fn verify_list(
    nodes: &[Node],
    enclosing: &mut Vec<(StructureId, bool)>,
    seen: &mut Vec<StructureId>,
) -> Result<()> {
    for node in nodes {
        match node {
            Node::Instruction(instr) => {
                if instr.is_control() || instr.is_cfg_only() {
                    return Err(consistency_error!(
                        "control instruction survived structuring: {}",
                        instr
                    ));
                }
            }
            Node::Break(id) => {
                if !enclosing.iter().any(|(e, _)| e == id) {
                    return Err(consistency_error!("break to non-enclosing {}", id));
                }
            }
            Node::Continue(id) => match enclosing.iter().find(|(e, _)| e == id) {
                Some((_, true)) => {}
                Some((_, false)) => {
                    return Err(consistency_error!("continue names labelled block {}", id))
                }
                None => return Err(consistency_error!("continue to non-enclosing {}", id)),
            },
            Node::Return(_) => {}
            Node::If { then, .. } => verify_list(then, enclosing, seen)?,
            Node::IfElse {
                then, otherwise, ..
            } => {
                verify_list(then, enclosing, seen)?;
                verify_list(otherwise, enclosing, seen)?;
            }
            Node::Loop { id, body } | Node::LabelledBlock { id, body } => {
                if seen.contains(id) {
                    return Err(consistency_error!("construct id {} used twice", id));
                }
                seen.push(*id);
                enclosing.push((*id, matches!(node, Node::Loop { .. })));
                verify_list(body, enclosing, seen)?;
                enclosing.pop();
            }
        }
    }
    Ok(())
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", param.ty, param)?;
        }
        f.write_str(") {\n")?;
        write_list(f, &self.body, 1)?;
        f.write_str("}\n")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, nodes: &[Node], depth: usize) -> fmt::Result {
    let pad = "    ".repeat(depth);
    for node in nodes {
        match node {
            Node::Instruction(instr) => writeln!(f, "{pad}{instr};")?,
            Node::Return(Some(value)) => writeln!(f, "{pad}return {value};")?,
            Node::Return(None) => writeln!(f, "{pad}return;")?,
            Node::Break(id) => writeln!(f, "{pad}break {id};")?,
            Node::Continue(id) => writeln!(f, "{pad}continue {id};")?,
            Node::If { condition, then } => {
                writeln!(f, "{pad}if {condition} {{")?;
                write_list(f, then, depth + 1)?;
                writeln!(f, "{pad}}}")?;
            }
            Node::IfElse {
                condition,
                then,
                otherwise,
            } => {
                writeln!(f, "{pad}if {condition} {{")?;
                write_list(f, then, depth + 1)?;
                writeln!(f, "{pad}}} else {{")?;
                write_list(f, otherwise, depth + 1)?;
                writeln!(f, "{pad}}}")?;
            }
            Node::Loop { id, body } => {
                writeln!(f, "{pad}{id}: loop {{")?;
                write_list(f, body, depth + 1)?;
                writeln!(f, "{pad}}}")?;
            }
            Node::LabelledBlock { id, body } => {
                writeln!(f, "{pad}{id}: {{")?;
                write_list(f, body, depth + 1)?;
                writeln!(f, "{pad}}}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CompareOp, LabelId};

    fn method(body: Vec<Node>) -> Method {
        Method {
            name: "main".to_string(),
            parameters: Vec::new(),
            return_type: ShaderType::Void,
            body,
        }
    }

    fn l0() -> Variable {
        Variable::local(0, ShaderType::INT)
    }

    #[test]
    fn test_verify_accepts_nested_jumps() {
        let m = method(vec![Node::Loop {
            id: StructureId(0),
            body: vec![Node::LabelledBlock {
                id: StructureId(1),
                body: vec![
                    Node::If {
                        condition: Value::bool(true),
                        then: vec![Node::Break(StructureId(1))],
                    },
                    Node::Continue(StructureId(0)),
                ],
            }],
        }]);
        assert!(m.verify().is_ok());
        assert_eq!(m.node_count(), 5);
    }

    #[test]
    fn test_verify_rejects_goto() {
        let m = method(vec![Node::Instruction(Instruction::Goto(LabelId(0)))]);
        assert!(matches!(
            m.verify(),
            Err(crate::Error::InternalConsistency { .. })
        ));
    }

    #[test]
    fn test_verify_rejects_stray_jumps() {
        let m = method(vec![
            Node::LabelledBlock {
                id: StructureId(0),
                body: vec![],
            },
            Node::Break(StructureId(0)),
        ]);
        assert!(m.verify().is_err());

        let m = method(vec![Node::LabelledBlock {
            id: StructureId(0),
            body: vec![Node::Continue(StructureId(0))],
        }]);
        assert!(m.verify().is_err());
    }

    #[test]
    fn test_display() {
        let m = method(vec![
            Node::IfElse {
                condition: Value::compare(CompareOp::Lt, Value::var(&l0()), Value::int(4)),
                then: vec![Node::Instruction(Instruction::assign(&l0(), Value::int(1)))],
                otherwise: vec![Node::Return(None)],
            },
            Node::Return(None),
        ]);
        let text = m.to_string();
        assert!(text.starts_with("void main() {\n"));
        assert!(text.contains("    if (l0 < 4) {\n        l0 = 1;\n    } else {\n"));
    }
}
