//! Program-order traversal of a structured method.

use crate::{
    ir::{Instruction, Value},
    structure::{Node, StructureId},
    Result,
};

/// Callbacks for a program-order walk over [`Node`]s.
///
/// Every callback defaults to doing nothing, so a visitor only implements the
/// events it cares about. [`walk_nodes`] drives the traversal and stops at the
/// first error.
///
/// # Examples
///
/// ```rust,ignore
/// struct CountReturns(usize);
///
/// impl AstVisitor for CountReturns {
///     fn visit_return(&mut self, _value: Option<&Value>) -> Result<()> {
///         self.0 += 1;
///         Ok(())
///     }
/// }
///
/// let mut counter = CountReturns(0);
/// walk_nodes(&mut counter, &method.body)?;
/// ```
pub trait AstVisitor {
    /// A sequential instruction.
    fn visit_instruction(&mut self, _instruction: &Instruction) -> Result<()> {
        Ok(())
    }

    /// A return.
    fn visit_return(&mut self, _value: Option<&Value>) -> Result<()> {
        Ok(())
    }

    /// A break out of the construct `target`.
    fn visit_break(&mut self, _target: StructureId) -> Result<()> {
        Ok(())
    }

    /// A continue of the loop `target`.
    fn visit_continue(&mut self, _target: StructureId) -> Result<()> {
        Ok(())
    }

    /// Start of an `If` or `IfElse`, before the `then` branch.
    fn enter_if(&mut self, _condition: &Value) -> Result<()> {
        Ok(())
    }

    /// Between the branches of an `IfElse`.
    fn enter_else(&mut self) -> Result<()> {
        Ok(())
    }

    /// End of an `If` or `IfElse`.
    fn exit_if(&mut self) -> Result<()> {
        Ok(())
    }

    /// Start of a loop body.
    fn enter_loop(&mut self, _id: StructureId) -> Result<()> {
        Ok(())
    }

    /// End of a loop body.
    fn exit_loop(&mut self, _id: StructureId) -> Result<()> {
        Ok(())
    }

    /// Start of a labelled block.
    fn enter_block(&mut self, _id: StructureId) -> Result<()> {
        Ok(())
    }

    /// End of a labelled block.
    fn exit_block(&mut self, _id: StructureId) -> Result<()> {
        Ok(())
    }
}

/// Walks `nodes` in program order, calling back into `visitor`.
///
/// # Errors
///
/// Returns the first error a callback returns.
pub fn walk_nodes<V: AstVisitor + ?Sized>(visitor: &mut V, nodes: &[Node]) -> Result<()> {
    for node in nodes {
        match node {
            Node::Instruction(instruction) => visitor.visit_instruction(instruction)?,
            Node::Return(value) => visitor.visit_return(value.as_ref())?,
            Node::Break(target) => visitor.visit_break(*target)?,
            Node::Continue(target) => visitor.visit_continue(*target)?,
            Node::If { condition, then } => {
                visitor.enter_if(condition)?;
                walk_nodes(visitor, then)?;
                visitor.exit_if()?;
            }
            Node::IfElse {
                condition,
                then,
                otherwise,
            } => {
                visitor.enter_if(condition)?;
                walk_nodes(visitor, then)?;
                visitor.enter_else()?;
                walk_nodes(visitor, otherwise)?;
                visitor.exit_if()?;
            }
            Node::Loop { id, body } => {
                visitor.enter_loop(*id)?;
                walk_nodes(visitor, body)?;
                visitor.exit_loop(*id)?;
            }
            Node::LabelledBlock { id, body } => {
                visitor.enter_block(*id)?;
                walk_nodes(visitor, body)?;
                visitor.exit_block(*id)?;
            }
        }
    }
    Ok(())
}
