//! Clean-up rewrites over a freshly structured tree.
//!
//! The structurer emits a `Break` or `Continue` at the end of every path, many
//! of them redundant, and wraps a labelled block around every merge point.
//! This pass repeats the following rewrites until none applies:
//!
//! - a `Continue` of a loop in tail position of its body is dropped, as is a
//!   `Break` of a labelled block in tail position of its body;
//! - a labelled block nothing breaks out of is replaced by its body;
//! - an `IfElse` with an empty side becomes an `If`, and one whose `then`
//!   side ends in a jump becomes an `If` followed by the `else` statements;
//! - an `If` with an empty body and a call-free condition is dropped;
//! - statements after a jump in the same sequence are dropped.

use crate::{
    ir::Value,
    structure::ast::{Node, StructureId},
};

/// Simplifies `body` to a fixed point.
pub(crate) fn simplify(mut body: Vec<Node>) -> Vec<Node> {
    loop {
        let next = simplify_list(body.clone());
        if next == body {
            return next;
        }
        body = next;
    }
}

fn simplify_list(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::If { condition, then } => push_if(&mut out, condition, simplify_list(then)),
            Node::IfElse {
                condition,
                then,
                otherwise,
            } => {
                let then = simplify_list(then);
                let otherwise = simplify_list(otherwise);
                if otherwise.is_empty() {
                    push_if(&mut out, condition, then);
                } else if then.is_empty() {
                    push_if(&mut out, Value::not(condition), otherwise);
                } else if then.last().is_some_and(Node::is_jump) {
                    out.push(Node::If { condition, then });
                    out.extend(otherwise);
                } else {
                    out.push(Node::IfElse {
                        condition,
                        then,
                        otherwise,
                    });
                }
            }
            Node::Loop { id, mut body } => {
                let jump = Node::Continue(id);
                strip_tail(&mut body, &jump);
                let mut body = simplify_list(body);
                strip_tail(&mut body, &jump);
                out.push(Node::Loop { id, body });
            }
            Node::LabelledBlock { id, mut body } => {
                let jump = Node::Break(id);
                strip_tail(&mut body, &jump);
                let mut body = simplify_list(body);
                strip_tail(&mut body, &jump);
                if breaks_to(&body, id) {
                    out.push(Node::LabelledBlock { id, body });
                } else {
                    out.extend(body);
                }
            }
            other => out.push(other),
        }
        if out.last().is_some_and(Node::is_jump) {
            break;
        }
    }
    out
}

fn push_if(out: &mut Vec<Node>, condition: Value, then: Vec<Node>) {
    if then.is_empty() && condition.calls().is_empty() {
        return;
    }
    out.push(Node::If { condition, then });
}

/// Removes `jump` wherever it is the last statement executed before control
/// would reach the end of `nodes` anyway.
fn strip_tail(nodes: &mut Vec<Node>, jump: &Node) {
    if nodes.last() == Some(jump) {
        nodes.pop();
        return;
    }
    match nodes.last_mut() {
        Some(Node::If { then, .. }) => strip_tail(then, jump),
        Some(Node::IfElse {
            then, otherwise, ..
        }) => {
            strip_tail(then, jump);
            strip_tail(otherwise, jump);
        }
        Some(Node::LabelledBlock { body, .. }) => strip_tail(body, jump),
        _ => {}
    }
}

fn breaks_to(nodes: &[Node], id: StructureId) -> bool {
    let mut found = false;
    for node in nodes {
        node.walk(&mut |n| found |= *n == Node::Break(id));
    }
    found
}
