//! Message tree assembly
//!
//! Turns the flat, time-ordered message rows of one topic into the shape
//! the viewer asked for: a reply forest or a flat list. Assembly is
//! index-based and iterative, so arbitrarily deep reply chains cannot
//! exhaust the stack.

use serde::Serialize;
use std::collections::HashMap;

use crate::entity::message;
use crate::error::{AppError, AppResult};
use crate::render::TextRenderer;

/// One message in a listing, with its rendered body and nested replies
#[derive(Clone, Debug, Serialize)]
pub struct MessageNode {
    pub id: i64,
    pub replyto: i64,
    pub time: i64,
    pub author: String,
    /// Body as safe display markup
    pub body: String,
    /// Created after the viewer last opened the topic
    pub new: bool,
    pub replies: Vec<MessageNode>,
}

fn node(
    row: &message::Model,
    replies: Vec<MessageNode>,
    visit_time: i64,
    renderer: &dyn TextRenderer,
) -> MessageNode {
    MessageNode {
        id: row.id,
        replyto: row.replyto,
        time: row.time,
        author: row.author.clone(),
        body: renderer.render(&row.body),
        new: row.time > visit_time,
        replies,
    }
}

/// Build the reply forest of a topic
///
/// `rows` must be the topic's messages in ascending time order. Roots are
/// the direct topic replies, kept in that order; every other message is
/// attached to its parent in encounter order. A message whose parent is
/// not in the set is an internal-consistency error: the schema guarantees
/// replies stay inside their topic, so a dangling parent means corrupt
/// data, not a message to quietly promote to a root.
pub fn threaded(
    rows: &[message::Model],
    visit_time: i64,
    renderer: &dyn TextRenderer,
) -> AppResult<Vec<MessageNode>> {
    let index: HashMap<i64, usize> = rows.iter().enumerate().map(|(i, m)| (m.id, i)).collect();

    let mut child_indexes: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut root_indexes: Vec<usize> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        if row.is_topic_reply() {
            root_indexes.push(i);
            continue;
        }
        match index.get(&row.replyto) {
            Some(&parent) if parent != i => child_indexes[parent].push(i),
            Some(_) => {
                return Err(AppError::Inconsistent(format!(
                    "message {} replies to itself",
                    row.id
                )))
            }
            None => {
                return Err(AppError::Inconsistent(format!(
                    "message {} replies to unknown message {}",
                    row.id, row.replyto
                )))
            }
        }
    }

    // Children always come later in time than their parent, so a reverse
    // sweep has every child finished before its parent is assembled.
    let mut nodes: Vec<Option<MessageNode>> = vec![None; rows.len()];
    for i in (0..rows.len()).rev() {
        let mut replies = Vec::with_capacity(child_indexes[i].len());
        for &child in &child_indexes[i] {
            let child_node = nodes[child].take().ok_or_else(|| {
                AppError::Inconsistent(format!(
                    "message {} is out of order with its reply",
                    rows[i].id
                ))
            })?;
            replies.push(child_node);
        }
        nodes[i] = Some(node(&rows[i], replies, visit_time, renderer));
    }

    let mut roots = Vec::with_capacity(root_indexes.len());
    for i in root_indexes {
        let root = nodes[i]
            .take()
            .ok_or_else(|| AppError::Inconsistent(format!("message {} claimed twice", rows[i].id)))?;
        roots.push(root);
    }
    Ok(roots)
}

/// Flat listing, preserving the query order verbatim
pub fn flat(
    rows: &[message::Model],
    visit_time: i64,
    renderer: &dyn TextRenderer,
) -> Vec<MessageNode> {
    rows.iter()
        .map(|row| node(row, Vec::new(), visit_time, renderer))
        .collect()
}
