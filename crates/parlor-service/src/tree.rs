// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comment tree assembly.
//!
//! A flat comment list becomes a forest rooted at comments with an empty
//! parent id. Replies are always ordered by timestamp ascending; the
//! requested sort key applies to the top level only. Deleted roots survive
//! only when a non-deleted descendant keeps the thread alive.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use parlor_core::{Comment, SortField, SortKey};

/// One comment with its reply subtree.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub replies: Vec<Node>,
}

struct Built {
    node: Node,
    /// Latest timestamp among non-deleted comments in the subtree.
    activity: Option<DateTime<Utc>>,
    live: usize,
}

/// Build the sorted forest for one page.
pub fn make_tree(comments: Vec<Comment>, sort: SortKey) -> Vec<Node> {
    let mut children: HashMap<String, Vec<Comment>> = HashMap::new();
    let mut roots: Vec<Comment> = Vec::new();
    for c in comments {
        if c.parent_id.is_empty() {
            roots.push(c);
        } else {
            children.entry(c.parent_id.clone()).or_default().push(c);
        }
    }

    let mut built: Vec<Built> = roots
        .into_iter()
        .map(|root| build_subtree(root, &mut children))
        .filter(|b| b.live > 0)
        .collect();

    built.sort_by(|a, b| {
        let primary = match sort.field {
            SortField::Time => a.node.comment.timestamp.cmp(&b.node.comment.timestamp),
            SortField::Score => a.node.comment.score.cmp(&b.node.comment.score),
            SortField::Controversy => a
                .node
                .comment
                .controversy
                .total_cmp(&b.node.comment.controversy),
            SortField::Active => a.activity.cmp(&b.activity),
        };
        let primary = if sort.desc { primary.reverse() } else { primary };
        match primary {
            Ordering::Equal => a.node.comment.timestamp.cmp(&b.node.comment.timestamp),
            other => other,
        }
    });

    built.into_iter().map(|b| b.node).collect()
}

fn build_subtree(comment: Comment, children: &mut HashMap<String, Vec<Comment>>) -> Built {
    let mut replies = children.remove(&comment.id).unwrap_or_default();
    replies.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut live = usize::from(!comment.deleted);
    let mut activity = (!comment.deleted).then_some(comment.timestamp);
    let replies: Vec<Node> = replies
        .into_iter()
        .map(|reply| {
            let sub = build_subtree(reply, children);
            live += sub.live;
            activity = activity.max(sub.activity);
            sub.node
        })
        .collect();

    Built {
        node: Node { comment, replies },
        activity,
        live,
    }
}
