// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WordPress WXR importer. Comments are nested inside `<item>` elements and
//! carry HTML-escaped content; only approved comments are taken.

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use sha1::{Digest, Sha1};
use tracing::debug;

use parlor_core::{Comment, Locator, ParlorError, User};

#[derive(Default)]
struct WpComment {
    id: String,
    author: String,
    date_gmt: String,
    content: String,
    approved: String,
    parent: String,
}

/// Parse a WXR dump into comments for `site`.
pub fn parse(site: &str, xml: &str) -> Result<Vec<Comment>, ParlorError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out: Vec<Comment> = Vec::new();
    let mut in_item = false;
    let mut item_link = String::new();
    let mut comment: Option<WpComment> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "item" => {
                        in_item = true;
                        item_link.clear();
                    }
                    "comment" if in_item => comment = Some(WpComment::default()),
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default().to_string();
                apply_text(&mut comment, in_item, &mut item_link, &path, &text);
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(&t).to_string();
                apply_text(&mut comment, in_item, &mut item_link, &path, &text);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                path.pop();
                match name.as_str() {
                    "item" => in_item = false,
                    "comment" => {
                        if let Some(c) = comment.take() {
                            if c.approved == "1" && !c.content.is_empty() {
                                out.push(to_comment(c, site, &item_link));
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParlorError::Validation(format!("broken wxr xml: {e}")));
            }
        }
    }
    debug!(comments = out.len(), "wordpress parse done");
    Ok(out)
}

fn apply_text(
    comment: &mut Option<WpComment>,
    in_item: bool,
    item_link: &mut String,
    path: &[String],
    text: &str,
) {
    let Some(leaf) = path.last() else { return };
    match comment {
        Some(c) => match leaf.as_str() {
            "comment_id" => c.id = text.to_string(),
            "comment_author" => c.author = text.to_string(),
            "comment_date_gmt" => c.date_gmt = text.to_string(),
            "comment_content" => c.content.push_str(text),
            "comment_approved" => c.approved = text.to_string(),
            "comment_parent" => c.parent = text.to_string(),
            _ => {}
        },
        None if in_item && leaf == "link" => *item_link = text.to_string(),
        None => {}
    }
}

fn to_comment(c: WpComment, site: &str, url: &str) -> Comment {
    let content = html_escape::decode_html_entities(&c.content).to_string();
    Comment {
        id: format!("wordpress_{}", c.id),
        parent_id: if c.parent.is_empty() || c.parent == "0" {
            String::new()
        } else {
            format!("wordpress_{}", c.parent)
        },
        text: content.clone(),
        orig: content,
        user: User {
            id: format!(
                "wordpress_{}",
                hex::encode(Sha1::digest(c.author.as_bytes()))
            ),
            name: c.author,
            ..User::default()
        },
        locator: Locator::new(site, url),
        timestamp: parse_time(&c.date_gmt),
        imported: true,
        ..Comment::default()
    }
}

fn parse_time(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}
