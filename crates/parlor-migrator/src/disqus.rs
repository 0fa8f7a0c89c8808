// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Disqus XML importer.
//!
//! Threads and posts can be interleaved in the export, so posts referencing
//! a thread that has not been seen yet are parked in a pending map and
//! resolved at the end; posts whose thread never appears are dropped, as are
//! spam and deleted posts.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use parlor_core::{Comment, Locator, ParlorError, User};

#[derive(Default)]
struct Post {
    id: String,
    thread_id: String,
    parent_id: String,
    message: String,
    created_at: String,
    author_name: String,
    author_username: String,
    is_spam: bool,
    is_deleted: bool,
}

/// Parse a Disqus export into comments for `site`.
pub fn parse(site: &str, xml: &str) -> Result<Vec<Comment>, ParlorError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut threads: HashMap<String, String> = HashMap::new();
    let mut pending: HashMap<String, Vec<Post>> = HashMap::new();
    let mut out: Vec<Comment> = Vec::new();

    let mut post: Option<Post> = None;
    let mut thread_id: Option<String> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "thread" if post.is_none() => thread_id = dsq_id(&e),
                    "post" => {
                        let mut p = Post::default();
                        p.id = dsq_id(&e).unwrap_or_default();
                        post = Some(p);
                    }
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if let Some(p) = post.as_mut() {
                    match name.as_str() {
                        "thread" => p.thread_id = dsq_id(&e).unwrap_or_default(),
                        "parent" => p.parent_id = dsq_id(&e).unwrap_or_default(),
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default().to_string();
                apply_text(&mut post, &mut threads, &thread_id, &path, &text);
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(&t).to_string();
                apply_text(&mut post, &mut threads, &thread_id, &path, &text);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                path.pop();
                match name.as_str() {
                    "thread" if post.is_none() => thread_id = None,
                    "post" => {
                        if let Some(p) = post.take() {
                            place_post(p, site, &threads, &mut pending, &mut out);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParlorError::Validation(format!("broken disqus xml: {e}")));
            }
        }
    }

    // posts parked before their thread appeared
    for (tid, posts) in pending {
        match threads.get(&tid) {
            Some(url) => {
                for p in posts {
                    out.push(to_comment(p, site, url));
                }
            }
            None => warn!(thread = %tid, "posts dropped, thread never seen"),
        }
    }
    debug!(comments = out.len(), "disqus parse done");
    Ok(out)
}

fn apply_text(
    post: &mut Option<Post>,
    threads: &mut HashMap<String, String>,
    thread_id: &Option<String>,
    path: &[String],
    text: &str,
) {
    let Some(leaf) = path.last() else { return };
    match post {
        Some(p) => match leaf.as_str() {
            "message" => p.message.push_str(text),
            "createdAt" => p.created_at = text.to_string(),
            "isSpam" => p.is_spam = text == "true",
            "isDeleted" => p.is_deleted = text == "true",
            "name" => p.author_name = text.to_string(),
            "username" => p.author_username = text.to_string(),
            _ => {}
        },
        None => {
            if leaf == "link" {
                if let Some(tid) = thread_id {
                    threads.insert(tid.clone(), text.to_string());
                }
            }
        }
    }
}

fn place_post(
    post: Post,
    site: &str,
    threads: &HashMap<String, String>,
    pending: &mut HashMap<String, Vec<Post>>,
    out: &mut Vec<Comment>,
) {
    if post.is_spam || post.is_deleted {
        return;
    }
    match threads.get(&post.thread_id) {
        Some(url) => {
            let url = url.clone();
            out.push(to_comment(post, site, &url));
        }
        None => pending.entry(post.thread_id.clone()).or_default().push(post),
    }
}

fn to_comment(post: Post, site: &str, url: &str) -> Comment {
    let username = if post.author_username.is_empty() {
        &post.author_name
    } else {
        &post.author_username
    };
    Comment {
        id: format!("disqus_{}", post.id),
        parent_id: if post.parent_id.is_empty() {
            String::new()
        } else {
            format!("disqus_{}", post.parent_id)
        },
        text: post.message.clone(),
        orig: post.message,
        user: User {
            id: format!("disqus_{}", hex::encode(Sha1::digest(username.as_bytes()))),
            name: post.author_name,
            ..User::default()
        },
        locator: Locator::new(site, url),
        timestamp: parse_time(&post.created_at),
        imported: true,
        ..Comment::default()
    }
}

fn parse_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|naive| naive.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn dsq_id(e: &BytesStart) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        (attr.key.as_ref() == b"dsq:id")
            .then(|| String::from_utf8_lossy(&attr.value).to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<disqus xmlns:dsq="http://disqus.com/disqus-internals">
  <post dsq:id="p-early">
    <message><![CDATA[posted before its thread]]></message>
    <createdAt>2017-06-27T05:31:21Z</createdAt>
    <isDeleted>false</isDeleted>
    <isSpam>false</isSpam>
    <author><name>Early Bird</name><username>early</username></author>
    <thread dsq:id="t-2" />
  </post>
  <thread dsq:id="t-1">
    <link>https://example.com/post-1</link>
  </thread>
  <thread dsq:id="t-2">
    <link>https://example.com/post-2</link>
  </thread>
  <post dsq:id="p-1">
    <message><![CDATA[<p>hello there</p>]]></message>
    <createdAt>2017-06-27T05:31:22Z</createdAt>
    <isDeleted>false</isDeleted>
    <isSpam>false</isSpam>
    <author><name>Some One</name><username>someone</username></author>
    <thread dsq:id="t-1" />
  </post>
  <post dsq:id="p-2">
    <message><![CDATA[a reply]]></message>
    <createdAt>2017-06-27T06:00:00Z</createdAt>
    <isDeleted>false</isDeleted>
    <isSpam>false</isSpam>
    <author><name>Other</name><username>other</username></author>
    <thread dsq:id="t-1" />
    <parent dsq:id="p-1" />
  </post>
  <post dsq:id="p-spam">
    <message><![CDATA[buy stuff]]></message>
    <createdAt>2017-06-27T07:00:00Z</createdAt>
    <isDeleted>false</isDeleted>
    <isSpam>true</isSpam>
    <author><name>Spammer</name><username>spam</username></author>
    <thread dsq:id="t-1" />
  </post>
  <post dsq:id="p-orphan">
    <message><![CDATA[thread missing]]></message>
    <createdAt>2017-06-27T08:00:00Z</createdAt>
    <isDeleted>false</isDeleted>
    <isSpam>false</isSpam>
    <author><name>Ghost</name><username>ghost</username></author>
    <thread dsq:id="t-unknown" />
  </post>
</disqus>"#;

    #[test]
    fn parses_threads_posts_and_pending() {
        let comments = parse("site-1", XML).unwrap();
        // spam and orphan dropped, early post resolved at the end
        assert_eq!(comments.len(), 3);

        let p1 = comments.iter().find(|c| c.id == "disqus_p-1").unwrap();
        assert_eq!(p1.locator.url, "https://example.com/post-1");
        assert_eq!(p1.orig, "<p>hello there</p>");
        assert_eq!(p1.user.name, "Some One");
        assert!(p1.user.id.starts_with("disqus_"));
        assert!(p1.imported);

        let reply = comments.iter().find(|c| c.id == "disqus_p-2").unwrap();
        assert_eq!(reply.parent_id, "disqus_p-1");

        let early = comments.iter().find(|c| c.id == "disqus_p-early").unwrap();
        assert_eq!(early.locator.url, "https://example.com/post-2");
    }

    #[test]
    fn author_hash_is_stable_per_username() {
        let comments = parse("site-1", XML).unwrap();
        let p1 = comments.iter().find(|c| c.id == "disqus_p-1").unwrap();
        let expected = format!("disqus_{}", hex::encode(Sha1::digest(b"someone")));
        assert_eq!(p1.user.id, expected);
    }

    #[test]
    fn broken_xml_is_a_validation_error() {
        let err = parse("site-1", "<disqus><post></disqus>").unwrap_err();
        assert!(matches!(err, ParlorError::Validation(_)));
    }
}
