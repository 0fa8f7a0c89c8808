// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comment formatting pipeline.
//!
//! `orig` is Markdown. It is rendered to HTML, emoji shortcodes are
//! substituted, the result is sanitized, and finally insecure `<img>`
//! sources are rewritten through the image proxy when one is configured.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use comrak::Options;
use regex::{Captures, Regex};

use parlor_core::ParlorError;

pub struct CommentFormatter {
    image_proxy: Option<String>,
    emoji_re: Regex,
    img_re: Regex,
}

impl CommentFormatter {
    /// `image_proxy` is the full proxy endpoint, e.g.
    /// `https://example.com/api/v1/img`.
    pub fn new(image_proxy: Option<String>) -> Result<Self, ParlorError> {
        Ok(Self {
            image_proxy,
            emoji_re: Regex::new(r":([a-zA-Z0-9_+\-]+):")
                .map_err(|e| ParlorError::Internal(e.to_string()))?,
            img_re: Regex::new(r#"(?i)(<img\s[^>]*?src=")(http://[^"]+)(")"#)
                .map_err(|e| ParlorError::Internal(e.to_string()))?,
        })
    }

    /// Render `orig` to display HTML.
    pub fn format(&self, orig: &str) -> String {
        let mut options = Options::default();
        options.extension.autolink = true;
        options.extension.strikethrough = true;
        options.extension.table = true;

        let html = comrak::markdown_to_html(orig, &options);
        let html = self.substitute_emoji(&html);
        let html = ammonia::Builder::default().clean(&html).to_string();
        self.proxy_images(&html)
    }

    fn substitute_emoji(&self, html: &str) -> String {
        self.emoji_re
            .replace_all(html, |caps: &Captures| {
                match emojis::get_by_shortcode(&caps[1]) {
                    Some(emoji) => emoji.as_str().to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Route plain-http image sources through the proxy; https sources are
    /// left alone.
    fn proxy_images(&self, html: &str) -> String {
        let Some(proxy) = &self.image_proxy else {
            return html.to_string();
        };
        self.img_re
            .replace_all(html, |caps: &Captures| {
                let encoded = URL_SAFE_NO_PAD.encode(caps[2].as_bytes());
                format!("{}{proxy}?src={encoded}{}", &caps[1], &caps[3])
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter(proxy: Option<&str>) -> CommentFormatter {
        CommentFormatter::new(proxy.map(str::to_string)).unwrap()
    }

    #[test]
    fn renders_markdown() {
        let html = formatter(None).format("**bold** and _em_");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>em</em>"));
    }

    #[test]
    fn strips_scripts_and_event_handlers() {
        let html = formatter(None).format("hi <script>alert(1)</script> <b onclick=\"x()\">b</b>");
        assert!(!html.contains("<script"));
        assert!(!html.contains("onclick"));
        assert!(html.contains("<b"));
    }

    #[test]
    fn substitutes_emoji_shortcodes() {
        let html = formatter(None).format("nice :smile: work");
        assert!(html.contains('\u{1F604}'));
        assert!(!html.contains(":smile:"));

        let html = formatter(None).format("unknown :not_an_emoji_xyz: stays");
        assert!(html.contains(":not_an_emoji_xyz:"));
    }

    #[test]
    fn proxies_insecure_images_only() {
        let fmt = formatter(Some("https://example.com/api/v1/img"));
        let html = fmt.format("![a](http://insecure.example/pic.png) ![b](https://ok.example/p.png)");
        assert!(html.contains("https://example.com/api/v1/img?src="));
        assert!(!html.contains("src=\"http://insecure.example"));
        assert!(html.contains("src=\"https://ok.example/p.png\""));

        let encoded = URL_SAFE_NO_PAD.encode(b"http://insecure.example/pic.png");
        assert!(html.contains(&encoded));
    }

    #[test]
    fn no_proxy_leaves_images_untouched() {
        let html = formatter(None).format("![a](http://insecure.example/pic.png)");
        assert!(html.contains("src=\"http://insecure.example/pic.png\""));
    }
}
