//! `jekyll-avatar`: a GitHub user's avatar image.
//!
//! ```text
//! {% avatar osteele %}
//! {% avatar user='osteele' size=20 %}
//! {% avatar user=page.author %}
//! ```
//!
//! The image is served from GitHub's avatar host at 1x through 4x density.

use super::{CapabilityRegistry, PluginError, RenderContext, TagArgs};
use html_escape::encode_quoted_attribute;

const DEFAULT_SIZE: u32 = 40;
/// Largest accepted `size`; the 4x srcset entry must stay representable.
const MAX_SIZE: u32 = 4096;
const AVATAR_HOST: &str = "https://avatars3.githubusercontent.com";

pub fn install(registry: &mut CapabilityRegistry) -> Result<(), PluginError> {
    registry.register_tag("avatar", avatar_tag)
}

fn avatar_tag(args: &TagArgs, ctx: &RenderContext<'_>) -> Result<String, PluginError> {
    let user = args
        .resolve_string("user", ctx.bindings)
        .or_else(|| args.positional.first().cloned())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| PluginError::Tag {
            tag: "avatar".into(),
            message: "missing user".into(),
        })?;
    let size = match args.resolve_string("size", ctx.bindings) {
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=MAX_SIZE).contains(n))
            .ok_or_else(|| PluginError::Tag {
                tag: "avatar".into(),
                message: format!("size must be an integer from 1 to {MAX_SIZE}, got {raw:?}"),
            })?,
        None => DEFAULT_SIZE,
    };

    let user = encode_quoted_attribute(&user);
    let src = |scale: u32| format!("{AVATAR_HOST}/{user}?v=3&amp;s={}", size * scale);
    let srcset = (1..=4)
        .map(|scale| format!("{} {scale}x", src(scale)))
        .collect::<Vec<_>>()
        .join(", ");
    let class = if size < 48 {
        "avatar avatar-small"
    } else {
        "avatar"
    };
    Ok(format!(
        r#"<img class="{class}" src="{}" alt="{user}" srcset="{srcset}" width="{size}" height="{size}" />"#,
        src(1)
    ))
}
