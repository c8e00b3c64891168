//! `jekyll-gist`: embed a GitHub gist.
//!
//! `{% gist 8c4e2b1 %}` and `{% gist 8c4e2b1 hello.rb %}` emit the gist's
//! script tag. Nothing is fetched.

use super::{CapabilityRegistry, PluginError, RenderContext, TagArgs};
use html_escape::encode_quoted_attribute;

pub fn install(registry: &mut CapabilityRegistry) -> Result<(), PluginError> {
    registry.register_tag("gist", gist_tag)
}

fn gist_tag(args: &TagArgs, _ctx: &RenderContext<'_>) -> Result<String, PluginError> {
    let Some(id) = args.positional.first() else {
        return Err(PluginError::Tag {
            tag: "gist".into(),
            message: "missing gist id".into(),
        });
    };
    let mut url = format!("https://gist.github.com/{id}.js");
    if let Some(file) = args.positional.get(1) {
        url.push_str("?file=");
        url.push_str(file);
    }
    Ok(format!(r#"<script src="{}"> </script>"#, encode_quoted_attribute(&url)))
}
