//! Ordered assembly of batch inputs into one text.

use tokio::fs;

use crate::batch::{AssetKind, Batch};
use crate::error::CombineError;

/// Parent-relative directory references rewritten to absolute form inside
/// stylesheet inputs.
const REWRITE_DIRS: &[&str] = &["images", "webfonts"];

/// One input's content after per-input rewriting, still unconcatenated.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub basename: String,
    pub public_url: String,
    pub content: String,
}

/// Ordered fragments of one batch.
#[derive(Debug)]
pub(crate) struct Assembly {
    fragments: Vec<Fragment>,
}

impl Assembly {
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Concatenation in batch order: newline between successive entries, no
    /// leading separator.
    pub fn combined(&self) -> String {
        let parts: Vec<&str> = self
            .fragments
            .iter()
            .map(|fragment| fragment.content.as_str())
            .collect();
        parts.join("\n")
    }
}

/// Read every input in batch order.
///
/// Stylesheet contents get their relative image and webfont references rooted
/// at the input's own public URL before concatenation; each input may have a
/// different base, so rewriting the joined text would apply the wrong base to
/// the wrong fragment. Any unreadable input fails the whole assembly.
pub(crate) async fn assemble(batch: &Batch) -> Result<Assembly, CombineError> {
    let mut fragments = Vec::with_capacity(batch.inputs().len());
    for input in batch.inputs() {
        let raw = fs::read_to_string(&input.path)
            .await
            .map_err(|source| CombineError::read(input.path.clone(), source))?;
        let content = match batch.kind() {
            AssetKind::Style => rewrite_relative_urls(&raw, &input.public_url),
            AssetKind::Script => raw,
        };
        fragments.push(Fragment {
            basename: input.basename.clone(),
            public_url: input.public_url.clone(),
            content,
        });
    }
    Ok(Assembly { fragments })
}

fn rewrite_relative_urls(content: &str, public_url: &str) -> String {
    let base = public_url.trim_end_matches('/');
    let mut rewritten = content.to_string();
    for dir in REWRITE_DIRS {
        let absolute = format!("{base}/{dir}");
        // Longest prefix first so "../../" is not left half-rewritten.
        rewritten = rewritten.replace(&format!("../../{dir}"), &absolute);
        rewritten = rewritten.replace(&format!("../{dir}"), &absolute);
    }
    rewritten
}
