//! Encoded-size-aware packing of fragments into remote request chunks.

use url::form_urlencoded::byte_serialize;

use crate::assemble::Fragment;

/// One remote request's worth of input. Fragments are never split: a chunk
/// holds whole fragments only, in original batch order.
#[derive(Debug)]
pub(crate) struct Chunk {
    pub content: String,
    /// A single fragment whose encoded size alone reaches the ceiling; it can
    /// never be submitted within the limit and is passed through raw instead.
    pub oversize: bool,
}

/// URL-encoded length of `text`, in characters.
pub(crate) fn encoded_len(text: &str) -> usize {
    byte_serialize(text.as_bytes()).map(str::len).sum()
}

/// Greedy first-fit packing in original order.
///
/// Every non-oversize chunk's encoded content stays strictly under `ceiling`,
/// and concatenating chunk contents with the newline joiner reproduces the
/// assembled text exactly.
pub(crate) fn pack_chunks(fragments: &[Fragment], ceiling: usize) -> Vec<Chunk> {
    let separator_len = encoded_len("\n");
    let mut chunks = Vec::new();
    let mut content = String::new();
    let mut content_len = 0usize;

    for fragment in fragments {
        let fragment_len = encoded_len(&fragment.content);

        if fragment_len >= ceiling {
            if !content.is_empty() {
                chunks.push(Chunk {
                    content: std::mem::take(&mut content),
                    oversize: false,
                });
                content_len = 0;
            }
            chunks.push(Chunk {
                content: fragment.content.clone(),
                oversize: true,
            });
            continue;
        }

        if !content.is_empty() && content_len + separator_len + fragment_len >= ceiling {
            chunks.push(Chunk {
                content: std::mem::take(&mut content),
                oversize: false,
            });
            content_len = 0;
        }

        if !content.is_empty() {
            content.push('\n');
            content_len += separator_len;
        }
        content.push_str(&fragment.content);
        content_len += fragment_len;
    }

    if !content.is_empty() {
        chunks.push(Chunk {
            content,
            oversize: false,
        });
    }

    chunks
}
