/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! MD5 digests in the format S3 uses for single part entity tags.

/// Lowercase hex MD5 digest of `data`
pub fn hash(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Incremental digest over a stream of chunks.
///
/// Produces the same digest as [`hash`] over the concatenated chunks.
pub struct ContentHasher {
    ctx: md5::Context,
}

impl ContentHasher {
    /// Create a hasher with no input consumed
    pub fn new() -> Self {
        Self {
            ctx: md5::Context::new(),
        }
    }

    /// Consume the next chunk of input
    pub fn update(&mut self, data: &[u8]) {
        self.ctx.consume(data);
    }

    /// Lowercase hex digest of everything consumed so far
    pub fn finalize(self) -> String {
        format!("{:x}", self.ctx.compute())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher").finish_non_exhaustive()
    }
}

/// Entity tags are returned wrapped in double quotes; strip them before comparison.
pub fn strip_etag(etag: &str) -> String {
    etag.replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!("d41d8cd98f00b204e9800998ecf8427e", hash(b""));
        assert_eq!("5eb63bbbe01eeed093cb22bb8f5acdc3", hash(b"hello world"));
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = ContentHasher::new();
        for chunk in [&b"hello"[..], b" ", b"world"] {
            hasher.update(chunk);
        }
        assert_eq!(hash(b"hello world"), hasher.finalize());
    }

    #[test]
    fn test_strip_etag() {
        assert_eq!(
            "5eb63bbbe01eeed093cb22bb8f5acdc3",
            strip_etag("\"5eb63bbbe01eeed093cb22bb8f5acdc3\"")
        );
        assert_eq!("abc", strip_etag("abc"));
    }
}
