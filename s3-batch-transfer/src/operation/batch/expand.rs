/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;

use super::input::{BatchInput, UploadGroup};
use crate::config::TransferOverrides;
use crate::error;
use crate::types::{
    CopySpec, DeleteSpec, DownloadSpec, TemplateRenderer, TransferSpec, UploadSpec,
};
use crate::Config;

/// A concrete transfer together with its effective configuration
#[derive(Debug, Clone)]
pub(crate) struct Transfer {
    pub(crate) spec: TransferSpec,
    pub(crate) config: Arc<Config>,
}

/// Resolve every declared group into concrete transfers.
///
/// Transfers are returned in submission order: uploads, downloads, deletes, copies, then
/// `explicit` transfers. Returns the batch wide configuration alongside. Fails before
/// anything runs if any group's effective configuration is invalid.
pub(crate) fn expand(
    base: &Config,
    input: &BatchInput,
    explicit: Vec<TransferSpec>,
    renderer: &TemplateRenderer,
) -> Result<(Config, Vec<Transfer>), error::Error> {
    let batch_config = base.merge(&input.options);
    let mut transfers = Vec::new();

    for group in &input.upload {
        let config = effective_config(&batch_config, &group.options, renderer)?;
        for (source, key) in upload_targets(group, renderer)? {
            let spec = UploadSpec {
                source,
                key,
                headers: config.headers().clone(),
                gzip: group.gzip,
                access: config.access().map(str::to_owned),
                sync: group.sync,
            };
            transfers.push(Transfer {
                spec: spec.into(),
                config: config.clone(),
            });
        }
    }

    for group in &input.download {
        let config = effective_config(&batch_config, &group.options, renderer)?;
        let destination = renderer.render(&group.dest.to_string_lossy());
        let spec = DownloadSpec::new(renderer.render(&group.src), destination);
        transfers.push(Transfer {
            spec: spec.into(),
            config,
        });
    }

    for group in &input.del {
        let config = effective_config(&batch_config, &group.options, renderer)?;
        let spec = DeleteSpec::new(renderer.render(&group.src));
        transfers.push(Transfer {
            spec: spec.into(),
            config,
        });
    }

    for group in &input.copy {
        let config = effective_config(&batch_config, &group.options, renderer)?;
        let mut spec = CopySpec::new(renderer.render(&group.src), renderer.render(&group.dest));
        // only headers declared on the copy itself replace metadata
        if let Some(headers) = &group.options.headers {
            spec.headers = headers.clone();
        }
        transfers.push(Transfer {
            spec: spec.into(),
            config,
        });
    }

    if !explicit.is_empty() {
        let config = effective_config(&batch_config, &TransferOverrides::default(), renderer)?;
        transfers.extend(explicit.into_iter().map(|spec| Transfer {
            spec,
            config: config.clone(),
        }));
    }

    Ok((batch_config, transfers))
}

fn effective_config(
    batch_config: &Config,
    overrides: &TransferOverrides,
    renderer: &TemplateRenderer,
) -> Result<Arc<Config>, error::Error> {
    let config = batch_config.merge(overrides).render(renderer);
    config.validate()?;
    Ok(Arc::new(config))
}

/// `(local file, object key)` for every file an upload group matches
fn upload_targets(
    group: &UploadGroup,
    renderer: &TemplateRenderer,
) -> Result<Vec<(PathBuf, String)>, error::Error> {
    let pattern = renderer.render(&group.src);
    let dest = renderer.render(&group.dest);
    let files = expand_files(&pattern)?;
    if files.is_empty() {
        tracing::warn!("no files match {pattern}");
        return Ok(Vec::new());
    }

    // a single match equal to the pattern itself is a plain file to file upload
    if files.len() == 1 && files[0] == absolute(Path::new(&pattern)) {
        return Ok(files.into_iter().map(|file| (file, dest.clone())).collect());
    }

    let root = match &group.rel {
        Some(rel) => {
            let rel = renderer.render(rel);
            let root = expand_dirs(&rel)?.into_iter().next();
            if root.is_none() {
                tracing::warn!("no directory matches {rel}, keys will use file names only");
            }
            root
        }
        None => None,
    };

    Ok(files
        .into_iter()
        .map(|file| {
            let relative = root
                .as_deref()
                .and_then(|root| file.strip_prefix(root).ok())
                .map(Path::to_path_buf)
                .or_else(|| file.file_name().map(PathBuf::from))
                .unwrap_or_default();
            let key = join_key(&dest, &relative);
            (file, key)
        })
        .collect())
}

/// Files (not directories) matching `pattern`, as absolute paths in match order
fn expand_files(pattern: &str) -> Result<Vec<PathBuf>, error::Error> {
    expand_matching(pattern, Path::is_file)
}

/// Directories matching `pattern`, as absolute paths in match order
fn expand_dirs(pattern: &str) -> Result<Vec<PathBuf>, error::Error> {
    expand_matching(pattern, Path::is_dir)
}

fn expand_matching(
    pattern: &str,
    filter: fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, error::Error> {
    let mut matches = Vec::new();
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if filter(&path) => matches.push(absolute(&path)),
            Ok(_) => {}
            Err(err) => tracing::warn!("skipping unreadable path: {err}"),
        }
    }
    Ok(matches)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .clean()
}

/// Join `dest` and a relative file path into an object key using `/` separators
fn join_key(dest: &str, relative: &Path) -> String {
    let key = Path::new(dest).join(relative).clean();
    let key = key.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        key.into_owned()
    } else {
        key.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn config() -> Config {
        Config::builder()
            .access_key_id("abc")
            .secret_access_key("def")
            .bucket("assets")
            .build()
    }

    fn touch(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, file.as_bytes()).unwrap();
        }
    }

    fn upload_keys(transfers: &[Transfer]) -> Vec<(PathBuf, String)> {
        transfers
            .iter()
            .map(|t| match &t.spec {
                TransferSpec::Upload(spec) => (spec.source.clone(), spec.key.clone()),
                other => panic!("unexpected spec {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_join_key() {
        assert_eq!("a.txt", join_key("", Path::new("a.txt")));
        assert_eq!("js/a.txt", join_key("js/", Path::new("a.txt")));
        assert_eq!("js/a.txt", join_key("js", Path::new("a.txt")));
        assert_eq!("js/sub/a.txt", join_key("js", Path::new("sub/a.txt")));
        assert_eq!("a.txt", join_key("js/..", Path::new("a.txt")));
    }

    #[test]
    fn test_wildcard_uses_basenames() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["files/a.txt", "files/b.txt", "files/c.js"]);
        let pattern = format!("{}/files/*.txt", dir.path().display());
        let input = BatchInput {
            upload: vec![UploadGroup::new(pattern, "docs/")],
            ..Default::default()
        };

        let (_, transfers) =
            expand(&config(), &input, Vec::new(), &TemplateRenderer::default()).unwrap();
        let root = absolute(dir.path());
        assert_eq!(
            vec![
                (root.join("files/a.txt"), "docs/a.txt".to_owned()),
                (root.join("files/b.txt"), "docs/b.txt".to_owned()),
            ],
            upload_keys(&transfers)
        );
    }

    #[test]
    fn test_literal_single_file_uses_dest_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["index.html"]);
        let src = format!("{}/index.html", dir.path().display());
        let input = BatchInput {
            upload: vec![UploadGroup::new(src, "site/home.html")],
            ..Default::default()
        };

        let (_, transfers) =
            expand(&config(), &input, Vec::new(), &TemplateRenderer::default()).unwrap();
        assert_eq!(
            vec![(absolute(&dir.path().join("index.html")), "site/home.html".to_owned())],
            upload_keys(&transfers)
        );
    }

    #[test]
    fn test_single_wildcard_match_is_joined() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["only.txt"]);
        let pattern = format!("{}/*.txt", dir.path().display());
        let input = BatchInput {
            upload: vec![UploadGroup::new(pattern, "docs")],
            ..Default::default()
        };

        let (_, transfers) =
            expand(&config(), &input, Vec::new(), &TemplateRenderer::default()).unwrap();
        assert_eq!("docs/only.txt", upload_keys(&transfers)[0].1);
    }

    #[test]
    fn test_rel_preserves_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["dist/app.js", "dist/vendor/lib.js"]);
        let pattern = format!("{}/dist/**/*.js", dir.path().display());
        let rel = format!("{}/dist", dir.path().display());
        let input = BatchInput {
            upload: vec![UploadGroup::new(pattern, "js").rel(rel)],
            ..Default::default()
        };

        let (_, transfers) =
            expand(&config(), &input, Vec::new(), &TemplateRenderer::default()).unwrap();
        let keys: Vec<String> = upload_keys(&transfers).into_iter().map(|(_, k)| k).collect();
        assert_eq!(vec!["js/app.js", "js/vendor/lib.js"], keys);
    }

    #[test]
    fn test_no_matches_yields_no_transfers() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.txt", dir.path().display());
        let input = BatchInput {
            upload: vec![UploadGroup::new(pattern, "docs")],
            ..Default::default()
        };
        let (_, transfers) =
            expand(&config(), &input, Vec::new(), &TemplateRenderer::default()).unwrap();
        assert!(transfers.is_empty());
    }

    #[test]
    fn test_group_overrides_and_submission_order() {
        let input = BatchInput::from_json(
            r#"{
                "access": "public-read",
                "headers": { "Cache-Control": "max-age=60" },
                "copy": [{ "src": "a.txt", "dest": "b.txt" }],
                "del": [{ "src": "old.txt", "bucket": "archive" }],
                "download": [{ "src": "a.txt", "dest": "a.txt" }]
            }"#,
        )
        .unwrap();
        let (batch_config, transfers) =
            expand(&config(), &input, Vec::new(), &TemplateRenderer::default()).unwrap();

        assert_eq!(Some("public-read"), batch_config.access());
        let kinds: Vec<&str> = transfers
            .iter()
            .map(|t| match t.spec {
                TransferSpec::Upload(_) => "upload",
                TransferSpec::Download(_) => "download",
                TransferSpec::Copy(_) => "copy",
                TransferSpec::Delete(_) => "delete",
            })
            .collect();
        assert_eq!(vec!["download", "delete", "copy"], kinds);
        assert_eq!(Some("archive"), transfers[1].config.bucket());
        assert_eq!(Some("assets"), transfers[2].config.bucket());

        // batch wide headers are for uploads, a copy only replaces metadata it declares
        match &transfers[2].spec {
            TransferSpec::Copy(spec) => assert!(spec.headers.is_empty()),
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn test_templates_are_rendered() {
        let renderer = TemplateRenderer::from(|s: &str| s.replace("{{env}}", "prod"));
        let input = BatchInput::from_json(
            r#"{
                "bucket": "assets-{{env}}",
                "del": [{ "src": "{{env}}/old.txt" }]
            }"#,
        )
        .unwrap();
        let (_, transfers) = expand(&config(), &input, Vec::new(), &renderer).unwrap();
        assert_eq!(Some("assets-prod"), transfers[0].config.bucket());
        assert_eq!(
            TransferSpec::Delete(DeleteSpec::new("prod/old.txt")),
            transfers[0].spec
        );
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let input = BatchInput {
            del: vec![crate::operation::batch::DeleteGroup::new("a.txt")],
            ..Default::default()
        };
        let base = Config::builder().bucket("assets").build();
        let err = expand(&base, &input, Vec::new(), &TemplateRenderer::default()).unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
    }

    #[test]
    fn test_explicit_transfers_follow_groups() {
        let input = BatchInput {
            del: vec![crate::operation::batch::DeleteGroup::new("a.txt")],
            ..Default::default()
        };
        let explicit = vec![TransferSpec::Delete(DeleteSpec::new("b.txt"))];
        let (_, transfers) =
            expand(&config(), &input, explicit, &TemplateRenderer::default()).unwrap();
        assert_eq!(2, transfers.len());
        assert_eq!(TransferSpec::Delete(DeleteSpec::new("b.txt")), transfers[1].spec);
    }
}
