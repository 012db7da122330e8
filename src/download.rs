//! Image download planning and execution
//!
//! Every image of a listing is saved as
//! `<root>/<sanitized name>/image_<n>.<ext>`. Existing files are kept and the
//! new one gets a ` (k)` suffix.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SinkError;
use crate::model::ImageSet;
use crate::page::strip_query;

pub const DEFAULT_DOWNLOAD_ROOT: &str = "ETSY_IMAGES";
const DEFAULT_EXTENSION: &str = "jpg";
const DEFAULT_FOLDER: &str = "Product";
const MAX_NAME_LEN: usize = 50;
const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024;

/// One planned download: source URL and path relative to the download root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub failed: usize,
}

/// Replace every non-alphanumeric character with `_`, lower-case, cap at 50.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_lowercase()
        .chars()
        .take(MAX_NAME_LEN)
        .collect()
}

/// Extension from the URL's last path segment, query stripped. Defaults to jpg.
pub fn image_extension(url: &str) -> &str {
    let path = strip_query(url);
    let path = path.split('#').next().unwrap_or(path);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => DEFAULT_EXTENSION,
    }
}

/// Download paths for every image, numbered from 1 in source order.
pub fn plan_downloads(images: &ImageSet, root: &str) -> Vec<DownloadRequest> {
    let name = if images.sku.trim().is_empty() {
        DEFAULT_FOLDER
    } else {
        images.sku.as_str()
    };
    let folder = sanitize_file_name(name);

    images
        .image_urls
        .iter()
        .enumerate()
        .map(|(i, url)| DownloadRequest {
            url: url.clone(),
            filename: format!(
                "{}/{}/image_{}.{}",
                root,
                folder,
                i + 1,
                image_extension(url)
            ),
        })
        .collect()
}

/// Fetch each planned image into `base_dir`. Individual failures are counted.
pub fn download_all(
    agent: &ureq::Agent,
    base_dir: &Path,
    plan: &[DownloadRequest],
) -> DownloadSummary {
    let mut summary = DownloadSummary::default();
    for request in plan {
        match download_one(agent, base_dir, request) {
            Ok(path) => {
                tracing::debug!("saved {} to {}", request.url, path.display());
                summary.downloaded += 1;
            }
            Err(e) => {
                tracing::warn!("download of {} failed: {}", request.url, e);
                summary.failed += 1;
            }
        }
    }
    tracing::info!(
        "downloaded {} images, {} failed",
        summary.downloaded,
        summary.failed
    );
    summary
}

fn download_one(
    agent: &ureq::Agent,
    base_dir: &Path,
    request: &DownloadRequest,
) -> Result<PathBuf, SinkError> {
    let response = agent.get(request.url.as_str()).call()?;
    if !response.status().is_success() {
        return Err(SinkError::Rejected {
            status: response.status().as_u16(),
            message: format!("could not fetch {}", request.url),
        });
    }
    let bytes = response
        .into_body()
        .with_config()
        .limit(MAX_IMAGE_BYTES)
        .read_to_vec()?;

    let target = unique_path(&base_dir.join(&request.filename));
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }
    fs::write(&target, bytes).map_err(|source| io_error(&target, source))?;
    Ok(target)
}

/// `path` itself if free, else the first free `stem (k).ext`.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|k| path.with_file_name(format!("{} ({}){}", stem, k, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("My Shop-Item#1"), "my_shop_item_1");
        assert_eq!(sanitize_file_name(&"A".repeat(80)).len(), 50);
        assert_eq!(sanitize_file_name("café"), "caf_");
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("https://i.etsystatic.com/il_794xN.123.jpg"), "jpg");
        assert_eq!(image_extension("https://i.etsystatic.com/a/b.webp?version=0"), "webp");
        assert_eq!(image_extension("https://i.etsystatic.com/a/noext"), "jpg");
        assert_eq!(image_extension("https://i.etsystatic.com/a/trailing."), "jpg");
    }

    #[test]
    fn test_plan_downloads() {
        let images = ImageSet {
            sku: "1234 Mug".to_string(),
            image_urls: vec![
                "https://i.etsystatic.com/a.png".to_string(),
                "https://i.etsystatic.com/b".to_string(),
            ],
        };
        let plan = plan_downloads(&images, DEFAULT_DOWNLOAD_ROOT);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].filename, "ETSY_IMAGES/1234_mug/image_1.png");
        assert_eq!(plan[1].filename, "ETSY_IMAGES/1234_mug/image_2.jpg");
    }

    #[test]
    fn test_plan_without_sku_uses_default_folder() {
        let images = ImageSet {
            sku: String::new(),
            image_urls: vec!["https://i.etsystatic.com/a.gif".to_string()],
        };
        let plan = plan_downloads(&images, "root");
        assert_eq!(plan[0].filename, "root/product/image_1.gif");
    }

    #[test]
    fn test_unique_path_adds_suffix() {
        let dir = std::env::temp_dir().join(format!("listing-parser-unique-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let first = dir.join("image_1.jpg");
        fs::write(&first, b"x").unwrap();

        assert_eq!(unique_path(&first), dir.join("image_1 (1).jpg"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_download_all_counts_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let images = ImageSet {
            sku: "777".to_string(),
            image_urls: vec![
                format!("{}/ok.png", server.uri()),
                format!("{}/missing.png", server.uri()),
            ],
        };
        let dir = std::env::temp_dir().join(format!("listing-parser-dl-{}", std::process::id()));
        let base = dir.clone();

        let summary = tokio::task::spawn_blocking(move || {
            let agent = crate::sink::SinkConfig::default().agent();
            download_all(&agent, &base, &plan_downloads(&images, "ETSY_IMAGES"))
        })
        .await
        .unwrap();

        assert_eq!(summary, DownloadSummary { downloaded: 1, failed: 1 });
        let saved = fs::read(dir.join("ETSY_IMAGES/777/image_1.png")).unwrap();
        assert_eq!(saved, vec![1u8, 2, 3]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
