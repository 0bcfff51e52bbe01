// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Language resource bootstrap and loading
//!
//! Two packages from the public `nltk_data` repository are needed:
//! - `punkt_tab`: sentence tokenizer parameters (the English abbreviation list is used)
//! - `stopwords`: stopword lists, one word per line
//!
//! `ResourceBootstrap` downloads and extracts missing packages into the
//! configured data directory. `LanguageResources` reads the extracted files.

use crate::config::ResourceConfig;
use crate::error::{MissingResource, ResourceError};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A downloadable resource package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePackage {
    pub id: &'static str,
    pub name: &'static str,
    /// Top-level directory under the data dir (`tokenizers`, `corpora`)
    pub category: &'static str,
    /// Path relative to the category directory whose presence marks the package installed
    pub marker: &'static str,
    pub url: &'static str,
}

impl ResourcePackage {
    pub fn category_dir(&self, config: &ResourceConfig) -> PathBuf {
        config.resolve(self.category)
    }

    pub fn marker_path(&self, config: &ResourceConfig) -> PathBuf {
        self.category_dir(config).join(self.marker)
    }

    fn archive_path(&self, config: &ResourceConfig) -> PathBuf {
        self.category_dir(config).join(format!("{}.zip", self.id))
    }
}

pub const PUNKT_TAB: ResourcePackage = ResourcePackage {
    id: "punkt_tab",
    name: "Punkt Tokenizer Tables",
    category: "tokenizers",
    marker: "punkt_tab/english",
    url: "https://raw.githubusercontent.com/nltk/nltk_data/gh-pages/packages/tokenizers/punkt_tab.zip",
};

pub const STOPWORDS: ResourcePackage = ResourcePackage {
    id: "stopwords",
    name: "Stopwords Corpus",
    category: "corpora",
    marker: "stopwords/english",
    url: "https://raw.githubusercontent.com/nltk/nltk_data/gh-pages/packages/corpora/stopwords.zip",
};

pub const PACKAGES: &[ResourcePackage] = &[PUNKT_TAB, STOPWORDS];

/// Look up a package by id
pub fn find_package(id: &str) -> Option<&'static ResourcePackage> {
    PACKAGES.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

/// Ensures resource packages are present in the data directory
pub struct ResourceBootstrap {
    config: ResourceConfig,
    force: bool,
}

impl ResourceBootstrap {
    pub fn new(config: ResourceConfig) -> Self {
        Self { config, force: false }
    }

    /// Re-download packages even when already installed
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn is_installed(&self, package: &ResourcePackage) -> bool {
        package.marker_path(&self.config).exists()
    }

    /// Install every known package
    pub fn ensure_all(&self) -> Result<Vec<PathBuf>> {
        PACKAGES.iter().map(|p| self.ensure(p)).collect()
    }

    /// Install `package` unless present; returns its marker path
    pub fn ensure(&self, package: &ResourcePackage) -> Result<PathBuf> {
        tracing::info!("Processing resource: {} ({})", package.name, package.id);

        let marker = package.marker_path(&self.config);
        if marker.exists() && !self.force {
            tracing::info!("Resource already installed: {}", marker.display());
            return Ok(marker);
        }

        let category_dir = package.category_dir(&self.config);
        std::fs::create_dir_all(&category_dir)
            .with_context(|| format!("Failed to create {}", category_dir.display()))?;

        let archive_path = package.archive_path(&self.config);
        let installed = self.install_archive(package, &archive_path, &category_dir);
        match std::fs::remove_file(&archive_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", archive_path.display(), e),
        }
        installed?;

        if !marker.exists() {
            anyhow::bail!(
                "Archive for {} did not contain expected path {}",
                package.id,
                marker.display()
            );
        }

        tracing::info!("Resource ready: {}", marker.display());
        Ok(marker)
    }

    /// Download, verify and unpack `package`; the archive is left for the caller to remove
    fn install_archive(&self, package: &ResourcePackage, archive_path: &Path, category_dir: &Path) -> Result<()> {
        self.download_file(package.url, archive_path)?;

        if let Some(expected) = self.config.pinned_checksum(package.id) {
            if !verify_sha256(archive_path, expected)? {
                anyhow::bail!("Checksum verification failed for {}", package.id);
            }
        }

        extract_zip(archive_path, category_dir)
    }

    fn http_client(&self) -> Result<reqwest::blocking::Client> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs));

        if self.config.certificate_verification.accepts_invalid() {
            tracing::warn!("TLS certificate verification is DISABLED for resource downloads");
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().context("Failed to build HTTP client")
    }

    fn download_file(&self, url: &str, output_path: &Path) -> Result<()> {
        tracing::info!("Downloading from: {}", url);

        let mut response = self
            .http_client()?
            .get(url)
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed with status: {}", response.status());
        }

        let pb = ProgressBar::new(response.content_length().unwrap_or(0));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
                .progress_chars("#>-"),
        );

        let file = File::create(output_path)
            .with_context(|| format!("Failed to create {}", output_path.display()))?;
        let mut writer = pb.wrap_write(BufWriter::new(file));
        response
            .copy_to(&mut writer)
            .context("Failed to read response body")?;
        writer.flush()?;

        pb.finish_with_message("Downloaded");
        Ok(())
    }
}

/// Compare the SHA-256 of `path` against a hex digest
pub fn verify_sha256(path: &Path, expected: &str) -> Result<bool> {
    tracing::info!("Verifying checksum...");

    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let result = hex::encode(hasher.finalize());
    let matches = result.eq_ignore_ascii_case(expected.trim());

    if !matches {
        tracing::warn!("Checksum mismatch: expected {}, got {}", expected, result);
    } else {
        tracing::info!("Checksum verified: {}", result);
    }

    Ok(matches)
}

/// Extract a zip archive below `output_dir`
pub fn extract_zip(archive_path: &Path, output_dir: &Path) -> Result<()> {
    tracing::info!("Extracting {}", archive_path.display());

    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file).context("Not a valid zip archive")?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        // mangled_name strips absolute prefixes and `..` components
        let outpath = output_dir.join(entry.mangled_name());

        if entry.name().ends_with('/') {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)
                .with_context(|| format!("Failed to create {}", outpath.display()))?;
            std::io::copy(&mut entry, &mut outfile)?;
        }
    }

    tracing::debug!("Extracted {} entries", archive.len());
    Ok(())
}

/// English resources read from the data directory
#[derive(Debug, Clone, Default)]
pub struct LanguageResources {
    stopwords: HashSet<String>,
    abbreviations: HashSet<String>,
}

impl LanguageResources {
    pub fn stopwords_path(config: &ResourceConfig) -> PathBuf {
        STOPWORDS.marker_path(config)
    }

    pub fn abbreviations_path(config: &ResourceConfig) -> PathBuf {
        PUNKT_TAB.marker_path(config).join("abbrev_types.txt")
    }

    /// Load the stopword list and the sentence tokenizer abbreviations
    pub fn load(config: &ResourceConfig) -> Result<Self, ResourceError> {
        let stopwords = read_word_list(STOPWORDS.id, &Self::stopwords_path(config))?;
        let abbreviations = read_word_list(PUNKT_TAB.id, &Self::abbreviations_path(config))?;

        tracing::debug!(
            "Loaded {} stopwords and {} abbreviations from {}",
            stopwords.len(),
            abbreviations.len(),
            config.data_dir.display()
        );

        Ok(Self::from_parts(stopwords, abbreviations))
    }

    /// Build from in-memory word lists. Entries are trimmed and lowercased.
    pub fn from_parts<S, A>(stopwords: S, abbreviations: A) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        Self {
            stopwords: normalize(stopwords),
            abbreviations: normalize(abbreviations),
        }
    }

    pub fn stopwords(&self) -> &HashSet<String> {
        &self.stopwords
    }

    pub fn abbreviations(&self) -> &HashSet<String> {
        &self.abbreviations
    }
}

fn normalize<I>(words: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn read_word_list(package: &str, path: &Path) -> Result<Vec<String>, ResourceError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ResourceError::Missing(MissingResource {
                package: package.to_string(),
                path: path.to_path_buf(),
            }))
        }
        Err(source) => Err(ResourceError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::TcpListener;
    use tempfile::TempDir;

    /// Write a minimal English resource layout into `dir`
    pub(crate) fn write_fixture_resources(dir: &Path) {
        let stopwords = dir.join("corpora/stopwords");
        std::fs::create_dir_all(&stopwords).unwrap();
        std::fs::write(
            stopwords.join("english"),
            "i\nme\nthe\nis\na\nan\nand\nit\nthis\nof\nto\nwas\nnot\ncan\nvery\n",
        )
        .unwrap();

        let punkt = dir.join("tokenizers/punkt_tab/english");
        std::fs::create_dir_all(&punkt).unwrap();
        std::fs::write(punkt.join("abbrev_types.txt"), "dr\nmr\nmrs\ne.g\ni.e\n").unwrap();
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        std::fs::write(path, zip_bytes(entries)).unwrap();
    }

    /// Answer one HTTP request on localhost; returns the URL to fetch.
    /// `declared_len` larger than the body simulates a dropped connection.
    fn serve_once(status: &'static str, body: Vec<u8>, declared_len: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {declared_len}\r\nConnection: close\r\n\r\n"
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
            stream.flush().unwrap();
        });

        format!("http://{addr}/stopwords.zip")
    }

    fn served_stopwords(url: String) -> ResourcePackage {
        ResourcePackage {
            url: Box::leak(url.into_boxed_str()),
            ..STOPWORDS
        }
    }

    fn stopwords_archive() -> Vec<u8> {
        zip_bytes(&[("stopwords/english", "the\nand\n")])
    }

    #[test]
    fn test_find_package() {
        assert_eq!(find_package("stopwords"), Some(&STOPWORDS));
        assert_eq!(find_package("PUNKT_TAB"), Some(&PUNKT_TAB));
        assert!(find_package("wordnet").is_none());
    }

    #[test]
    fn test_marker_paths() {
        let config = ResourceConfig::with_data_dir("/data");
        assert_eq!(
            STOPWORDS.marker_path(&config),
            PathBuf::from("/data/corpora/stopwords/english")
        );
        assert_eq!(
            LanguageResources::abbreviations_path(&config),
            PathBuf::from("/data/tokenizers/punkt_tab/english/abbrev_types.txt")
        );
    }

    #[test]
    fn test_ensure_skips_installed_package() {
        let dir = TempDir::new().unwrap();
        write_fixture_resources(dir.path());

        let bootstrap = ResourceBootstrap::new(ResourceConfig::with_data_dir(dir.path()));
        assert!(bootstrap.is_installed(&STOPWORDS));
        assert!(bootstrap.is_installed(&PUNKT_TAB));

        // No network access happens for installed packages
        let paths = bootstrap.ensure_all().unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_ensure_downloads_verifies_and_extracts() {
        let dir = TempDir::new().unwrap();
        let archive = stopwords_archive();
        let mut config = ResourceConfig::with_data_dir(dir.path());
        config
            .checksums
            .insert("stopwords".to_string(), hex::encode(Sha256::digest(&archive)));

        let len = archive.len();
        let package = served_stopwords(serve_once("200 OK", archive, len));
        let bootstrap = ResourceBootstrap::new(config);

        let marker = bootstrap.ensure(&package).unwrap();
        assert_eq!(marker, dir.path().join("corpora/stopwords/english"));
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "the\nand\n");
        assert!(bootstrap.is_installed(&package));
        assert!(!package.archive_path(bootstrap.config()).exists());
    }

    #[test]
    fn test_ensure_reports_http_error() {
        let dir = TempDir::new().unwrap();
        let body = b"not found".to_vec();
        let len = body.len();
        let package = served_stopwords(serve_once("404 Not Found", body, len));
        let bootstrap = ResourceBootstrap::new(ResourceConfig::with_data_dir(dir.path()));

        let err = bootstrap.ensure(&package).unwrap_err();
        assert!(err.to_string().contains("404"), "unexpected error: {err:#}");
        assert!(!bootstrap.is_installed(&package));
        assert!(!package.archive_path(bootstrap.config()).exists());
    }

    #[test]
    fn test_ensure_rejects_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        let mut config = ResourceConfig::with_data_dir(dir.path());
        config.checksums.insert("stopwords".to_string(), "00".to_string());

        let archive = stopwords_archive();
        let len = archive.len();
        let package = served_stopwords(serve_once("200 OK", archive, len));
        let bootstrap = ResourceBootstrap::new(config);

        let err = bootstrap.ensure(&package).unwrap_err();
        assert!(err.to_string().contains("Checksum verification failed"));
        assert!(!bootstrap.is_installed(&package));
        assert!(!package.archive_path(bootstrap.config()).exists());
    }

    #[test]
    fn test_ensure_removes_partial_download() {
        let dir = TempDir::new().unwrap();
        let archive = stopwords_archive();
        let declared = archive.len() + 512;
        let package = served_stopwords(serve_once("200 OK", archive, declared));
        let bootstrap = ResourceBootstrap::new(ResourceConfig::with_data_dir(dir.path()));

        assert!(bootstrap.ensure(&package).is_err());
        assert!(!bootstrap.is_installed(&package));
        assert!(!package.archive_path(bootstrap.config()).exists());
    }

    #[test]
    fn test_extract_zip_into_category_dir() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("stopwords.zip");
        write_zip(
            &archive,
            &[
                ("stopwords/english", "the\nand\n"),
                ("stopwords/README", "Stopwords Corpus"),
                ("../escape.txt", "outside"),
            ],
        );

        let target = dir.path().join("corpora");
        extract_zip(&archive, &target).unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("stopwords/english")).unwrap(),
            "the\nand\n"
        );
        assert!(target.join("stopwords/README").exists());
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_extract_rejects_non_zip() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"<html>not found</html>").unwrap();

        assert!(extract_zip(&archive, dir.path()).is_err());
    }

    #[test]
    fn test_verify_sha256() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, b"abc").unwrap();

        let digest = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert!(verify_sha256(&path, digest).unwrap());
        assert!(verify_sha256(&path, &digest.to_uppercase()).unwrap());
        assert!(!verify_sha256(&path, "00ff").unwrap());
    }

    #[test]
    fn test_load_normalizes_casing() {
        let dir = TempDir::new().unwrap();
        write_fixture_resources(dir.path());
        std::fs::write(
            dir.path().join("corpora/stopwords/english"),
            "The\n  AND \n\nit\n",
        )
        .unwrap();

        let resources = LanguageResources::load(&ResourceConfig::with_data_dir(dir.path())).unwrap();
        let stopwords = resources.stopwords();

        assert_eq!(stopwords.len(), 3);
        assert!(stopwords.contains("the"));
        assert!(stopwords.contains("and"));
        assert!(stopwords.contains("it"));
        assert!(resources.abbreviations().contains("dr"));
    }

    #[test]
    fn test_load_reports_missing_package() {
        let dir = TempDir::new().unwrap();
        let err = LanguageResources::load(&ResourceConfig::with_data_dir(dir.path())).unwrap_err();

        match err {
            ResourceError::Missing(missing) => assert_eq!(missing.package, "stopwords"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
