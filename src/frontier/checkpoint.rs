//! Frontier checkpoint format and file rotation
//!
//! The checkpoint is a line-oriented text file:
//!
//! ```text
//! URL_LIST
//! <domain>
//! <target-pattern>
//! <all-pattern>
//! <exclude-pattern, empty for none>
//! MATCHING
//! /posts/abc/
//! ALL
//! /posts/
//! /posts/abc/
//! CRAWLED
//! /posts/
//! PARAM_EXCLUDED
//! utm_source
//! ```
//!
//! Loading never yields a partially populated frontier: any structural
//! problem is a [`CheckpointError`].

use crate::frontier::Frontier;
use crate::url::UrlRules;
use crate::UrlError;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

const HEADER: &str = "URL_LIST";

/// Errors raised while reading or writing a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Missing URL_LIST header")]
    MissingHeader,

    #[error("Checkpoint ends before the {0} line")]
    Truncated(&'static str),

    #[error("Missing {0} section")]
    MissingSection(&'static str),

    #[error("Unexpected line {line_no}: '{line}'")]
    UnexpectedLine { line_no: usize, line: String },

    #[error("Invalid crawl rules: {0}")]
    InvalidRules(#[from] UrlError),

    #[error("{section} entry '{url}' is not in ALL")]
    Inconsistent { section: &'static str, url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Section {
    Matching,
    All,
    Crawled,
    ParamExcluded,
}

impl Section {
    const ORDER: [Section; 4] = [
        Section::Matching,
        Section::All,
        Section::Crawled,
        Section::ParamExcluded,
    ];

    fn marker(&self) -> &'static str {
        match self {
            Self::Matching => "MATCHING",
            Self::All => "ALL",
            Self::Crawled => "CRAWLED",
            Self::ParamExcluded => "PARAM_EXCLUDED",
        }
    }

    fn from_marker(line: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|s| s.marker() == line)
    }
}

impl Frontier {
    /// Writes the frontier in checkpoint format
    ///
    /// Set entries are written sorted so identical frontiers produce identical
    /// files.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)?;
        writeln!(writer, "{}", self.rules.domain().as_str())?;
        writeln!(writer, "{}", self.rules.target_pattern())?;
        writeln!(writer, "{}", self.rules.all_pattern())?;
        writeln!(writer, "{}", self.rules.exclude_pattern())?;

        for (section, urls) in [
            (Section::Matching, &self.matching),
            (Section::All, &self.all),
            (Section::Crawled, &self.crawled),
        ] {
            writeln!(writer, "{}", section.marker())?;
            let mut sorted: Vec<&String> = urls.iter().collect();
            sorted.sort();
            for url in sorted {
                writeln!(writer, "{}", url)?;
            }
        }

        writeln!(writer, "{}", Section::ParamExcluded.marker())?;
        for param in self.rules.excluded_params() {
            writeln!(writer, "{}", param)?;
        }

        Ok(())
    }

    /// Parses a frontier from checkpoint format
    pub fn deserialize<R: BufRead>(reader: R) -> Result<Self, CheckpointError> {
        let mut lines = reader.lines().enumerate();

        let mut next_line = |name: &'static str| -> Result<String, CheckpointError> {
            match lines.next() {
                Some((_, line)) => Ok(line?.trim_end_matches('\r').to_string()),
                None => Err(CheckpointError::Truncated(name)),
            }
        };

        match next_line("header") {
            Ok(line) if line == HEADER => {}
            Ok(_) | Err(CheckpointError::Truncated(_)) => {
                return Err(CheckpointError::MissingHeader)
            }
            Err(e) => return Err(e),
        }

        let domain = next_line("domain")?;
        let target_pattern = next_line("target-pattern")?;
        let all_pattern = next_line("all-pattern")?;
        let exclude_pattern = next_line("exclude-pattern")?;

        let mut all = HashSet::new();
        let mut matching = HashSet::new();
        let mut crawled = HashSet::new();
        let mut excluded_params = Vec::new();

        let mut seen = HashSet::new();
        let mut section = None;

        for (index, line) in lines {
            let line = line?;
            let line = line.trim_end_matches('\r');

            if let Some(marker) = Section::from_marker(line) {
                section = Some(marker);
                seen.insert(marker);
                continue;
            }

            if line.is_empty() {
                continue;
            }

            match section {
                Some(Section::Matching) => {
                    matching.insert(line.to_string());
                }
                Some(Section::All) => {
                    all.insert(line.to_string());
                }
                Some(Section::Crawled) => {
                    crawled.insert(line.to_string());
                }
                Some(Section::ParamExcluded) => excluded_params.push(line.to_string()),
                None => {
                    return Err(CheckpointError::UnexpectedLine {
                        line_no: index + 1,
                        line: line.to_string(),
                    })
                }
            }
        }

        if let Some(missing) = Section::ORDER.iter().find(|s| !seen.contains(*s)) {
            return Err(CheckpointError::MissingSection(missing.marker()));
        }

        for (section, urls) in [
            (Section::Matching, &matching),
            (Section::Crawled, &crawled),
        ] {
            if let Some(url) = urls.iter().find(|u| !all.contains(*u)) {
                return Err(CheckpointError::Inconsistent {
                    section: section.marker(),
                    url: url.clone(),
                });
            }
        }

        let rules = UrlRules::new(
            &domain,
            &target_pattern,
            &all_pattern,
            Some(&exclude_pattern),
            excluded_params,
        )?;

        Ok(Self {
            rules,
            all,
            matching,
            crawled,
        })
    }
}

/// True if `line` would be read back as a section marker
pub fn is_section_marker(line: &str) -> bool {
    Section::from_marker(line).is_some()
}

/// Path of the single-generation backup kept next to a checkpoint
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Durably writes a checkpoint, rotating the previous one to `.bak`
///
/// The new state is written to a temporary file in the same directory and
/// synced before any rename happens, so the last good checkpoint is never
/// overwritten in place.
pub fn save_checkpoint(frontier: &Frontier, path: &Path) -> Result<(), CheckpointError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        frontier.serialize(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    if path.exists() {
        fs::rename(path, backup_path(path))?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    tracing::debug!(
        "Checkpoint written to {} ({} URLs, {} crawled)",
        path.display(),
        frontier.len_all(),
        frontier.len_crawled()
    );

    Ok(())
}

/// Finds the checkpoint a crawl should resume from
///
/// A save interrupted between its two renames leaves only the `.bak`
/// generation behind; that file is returned when `path` itself is missing.
pub fn find_checkpoint(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }

    let backup = backup_path(path);
    if backup.exists() {
        tracing::warn!(
            "{} is missing; falling back to {}",
            path.display(),
            backup.display()
        );
        return Some(backup);
    }

    None
}

/// Loads a frontier from a checkpoint file
pub fn load_checkpoint(path: &Path) -> Result<Frontier, CheckpointError> {
    let file = File::open(path)?;
    Frontier::deserialize(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_frontier() -> Frontier {
        let rules = UrlRules::new(
            "example.com",
            r"/posts/\w+/",
            "/posts/.*",
            Some(".*/edit/"),
            vec!["utm_source".to_string(), "ref".to_string()],
        )
        .unwrap();

        let mut frontier = Frontier::new(rules);
        frontier.add_seed("https://example.com/posts/");
        frontier.record_visit(
            "https://example.com/posts/",
            &[
                "https://example.com/posts/abc/".to_string(),
                "https://example.com/posts/def/?utm_source=x".to_string(),
                "https://example.com/posts/list?page=2".to_string(),
            ],
        );
        frontier.record_visit("https://example.com/posts/abc/", &[]);
        frontier
    }

    fn to_text(frontier: &Frontier) -> String {
        let mut buffer = Vec::new();
        frontier.serialize(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_serialized_layout() {
        let text = to_text(&sample_frontier());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            &lines[..5],
            &["URL_LIST", "example.com", r"/posts/\w+/", "/posts/.*", ".*/edit/"]
        );
        assert_eq!(lines[5], "MATCHING");
        assert_eq!(&lines[6..8], &["/posts/abc/", "/posts/def/"]);
        assert_eq!(lines[8], "ALL");
        assert!(text.contains("CRAWLED\n/posts/\n/posts/abc/\nPARAM_EXCLUDED\nutm_source\nref\n"));
    }

    #[test]
    fn test_round_trip() {
        let original = sample_frontier();
        let restored = Frontier::deserialize(to_text(&original).as_bytes()).unwrap();

        assert_eq!(restored.all, original.all);
        assert_eq!(restored.matching, original.matching);
        assert_eq!(restored.crawled, original.crawled);
        assert_eq!(restored.rules.domain().as_str(), "example.com");
        assert_eq!(restored.rules.target_pattern(), original.rules.target_pattern());
        assert_eq!(restored.rules.all_pattern(), original.rules.all_pattern());
        assert_eq!(restored.rules.exclude_pattern(), ".*/edit/");
        assert_eq!(restored.rules.excluded_params(), original.rules.excluded_params());
        assert_eq!(to_text(&restored), to_text(&original));
    }

    #[test]
    fn test_crawled_survives_round_trip() {
        let restored = Frontier::deserialize(to_text(&sample_frontier()).as_bytes()).unwrap();
        assert!(restored.already_crawled("https://example.com/posts/"));
        assert!(restored.already_crawled("https://example.com/posts/abc/"));
        assert!(!restored.already_crawled("https://example.com/posts/def/"));
    }

    #[test]
    fn test_empty_exclude_round_trip() {
        let rules = UrlRules::new("example.com", "/p/", "/.*", None, vec![]).unwrap();
        let frontier = Frontier::new(rules);
        let restored = Frontier::deserialize(to_text(&frontier).as_bytes()).unwrap();
        assert_eq!(restored.rules.exclude_pattern(), "");
        assert!(restored.validate("https://example.com/anything").is_some());
    }

    #[test]
    fn test_missing_header() {
        let text = to_text(&sample_frontier()).replacen("URL_LIST\n", "", 1);
        let result = Frontier::deserialize(text.as_bytes());
        assert!(matches!(result, Err(CheckpointError::MissingHeader)));

        let result = Frontier::deserialize("".as_bytes());
        assert!(matches!(result, Err(CheckpointError::MissingHeader)));
    }

    #[test]
    fn test_truncated_config_lines() {
        let result = Frontier::deserialize("URL_LIST\nexample.com\n/p/\n/.*\n".as_bytes());
        assert!(matches!(
            result,
            Err(CheckpointError::Truncated("exclude-pattern"))
        ));
    }

    #[test]
    fn test_missing_section() {
        let text = "URL_LIST\nexample.com\n/p/\n/.*\n\nMATCHING\nALL\nCRAWLED\n";
        let result = Frontier::deserialize(text.as_bytes());
        assert!(matches!(
            result,
            Err(CheckpointError::MissingSection("PARAM_EXCLUDED"))
        ));
    }

    #[test]
    fn test_line_before_first_marker() {
        let text = "URL_LIST\nexample.com\n/p/\n/.*\n\n/stray\nMATCHING\nALL\nCRAWLED\nPARAM_EXCLUDED\n";
        let result = Frontier::deserialize(text.as_bytes());
        assert!(matches!(
            result,
            Err(CheckpointError::UnexpectedLine { line_no: 6, .. })
        ));
    }

    #[test]
    fn test_crawled_not_in_all() {
        let text = "URL_LIST\nexample.com\n/p/\n/.*\n\nMATCHING\nALL\n/a\nCRAWLED\n/b\nPARAM_EXCLUDED\n";
        let result = Frontier::deserialize(text.as_bytes());
        assert!(matches!(
            result,
            Err(CheckpointError::Inconsistent { section: "CRAWLED", .. })
        ));
    }

    #[test]
    fn test_invalid_pattern_in_file() {
        let text = "URL_LIST\nexample.com\n/p/(\n/.*\n\nMATCHING\nALL\nCRAWLED\nPARAM_EXCLUDED\n";
        let result = Frontier::deserialize(text.as_bytes());
        assert!(matches!(result, Err(CheckpointError::InvalidRules(_))));
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/tmp/state.txt")),
            PathBuf::from("/tmp/state.txt.bak")
        );
    }

    #[test]
    fn test_save_rotates_previous_checkpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.txt");

        let mut frontier = sample_frontier();
        save_checkpoint(&frontier, &path).unwrap();
        assert!(!backup_path(&path).exists());

        frontier.record_visit("https://example.com/posts/def/", &[]);
        save_checkpoint(&frontier, &path).unwrap();

        // Process "killed" here: both generations must load
        let current = load_checkpoint(&path).unwrap();
        let previous = load_checkpoint(&backup_path(&path)).unwrap();

        assert_eq!(current.len_crawled(), 3);
        assert_eq!(previous.len_crawled(), 2);
        assert_eq!(current.all, previous.all);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.txt");
        save_checkpoint(&sample_frontier(), &path).unwrap();
        assert!(load_checkpoint(&path).is_ok());
    }

    #[test]
    fn test_find_checkpoint_prefers_primary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.txt");
        assert_eq!(find_checkpoint(&path), None);

        save_checkpoint(&sample_frontier(), &path).unwrap();
        save_checkpoint(&sample_frontier(), &path).unwrap();
        assert_eq!(find_checkpoint(&path), Some(path.clone()));
    }

    #[test]
    fn test_find_checkpoint_falls_back_to_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.txt");
        save_checkpoint(&sample_frontier(), &path).unwrap();

        // Interrupted save: rotated to .bak, new file never persisted
        fs::rename(&path, backup_path(&path)).unwrap();

        let found = find_checkpoint(&path).unwrap();
        assert_eq!(found, backup_path(&path));
        assert_eq!(load_checkpoint(&found).unwrap().len_crawled(), 2);
    }

    #[test]
    fn test_section_markers() {
        for marker in ["ALL", "MATCHING", "CRAWLED", "PARAM_EXCLUDED"] {
            assert!(is_section_marker(marker));
        }
        assert!(!is_section_marker("URL_LIST"));
        assert!(!is_section_marker("utm_source"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_checkpoint(Path::new("/nonexistent/state.txt"));
        assert!(matches!(result, Err(CheckpointError::Io(_))));
    }
}
