use crate::{clock::Timestamp, error::Error};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

pub(crate) const DEFAULT_NAME: &str = "Unknown Player";

const STORE_DIR: &str = "minesweep";
const STORE_FILE: &str = "store.json";

/// A finished game, as shown on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ScoreEntry {
    pub(crate) name: String,
    pub(crate) difficulty: String,
    /// Elapsed time as `HH:MM:SS.mmm`.
    pub(crate) timestamp: String,
    /// RFC 3339 date of the win.
    pub(crate) date: String,
}

impl ScoreEntry {
    fn millis(&self) -> Option<u64> {
        self.timestamp
            .parse::<Timestamp>()
            .ok()
            .and_then(|timestamp| timestamp.as_millis())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Contents {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    scores: Vec<ScoreEntry>,
}

fn default_name() -> String {
    DEFAULT_NAME.to_owned()
}

impl Default for Contents {
    fn default() -> Self {
        Self {
            name: default_name(),
            scores: Vec::new(),
        }
    }
}

/// The player name and score list, kept in a JSON file.
#[derive(Debug)]
pub(crate) struct Store {
    path: PathBuf,
    contents: Contents,
}

/// Where the store lives when no path is given.
pub(crate) fn default_path() -> PathBuf {
    std::env::var_os("XDG_DATA_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .filter(|dir| !dir.is_empty())
                .map(|home| Path::new(&home).join(".local").join("share"))
        })
        .map_or_else(
            || PathBuf::from("minesweep.json"),
            |dir| dir.join(STORE_DIR).join(STORE_FILE),
        )
}

impl Store {
    /// Read the store at `path`. A missing or unreadable file yields an empty store.
    pub(crate) fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let contents = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Contents>(&raw) {
                Ok(mut contents) => {
                    if contents.name.is_empty() {
                        contents.name = default_name();
                    }
                    info!(
                        path = %path.display(),
                        scores = contents.scores.len(),
                        "loaded store"
                    );
                    contents
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "store is corrupt, using defaults");
                    Contents::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no store yet, using defaults");
                Contents::default()
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read store, using defaults");
                Contents::default()
            }
        };

        Self { path, contents }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn name(&self) -> &str {
        &self.contents.name
    }

    pub(crate) fn scores(&self) -> &[ScoreEntry] {
        &self.contents.scores
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) -> Result<(), Error> {
        let name = name.into();
        self.contents.name = if name.trim().is_empty() {
            default_name()
        } else {
            name
        };
        self.save()
    }

    pub(crate) fn add_score(&mut self, entry: ScoreEntry) -> Result<(), Error> {
        info!(
            player = %entry.name,
            difficulty = %entry.difficulty,
            timestamp = %entry.timestamp,
            "recording score"
        );
        self.contents.scores.push(entry);
        self.save()
    }

    /// Forget the name and every score, removing the file.
    pub(crate) fn reset(&mut self) -> Result<(), Error> {
        self.contents = Contents::default();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::RemoveStore(self.path.clone(), err)),
        }
    }

    /// Scores for `difficulty`, fastest first.
    pub(crate) fn leaderboard(&self, difficulty: &str) -> Vec<&ScoreEntry> {
        let mut scores = self
            .contents
            .scores
            .iter()
            .filter(|entry| entry.difficulty.eq_ignore_ascii_case(difficulty))
            .collect::<Vec<_>>();
        // unparseable times sort last
        scores.sort_by_key(|entry| entry.millis().unwrap_or(u64::MAX));
        scores
    }

    fn save(&self) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| Error::WriteStore(self.path.clone(), err))?;
        }
        let raw = serde_json::to_string_pretty(&self.contents).map_err(Error::SerializeStore)?;
        fs::write(&self.path, raw).map_err(|err| Error::WriteStore(self.path.clone(), err))?;
        debug!(path = %self.path.display(), "saved store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "minesweep-store-{}-{}",
            std::process::id(),
            test
        ));
        let _ = fs::remove_dir_all(&dir);
        dir.join(STORE_FILE)
    }

    fn entry(name: &str, difficulty: &str, timestamp: &str) -> ScoreEntry {
        ScoreEntry {
            name: name.to_owned(),
            difficulty: difficulty.to_owned(),
            timestamp: timestamp.to_owned(),
            date: "2026-10-19T10:00:00+00:00".to_owned(),
        }
    }

    #[test]
    fn missing_file_gives_defaults() {
        let store = Store::load(scratch("missing"));
        assert_eq!(store.name(), DEFAULT_NAME);
        assert!(store.scores().is_empty());
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let path = scratch("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ this is not json").unwrap();

        let store = Store::load(&path);
        assert_eq!(store.name(), DEFAULT_NAME);
        assert!(store.scores().is_empty());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = scratch("partial");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{ "name": "" }"#).unwrap();

        let store = Store::load(&path);
        assert_eq!(store.name(), DEFAULT_NAME);
        assert!(store.scores().is_empty());
    }

    #[test]
    fn name_and_scores_survive_reload() {
        let path = scratch("reload");
        let mut store = Store::load(&path);
        store.set_name("Ada").unwrap();
        store.add_score(entry("Ada", "Easy", "00:00:42.017")).unwrap();
        store.add_score(entry("Ada", "Hard", "00:03:10.500")).unwrap();

        let reloaded = Store::load(&path);
        assert_eq!(reloaded.name(), "Ada");
        assert_eq!(reloaded.scores(), store.scores());
        assert_eq!(reloaded.scores().len(), 2);
    }

    #[test]
    fn blank_name_falls_back_to_placeholder() {
        let mut store = Store::load(scratch("blank"));
        store.set_name("   ").unwrap();
        assert_eq!(store.name(), DEFAULT_NAME);
    }

    #[test]
    fn leaderboard_is_fastest_first_per_difficulty() {
        let path = scratch("leaderboard");
        let mut store = Store::load(&path);
        store.add_score(entry("a", "Easy", "00:01:00.000")).unwrap();
        store.add_score(entry("b", "Easy", "00:00:59.999")).unwrap();
        store.add_score(entry("c", "Normal", "00:00:01.000")).unwrap();
        store.add_score(entry("d", "Easy", "garbage")).unwrap();
        store.add_score(entry("e", "easy", "00:00:30:000")).unwrap();

        let names = store
            .leaderboard("Easy")
            .into_iter()
            .map(|entry| entry.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["e", "b", "a", "d"]);
        assert_eq!(store.leaderboard("Expert").len(), 0);
    }

    #[test]
    fn leaderboard_survives_absurd_stored_times() {
        let path = scratch("absurd");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{
                "name": "Ada",
                "scores": [
                    { "name": "huge", "difficulty": "Easy", "timestamp": "18446744073709551615:00:00.000", "date": "2026-10-19T10:00:00+00:00" },
                    { "name": "fair", "difficulty": "Easy", "timestamp": "00:00:12.000", "date": "2026-10-19T10:00:00+00:00" }
                ]
            }"#,
        )
        .unwrap();

        let store = Store::load(&path);
        let names = store
            .leaderboard("Easy")
            .into_iter()
            .map(|entry| entry.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["fair", "huge"]);
    }

    #[test]
    fn reset_clears_everything() {
        let path = scratch("reset");
        let mut store = Store::load(&path);
        store.set_name("Ada").unwrap();
        store.add_score(entry("Ada", "Easy", "00:00:42.017")).unwrap();
        assert!(path.exists());

        store.reset().unwrap();
        assert!(!path.exists());
        assert_eq!(store.name(), DEFAULT_NAME);
        assert!(store.scores().is_empty());

        // resetting twice is fine
        store.reset().unwrap();
    }
}
