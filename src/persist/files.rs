//! Per-user trail files and waypoint snapshots on the server.
//!
//! Layout under the data root:
//!
//! ```text
//! <root>/<user>/<YYYYMMDDHHMMSS>-<id16>.json   raw accepted trail bodies
//! <root>/<user>/<YYYYMMDDHHMMSS>-<id16>-<n>.json  another trail whose id normalizes to id16
//! <root>/<user>/waypoints.json                 {"waypoints": {name: Waypoint}}
//! ```

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    core::waypoints::{WaypointSnapshot, WaypointStore},
    trail::Trail,
    validate::parse_trail,
};

use super::PersistResult;

const WAYPOINTS_FILE: &str = "waypoints.json";

static TRAIL_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{14}-([0-9A-Za-z]{16})(?:-\d+)?\.json$").expect("valid regex")
});
static SELECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z]{16}$").expect("valid regex"));

/// Which stored trails a plot covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailSelection {
    All,
    Ids(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad trail id {0:?}")]
pub struct SelectionError(pub String);

impl TrailSelection {
    /// Parses `all` or a comma-separated list of 16-character ids.
    pub fn parse(params: &str) -> Result<Self, SelectionError> {
        if params == "all" {
            return Ok(Self::All);
        }
        let ids = params
            .split(',')
            .map(|id| {
                if SELECT_ID.is_match(id) {
                    Ok(id.to_string())
                } else {
                    Err(SelectionError(id.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Ids(ids))
    }

    /// True when `file_name` is a trail file this selection covers.
    pub fn matches(&self, file_name: &str) -> bool {
        let Some(caps) = TRAIL_FILE.captures(file_name) else {
            return false;
        };
        match self {
            Self::All => true,
            Self::Ids(ids) => {
                let id = &caps[1];
                ids.iter().any(|want| want.eq_ignore_ascii_case(id))
            }
        }
    }
}

/// Raw bytes of one stored trail file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub body: Vec<u8>,
}

/// Outcome of [`TrailDirectory::store_trail`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOutcome {
    pub path: PathBuf,
    /// False when a file for the same id already existed.
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct TrailDirectory {
    root: PathBuf,
}

impl TrailDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Caller must have checked `user` against the user-id pattern.
    pub fn user_dir(&self, user: &str) -> PathBuf {
        self.root.join(user)
    }

    /// Path of the stored copy of `trail`, if any.
    ///
    /// File names only carry the normalized 16-digit id, so candidates are
    /// confirmed against the exact version and id inside the stored body.
    pub fn find_trail(&self, user: &str, trail: &Trail) -> PersistResult<Option<PathBuf>> {
        let selection = TrailSelection::Ids(vec![trail.storage_id()]);
        let dir = self.user_dir(user);
        for name in self.trail_file_names(user)? {
            if !selection.matches(&name) {
                continue;
            }
            let path = dir.join(name);
            if let Ok(stored) = parse_trail(&fs::read(&path)?) {
                if stored.version() == trail.version() && stored.id() == trail.id() {
                    return Ok(Some(path));
                }
            }
        }
        Ok(None)
    }

    /// Writes `body` verbatim as a new trail file unless `trail` is already stored.
    ///
    /// Distinct ids sharing a normalized id get a `-<n>` suffix.
    pub fn store_trail(
        &self,
        user: &str,
        trail: &Trail,
        body: &[u8],
    ) -> PersistResult<StoreOutcome> {
        let storage_id = trail.storage_id();
        if let Some(path) = self.find_trail(user, trail)? {
            info!(user, id = trail.id(), "trail already stored; skipping write");
            return Ok(StoreOutcome {
                path,
                created: false,
            });
        }

        let dir = self.user_dir(user);
        fs::create_dir_all(&dir)?;
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let mut path = dir.join(format!("{stamp}-{storage_id}.json"));
        let mut suffix = 1;
        while path.exists() {
            path = dir.join(format!("{stamp}-{storage_id}-{suffix}.json"));
            suffix += 1;
        }
        write_atomic(&path, body)?;
        info!(user, id = trail.id(), path = %path.display(), "stored trail");
        Ok(StoreOutcome {
            path,
            created: true,
        })
    }

    /// Loads every selected trail file in file-name (time) order.
    pub fn load_trails(
        &self,
        user: &str,
        selection: &TrailSelection,
    ) -> PersistResult<Vec<StoredFile>> {
        let dir = self.user_dir(user);
        let mut out = Vec::new();
        for file_name in self.trail_file_names(user)? {
            if !selection.matches(&file_name) {
                continue;
            }
            let body = fs::read(dir.join(&file_name))?;
            out.push(StoredFile { file_name, body });
        }
        debug!(user, count = out.len(), "loaded trail files");
        Ok(out)
    }

    /// Loads the user's waypoint snapshot; a missing file is an empty store.
    pub fn load_waypoints(&self, user: &str) -> PersistResult<WaypointStore> {
        let path = self.user_dir(user).join(WAYPOINTS_FILE);
        match fs::read(&path) {
            Ok(bytes) => {
                let snapshot: WaypointSnapshot = serde_json::from_slice(&bytes)?;
                Ok(WaypointStore::from_snapshot(snapshot))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(WaypointStore::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn write_waypoints(&self, user: &str, snapshot: &WaypointSnapshot) -> PersistResult<()> {
        let dir = self.user_dir(user);
        fs::create_dir_all(&dir)?;
        write_atomic(&dir.join(WAYPOINTS_FILE), &serde_json::to_vec(snapshot)?)?;
        debug!(user, count = snapshot.waypoints.len(), "saved waypoints");
        Ok(())
    }

    fn trail_file_names(&self, user: &str) -> PersistResult<Vec<String>> {
        let entries = match fs::read_dir(self.user_dir(user)) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(name) = name.to_str() {
                if TrailSelection::All.matches(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> PersistResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{trail::TrailV1, types::Reading};

    #[test]
    fn selection_parsing() {
        assert_eq!(TrailSelection::parse("all"), Ok(TrailSelection::All));
        assert_eq!(
            TrailSelection::parse("0123456789ABCDEF,000000000000000a"),
            Ok(TrailSelection::Ids(vec![
                "0123456789ABCDEF".to_string(),
                "000000000000000a".to_string()
            ]))
        );
        assert!(TrailSelection::parse("ALL").is_err());
        assert!(TrailSelection::parse("0123456789ABCDEF,").is_err());
    }

    #[test]
    fn selection_matches_only_trail_files() {
        let sel = TrailSelection::parse("000000000000000A").unwrap();
        assert!(sel.matches("20240101120000-000000000000000a.json"));
        assert!(!sel.matches("20240101120000-000000000000000B.json"));
        assert!(!TrailSelection::All.matches("waypoints.json"));
        assert!(!TrailSelection::All.matches("20240101120000-000000000000000A.json.tmp"));
    }

    fn v1(id: &str) -> (Trail, String) {
        let trail = Trail::V1(TrailV1 {
            id: id.to_string(),
            device: "phone".to_string(),
            start: 0.0,
            end: 1.0,
            distance: 0.0,
            waypoints: Vec::new(),
            readings: vec![Reading::new(10.0, 20.0)],
        });
        let body = trail.to_json().unwrap();
        (trail, body)
    }

    #[test]
    fn suffixed_names_are_trail_files() {
        let sel = TrailSelection::parse("000000000000000A").unwrap();
        assert!(sel.matches("20240101120000-000000000000000A-2.json"));
        assert!(!TrailSelection::All.matches("20240101120000-000000000000000A-x.json"));
    }

    #[test]
    fn missing_user_directory_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = TrailDirectory::new(tmp.path());
        assert!(dir.load_trails("nobody", &TrailSelection::All).unwrap().is_empty());
        assert!(dir.load_waypoints("nobody").unwrap().is_empty());
        assert_eq!(dir.find_trail("nobody", &v1("a").0).unwrap(), None);
    }

    #[test]
    fn store_is_idempotent_per_id() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = TrailDirectory::new(tmp.path());
        let (trail, body) = v1("abc123");
        let first = dir.store_trail("alice", &trail, body.as_bytes()).unwrap();
        assert!(first.created);
        let again = dir.store_trail("alice", &trail, b"{\"other\":1}").unwrap();
        assert!(!again.created);
        assert_eq!(again.path, first.path);
        assert_eq!(fs::read(&first.path).unwrap(), body.as_bytes());
    }

    #[test]
    fn ids_sharing_a_storage_id_are_both_kept() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = TrailDirectory::new(tmp.path());
        let (a, a_body) = v1("10000000000000000");
        let (b, b_body) = v1("20000000000000000");
        let (c, c_body) = v1("0000000000000000");
        assert_eq!(a.storage_id(), b.storage_id());
        assert_eq!(a.storage_id(), c.storage_id());

        let stored_a = dir.store_trail("alice", &a, a_body.as_bytes()).unwrap();
        let stored_b = dir.store_trail("alice", &b, b_body.as_bytes()).unwrap();
        let stored_c = dir.store_trail("alice", &c, c_body.as_bytes()).unwrap();
        assert!(stored_a.created && stored_b.created && stored_c.created);
        assert_ne!(stored_a.path, stored_b.path);
        assert_ne!(stored_b.path, stored_c.path);

        assert_eq!(dir.find_trail("alice", &b).unwrap(), Some(stored_b.path.clone()));
        assert!(!dir.store_trail("alice", &b, b_body.as_bytes()).unwrap().created);
        assert_eq!(dir.load_trails("alice", &TrailSelection::All).unwrap().len(), 3);
    }

    #[test]
    fn ids_differing_in_case_are_distinct() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = TrailDirectory::new(tmp.path());
        let (lower, lower_body) = v1("abc");
        let (upper, upper_body) = v1("ABC");
        assert!(dir.store_trail("alice", &lower, lower_body.as_bytes()).unwrap().created);
        assert!(dir.store_trail("alice", &upper, upper_body.as_bytes()).unwrap().created);
        assert_eq!(dir.load_trails("alice", &TrailSelection::All).unwrap().len(), 2);
    }
}
