//! Caller authorization for the browse surface.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::config::{AccessSettings, AllowedCaller};

pub const ROOT_UID: u32 = 0;
pub const SYSTEM_UID: u32 = 1000;

/// Decides whether a caller may browse the catalog.
pub trait CallerAuthorizer: Send + Sync {
    fn is_known_caller(&self, package: &str, uid: u32) -> bool;
}

/// Allow-list backed authorizer.
///
/// Root, the system uid and the uid this process runs as are always known.
/// Verdicts are cached per package and re-evaluated when the package shows
/// up with a different uid.
pub struct AllowList {
    own_uid: u32,
    allowed: Vec<AllowedCaller>,
    checked: Mutex<HashMap<String, (u32, bool)>>,
}

impl AllowList {
    pub fn new(own_uid: u32, allowed: Vec<AllowedCaller>) -> Self {
        Self {
            own_uid,
            allowed,
            checked: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &AccessSettings, own_uid: u32) -> Self {
        Self::new(own_uid, settings.allowed_callers.clone())
    }

    fn evaluate(&self, package: &str, uid: u32) -> bool {
        if uid == self.own_uid || uid == ROOT_UID || uid == SYSTEM_UID {
            return true;
        }
        self.allowed
            .iter()
            .any(|c| c.package == package && c.uid.is_none_or(|u| u == uid))
    }
}

impl CallerAuthorizer for AllowList {
    fn is_known_caller(&self, package: &str, uid: u32) -> bool {
        let mut checked = self.checked.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&(cached_uid, verdict)) = checked.get(package) {
            if cached_uid == uid {
                return verdict;
            }
        }

        let verdict = self.evaluate(package, uid);
        if verdict {
            debug!(package, uid, "caller allowed");
        } else {
            info!(package, uid, "unknown caller");
        }
        checked.insert(package.to_string(), (uid, verdict));
        verdict
    }
}

/// Uid of the running process.
#[cfg(unix)]
pub fn current_uid() -> Option<u32> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata("/proc/self").ok().map(|m| m.uid())
}

#[cfg(not(unix))]
pub fn current_uid() -> Option<u32> {
    None
}
