// handshake-client/src/token_store.rs
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Well-known key the session token is persisted under
pub const TOKEN_KEY: &str = "auth_token";

/// Persisted client-side session token.
///
/// One slot, one key: written on successful verification, cleared on
/// explicit disconnect.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// File-backed store: the token lives in `<dir>/auth_token`
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(TOKEN_KEY),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    None
                } else {
                    Some(token.to_string())
                }
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("Failed to read token file {}: {}", self.path.display(), e);
                }
                None
            }
        }
    }

    fn save(&self, token: &str) -> io::Result<()> {
        std::fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// In-memory store for embedders that manage persistence themselves
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}
