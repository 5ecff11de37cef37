//! Output sinks behind configured handlers.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::configuration::{ConsoleStream, HandlerKind};
use crate::error::{LogConfigError, LogConfigResult};

/// Destination of rendered records for one handler.
#[derive(Debug)]
pub enum Sink {
    Console(ConsoleStream),
    WatchedFile(Mutex<WatchedFile>),
}

impl Sink {
    /// Open the sink described by `kind`. Files are opened eagerly so an
    /// unwritable path is reported at install time.
    pub fn open(kind: &HandlerKind) -> LogConfigResult<Self> {
        match kind {
            HandlerKind::Console { stream } => Ok(Sink::Console(*stream)),
            HandlerKind::WatchedFile { filename } => {
                let file = WatchedFile::open(filename)
                    .map_err(|err| LogConfigError::io(filename.clone(), err))?;
                Ok(Sink::WatchedFile(Mutex::new(file)))
            }
        }
    }

    /// Write one line. `line` must not carry its trailing newline.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        match self {
            Sink::Console(ConsoleStream::Stderr) => {
                let mut out = io::stderr().lock();
                writeln!(out, "{}", line)
            }
            Sink::Console(ConsoleStream::Stdout) => {
                let mut out = io::stdout().lock();
                writeln!(out, "{}", line)?;
                out.flush()
            }
            Sink::WatchedFile(file) => {
                let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                file.write_line(line)
            }
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Sink::Console(_) => "console",
            Sink::WatchedFile(_) => "watched_file",
        }
    }
}

/// Append-mode file that follows external rotation.
///
/// Before every write the path is checked against the open handle; when
/// the file was moved, deleted or replaced it is reopened at the same path.
#[derive(Debug)]
pub struct WatchedFile {
    path: PathBuf,
    file: File,
    identity: Option<FileIdentity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl WatchedFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = open_append(path)?;
        let identity = identity_of(&file.metadata()?);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            identity,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.reopen_if_rotated()?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()
    }

    fn reopen_if_rotated(&mut self) -> io::Result<()> {
        let current = match std::fs::metadata(&self.path) {
            Ok(meta) => identity_of(&meta),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err),
        };

        if current.is_some() && current == self.identity {
            return Ok(());
        }
        // Identity is unavailable off unix; keep the original handle there.
        if self.identity.is_none() && current.is_some() {
            return Ok(());
        }

        let file = open_append(&self.path)?;
        self.identity = identity_of(&file.metadata()?);
        self.file = file;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(unix)]
fn identity_of(meta: &std::fs::Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;

    Some(FileIdentity {
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

#[cfg(not(unix))]
fn identity_of(_meta: &std::fs::Metadata) -> Option<FileIdentity> {
    None
}
