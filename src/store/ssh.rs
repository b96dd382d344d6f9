use chrono::{DateTime, Utc};
use std::io::{self, Cursor, Read, Write};
use std::process::{Command, Output, Stdio};

use super::RemoteStore;
use crate::error::{StoreError, StoreResult};
use crate::models::RemoteEntry;
use crate::remote_path;

/// A remote host reached through the system `ssh` binary. Every call is a
/// separate, blocking ssh invocation; authentication is left to the user's
/// ssh agent and config.
#[derive(Debug, Clone)]
pub struct SshStore {
    /// `None` lets ssh pick the user from its own config
    user: Option<String>,
    host: String,
    port: u16,
    root: String,
}

#[derive(Debug, Clone, PartialEq)]
struct LsLine {
    is_dir: bool,
    size: u64,
    modified: Option<DateTime<Utc>>,
    name: String,
}

impl SshStore {
    pub fn new(user: Option<&str>, host: &str, port: u16, root: &str) -> Self {
        Self {
            user: user.map(str::to_string),
            host: host.to_string(),
            port,
            root: remote_path::normalize(root),
        }
    }

    /// Normalized first so `..` cannot climb out of the root.
    fn full_path(&self, path: &str) -> String {
        remote_path::join(&self.root, &remote_path::normalize(path))
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    fn command(&self, remote_cmd: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg(self.destination())
            .arg("-p")
            .arg(self.port.to_string())
            .arg("-o")
            .arg("ConnectTimeout=10")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("LogLevel=ERROR")
            .arg(remote_cmd);
        cmd
    }

    fn run(&self, remote_cmd: &str, path: &str) -> StoreResult<Vec<u8>> {
        tracing::debug!("ssh {}: {}", self.destination(), remote_cmd);
        let output = self
            .command(remote_cmd)
            .output()
            .map_err(|e| StoreError::Transport(format!("failed to execute ssh: {}", e)))?;
        check_status(&output, path)?;
        Ok(output.stdout)
    }
}

fn check_status(output: &Output, path: &str) -> StoreResult<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(classify_stderr(path, &stderr))
}

/// Map the error text of common coreutils failures onto the store taxonomy.
fn classify_stderr(path: &str, stderr: &str) -> StoreError {
    let path = path.to_string();
    if stderr.contains("No such file or directory") {
        StoreError::NotFound(path)
    } else if stderr.contains("File exists") || stderr.contains("cannot overwrite existing file") {
        StoreError::AlreadyExists(path)
    } else if stderr.contains("Not a directory") {
        StoreError::NotADirectory(path)
    } else {
        StoreError::Transport(format!("ssh command failed for {}: {}", path, stderr.trim()))
    }
}

/// Single-quote a path for the remote shell.
fn quote(path: &str) -> String {
    format!("'{}'", path.replace('\'', r"'\''"))
}

/// Parse one line of `ls -laL --time-style=+%s`:
/// `perms links user group size epoch name...`
/// The name is sliced from the raw line so runs of spaces survive.
fn parse_ls_line(line: &str) -> Option<LsLine> {
    let mut parts = Vec::with_capacity(6);
    let mut rest = line.trim_start();
    while parts.len() < 6 {
        let end = rest.find(char::is_whitespace)?;
        parts.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    if rest.is_empty() {
        return None;
    }

    let permissions = parts[0];
    // With -L only dangling links are still reported as links
    if permissions.starts_with('l') {
        return None;
    }
    let name = rest.to_string();

    Some(LsLine {
        is_dir: permissions.starts_with('d'),
        size: parts[4].parse::<u64>().unwrap_or(0),
        modified: parts[5]
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        name,
    })
}

fn to_entry(path: String, line: LsLine) -> RemoteEntry {
    let name = remote_path::file_name(&path).unwrap_or_default();
    if line.is_dir {
        RemoteEntry::Directory { path, name }
    } else {
        RemoteEntry::File {
            path,
            name,
            size: line.size,
            modified: line.modified,
        }
    }
}

impl RemoteStore for SshStore {
    fn get_metadata(&self, path: &str) -> StoreResult<RemoteEntry> {
        let path = remote_path::normalize(path);
        let full = self.full_path(&path);
        let stdout = self.run(&format!("ls -ladL --time-style=+%s {}", quote(&full)), &path)?;
        let stdout = String::from_utf8_lossy(&stdout);
        let line = stdout
            .lines()
            .find_map(parse_ls_line)
            .ok_or_else(|| StoreError::Transport(format!("unexpected ls output for {}", path)))?;
        Ok(to_entry(path, line))
    }

    fn list_children(&self, path: &str) -> StoreResult<Vec<RemoteEntry>> {
        let path = remote_path::normalize(path);
        let full = quote(&self.full_path(&path));
        let script = format!(
            "if [ -d {p} ]; then ls -laL --time-style=+%s {p}; s=$?; [ $s -le 1 ] || exit $s; \
             elif [ -e {p} ]; then echo {p}': Not a directory' >&2; exit 1; \
             else echo {p}': No such file or directory' >&2; exit 1; fi",
            p = full
        );
        let stdout = self.run(&script, &path)?;
        let stdout = String::from_utf8_lossy(&stdout);

        let mut items = Vec::new();
        // The leading `total` line does not parse
        for line in stdout.lines() {
            let Some(parsed) = parse_ls_line(line) else {
                continue;
            };
            if parsed.name == "." || parsed.name == ".." {
                continue;
            }
            let child = remote_path::join(&path, &parsed.name);
            items.push(to_entry(child, parsed));
        }
        Ok(items)
    }

    fn create_directory(&self, path: &str) -> StoreResult<()> {
        let path = remote_path::normalize(path);
        let full = self.full_path(&path);
        self.run(&format!("mkdir {}", quote(&full)), &path)?;
        Ok(())
    }

    fn read_file(&self, path: &str) -> StoreResult<Box<dyn Read + '_>> {
        let path = remote_path::normalize(path);
        let full = self.full_path(&path);
        let stdout = self.run(&format!("cat {}", quote(&full)), &path)?;
        Ok(Box::new(Cursor::new(stdout)))
    }

    fn write_file(&self, path: &str, source: &mut dyn Read, overwrite: bool) -> StoreResult<u64> {
        let path = remote_path::normalize(path);
        let full = quote(&self.full_path(&path));
        let remote_cmd = if overwrite {
            format!("cat > {}", full)
        } else {
            format!("set -C; cat > {}", full)
        };
        tracing::debug!("ssh {}: {}", self.destination(), remote_cmd);

        let mut child = self
            .command(&remote_cmd)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StoreError::Transport(format!("failed to execute ssh: {}", e)))?;

        let copied = match child.stdin.take() {
            Some(mut stdin) => {
                let copied = io::copy(source, &mut stdin);
                // Close stdin so the remote cat sees EOF
                let _ = stdin.flush();
                drop(stdin);
                copied
            }
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "ssh stdin unavailable")),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| StoreError::Transport(format!("ssh did not finish: {}", e)))?;
        check_status(&output, &path)?;
        copied.map_err(|e| StoreError::Transport(format!("upload of {} interrupted: {}", path, e)))
    }

    fn describe(&self) -> String {
        format!("ssh://{}:{}{}", self.destination(), self.port, self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ls_lines() {
        let line = "-rw-r--r-- 1 me staff 1024 1700000000 notes final.txt";
        let parsed = parse_ls_line(line).unwrap();
        assert!(!parsed.is_dir);
        assert_eq!(parsed.size, 1024);
        assert_eq!(parsed.name, "notes final.txt");
        assert_eq!(parsed.modified.unwrap().timestamp(), 1_700_000_000);

        let dir = parse_ls_line("drwxr-xr-x 2 me staff 4096 1700000000 photos").unwrap();
        assert!(dir.is_dir);

        let spaced = parse_ls_line("-rw-r--r--  1 me staff 3 1700000000 a  b.txt ").unwrap();
        assert_eq!(spaced.name, "a  b.txt ");
        assert_eq!(spaced.size, 3);

        // A dangling link keeps its `l` type under -L
        assert_eq!(parse_ls_line("l????????? ? ? ? ? ? dangling"), None);
        assert_eq!(parse_ls_line("-rw-r--r-- 1 me staff 3 1700000000"), None);

        assert_eq!(parse_ls_line("total 12"), None);
    }

    #[test]
    fn classifies_coreutils_errors() {
        assert!(classify_stderr("/a", "ls: cannot access '/a': No such file or directory").is_not_found());
        assert!(classify_stderr("/a", "mkdir: cannot create directory '/a': File exists").is_already_exists());
        assert!(classify_stderr("/a", "bash: /a: cannot overwrite existing file").is_already_exists());
        assert!(matches!(
            classify_stderr("/a", "/a: Not a directory"),
            StoreError::NotADirectory(_)
        ));
        assert!(matches!(
            classify_stderr("/a", "Connection refused"),
            StoreError::Transport(_)
        ));
    }

    #[test]
    fn quotes_paths_and_prefixes_root() {
        assert_eq!(quote("/it's here"), r"'/it'\''s here'");
        let store = SshStore::new(Some("me"), "example.org", 22, "/srv/data/");
        assert_eq!(store.full_path("/"), "/srv/data");
        assert_eq!(store.full_path("docs/a.txt"), "/srv/data/docs/a.txt");
        assert_eq!(store.full_path("/../../etc/passwd"), "/srv/data/etc/passwd");
        assert_eq!(store.describe(), "ssh://me@example.org:22/srv/data");
    }

    #[test]
    fn user_is_optional() {
        let store = SshStore::new(None, "example.org", 2222, "/");
        assert_eq!(store.destination(), "example.org");
        assert_eq!(store.describe(), "ssh://example.org:2222/");
    }
}
