use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, Output},
};

use crate::branch::{BranchItem, TagItem};
use crate::cache::HeadState;
use crate::conflict;
use crate::files::{FileItem, FileStatus};
use crate::log::CommitItem;
use crate::operation::{CheckoutStrategy, CheckoutTarget, OperationError, OperationOutput};
use crate::remotes::RemoteItem;

const LOG_FORMAT: &str = "--pretty=format:%H\t%h\t%ad\t%an\t%P\t%s";

fn run_git(cwd: &Path, args: &[&str]) -> io::Result<Output> {
    Command::new("git")
        .arg("-C")
        .arg(cwd)
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GCM_INTERACTIVE", "never")
        .env("GIT_PAGER", "cat")
        .env("PAGER", "cat")
        .env("GIT_EDITOR", ":")
        .env("EDITOR", ":")
        .env("GIT_SEQUENCE_EDITOR", ":")
        .env("GIT_MERGE_AUTOEDIT", "no")
        .output()
}

fn stderr_text(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).trim().to_string()
}

/// Run a read-only query and return stdout.
fn git_query(repo_root: &Path, args: &[&str]) -> Result<String, String> {
    let out = run_git(repo_root, args).map_err(|e| e.to_string())?;
    if !out.status.success() {
        return Err(stderr_text(&out));
    }
    Ok(String::from_utf8_lossy(&out.stdout).to_string())
}

/// Run a mutating command. Failures are classified from git's output.
fn git_op(repo_root: &Path, args: &[&str]) -> Result<String, OperationError> {
    let out = run_git(repo_root, args).map_err(|e| OperationError::Backend(e.to_string()))?;
    let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
    let stderr = stderr_text(&out);
    if out.status.success() {
        let text = if stderr.is_empty() {
            stdout
        } else if stdout.is_empty() {
            stderr
        } else {
            format!("{}\n{}", stdout, stderr)
        };
        return Ok(text);
    }
    let combined = format!("{}\n{}", stdout, stderr);
    tracing::debug!(?args, stderr = %stderr, "git command failed");
    Err(classify_failure(combined.trim()))
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Map git's output for a failed command onto the error taxonomy.
pub fn classify_failure(text: &str) -> OperationError {
    let lower = text.to_lowercase();

    if lower.contains("would be overwritten by")
        || lower.contains("please commit your changes or stash them")
    {
        return OperationError::DirtyWorkingTree {
            paths: indented_paths(text),
        };
    }

    if lower.contains("conflict (")
        || lower.contains("automatic merge failed")
        || lower.contains("after resolving the conflicts")
        || lower.contains("you have unmerged paths")
    {
        return OperationError::MergeConflict {
            paths: conflict_paths(text),
            detail: text.to_string(),
        };
    }

    if lower.contains("non-fast-forward")
        || lower.contains("fetch first")
        || lower.contains("not possible to fast-forward")
        || lower.contains("updates were rejected")
    {
        return OperationError::NonFastForward(text.to_string());
    }

    if lower.contains("authentication failed")
        || lower.contains("could not read username")
        || lower.contains("could not read password")
        || lower.contains("permission denied (publickey")
        || lower.contains("terminal prompts disabled")
        || lower.contains("host key verification failed")
    {
        return OperationError::AuthenticationRequired(text.to_string());
    }

    if lower.contains("could not resolve host")
        || lower.contains("unable to access")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("could not read from remote repository")
    {
        return OperationError::NetworkUnavailable(text.to_string());
    }

    if lower.contains("no tracking information")
        || lower.contains("has no upstream branch")
        || lower.contains("nothing to commit")
        || lower.contains("nothing added to commit")
        || lower.contains("already exists")
        || lower.contains("not a valid branch name")
        || lower.contains("is not a valid")
    {
        return OperationError::InvalidOperation(last_line(text));
    }

    if text.trim().is_empty() {
        return OperationError::Backend("git exited with an error".to_string());
    }
    OperationError::Backend(last_line(text))
}

/// Paths git lists (tab-indented) under "would be overwritten".
fn indented_paths(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| l.starts_with('\t'))
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// `CONFLICT (content): Merge conflict in src/a.rs` -> `src/a.rs`.
fn conflict_paths(text: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for line in text.lines() {
        if !line.starts_with("CONFLICT") {
            continue;
        }
        let path = line
            .split_once("Merge conflict in ")
            .map(|(_, p)| p.trim())
            .or_else(|| line.split_whitespace().nth(2));
        if let Some(p) = path
            && !p.is_empty()
            && !paths.iter().any(|x: &String| x == p)
        {
            paths.push(p.to_string());
        }
    }
    paths
}

pub fn discover_repo_root(path: &Path) -> Result<PathBuf, String> {
    let root = git_query(path, &["rev-parse", "--show-toplevel"])?;
    let root = root.trim();
    if root.is_empty() {
        return Err("not inside a git repository".to_string());
    }
    Ok(PathBuf::from(root))
}

pub fn head_state(repo_root: &Path) -> Result<HeadState, String> {
    let out = run_git(repo_root, &["symbolic-ref", "--short", "-q", "HEAD"])
        .map_err(|e| e.to_string())?;
    if out.status.success() {
        let name = String::from_utf8_lossy(&out.stdout).trim().to_string();
        let born = run_git(repo_root, &["rev-parse", "--verify", "-q", "HEAD"])
            .map_err(|e| e.to_string())?;
        return Ok(if born.status.success() {
            HeadState::Branch(name)
        } else {
            HeadState::Unborn(name)
        });
    }
    let hash = git_query(repo_root, &["rev-parse", "--short", "HEAD"])?;
    Ok(HeadState::Detached(hash.trim().to_string()))
}

pub fn list_branches(repo_root: &Path) -> Result<Vec<BranchItem>, String> {
    let format = "%(HEAD)\t%(refname:short)\t%(upstream:short)\t%(upstream:track)";

    let local = git_query(
        repo_root,
        &["for-each-ref", "--sort=-committerdate", "refs/heads", "--format", format],
    )?;
    let remote = git_query(
        repo_root,
        &["for-each-ref", "--sort=-committerdate", "refs/remotes", "--format", format],
    )?;

    let mut branches = parse_branch_lines(&local, false);
    branches.extend(parse_branch_lines(&remote, true));
    Ok(branches)
}

fn parse_branch_lines(text: &str, is_remote: bool) -> Vec<BranchItem> {
    let mut branches = Vec::new();
    for line in text.lines() {
        let mut it = line.split('\t');
        let head = it.next().unwrap_or("").trim();
        let name = it.next().unwrap_or("").trim().to_string();
        if name.is_empty() || (is_remote && (name.ends_with("/HEAD") || !name.contains('/'))) {
            continue;
        }
        let upstream = it
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let (ahead, behind) = parse_track(it.next().unwrap_or(""));
        branches.push(BranchItem {
            name,
            is_current: !is_remote && head == "*",
            is_remote,
            upstream,
            ahead,
            behind,
        });
    }
    branches
}

/// `[ahead 2, behind 1]` -> (2, 1). `[gone]` and empty -> (0, 0).
fn parse_track(track: &str) -> (u32, u32) {
    let inner = track.trim().trim_start_matches('[').trim_end_matches(']');
    let mut ahead = 0;
    let mut behind = 0;
    for part in inner.split(',') {
        let mut words = part.split_whitespace();
        match (words.next(), words.next().and_then(|n| n.parse().ok())) {
            (Some("ahead"), Some(n)) => ahead = n,
            (Some("behind"), Some(n)) => behind = n,
            _ => {}
        }
    }
    (ahead, behind)
}

pub fn list_tags(repo_root: &Path) -> Result<Vec<TagItem>, String> {
    let text = git_query(
        repo_root,
        &[
            "for-each-ref",
            "--sort=-creatordate",
            "refs/tags",
            "--format",
            "%(refname:short)\t%(objectname:short)\t%(*objectname:short)",
        ],
    )?;
    let mut tags = Vec::new();
    for line in text.lines() {
        let mut it = line.split('\t');
        let name = it.next().unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue;
        }
        let object = it.next().unwrap_or("").trim();
        let peeled = it.next().unwrap_or("").trim();
        let target = if peeled.is_empty() { object } else { peeled };
        tags.push(TagItem {
            name,
            target: target.to_string(),
        });
    }
    Ok(tags)
}

pub fn list_history(repo_root: &Path, max: usize) -> Result<Vec<CommitItem>, String> {
    let max_s = max.to_string();
    let out = run_git(
        repo_root,
        &[
            "log",
            "--no-color",
            "--date=short",
            "--max-count",
            max_s.as_str(),
            LOG_FORMAT,
        ],
    )
    .map_err(|e| e.to_string())?;
    if !out.status.success() {
        let err = stderr_text(&out);
        // Fresh repository without commits.
        if err.contains("does not have any commits") || err.contains("bad default revision") {
            return Ok(Vec::new());
        }
        return Err(err);
    }
    Ok(parse_log(&String::from_utf8_lossy(&out.stdout)))
}

fn parse_log(text: &str) -> Vec<CommitItem> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let mut it = line.splitn(6, '\t');
        let hash = it.next().unwrap_or("").trim().to_string();
        let short = it.next().unwrap_or("").trim().to_string();
        let date = it.next().unwrap_or("").trim().to_string();
        let author = it.next().unwrap_or("").trim().to_string();
        let parent_count = it.next().unwrap_or("").split_whitespace().count();
        let summary = it.next().unwrap_or("").trim().to_string();
        if hash.is_empty() {
            continue;
        }
        entries.push(CommitItem {
            hash,
            short,
            summary,
            author,
            date,
            parent_count,
        });
    }
    entries
}

pub fn list_status(repo_root: &Path) -> Result<Vec<FileItem>, String> {
    let out = run_git(repo_root, &["status", "--porcelain=v1", "-z"]).map_err(|e| e.to_string())?;
    if !out.status.success() {
        return Err(stderr_text(&out));
    }
    Ok(parse_status(&out.stdout))
}

fn is_conflict_status(x: char, y: char) -> bool {
    matches!(
        (x, y),
        ('U', 'U') | ('A', 'A') | ('D', 'D') | ('A', 'U') | ('U', 'A') | ('D', 'U') | ('U', 'D')
    )
}

/// Parse `git status --porcelain=v1 -z`. A path with changes on both
/// sides yields a staged and an unstaged item.
fn parse_status(raw: &[u8]) -> Vec<FileItem> {
    let items: Vec<String> = raw
        .split(|b| *b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).to_string())
        .collect();

    let mut files = Vec::new();
    let mut i = 0;
    while i < items.len() {
        let s = &items[i];
        i += 1;
        if s.len() < 4 {
            continue;
        }
        let mut chars = s.chars();
        let x = chars.next().unwrap_or(' ');
        let y = chars.next().unwrap_or(' ');
        let path = s[3..].to_string();

        if x == '?' && y == '?' {
            files.push(FileItem::new(path, false, FileStatus::Untracked));
            continue;
        }
        if x == '!' {
            continue;
        }
        if is_conflict_status(x, y) {
            files.push(FileItem::new(path, false, FileStatus::Conflicted));
            continue;
        }

        // In -z mode the original path of a rename follows as its own field.
        let renamed_from = if matches!(x, 'R' | 'C') && i < items.len() {
            i += 1;
            Some(items[i - 1].clone())
        } else {
            None
        };

        if let Some(status) = FileStatus::from_porcelain(x) {
            let mut item = FileItem::new(path.clone(), true, status);
            item.renamed_from = renamed_from;
            files.push(item);
        }
        if let Some(status) = FileStatus::from_porcelain(y) {
            files.push(FileItem::new(path, false, status));
        }
    }
    files
}

pub fn list_remotes(repo_root: &Path) -> Result<Vec<RemoteItem>, String> {
    let text = git_query(repo_root, &["remote", "-v"])?;
    Ok(parse_remotes(&text))
}

fn parse_remotes(text: &str) -> Vec<RemoteItem> {
    let mut remotes: Vec<RemoteItem> = Vec::new();
    for line in text.lines() {
        let mut it = line.split_whitespace();
        let (Some(name), Some(url)) = (it.next(), it.next()) else {
            continue;
        };
        if remotes.iter().any(|r| r.name == name) {
            continue;
        }
        remotes.push(RemoteItem {
            name: name.to_string(),
            url: url.to_string(),
        });
    }
    remotes
}

fn remote_exists(repo_root: &Path, name: &str) -> Result<bool, OperationError> {
    let remotes = list_remotes(repo_root).map_err(OperationError::Backend)?;
    Ok(remotes.iter().any(|r| r.name == name))
}

fn local_branch_exists(repo_root: &Path, name: &str) -> bool {
    let reference = format!("refs/heads/{}", name);
    run_git(repo_root, &["show-ref", "--verify", "--quiet", reference.as_str()])
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn current_branch(repo_root: &Path) -> Option<String> {
    head_state(repo_root)
        .ok()
        .and_then(|h| h.branch_name().map(str::to_string))
}

pub fn show_commit(repo_root: &Path, hash: &str) -> Result<Vec<String>, String> {
    let text = git_query(
        repo_root,
        &[
            "show",
            "--no-color",
            "--decorate=short",
            "--date=iso",
            "--format=format:commit %H%d%nAuthor: %an <%ae>%nDate:   %ad%nParents: %p%n%n%B%n───────────────────────────────────────",
            "--stat",
            "--patch",
            hash,
        ],
    )?;
    Ok(text.lines().map(str::to_string).collect())
}

pub fn diff_path(repo_root: &Path, path: &str, staged: bool) -> Result<String, String> {
    let mut args: Vec<&str> = vec!["diff", "--no-color"];
    if staged {
        args.push("--cached");
    }
    args.push("--");
    args.push(path);
    git_query(repo_root, &args)
}

/// Diff lines for one row of the Files pane.
pub fn file_diff_lines(
    repo_root: &Path,
    path: &str,
    staged: bool,
    untracked: bool,
) -> Result<Vec<String>, String> {
    if untracked {
        let file_path = repo_root.join(path);
        if file_path.is_dir() {
            let entries = fs::read_dir(&file_path).map_err(|e| e.to_string())?;
            let mut lines = vec![format!("Untracked directory: {}/", path), String::new()];
            for entry in entries.filter_map(|e| e.ok()) {
                lines.push(format!("  + {}", entry.file_name().to_string_lossy()));
            }
            return Ok(lines);
        }
        let content = fs::read_to_string(&file_path).map_err(|e| e.to_string())?;
        let body: Vec<&str> = content.lines().collect();
        let mut lines = vec![
            format!("diff --git a/{} b/{}", path, path),
            "new file".to_string(),
            "--- /dev/null".to_string(),
            format!("+++ b/{}", path),
            format!("@@ -0,0 +1,{} @@", body.len()),
        ];
        lines.extend(body.into_iter().map(|l| format!("+{}", l)));
        return Ok(lines);
    }

    let text = diff_path(repo_root, path, staged)?;
    if text.trim().is_empty() {
        return Ok(vec!["No diff".to_string()]);
    }
    Ok(text.lines().map(str::to_string).collect())
}

pub fn conflict_lines(repo_root: &Path, path: &str) -> Result<Vec<String>, String> {
    let text = fs::read_to_string(repo_root.join(path)).map_err(|e| e.to_string())?;
    Ok(conflict::render_conflicts(path, &text))
}

pub fn checkout(
    repo_root: &Path,
    target: &CheckoutTarget,
    strategy: CheckoutStrategy,
) -> Result<OperationOutput, OperationError> {
    let mut notes = Vec::new();

    if let CheckoutTarget::RemoteBranch(remote) = target {
        let local = tracking_name(remote);
        if local_branch_exists(repo_root, local) {
            return Err(OperationError::InvalidOperation(format!(
                "local branch '{}' already exists; check it out instead",
                local
            )));
        }
    }

    let mut stashed = None;
    if strategy == CheckoutStrategy::Stash {
        let msg = format!("gitbuddy: before checkout {}", target.label());
        let out = git_op(
            repo_root,
            &["stash", "push", "--include-untracked", "-m", msg.as_str()],
        )?;
        let line = last_line(&out);
        if !line.starts_with("No local changes") {
            stashed = Some(line.clone());
        }
        notes.push(line);
    }

    let mut args: Vec<&str> = vec!["checkout"];
    if strategy == CheckoutStrategy::Discard {
        args.push("-f");
    }
    match target {
        CheckoutTarget::Branch(name) => args.push(name.as_str()),
        CheckoutTarget::RemoteBranch(remote) => {
            args.extend(["--track", "-b", tracking_name(remote), remote.as_str()]);
        }
        CheckoutTarget::Detached(rev) => args.extend(["--detach", rev.as_str()]),
    }

    let out = git_op(repo_root, &args).map_err(|err| match &stashed {
        Some(line) => err.with_note(&format!(
            "local changes were stashed ({}); `git stash pop` restores them",
            line
        )),
        None => err,
    })?;
    notes.push(last_line(&out));
    notes.retain(|n| !n.is_empty());
    Ok(OperationOutput::with_message(notes.join("; ")))
}

/// `origin/feature/x` -> `feature/x`.
fn tracking_name(remote: &str) -> &str {
    remote.split_once('/').map(|(_, rest)| rest).unwrap_or(remote)
}

/// Create a branch at HEAD without switching to it.
pub fn create_branch(repo_root: &Path, name: &str) -> Result<OperationOutput, OperationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OperationError::InvalidOperation(
            "branch name is empty".to_string(),
        ));
    }
    git_op(repo_root, &["check-ref-format", "--branch", name])
        .map_err(|_| OperationError::InvalidOperation(format!("'{}' is not a valid branch name", name)))?;
    git_op(repo_root, &["branch", name, "HEAD"])?;
    Ok(OperationOutput::with_message(format!("Created branch {}", name)))
}

pub fn delete_branch(repo_root: &Path, name: &str) -> Result<OperationOutput, OperationError> {
    if current_branch(repo_root).as_deref() == Some(name) {
        return Err(OperationError::InvalidOperation(format!(
            "cannot delete the checked-out branch '{}'",
            name
        )));
    }
    let out = git_op(repo_root, &["branch", "-d", name])?;
    Ok(OperationOutput::with_message(last_line(&out)))
}

pub fn merge(repo_root: &Path, branch: &str) -> Result<OperationOutput, OperationError> {
    if current_branch(repo_root).as_deref() == Some(branch) {
        return Err(OperationError::InvalidOperation(format!(
            "cannot merge '{}' into itself",
            branch
        )));
    }
    let out = git_op(repo_root, &["merge", "--no-edit", branch])?;
    Ok(OperationOutput::with_message(last_line(&out)))
}

pub fn merge_abort(repo_root: &Path) -> Result<OperationOutput, OperationError> {
    git_op(repo_root, &["merge", "--abort"])?;
    Ok(OperationOutput::with_message("Merge aborted"))
}

pub fn revert_abort(repo_root: &Path) -> Result<OperationOutput, OperationError> {
    git_op(repo_root, &["revert", "--abort"])?;
    Ok(OperationOutput::with_message("Revert aborted"))
}

pub fn fetch(repo_root: &Path, remote: &str) -> Result<OperationOutput, OperationError> {
    if !remote_exists(repo_root, remote)? {
        return Err(OperationError::InvalidOperation(format!(
            "no remote named '{}'",
            remote
        )));
    }
    git_op(repo_root, &["fetch", "--prune", remote])?;
    Ok(OperationOutput::with_message(format!("Fetched {}", remote)))
}

pub fn pull(repo_root: &Path) -> Result<OperationOutput, OperationError> {
    if matches!(head_state(repo_root), Ok(HeadState::Detached(_))) {
        return Err(OperationError::InvalidOperation(
            "HEAD is detached; nothing to pull into".to_string(),
        ));
    }
    let out = git_op(repo_root, &["pull", "--no-rebase", "--no-edit"])?;
    Ok(OperationOutput::with_message(last_line(&out)))
}

/// Fast-forward `branch` to `upstream` without touching HEAD or the worktree.
pub fn pull_branch(
    repo_root: &Path,
    branch: &str,
    upstream: &str,
) -> Result<OperationOutput, OperationError> {
    if current_branch(repo_root).as_deref() == Some(branch) {
        return pull(repo_root);
    }

    // An upstream without a known remote prefix is a local branch.
    let (remote, remote_ref) = match upstream.split_once('/') {
        Some((remote, rest)) => {
            if remote_exists(repo_root, remote)? {
                (remote, rest)
            } else {
                (".", upstream)
            }
        }
        None => (".", upstream),
    };
    let refspec = format!("{}:{}", remote_ref, branch);
    git_op(repo_root, &["fetch", remote, refspec.as_str()])?;
    Ok(OperationOutput::with_message(format!(
        "Updated {} from {}",
        branch, upstream
    )))
}

pub fn push(repo_root: &Path) -> Result<OperationOutput, OperationError> {
    let head = head_state(repo_root).map_err(OperationError::Backend)?;
    if head.is_detached() {
        return Err(OperationError::InvalidOperation(
            "HEAD is detached; check out a branch before pushing".to_string(),
        ));
    }

    let has_upstream = run_git(
        repo_root,
        &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"],
    )
    .map(|o| o.status.success())
    .unwrap_or(false);

    let out = if has_upstream {
        git_op(repo_root, &["push"])?
    } else {
        if !remote_exists(repo_root, "origin")? {
            return Err(OperationError::InvalidOperation(
                "branch has no upstream and there is no 'origin' remote".to_string(),
            ));
        }
        git_op(repo_root, &["push", "-u", "origin", "HEAD"])?
    };
    Ok(OperationOutput::with_message(last_line(&out)))
}

pub fn revert_no_commit(
    repo_root: &Path,
    hash: &str,
    parent_count: usize,
) -> Result<OperationOutput, OperationError> {
    let mut args = vec!["revert", "--no-commit"];
    if parent_count > 1 {
        args.extend(["-m", "1"]);
    }
    args.push(hash);
    git_op(repo_root, &args)?;
    Ok(OperationOutput::with_message(format!(
        "Reverted {} into the working tree",
        crate::operation::short_rev(hash)
    )))
}

pub fn stage_path(repo_root: &Path, path: &str) -> Result<OperationOutput, OperationError> {
    git_op(repo_root, &["add", "-A", "--", path])?;
    Ok(OperationOutput::with_message(format!("Staged {}", path)))
}

pub fn unstage_path(repo_root: &Path, path: &str) -> Result<OperationOutput, OperationError> {
    match git_op(repo_root, &["restore", "--staged", "--", path]) {
        Ok(_) => {}
        // No HEAD to restore from in a fresh repository.
        Err(_) if matches!(head_state(repo_root), Ok(HeadState::Unborn(_))) => {
            git_op(repo_root, &["rm", "--cached", "-r", "-q", "--", path])?;
        }
        Err(e) => return Err(e),
    }
    Ok(OperationOutput::with_message(format!("Unstaged {}", path)))
}

/// Apply `single` to every path. A batch attempt goes first; if it fails
/// each path is retried alone so the failures can be reported per path.
fn apply_all<F>(
    paths: &[String],
    batch: impl FnOnce() -> Result<OperationOutput, OperationError>,
    single: F,
    verb: &str,
) -> Result<OperationOutput, OperationError>
where
    F: Fn(&str) -> Result<OperationOutput, OperationError>,
{
    if paths.is_empty() {
        return Err(OperationError::InvalidOperation(format!(
            "nothing to {}",
            verb
        )));
    }
    if batch().is_ok() {
        return Ok(OperationOutput::with_message(format!(
            "{} {} file(s)",
            capitalize(verb),
            paths.len()
        )));
    }

    let mut failed = Vec::new();
    let mut succeeded = 0;
    for path in paths {
        match single(path) {
            Ok(_) => succeeded += 1,
            Err(e) => failed.push((path.clone(), e.to_string())),
        }
    }
    if failed.is_empty() {
        return Ok(OperationOutput::with_message(format!(
            "{} {} file(s)",
            capitalize(verb),
            succeeded
        )));
    }
    Err(OperationError::PartialFailure { failed, succeeded })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn stage_paths(repo_root: &Path, paths: &[String]) -> Result<OperationOutput, OperationError> {
    apply_all(
        paths,
        || {
            let mut args = vec!["add", "-A", "--"];
            args.extend(paths.iter().map(String::as_str));
            git_op(repo_root, &args).map(OperationOutput::with_message)
        },
        |p| stage_path(repo_root, p),
        "stage",
    )
}

pub fn unstage_paths(repo_root: &Path, paths: &[String]) -> Result<OperationOutput, OperationError> {
    apply_all(
        paths,
        || {
            let mut args = vec!["restore", "--staged", "--"];
            args.extend(paths.iter().map(String::as_str));
            git_op(repo_root, &args).map(OperationOutput::with_message)
        },
        |p| unstage_path(repo_root, p),
        "unstage",
    )
}

pub fn commit_message(repo_root: &Path, message: &str) -> Result<OperationOutput, OperationError> {
    let msg = message.trim();
    if msg.is_empty() {
        return Err(OperationError::InvalidOperation(
            "empty commit message".to_string(),
        ));
    }

    let mut file = tempfile::Builder::new()
        .prefix("gitbuddy-commit-")
        .suffix(".txt")
        .tempfile()
        .map_err(|e| OperationError::Backend(e.to_string()))?;
    file.write_all(msg.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| OperationError::Backend(e.to_string()))?;

    git_op(
        repo_root,
        &["commit", "-F", file.path().to_string_lossy().as_ref()],
    )?;

    // The log refresh covers it if this lookup fails.
    let commit = git_query(
        repo_root,
        &["log", "-1", "--no-color", "--date=short", LOG_FORMAT],
    )
    .ok()
    .and_then(|text| parse_log(&text).into_iter().next());

    let message = match &commit {
        Some(c) => format!("Committed {} {}", c.short, c.summary),
        None => "Committed".to_string(),
    };
    Ok(OperationOutput {
        message: Some(message),
        commit,
    })
}

pub fn add_remote(repo_root: &Path, name: &str, url: &str) -> Result<OperationOutput, OperationError> {
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() || url.is_empty() {
        return Err(OperationError::InvalidOperation(
            "remote name and URL are required".to_string(),
        ));
    }
    git_op(repo_root, &["remote", "add", name, url])?;
    Ok(OperationOutput::with_message(format!("Added remote {}", name)))
}

pub fn remove_remote(repo_root: &Path, name: &str) -> Result<OperationOutput, OperationError> {
    git_op(repo_root, &["remote", "remove", name])?;
    Ok(OperationOutput::with_message(format!("Removed remote {}", name)))
}
