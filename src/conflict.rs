/// One `<<<<<<< ... >>>>>>>` region of a conflicted file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictBlock {
    /// 1-based line of the opening marker.
    pub line: usize,
    pub ours_label: String,
    pub theirs_label: String,
    pub ours: Vec<String>,
    pub theirs: Vec<String>,
}

/// Parse conflict markers. A diff3 base section (`|||||||`) is skipped;
/// an unterminated block at the end of the file is dropped.
pub fn parse_conflicts(text: &str) -> Vec<ConflictBlock> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0usize;

    while i < lines.len() {
        let Some(ours_label) = lines[i].strip_prefix("<<<<<<<") else {
            i += 1;
            continue;
        };

        let start = i;
        i += 1;

        let mut ours = Vec::new();
        while i < lines.len()
            && !lines[i].starts_with("=======")
            && !lines[i].starts_with("|||||||")
        {
            ours.push(lines[i].to_string());
            i += 1;
        }
        while i < lines.len() && !lines[i].starts_with("=======") {
            i += 1;
        }

        if i >= lines.len() {
            break;
        }
        i += 1;

        let mut theirs = Vec::new();
        while i < lines.len() && !lines[i].starts_with(">>>>>>>") {
            theirs.push(lines[i].to_string());
            i += 1;
        }

        if i >= lines.len() {
            break;
        }
        let theirs_label = lines[i].trim_start_matches('>').trim().to_string();
        i += 1;

        blocks.push(ConflictBlock {
            line: start + 1,
            ours_label: ours_label.trim().to_string(),
            theirs_label,
            ours,
            theirs,
        });
    }

    blocks
}

/// Lines for the Detail pane describing every conflict in `path`.
pub fn render_conflicts(path: &str, text: &str) -> Vec<String> {
    let blocks = parse_conflicts(text);
    if blocks.is_empty() {
        return vec![
            format!("{}: no conflict markers left", path),
            "Stage the file to mark it resolved.".to_string(),
        ];
    }

    let mut out = vec![format!("{}: {} conflict(s)", path, blocks.len())];
    for (n, block) in blocks.iter().enumerate() {
        out.push(String::new());
        out.push(format!("── conflict {} at line {} ──", n + 1, block.line));
        out.push(format!("ours ({}):", label_or(&block.ours_label, "HEAD")));
        out.extend(block.ours.iter().map(|l| format!("  - {}", l)));
        out.push(format!("theirs ({}):", label_or(&block.theirs_label, "incoming")));
        out.extend(block.theirs.iter().map(|l| format!("  + {}", l)));
    }
    out
}

fn label_or<'a>(label: &'a str, fallback: &'a str) -> &'a str {
    if label.is_empty() { fallback } else { label }
}
