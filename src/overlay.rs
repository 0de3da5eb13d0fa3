//! Modal input surfaces. While an overlay is on the stack it receives every
//! key; the pane underneath keeps its state untouched.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::input::TextInput;
use crate::log::FilterOrigin;
use crate::operation::CheckoutTarget;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayKind {
    CommitMessage,
    NewBranch,
    AddRemote,
    Confirm,
    FuzzyFind,
}

/// What a confirmation prompt is asking about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteBranch(String),
    RemoveRemote(String),
    /// Checkout blocked by local changes.
    DirtyCheckout(CheckoutTarget),
    /// Conflicts left behind by a merge, pull or revert.
    Conflict { revert: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmChoice {
    Yes,
    Stash,
    Discard,
    Abort,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlaySubmit {
    Commit(String),
    NewBranch(String),
    AddRemote { name: String, url: String },
    Confirm(ConfirmAction, ConfirmChoice),
    FindAccept,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayOutcome {
    /// Key handled inside the overlay, nothing for the app to do.
    Consumed,
    Cancelled,
    Submit(OverlaySubmit),
    QueryChanged(String),
    FindMove(i32),
}

#[derive(Clone, Debug, Default)]
pub struct TextOverlay {
    pub input: TextInput,
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteField {
    Name,
    Url,
}

impl RemoteField {
    fn index(self) -> usize {
        match self {
            RemoteField::Name => 0,
            RemoteField::Url => 1,
        }
    }

    fn other(self) -> RemoteField {
        match self {
            RemoteField::Name => RemoteField::Url,
            RemoteField::Url => RemoteField::Name,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AddRemoteForm {
    pub fields: [TextInput; 2],
    pub focus: RemoteField,
    pub error: Option<String>,
}

impl AddRemoteForm {
    pub fn field(&self, field: RemoteField) -> &TextInput {
        &self.fields[field.index()]
    }
}

#[derive(Clone, Debug)]
pub struct ConfirmPrompt {
    pub title: String,
    pub lines: Vec<String>,
    pub action: ConfirmAction,
}

impl ConfirmPrompt {
    pub fn new<S: Into<String>>(title: S, lines: Vec<String>, action: ConfirmAction) -> Self {
        Self {
            title: title.into(),
            lines,
            action,
        }
    }

    pub fn choices(&self) -> &'static [(char, &'static str)] {
        match self.action {
            ConfirmAction::DeleteBranch(_) | ConfirmAction::RemoveRemote(_) => {
                &[('y', "yes"), ('n', "no")]
            }
            ConfirmAction::DirtyCheckout(_) => &[('s', "stash & checkout"), ('d', "discard & checkout")],
            ConfirmAction::Conflict { revert: false } => &[('a', "abort merge"), ('k', "keep resolving")],
            ConfirmAction::Conflict { revert: true } => &[('a', "abort revert"), ('k', "keep resolving")],
        }
    }

    fn handle_key(&self, key: &KeyEvent) -> OverlayOutcome {
        let submit = |choice| OverlayOutcome::Submit(OverlaySubmit::Confirm(self.action.clone(), choice));
        let yes_no = matches!(
            self.action,
            ConfirmAction::DeleteBranch(_) | ConfirmAction::RemoveRemote(_)
        );
        match (key.code, &self.action) {
            (KeyCode::Esc, _) => OverlayOutcome::Cancelled,
            (KeyCode::Char('y') | KeyCode::Enter, _) if yes_no => submit(ConfirmChoice::Yes),
            (KeyCode::Char('n'), _) if yes_no => OverlayOutcome::Cancelled,
            (KeyCode::Char('s'), ConfirmAction::DirtyCheckout(_)) => submit(ConfirmChoice::Stash),
            (KeyCode::Char('d'), ConfirmAction::DirtyCheckout(_)) => submit(ConfirmChoice::Discard),
            (KeyCode::Char('a'), ConfirmAction::Conflict { .. }) => submit(ConfirmChoice::Abort),
            (KeyCode::Char('k'), ConfirmAction::Conflict { .. }) => OverlayOutcome::Cancelled,
            _ => OverlayOutcome::Consumed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FindOverlay {
    pub input: TextInput,
    pub origin: FilterOrigin,
}

#[derive(Clone, Debug)]
pub enum Overlay {
    CommitMessage(TextOverlay),
    NewBranch(TextOverlay),
    AddRemote(AddRemoteForm),
    Confirm(ConfirmPrompt),
    FuzzyFind(FindOverlay),
}

impl Overlay {
    pub fn commit_message() -> Self {
        Overlay::CommitMessage(TextOverlay::default())
    }

    pub fn new_branch() -> Self {
        Overlay::NewBranch(TextOverlay::default())
    }

    pub fn add_remote() -> Self {
        Overlay::AddRemote(AddRemoteForm {
            fields: [TextInput::new(), TextInput::new()],
            focus: RemoteField::Name,
            error: None,
        })
    }

    pub fn fuzzy_find(origin: FilterOrigin) -> Self {
        Overlay::FuzzyFind(FindOverlay {
            input: TextInput::new(),
            origin,
        })
    }

    pub fn kind(&self) -> OverlayKind {
        match self {
            Overlay::CommitMessage(_) => OverlayKind::CommitMessage,
            Overlay::NewBranch(_) => OverlayKind::NewBranch,
            Overlay::AddRemote(_) => OverlayKind::AddRemote,
            Overlay::Confirm(_) => OverlayKind::Confirm,
            Overlay::FuzzyFind(_) => OverlayKind::FuzzyFind,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Overlay::CommitMessage(_) => "Commit message",
            Overlay::NewBranch(_) => "New branch from HEAD",
            Overlay::AddRemote(_) => "Add remote",
            Overlay::Confirm(p) => p.title.as_str(),
            Overlay::FuzzyFind(_) => "Find commit",
        }
    }

    pub fn hints(&self) -> Vec<(String, &'static str)> {
        let keys = |pairs: &[(&str, &'static str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<Vec<_>>()
        };
        match self {
            Overlay::CommitMessage(_) | Overlay::NewBranch(_) => {
                keys(&[("Enter", "submit"), ("Esc", "cancel")])
            }
            Overlay::AddRemote(_) => keys(&[("Tab", "next field"), ("Enter", "add"), ("Esc", "cancel")]),
            Overlay::FuzzyFind(_) => keys(&[("↑/↓", "move"), ("Enter", "jump"), ("Esc", "clear")]),
            Overlay::Confirm(p) => {
                let mut out: Vec<_> = p.choices().iter().map(|(c, v)| (c.to_string(), *v)).collect();
                out.push(("Esc".to_string(), "cancel"));
                out
            }
        }
    }

    /// Route one key to the overlay.
    pub fn handle_key(&mut self, key: &KeyEvent) -> OverlayOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return OverlayOutcome::Cancelled;
        }
        match self {
            Overlay::CommitMessage(o) => text_key(o, key, |text| {
                if text.trim().is_empty() {
                    Err("commit message is empty".to_string())
                } else {
                    Ok(OverlaySubmit::Commit(text.trim().to_string()))
                }
            }),
            Overlay::NewBranch(o) => text_key(o, key, |text| {
                let name = text.trim();
                if name.is_empty() {
                    Err("branch name is empty".to_string())
                } else if name.chars().any(char::is_whitespace) {
                    Err("branch names cannot contain spaces".to_string())
                } else {
                    Ok(OverlaySubmit::NewBranch(name.to_string()))
                }
            }),
            Overlay::AddRemote(form) => remote_key(form, key),
            Overlay::Confirm(prompt) => prompt.handle_key(key),
            Overlay::FuzzyFind(find) => find_key(find, key),
        }
    }
}

fn text_key<F>(o: &mut TextOverlay, key: &KeyEvent, validate: F) -> OverlayOutcome
where
    F: FnOnce(&str) -> Result<OverlaySubmit, String>,
{
    match key.code {
        KeyCode::Esc => OverlayOutcome::Cancelled,
        KeyCode::Enter => match validate(o.input.text()) {
            Ok(submit) => OverlayOutcome::Submit(submit),
            Err(msg) => {
                o.error = Some(msg);
                OverlayOutcome::Consumed
            }
        },
        _ => {
            if o.input.handle_key(key) {
                o.error = None;
            }
            OverlayOutcome::Consumed
        }
    }
}

fn remote_key(form: &mut AddRemoteForm, key: &KeyEvent) -> OverlayOutcome {
    match key.code {
        KeyCode::Esc => OverlayOutcome::Cancelled,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            form.focus = form.focus.other();
            OverlayOutcome::Consumed
        }
        KeyCode::Enter => {
            let empty = [RemoteField::Name, RemoteField::Url]
                .into_iter()
                .find(|f| form.field(*f).is_blank());
            match empty {
                Some(field) => {
                    form.focus = field;
                    form.error = Some(match field {
                        RemoteField::Name => "remote name is required".to_string(),
                        RemoteField::Url => "remote URL is required".to_string(),
                    });
                    OverlayOutcome::Consumed
                }
                None => OverlayOutcome::Submit(OverlaySubmit::AddRemote {
                    name: form.field(RemoteField::Name).text().trim().to_string(),
                    url: form.field(RemoteField::Url).text().trim().to_string(),
                }),
            }
        }
        _ => {
            if form.fields[form.focus.index()].handle_key(key) {
                form.error = None;
            }
            OverlayOutcome::Consumed
        }
    }
}

fn find_key(find: &mut FindOverlay, key: &KeyEvent) -> OverlayOutcome {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => OverlayOutcome::Cancelled,
        KeyCode::Enter => OverlayOutcome::Submit(OverlaySubmit::FindAccept),
        KeyCode::Up => OverlayOutcome::FindMove(-1),
        KeyCode::Down => OverlayOutcome::FindMove(1),
        KeyCode::Char('p') if ctrl => OverlayOutcome::FindMove(-1),
        KeyCode::Char('n') if ctrl => OverlayOutcome::FindMove(1),
        _ => {
            if find.input.handle_key(key) {
                OverlayOutcome::QueryChanged(find.input.text().to_string())
            } else {
                OverlayOutcome::Consumed
            }
        }
    }
}

/// Overlays in open order; only the top one sees input.
#[derive(Clone, Debug, Default)]
pub struct OverlayStack {
    stack: Vec<Overlay>,
}

impl OverlayStack {
    pub fn push(&mut self, overlay: Overlay) {
        tracing::debug!(kind = ?overlay.kind(), depth = self.stack.len() + 1, "overlay opened");
        self.stack.push(overlay);
    }

    pub fn pop(&mut self) -> Option<Overlay> {
        self.stack.pop()
    }

    /// Remove the find box wherever it sits in the stack.
    pub fn take_find(&mut self) -> Option<FindOverlay> {
        let idx = self
            .stack
            .iter()
            .position(|o| matches!(o, Overlay::FuzzyFind(_)))?;
        match self.stack.remove(idx) {
            Overlay::FuzzyFind(find) => Some(find),
            _ => None,
        }
    }

    pub fn top(&self) -> Option<&Overlay> {
        self.stack.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Overlay> {
        self.stack.last_mut()
    }

    pub fn top_kind(&self) -> Option<OverlayKind> {
        self.top().map(Overlay::kind)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.stack.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(overlay: &mut Overlay, text: &str) {
        for ch in text.chars() {
            overlay.handle_key(&key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn blank_commit_message_is_rejected_locally() {
        let mut o = Overlay::commit_message();
        type_text(&mut o, "   ");
        assert_eq!(o.handle_key(&key(KeyCode::Enter)), OverlayOutcome::Consumed);
        let Overlay::CommitMessage(text) = &o else { unreachable!() };
        assert_eq!(text.error.as_deref(), Some("commit message is empty"));

        type_text(&mut o, "fix it ");
        assert_eq!(
            o.handle_key(&key(KeyCode::Enter)),
            OverlayOutcome::Submit(OverlaySubmit::Commit("fix it".to_string()))
        );
    }

    #[test]
    fn add_remote_focuses_first_empty_field() {
        let mut o = Overlay::add_remote();
        type_text(&mut o, "origin");
        assert_eq!(o.handle_key(&key(KeyCode::Enter)), OverlayOutcome::Consumed);
        let Overlay::AddRemote(form) = &o else { unreachable!() };
        assert_eq!(form.focus, RemoteField::Url);
        assert!(form.error.is_some());

        type_text(&mut o, "https://example.com/r.git");
        o.handle_key(&key(KeyCode::Tab));
        let Overlay::AddRemote(form) = &o else { unreachable!() };
        assert_eq!(form.focus, RemoteField::Name);
        assert_eq!(
            o.handle_key(&key(KeyCode::Enter)),
            OverlayOutcome::Submit(OverlaySubmit::AddRemote {
                name: "origin".to_string(),
                url: "https://example.com/r.git".to_string(),
            })
        );
    }

    #[test]
    fn ctrl_c_cancels_every_overlay() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        for mut o in [
            Overlay::commit_message(),
            Overlay::new_branch(),
            Overlay::add_remote(),
        ] {
            type_text(&mut o, "wip");
            assert_eq!(o.handle_key(&ctrl_c), OverlayOutcome::Cancelled);
        }
    }

    #[test]
    fn pane_keys_are_text_inside_inputs() {
        let mut o = Overlay::new_branch();
        for ch in ['c', 'd', 'j', 'k', '1'] {
            assert_eq!(o.handle_key(&key(KeyCode::Char(ch))), OverlayOutcome::Consumed);
        }
        let Overlay::NewBranch(text) = &o else { unreachable!() };
        assert_eq!(text.input.text(), "cdjk1");
    }

    #[test]
    fn dirty_checkout_prompt_offers_stash_and_discard() {
        let target = CheckoutTarget::Branch("dev".to_string());
        let mut o = Overlay::Confirm(ConfirmPrompt::new(
            "Local changes",
            vec![],
            ConfirmAction::DirtyCheckout(target.clone()),
        ));
        assert_eq!(o.handle_key(&key(KeyCode::Char('y'))), OverlayOutcome::Consumed);
        assert_eq!(
            o.handle_key(&key(KeyCode::Char('s'))),
            OverlayOutcome::Submit(OverlaySubmit::Confirm(
                ConfirmAction::DirtyCheckout(target),
                ConfirmChoice::Stash
            ))
        );
        assert_eq!(o.handle_key(&key(KeyCode::Esc)), OverlayOutcome::Cancelled);
    }

    #[test]
    fn find_reports_query_changes() {
        let origin = FilterOrigin {
            cursor: Default::default(),
        };
        let mut o = Overlay::fuzzy_find(origin);
        assert_eq!(
            o.handle_key(&key(KeyCode::Char('f'))),
            OverlayOutcome::QueryChanged("f".to_string())
        );
        assert_eq!(o.handle_key(&key(KeyCode::Down)), OverlayOutcome::FindMove(1));
        assert_eq!(o.handle_key(&key(KeyCode::Left)), OverlayOutcome::Consumed);
    }

    #[test]
    fn stack_routes_to_top() {
        let mut stack = OverlayStack::default();
        stack.push(Overlay::commit_message());
        stack.push(Overlay::Confirm(ConfirmPrompt::new(
            "Merge conflict",
            vec![],
            ConfirmAction::Conflict { revert: false },
        )));
        assert_eq!(stack.top_kind(), Some(OverlayKind::Confirm));
        stack.pop();
        assert_eq!(stack.top_kind(), Some(OverlayKind::CommitMessage));
        assert_eq!(stack.len(), 1);
    }
}
