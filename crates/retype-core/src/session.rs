//! Session controller.
//!
//! A `Session` owns one region's history and keystroke classification. The
//! host drives it in two phases per key press:
//!
//! 1. [`Session::key_down`] while the raw event is being dispatched. This only
//!    records what kind of key it was and tells the host whether to suppress
//!    the default action.
//! 2. [`Session::settle`] on a later turn of the event loop, once the host has
//!    applied the key to the region. This is where history is recorded, the
//!    rewrite runs and undo/redo are installed.
//!
//! Consecutive keystrokes of the same kind coalesce into one history step.

use std::fmt;

use crate::config::RetypeConfig;
use crate::history::History;
use crate::keys::{Action, KeyBindings, KeyClass, KeyInput, KeydownResult};
use crate::marker::{self, MARKER};
use crate::mutator::perform_rewrite;
use crate::platform::{Caret, RegionDom};
use crate::trigger::{Rewrite, TriggerSpec};

type ChangeHook = Box<dyn FnMut(&str)>;

/// Keystroke-driven history and rewrite controller for one region.
pub struct Session<R: RegionDom> {
    region: R,
    history: History,
    action: Action,
    /// Content as of the last settle, possibly with the caret marker in it.
    last_content: String,
    rewrite: Box<dyn Rewrite>,
    bindings: KeyBindings,
    placeholder: String,
    pending: Option<KeyClass>,
    paste_stamp: u64,
    keyed_since_focus: bool,
    on_change: Option<ChangeHook>,
}

impl<R: RegionDom> Session<R> {
    /// Take over `region`: fill it if empty, run the rewrite once, and seed
    /// history with the result, caret marker at the start.
    pub fn new(region: R, trigger: TriggerSpec, config: &RetypeConfig) -> Self {
        tracing::debug!(
            target: "retype::session",
            trigger = ?trigger,
            history_limit = config.history_limit,
            "session attached"
        );
        let mut session = Self {
            region,
            history: History::with_limit(String::new(), config.history_limit),
            action: Action::None,
            last_content: String::new(),
            rewrite: trigger.into_rewrite(None),
            bindings: config.bindings(false),
            placeholder: config.placeholder.clone(),
            pending: None,
            paste_stamp: 0,
            keyed_since_focus: false,
            on_change: None,
        };

        session.fill_if_empty();
        let rewrite = &*session.rewrite;
        let outcome = perform_rewrite(&mut session.region, |region| apply(rewrite, region));
        if !outcome.ran() {
            apply(rewrite, &mut session.region);
        }
        session.last_content = session.region.inner_html();

        let seed = format!("{MARKER}{}", session.last_content);
        session.history = History::with_limit(seed, config.history_limit);
        session
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Swap the rewrite. History is kept.
    pub fn set_trigger(&mut self, trigger: TriggerSpec) {
        tracing::debug!(target: "retype::session", trigger = ?trigger, "trigger reconfigured");
        let current = std::mem::replace(&mut self.rewrite, TriggerSpec::Keep.into_rewrite(None));
        self.rewrite = trigger.into_rewrite(Some(current));
    }

    /// Register the content-changed hook, replacing any previous one.
    pub fn set_on_change(&mut self, hook: impl FnMut(&str) + 'static) {
        self.on_change = Some(Box::new(hook));
    }

    /// Current serialized content of the region.
    pub fn content(&self) -> String {
        self.region.inner_html()
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    pub fn region_mut(&mut self) -> &mut R {
        &mut self.region
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Record a key press. The host must call [`settle`](Self::settle) on a
    /// later turn whenever the result asks for it.
    pub fn key_down(&mut self, input: &KeyInput) -> KeydownResult {
        let class = self.bindings.classify(input);
        if class == KeyClass::Ignored {
            return KeydownResult::Ignored;
        }

        if let Some(previous) = self.pending.replace(class) {
            tracing::warn!(
                target: "retype::session",
                ?previous,
                "key press arrived before the previous one settled"
            );
        }
        self.keyed_since_focus = true;

        tracing::trace!(target: "retype::session", key = ?input.key, ?class, "key down");
        if class.suppresses_default() {
            KeydownResult::Handled
        } else {
            KeydownResult::Deferred
        }
    }

    /// Deferred half of a key press: classify, record history, rewrite.
    pub fn settle(&mut self) {
        let Some(class) = self.pending.take() else {
            return;
        };

        match class {
            KeyClass::Undo => self.undo(),
            KeyClass::Redo => self.redo(),
            class => self.record_edit(class),
        }
    }

    /// Step back one history entry and install it.
    pub fn undo(&mut self) {
        let before = self.last_content.clone();
        self.checkpoint();
        let entry = self.history.prev().content().to_string();
        self.install(&entry);
        self.action = Action::Back;
        tracing::debug!(
            target: "retype::session",
            position = self.history.position(),
            "undo"
        );
        self.notify_if_changed(&before);
    }

    /// Step forward one history entry and install it.
    pub fn redo(&mut self) {
        let before = self.last_content.clone();
        self.checkpoint();
        let entry = self.history.next().content().to_string();
        self.install(&entry);
        tracing::debug!(
            target: "retype::session",
            position = self.history.position(),
            "redo"
        );
        self.notify_if_changed(&before);
    }

    /// Replace the region's content as one undoable step.
    pub fn set_content(&mut self, content: &str) {
        let before = self.last_content.clone();
        self.history.push(before.clone());
        self.install(content);
        self.history.push(self.last_content.clone());
        self.action = Action::None;
        self.notify_if_changed(&before);
    }

    /// The region gained focus; trust the live content over our snapshot.
    pub fn on_focus(&mut self) {
        self.keyed_since_focus = false;
        self.resync();
    }

    /// A click landed in the region.
    pub fn on_click(&mut self) {
        if !self.keyed_since_focus {
            self.resync();
        }
    }

    fn resync(&mut self) {
        self.last_content = self.region.inner_html();
        tracing::trace!(target: "retype::session", "resynced from region");
    }

    fn record_edit(&mut self, class: KeyClass) {
        let before = self.last_content.clone();
        let live = self.region.inner_html();
        let changed = !marker::same_content(&live, &before);

        let next = match class {
            KeyClass::Delete => Some(Action::Delete),
            KeyClass::Paste => {
                self.paste_stamp += 1;
                Some(Action::Paste(self.paste_stamp))
            }
            KeyClass::Arrow => Some(Action::Arrow),
            _ => changed.then_some(Action::None),
        };

        if let Some(next) = next {
            if changed && next != self.action {
                self.history.push(before.clone());
            }
            self.action = next;
        }

        tracing::trace!(
            target: "retype::session",
            ?class,
            changed,
            action = ?self.action,
            "edit settled"
        );

        self.refresh();
        self.fill_if_empty();
        self.notify_if_changed(&before);
    }

    /// Run the rewrite around the caret and refresh the snapshot.
    fn refresh(&mut self) {
        let rewrite = &*self.rewrite;
        let mut captured = None;
        perform_rewrite(&mut self.region, |region| {
            apply(rewrite, region);
            captured = Some(region.inner_html());
        });
        self.last_content = captured.unwrap_or_else(|| self.region.inner_html());
    }

    /// Push unsaved live content when sitting on the newest entry.
    fn checkpoint(&mut self) {
        if !self.history.is_last() {
            return;
        }
        let mut captured = None;
        perform_rewrite(&mut self.region, |region| {
            captured = Some(region.inner_html());
        });
        let live = captured.unwrap_or_else(|| self.region.inner_html());
        self.history.push(live);
    }

    /// Write `content` to the region, restoring the caret from its marker.
    fn install(&mut self, content: &str) {
        if marker::strip_markers(content).is_empty() {
            self.write_placeholder();
            return;
        }

        let mut captured = None;
        let outcome = perform_rewrite(&mut self.region, |region| {
            region.set_inner_html(content);
            captured = Some(region.inner_html());
        });
        if !outcome.ran() {
            self.region.set_inner_html(&marker::strip_markers(content));
        }
        self.last_content = captured.unwrap_or_else(|| self.region.inner_html());
    }

    /// Install the placeholder if the region holds nothing but markers.
    fn fill_if_empty(&mut self) {
        if marker::strip_markers(&self.region.inner_html()).is_empty() {
            self.write_placeholder();
        }
    }

    /// Write the placeholder, moving the caret to the region start if it was inside.
    fn write_placeholder(&mut self) {
        let had_caret = self.region.collapsed_caret().is_some();
        self.region.set_inner_html(&self.placeholder);
        if had_caret {
            if let Err(e) = self.region.place_caret(Caret::RegionStart) {
                tracing::warn!(target: "retype::session", error = %e, "failed to place caret");
            }
        }
        self.last_content = self.placeholder.clone();
        tracing::trace!(target: "retype::session", "placeholder installed");
    }

    fn notify_if_changed(&mut self, before: &str) {
        if marker::same_content(before, &self.last_content) {
            return;
        }
        if let Some(hook) = self.on_change.as_mut() {
            let content = self.region.inner_html();
            hook(&content);
        }
    }
}

/// Run `rewrite` over the region's content, writing back only on change.
fn apply<R: RegionDom>(rewrite: &dyn Rewrite, region: &mut R) {
    let content = region.inner_html();
    let rewritten = rewrite.rewrite(&content);
    if rewritten != content {
        region.set_inner_html(&rewritten);
    }
}

impl<R: RegionDom + fmt::Debug> fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("region", &self.region)
            .field("history", &self.history)
            .field("action", &self.action)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::dom::MemoryRegion;
    use crate::keys::{Key, Modifiers};

    type TestSession = Session<MemoryRegion>;

    fn session(html: &str) -> TestSession {
        let mut region = MemoryRegion::from_html(html);
        region.focus();
        let len = region.text_content().chars().count();
        region.set_caret_offset(len);
        Session::new(region, TriggerSpec::from("@#"), &RetypeConfig::default())
    }

    fn type_str(s: &mut TestSession, text: &str) {
        for c in text.chars() {
            assert_eq!(s.key_down(&KeyInput::char(c)), KeydownResult::Deferred);
            s.region_mut().type_text(&c.to_string());
            s.settle();
        }
    }

    fn backspace(s: &mut TestSession) {
        assert_eq!(
            s.key_down(&KeyInput::new(Key::Backspace)),
            KeydownResult::Deferred
        );
        s.region_mut().delete_backward();
        s.settle();
    }

    fn arrow_left(s: &mut TestSession) {
        s.key_down(&KeyInput::new(Key::ArrowLeft));
        s.region_mut().move_caret(-1);
        s.settle();
    }

    fn paste(s: &mut TestSession, text: &str) {
        s.key_down(&KeyInput::primary(Key::character("v"), false));
        s.region_mut().type_text(text);
        s.settle();
    }

    fn undo(s: &mut TestSession) {
        let input = KeyInput::primary(Key::character("z"), false);
        assert_eq!(s.key_down(&input), KeydownResult::Handled);
        s.settle();
    }

    fn redo(s: &mut TestSession) {
        let input = KeyInput::with_modifiers(Key::character("z"), Modifiers::CTRL_SHIFT);
        assert_eq!(s.key_down(&input), KeydownResult::Handled);
        s.settle();
    }

    fn history_texts(s: &TestSession) -> Vec<String> {
        s.history()
            .entries()
            .iter()
            .map(|e| marker::strip_markers(e.content()).into_owned())
            .collect()
    }

    #[test]
    fn test_typing_coalesces_into_one_step() {
        let mut s = session("hello");
        type_str(&mut s, " world");
        assert_eq!(s.content(), "hello world");
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.action(), Action::None);
    }

    #[test]
    fn test_backspace_run_is_one_step() {
        let mut s = session("hello");
        type_str(&mut s, " world");

        backspace(&mut s);
        backspace(&mut s);
        backspace(&mut s);

        assert_eq!(s.content(), "hello wo");
        assert_eq!(history_texts(&s), ["hello", "hello world"]);
        assert_eq!(s.action(), Action::Delete);
    }

    #[test]
    fn test_arrow_without_change_adds_no_step() {
        let mut s = session("hello");
        backspace(&mut s);
        let len = s.history().len();

        arrow_left(&mut s);

        assert_eq!(s.history().len(), len);
        assert_eq!(s.action(), Action::Arrow);
        assert_eq!(s.region().caret_offset(), Some(3));
    }

    #[test]
    fn test_action_change_starts_new_step() {
        let mut s = session("ab");
        backspace(&mut s);
        type_str(&mut s, "xy");
        assert_eq!(history_texts(&s), ["ab", "a"]);
        assert_eq!(s.content(), "axy");
    }

    #[test]
    fn test_each_paste_is_its_own_step() {
        let mut s = session("a");
        type_str(&mut s, "b");
        paste(&mut s, "X");
        paste(&mut s, "Y");

        assert_eq!(history_texts(&s), ["a", "ab", "abX"]);
        assert!(matches!(s.action(), Action::Paste(2)));
    }

    #[test]
    fn test_modifier_alone_changes_nothing() {
        let mut s = session("ab");
        backspace(&mut s);
        let len = s.history().len();

        s.key_down(&KeyInput::new(Key::Shift));
        s.settle();

        assert_eq!(s.action(), Action::Delete);
        assert_eq!(s.history().len(), len);
        assert_eq!(s.content(), "a");
    }

    #[test]
    fn test_undo_restores_content_and_caret() {
        let mut s = session("hello");
        type_str(&mut s, " world");
        backspace(&mut s);
        backspace(&mut s);
        backspace(&mut s);

        undo(&mut s);
        assert_eq!(s.content(), "hello world");
        assert_eq!(s.region().caret_offset(), Some(11));
        assert_eq!(s.action(), Action::Back);

        redo(&mut s);
        assert_eq!(s.content(), "hello wo");
        assert_eq!(s.region().caret_offset(), Some(8));
    }

    #[test]
    fn test_undo_walks_back_to_first_entry() {
        let mut s = session("hello");
        type_str(&mut s, " world");
        backspace(&mut s);

        undo(&mut s);
        assert_eq!(s.content(), "hello world");
        undo(&mut s);
        assert_eq!(s.content(), "hello");
        undo(&mut s);
        assert_eq!(s.content(), "hello");
        assert_eq!(s.history().position(), 0);
    }

    #[test]
    fn test_edit_after_undo_prunes_redo_branch() {
        let mut s = session("hello");
        type_str(&mut s, " world");
        backspace(&mut s);
        undo(&mut s);
        assert_eq!(s.content(), "hello world");

        type_str(&mut s, "!");
        assert_eq!(history_texts(&s), ["hello", "hello world"]);

        redo(&mut s);
        assert_eq!(s.content(), "hello world!");
        assert_eq!(history_texts(&s), ["hello", "hello world", "hello world!"]);
    }

    #[test]
    fn test_tab_is_ignored() {
        let mut s = session("abc");
        backspace(&mut s);
        let len = s.history().len();

        assert_eq!(s.key_down(&KeyInput::new(Key::Tab)), KeydownResult::Ignored);
        s.settle();

        assert_eq!(s.history().len(), len);
        assert_eq!(s.action(), Action::Delete);
    }

    #[test]
    fn test_highlight_follows_typing() {
        let mut s = session("");
        type_str(&mut s, "@bo");
        assert_eq!(s.content(), r#"<span class="tag tag1">@bo</span><br>"#);
        assert_eq!(s.region().caret_offset(), Some(3));

        type_str(&mut s, "b hi");
        assert_eq!(s.content(), r#"<span class="tag tag1">@bob</span> hi<br>"#);
        assert_eq!(s.region().caret_offset(), Some(7));
    }

    #[test]
    fn test_set_trigger_keeps_history() {
        let mut s = session("x");
        backspace(&mut s);
        type_str(&mut s, "#a");
        let len = s.history().len();

        s.set_trigger(TriggerSpec::from("@"));
        type_str(&mut s, "b");

        assert_eq!(s.history().len(), len);
        assert_eq!(s.content(), "#ab<br>");
    }

    #[test]
    fn test_custom_rewrite() {
        let mut s = session("");
        s.set_trigger(TriggerSpec::rewrite(|content: &str| content.replace("cat", "dog")));
        type_str(&mut s, "cat");
        assert_eq!(s.content(), "dog<br>");
        assert_eq!(s.region().caret_offset(), Some(3));
    }

    #[test]
    fn test_set_empty_content_installs_placeholder() {
        let mut s = session("abc");
        s.set_content("");
        assert_eq!(s.content(), "<br>");
        assert_eq!(s.region().collapsed_caret(), Some(Caret::RegionStart));

        s.set_content(&MARKER.to_string());
        assert_eq!(s.content(), "<br>");
    }

    #[test]
    fn test_set_content_is_undoable() {
        let mut s = session("abc");
        s.set_content("xyz");
        assert_eq!(s.content(), "xyz");
        undo(&mut s);
        assert_eq!(s.content(), "abc");
        redo(&mut s);
        assert_eq!(s.content(), "xyz");
    }

    #[test]
    fn test_focus_resyncs_stale_snapshot() {
        let mut s = session("abc");
        type_str(&mut s, "d");
        s.region_mut().set_inner_html("changed elsewhere");
        s.region_mut().set_caret_offset(3);
        s.on_focus();

        arrow_left(&mut s);
        assert_eq!(history_texts(&s), ["abc"]);
    }

    #[test]
    fn test_stale_snapshot_without_resync_records_step() {
        let mut s = session("abc");
        type_str(&mut s, "d");
        s.region_mut().set_inner_html("changed elsewhere");
        s.region_mut().set_caret_offset(3);

        arrow_left(&mut s);
        assert_eq!(history_texts(&s), ["abc", "abcd"]);
        assert_eq!(s.action(), Action::Arrow);
    }

    #[test]
    fn test_click_resyncs_only_before_first_key() {
        let mut s = session("abc");
        s.on_click();
        type_str(&mut s, "d");

        s.region_mut().set_inner_html("external");
        s.on_click();
        assert_eq!(s.last_content, format!("abcd{MARKER}"));

        s.on_focus();
        assert_eq!(s.last_content, "external");
    }

    #[test]
    fn test_change_hook_fires_on_content_change_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut s = session("a");
        let sink = Rc::clone(&seen);
        s.set_on_change(move |content| sink.borrow_mut().push(content.to_string()));

        type_str(&mut s, "b");
        arrow_left(&mut s);
        undo(&mut s);

        assert_eq!(*seen.borrow(), ["ab", "a"]);
    }

    #[test]
    fn test_unfocused_undo_still_installs() {
        let mut s = session("a");
        type_str(&mut s, "b");
        backspace(&mut s);
        s.region_mut().blur();

        s.undo();
        assert_eq!(s.content(), "ab");
        assert!(!marker::contains_marker(&s.content()));
    }

    #[test]
    fn test_attach_highlights_existing_tokens() {
        let s = session("hi @bob");
        assert_eq!(s.content(), r#"hi <span class="tag tag1">@bob</span>"#);
        assert_eq!(s.region().caret_offset(), Some(7));
        assert_eq!(
            s.history().current().content(),
            format!(r#"{MARKER}hi <span class="tag tag1">@bob</span>"#)
        );
    }

    #[test]
    fn test_attach_without_caret_still_rewrites() {
        let region = MemoryRegion::from_html("#a b");
        let s = Session::new(region, TriggerSpec::from("@#"), &RetypeConfig::default());
        assert_eq!(s.content(), r#"<span class="tag tag2">#a</span> b"#);
        assert_eq!(s.region().collapsed_caret(), None);
    }

    #[test]
    fn test_attach_fills_empty_region() {
        let s = Session::new(MemoryRegion::new(), TriggerSpec::Keep, &RetypeConfig::default());
        assert_eq!(s.content(), "<br>");
        assert_eq!(history_texts(&s), ["<br>"]);
    }

    #[test]
    fn test_deleting_everything_leaves_placeholder() {
        let mut s = session("a");
        backspace(&mut s);
        assert_eq!(s.content(), "<br>");
        assert_eq!(s.region().collapsed_caret(), Some(Caret::RegionStart));

        type_str(&mut s, "x");
        assert_eq!(s.content(), "x<br>");

        undo(&mut s);
        assert_eq!(s.content(), "<br>");
        undo(&mut s);
        assert_eq!(s.content(), "a");
    }

    #[test]
    fn test_undo_to_seed_puts_caret_at_start() {
        let mut s = session("hello");
        type_str(&mut s, " world");
        undo(&mut s);
        assert_eq!(s.content(), "hello");
        assert_eq!(s.region().caret_offset(), Some(0));
    }
}
