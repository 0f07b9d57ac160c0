//! Binding sessions to elements.
//!
//! Sessions live in a thread-local [`Registry`] keyed by an id stored in the
//! element's `data-retype-id` attribute. Listeners hold only the id and look
//! the session up per event. Change notifications are collected while the
//! registry is borrowed and delivered afterwards, so a callback is free to
//! call back into its [`Retype`] handle.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use gloo_timers::callback::Timeout;
use smol_str::{SmolStr, format_smolstr};
use wasm_bindgen::JsCast;
use web_sys::{HtmlElement, KeyboardEvent};

use retype_core::{ConfigError, PlatformError, Registry, RetypeConfig, Session, TriggerSpec};

use crate::events::key_input_from_event;
use crate::platform::platform;
use crate::region::BrowserRegion;

/// Attribute carrying the session id of a bound element.
pub const ID_ATTR: &str = "data-retype-id";

/// Error returned when binding an element fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind element: {0}")]
    Platform(#[from] PlatformError),
}

type ChangeCallback = Rc<dyn Fn(&str)>;

struct Binding {
    element: HtmlElement,
    changed: Rc<RefCell<Option<String>>>,
    on_change: Option<ChangeCallback>,
    _listeners: Vec<EventListener>,
}

#[derive(Default)]
struct Bound {
    sessions: Registry<SmolStr, BrowserRegion>,
    bindings: HashMap<SmolStr, Binding>,
    next_id: u64,
}

thread_local! {
    static BOUND: RefCell<Bound> = RefCell::new(Bound::default());
}

/// Bind `element`, or reconfigure it if it is already bound.
///
/// `config` is validated and applied on first bind only. A rebind keeps
/// history and swaps the rewrite according to `trigger`.
pub fn retype(
    element: &HtmlElement,
    trigger: TriggerSpec,
    config: RetypeConfig,
) -> Result<Retype, AttachError> {
    BOUND.with(|bound| -> Result<Retype, AttachError> {
        let mut bound = bound.borrow_mut();

        if let Some(id) = bound_id(&bound, element) {
            if let Some(session) = bound.sessions.get_mut(&id) {
                session.set_trigger(trigger);
            }
            tracing::debug!(target: "retype::browser", %id, "rebound");
            return Ok(Retype { id });
        }

        let config = config.validate()?;
        bound.next_id += 1;
        let id = format_smolstr!("retype-{}", bound.next_id);
        element
            .set_attribute(ID_ATTR, &id)
            .map_err(|e| PlatformError::from(format!("set_attribute failed: {:?}", e)))?;

        let changed = Rc::new(RefCell::new(None));
        let session = bound.sessions.bind_with(id.clone(), trigger, |trigger| {
            Session::new(BrowserRegion::new(element.clone()), trigger, &config)
                .with_bindings(config.bindings(platform().mac))
        });
        let slot = Rc::clone(&changed);
        session.set_on_change(move |content: &str| {
            *slot.borrow_mut() = Some(content.to_string());
        });

        bound.bindings.insert(
            id.clone(),
            Binding {
                element: element.clone(),
                changed,
                on_change: None,
                _listeners: listen(element, &id),
            },
        );
        tracing::debug!(target: "retype::browser", %id, "attached");
        Ok(Retype { id })
    })
}

/// Handle of an element that is already bound.
pub fn find(element: &HtmlElement) -> Option<Retype> {
    BOUND.with(|bound| bound_id(&bound.borrow(), element).map(|id| Retype { id }))
}

fn bound_id(bound: &Bound, element: &HtmlElement) -> Option<SmolStr> {
    let id = SmolStr::from(element.get_attribute(ID_ATTR)?);
    // A cloned element carries the attribute but not the binding.
    let binding = bound.bindings.get(&id)?;
    binding
        .element
        .is_same_node(Some(element.as_ref()))
        .then_some(id)
}

fn listen(element: &HtmlElement, id: &SmolStr) -> Vec<EventListener> {
    let keydown = {
        let id = id.clone();
        EventListener::new_with_options(
            element,
            "keydown",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                let input = key_input_from_event(event);
                let Some(result) = with_session(&id, |session| session.key_down(&input)) else {
                    return;
                };

                if result.prevent_default() {
                    event.prevent_default();
                }
                if result.needs_settle() {
                    let id = id.clone();
                    Timeout::new(0, move || {
                        with_session(&id, |session| session.settle());
                    })
                    .forget();
                }
            },
        )
    };

    let focus = {
        let id = id.clone();
        EventListener::new(element, "focus", move |_| {
            with_session(&id, |session| session.on_focus());
        })
    };

    let click = {
        let id = id.clone();
        EventListener::new(element, "click", move |_| {
            with_session(&id, |session| session.on_click());
        })
    };

    vec![keydown, focus, click]
}

/// Run `f` against the session for `id`, then deliver any change notification.
fn with_session<T>(
    id: &SmolStr,
    f: impl FnOnce(&mut Session<BrowserRegion>) -> T,
) -> Option<T> {
    let (out, notify) = BOUND.with(|bound| {
        let Ok(mut bound) = bound.try_borrow_mut() else {
            tracing::warn!(target: "retype::browser", %id, "session busy, dropping call");
            return None;
        };
        let out = f(bound.sessions.get_mut(id)?);
        let binding = bound.bindings.get(id)?;
        let changed = binding.changed.borrow_mut().take();
        Some((out, changed.zip(binding.on_change.clone())))
    })?;

    if let Some((content, callback)) = notify {
        callback(&content);
    }
    Some(out)
}

/// Handle to a bound element.
///
/// Operations on a detached handle are no-ops returning `None`/`false`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Retype {
    id: SmolStr,
}

impl Retype {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_attached(&self) -> bool {
        BOUND.with(|bound| bound.borrow().sessions.contains(&self.id))
    }

    /// Current content of the element.
    pub fn content(&self) -> Option<String> {
        with_session(&self.id, |session| session.content())
    }

    /// Replace the element's content as one undoable step.
    pub fn set_content(&self, content: &str) -> bool {
        with_session(&self.id, |session| session.set_content(content)).is_some()
    }

    pub fn set_trigger(&self, trigger: TriggerSpec) -> bool {
        with_session(&self.id, |session| session.set_trigger(trigger)).is_some()
    }

    pub fn undo(&self) -> bool {
        with_session(&self.id, |session| session.undo()).is_some()
    }

    pub fn redo(&self) -> bool {
        with_session(&self.id, |session| session.redo()).is_some()
    }

    /// Call `callback` with the new content whenever it changes.
    pub fn on_change(&self, callback: impl Fn(&str) + 'static) -> bool {
        BOUND.with(|bound| {
            let mut bound = bound.borrow_mut();
            let Some(binding) = bound.bindings.get_mut(&self.id) else {
                return false;
            };
            binding.on_change = Some(Rc::new(callback));
            true
        })
    }

    /// Remove listeners and drop the session, history included.
    pub fn detach(&self) -> bool {
        let binding = BOUND.with(|bound| {
            let mut bound = bound.borrow_mut();
            bound.sessions.unbind(&self.id);
            bound.bindings.remove(&self.id)
        });
        let Some(binding) = binding else {
            return false;
        };

        let _ = binding.element.remove_attribute(ID_ATTR);
        tracing::debug!(target: "retype::browser", id = %self.id, "detached");
        true
    }
}
