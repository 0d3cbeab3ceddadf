//! View Manager for TabHost.
//!
//! Keeps the process-wide view table and enforces that a window has at most
//! one content view attached. Before attaching, the host's attachment state
//! is checked explicitly:
//!
//! - nothing attached: attach;
//! - the requested view attached: no-op;
//! - another single view attached: detach it (it stays alive), then attach;
//! - more than one view attached: corrupted state, detach every view, then
//!   attach the requested one.

use std::collections::HashMap;

use tracing::{debug, error, warn};

use crate::host::WindowHost;
use crate::managers::window_registry::WindowRegistry;
use crate::types::errors::ViewError;
use crate::types::notification::Notification;
use crate::types::view::{BrowserView, Rect, ViewId};
use crate::types::window::WindowId;

/// What an attach call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The caller passed the "no view" sentinel.
    NoView,
    /// The view was already the attached one.
    AlreadyAttached,
    /// Attached, after detaching `replaced` if there was one.
    Attached { replaced: Option<ViewId> },
    /// The host reported several views attached; all were detached first.
    Recovered { detached: Vec<ViewId> },
}

/// Trait defining view attachment operations.
pub trait ViewManagerTrait {
    fn create_view(
        &mut self,
        host: &mut dyn WindowHost,
        registry: &WindowRegistry,
        window: WindowId,
        url: &str,
    ) -> Result<ViewId, ViewError>;
    fn destroy_view(
        &mut self,
        host: &mut dyn WindowHost,
        view: Option<ViewId>,
    ) -> Result<Option<BrowserView>, ViewError>;
    fn attach(
        &mut self,
        host: &mut dyn WindowHost,
        registry: &WindowRegistry,
        window: WindowId,
        view: Option<ViewId>,
    ) -> Result<AttachOutcome, ViewError>;
    fn set_bounds(
        &mut self,
        host: &mut dyn WindowHost,
        window: WindowId,
        requested: Rect,
    ) -> Result<Option<(ViewId, Rect)>, ViewError>;
    fn navigate(&mut self, host: &mut dyn WindowHost, view: ViewId, url: &str) -> Result<(), ViewError>;
    fn get(&self, view: ViewId) -> Option<&BrowserView>;
    fn attached_to(&self, window: WindowId) -> Option<ViewId>;
    fn view_count(&self) -> usize;
    fn forget_window(&mut self, window: WindowId) -> Vec<ViewId>;
}

#[derive(Default)]
pub struct ViewManager {
    views: HashMap<ViewId, BrowserView>,
    attached: HashMap<WindowId, ViewId>,
}

impl ViewManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn mark_detached(&mut self, window: WindowId, view: ViewId) {
        if let Some(record) = self.views.get_mut(&view) {
            if record.owner_window_id == Some(window) {
                record.owner_window_id = None;
            }
        }
        if self.attached.get(&window) == Some(&view) {
            self.attached.remove(&window);
        }
    }

    /// Takes `view` off any other window it is attached to, on the host too.
    fn detach_elsewhere(&mut self, host: &mut dyn WindowHost, window: WindowId, view: ViewId) {
        let previous = self.views.get(&view).and_then(|v| v.owner_window_id);
        if let Some(previous) = previous.filter(|p| *p != window) {
            if let Err(e) = host.remove_view(previous, view) {
                warn!(view = %view, window = %previous, "detach from previous window failed: {}", e);
            }
            self.mark_detached(previous, view);
        }
    }

    fn mark_attached(&mut self, window: WindowId, view: ViewId) {
        if let Some(record) = self.views.get_mut(&view) {
            if let Some(previous) = record.owner_window_id.replace(window) {
                if previous != window && self.attached.get(&previous) == Some(&view) {
                    self.attached.remove(&previous);
                }
            }
        }
        self.attached.insert(window, view);
    }

    /// Asks the window's chrome for its content rectangle; the answer comes
    /// back as a `view.set_bounds` request.
    fn request_bounds(host: &mut dyn WindowHost, window: WindowId) {
        if let Err(e) = host.send(window, &Notification::MeasureViewBounds) {
            debug!(window = %window, "bounds request dropped: {}", e);
        }
    }
}

impl ViewManagerTrait for ViewManager {
    /// Creates a view for `window`, records it and returns its id at once so
    /// the caller can attach it and set bounds right away.
    fn create_view(
        &mut self,
        host: &mut dyn WindowHost,
        registry: &WindowRegistry,
        window: WindowId,
        url: &str,
    ) -> Result<ViewId, ViewError> {
        if !registry.contains(window) {
            return Err(ViewError::WindowNotFound(window));
        }
        let id = host.create_view(window, url)?;
        self.views.insert(
            id,
            BrowserView {
                id,
                home_window: window,
                owner_window_id: None,
                bounds: None,
                url: url.to_string(),
            },
        );
        Self::request_bounds(host, window);
        debug!(view = %id, window = %window, "view created");
        Ok(id)
    }

    /// Detaches (if attached) and destroys a view. `None` is the caller's
    /// "no view" sentinel and is not an error.
    fn destroy_view(
        &mut self,
        host: &mut dyn WindowHost,
        view: Option<ViewId>,
    ) -> Result<Option<BrowserView>, ViewError> {
        let Some(view) = view else {
            return Ok(None);
        };
        let owner = self
            .views
            .get(&view)
            .ok_or(ViewError::NotFound(view))?
            .owner_window_id;

        if let Some(window) = owner {
            if let Err(e) = host.remove_view(window, view) {
                warn!(view = %view, window = %window, "detach before destroy failed: {}", e);
            }
            self.mark_detached(window, view);
        }
        host.destroy_view(view)?;
        let removed = self.views.remove(&view);
        debug!(view = %view, "view destroyed");
        Ok(removed)
    }

    fn attach(
        &mut self,
        host: &mut dyn WindowHost,
        registry: &WindowRegistry,
        window: WindowId,
        view: Option<ViewId>,
    ) -> Result<AttachOutcome, ViewError> {
        let Some(view) = view else {
            return Ok(AttachOutcome::NoView);
        };
        if !registry.contains(window) {
            return Err(ViewError::WindowNotFound(window));
        }
        if !self.views.contains_key(&view) {
            return Err(ViewError::NotFound(view));
        }

        self.detach_elsewhere(host, window, view);
        let currently = host.attached_views(window);
        let outcome = match currently.as_slice() {
            [] => {
                host.add_view(window, view)?;
                AttachOutcome::Attached { replaced: None }
            }
            [current] if *current == view => {
                self.mark_attached(window, view);
                return Ok(AttachOutcome::AlreadyAttached);
            }
            [current] => {
                let current = *current;
                host.remove_view(window, current)?;
                self.mark_detached(window, current);
                host.add_view(window, view)?;
                AttachOutcome::Attached {
                    replaced: Some(current),
                }
            }
            many => {
                error!(
                    window = %window,
                    attached = many.len(),
                    "multiple views attached to one window, detaching all"
                );
                let detached = many.to_vec();
                for stray in &detached {
                    if let Err(e) = host.remove_view(window, *stray) {
                        warn!(view = %stray, "forced detach failed: {}", e);
                    }
                    self.mark_detached(window, *stray);
                }
                host.add_view(window, view)?;
                AttachOutcome::Recovered { detached }
            }
        };

        self.mark_attached(window, view);
        Self::request_bounds(host, window);
        Ok(outcome)
    }

    /// Applies the chrome-reported content rectangle to the window's attached
    /// view, with the height clamped to `height - y + 1`.
    fn set_bounds(
        &mut self,
        host: &mut dyn WindowHost,
        window: WindowId,
        requested: Rect,
    ) -> Result<Option<(ViewId, Rect)>, ViewError> {
        let Some(view) = self.attached.get(&window).copied() else {
            return Ok(None);
        };
        let bounds = requested.clamped_below_chrome();
        host.set_view_bounds(view, bounds)?;
        if let Some(record) = self.views.get_mut(&view) {
            record.bounds = Some(bounds);
        }
        let changed = Notification::ViewBoundsChanged { view_id: view, bounds };
        if let Err(e) = host.send(window, &changed) {
            debug!(window = %window, "bounds notification dropped: {}", e);
        }
        Ok(Some((view, bounds)))
    }

    fn navigate(&mut self, host: &mut dyn WindowHost, view: ViewId, url: &str) -> Result<(), ViewError> {
        let record = self.views.get_mut(&view).ok_or(ViewError::NotFound(view))?;
        host.load_url(view, url)?;
        record.url = url.to_string();
        Ok(())
    }

    fn get(&self, view: ViewId) -> Option<&BrowserView> {
        self.views.get(&view)
    }

    fn attached_to(&self, window: WindowId) -> Option<ViewId> {
        self.attached.get(&window).copied()
    }

    fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Drops the views a closed window took with it: the one attached to it
    /// and unattached views created for it. Views moved to another window
    /// survive.
    fn forget_window(&mut self, window: WindowId) -> Vec<ViewId> {
        self.attached.remove(&window);
        let gone: Vec<ViewId> = self
            .views
            .values()
            .filter(|v| match v.owner_window_id {
                Some(owner) => owner == window,
                None => v.home_window == window,
            })
            .map(|v| v.id)
            .collect();
        for id in &gone {
            self.views.remove(id);
        }
        gone
    }
}
