//! In-memory host for tests.
//!
//! [`RecordingHost`] records every call the core makes, keeps just enough
//! window and view state to answer queries, and never fires timers on its
//! own: tests deliver [`HostEvent`]s by hand.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use crate::app::App;
use crate::host::{ExitStatus, HostEvent, TimerId, WindowHost};
use crate::types::errors::HostError;
use crate::types::notification::Notification;
use crate::types::view::{Rect, ViewId};
use crate::types::window::{DisplayState, WindowId, WindowOptions};

/// A recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    CreateWindow { window_id: WindowId, options: WindowOptions },
    CloseWindow(WindowId),
    FocusWindow(WindowId),
    SetDisplayState(WindowId, DisplayState),
    SetTitle(WindowId, String),
    RegisterAccelerator(WindowId, String),
    CreateView { window_id: WindowId, view_id: ViewId, url: String },
    DestroyView(ViewId),
    AddView(WindowId, ViewId),
    RemoveView(WindowId, ViewId),
    SetViewBounds(ViewId, Rect),
    LoadUrl(ViewId, String),
    StartTimer { timer_id: TimerId, period: Duration, repeat: bool },
    CancelTimer(TimerId),
    Exit(ExitStatus),
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
    pub sent: Vec<(WindowId, Notification)>,
    /// When set, `create_window` fails.
    pub fail_create_window: bool,
    next_id: u64,
    windows: BTreeSet<WindowId>,
    pending_closes: Vec<WindowId>,
    views: BTreeSet<ViewId>,
    attached: HashMap<WindowId, Vec<ViewId>>,
    timers: BTreeSet<TimerId>,
    exit: Option<ExitStatus>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Puts the host in the corrupted state where several views report
    /// attached to one window.
    pub fn force_attached(&mut self, window: WindowId, views: Vec<ViewId>) {
        self.views.extend(views.iter().copied());
        self.attached.insert(window, views);
    }

    pub fn open_windows(&self) -> Vec<WindowId> {
        self.windows.iter().copied().collect()
    }

    pub fn active_timers(&self) -> Vec<TimerId> {
        self.timers.iter().copied().collect()
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Close requests the core made that have not been confirmed yet.
    pub fn take_pending_closes(&mut self) -> Vec<WindowId> {
        std::mem::take(&mut self.pending_closes)
    }

    pub fn sent_to(&self, window: WindowId) -> Vec<&Notification> {
        self.sent
            .iter()
            .filter(|(w, _)| *w == window)
            .map(|(_, n)| n)
            .collect()
    }

    pub fn count_calls(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl WindowHost for RecordingHost {
    fn create_window(&mut self, options: &WindowOptions) -> Result<WindowId, HostError> {
        if self.fail_create_window {
            return Err(HostError::CreateWindow("refused by test host".to_string()));
        }
        let window_id = WindowId(self.next());
        self.windows.insert(window_id);
        self.calls.push(HostCall::CreateWindow {
            window_id,
            options: options.clone(),
        });
        Ok(window_id)
    }

    fn close_window(&mut self, window: WindowId) -> Result<(), HostError> {
        if !self.windows.contains(&window) {
            return Err(HostError::UnknownWindow(window));
        }
        self.calls.push(HostCall::CloseWindow(window));
        self.pending_closes.push(window);
        Ok(())
    }

    fn focus_window(&mut self, window: WindowId) -> Result<(), HostError> {
        self.calls.push(HostCall::FocusWindow(window));
        Ok(())
    }

    fn set_display_state(&mut self, window: WindowId, state: DisplayState) -> Result<(), HostError> {
        self.calls.push(HostCall::SetDisplayState(window, state));
        Ok(())
    }

    fn set_title(&mut self, window: WindowId, title: &str) -> Result<(), HostError> {
        self.calls.push(HostCall::SetTitle(window, title.to_string()));
        Ok(())
    }

    fn register_accelerator(&mut self, window: WindowId, accelerator: &str) -> Result<(), HostError> {
        self.calls
            .push(HostCall::RegisterAccelerator(window, accelerator.to_string()));
        Ok(())
    }

    fn send(&mut self, window: WindowId, notification: &Notification) -> Result<(), HostError> {
        if !self.windows.contains(&window) {
            return Err(HostError::Delivery(format!("window {} is gone", window)));
        }
        self.sent.push((window, notification.clone()));
        Ok(())
    }

    fn create_view(&mut self, window: WindowId, url: &str) -> Result<ViewId, HostError> {
        if !self.windows.contains(&window) {
            return Err(HostError::UnknownWindow(window));
        }
        let view_id = ViewId(self.next());
        self.views.insert(view_id);
        self.calls.push(HostCall::CreateView {
            window_id: window,
            view_id,
            url: url.to_string(),
        });
        Ok(view_id)
    }

    fn destroy_view(&mut self, view: ViewId) -> Result<(), HostError> {
        if !self.views.remove(&view) {
            return Err(HostError::UnknownView(view));
        }
        for attached in self.attached.values_mut() {
            attached.retain(|v| *v != view);
        }
        self.calls.push(HostCall::DestroyView(view));
        Ok(())
    }

    fn attached_views(&self, window: WindowId) -> Vec<ViewId> {
        self.attached.get(&window).cloned().unwrap_or_default()
    }

    fn add_view(&mut self, window: WindowId, view: ViewId) -> Result<(), HostError> {
        if !self.views.contains(&view) {
            return Err(HostError::UnknownView(view));
        }
        let attached = self.attached.entry(window).or_default();
        if !attached.contains(&view) {
            attached.push(view);
        }
        self.calls.push(HostCall::AddView(window, view));
        Ok(())
    }

    fn remove_view(&mut self, window: WindowId, view: ViewId) -> Result<(), HostError> {
        if let Some(attached) = self.attached.get_mut(&window) {
            attached.retain(|v| *v != view);
        }
        self.calls.push(HostCall::RemoveView(window, view));
        Ok(())
    }

    fn set_view_bounds(&mut self, view: ViewId, bounds: Rect) -> Result<(), HostError> {
        self.calls.push(HostCall::SetViewBounds(view, bounds));
        Ok(())
    }

    fn load_url(&mut self, view: ViewId, url: &str) -> Result<(), HostError> {
        self.calls.push(HostCall::LoadUrl(view, url.to_string()));
        Ok(())
    }

    fn start_timer(&mut self, period: Duration, repeat: bool) -> TimerId {
        let timer_id = TimerId(self.next());
        self.timers.insert(timer_id);
        self.calls.push(HostCall::StartTimer {
            timer_id,
            period,
            repeat,
        });
        timer_id
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
        self.calls.push(HostCall::CancelTimer(timer));
    }

    fn exit(&mut self, status: ExitStatus) {
        self.calls.push(HostCall::Exit(status));
        if self.exit.is_none() {
            self.exit = Some(status);
        }
    }

    fn on_event(&mut self, event: &HostEvent) {
        if let HostEvent::WindowClosed { window_id } = event {
            self.windows.remove(window_id);
            self.attached.remove(window_id);
            self.pending_closes.retain(|w| w != window_id);
        }
    }
}

/// Confirms every close the core requested, in request order, until none
/// are left. Returns how many windows were closed.
pub fn confirm_closes(app: &mut App<RecordingHost>) -> usize {
    let mut closed = 0;
    loop {
        let pending = app.host_mut().take_pending_closes();
        if pending.is_empty() {
            return closed;
        }
        for window_id in pending {
            app.handle_event(HostEvent::WindowClosed { window_id });
            closed += 1;
        }
    }
}

/// Delivers the first content-ready signal to every open window.
pub fn ready_all(app: &mut App<RecordingHost>) {
    for window_id in app.host().open_windows() {
        app.handle_event(HostEvent::ContentReady { window_id });
    }
}
