//! JSON-lines host adapter.
//!
//! The windowing shell runs as a separate process. Host commands go to it as
//! one JSON object per line:
//!
//! ```text
//! {"command":"window.create","window_id":1,"width":1080,"height":720,...}
//! {"command":"window.send","window_id":1,"notification":{"type":"reload"}}
//! ```
//!
//! Ids are allocated here so calls can return synchronously. Timers are
//! tokio tasks that push [`HostEvent::TimerFired`] into the event channel.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::debug;

use super::{ExitStatus, HostEvent, TimerId, WindowHost};
use crate::types::errors::HostError;
use crate::types::notification::Notification;
use crate::types::view::{Rect, ViewId};
use crate::types::window::{DisplayState, WindowId, WindowOptions};

pub struct StdioHost {
    out: Box<dyn Write + Send>,
    events: UnboundedSender<HostEvent>,
    next_window: u64,
    next_view: u64,
    next_timer: u64,
    windows: HashSet<WindowId>,
    views: HashMap<ViewId, WindowId>,
    attached: HashMap<WindowId, Vec<ViewId>>,
    timers: HashMap<TimerId, JoinHandle<()>>,
    exit: Option<ExitStatus>,
}

impl StdioHost {
    pub fn new(out: Box<dyn Write + Send>, events: UnboundedSender<HostEvent>) -> Self {
        Self {
            out,
            events,
            next_window: 1,
            next_view: 1,
            next_timer: 1,
            windows: HashSet::new(),
            views: HashMap::new(),
            attached: HashMap::new(),
            timers: HashMap::new(),
            exit: None,
        }
    }

    /// Set once the core asked the process to end.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit
    }

    /// Writes a response line to the shell.
    pub fn respond(&mut self, response: &Value) -> Result<(), HostError> {
        self.write_line(response)
    }

    fn emit(&mut self, command: &str, body: Value) -> Result<(), HostError> {
        let mut line = json!({ "command": command });
        if let (Some(line), Value::Object(body)) = (line.as_object_mut(), body) {
            line.extend(body);
        }
        self.write_line(&line)
    }

    fn write_line(&mut self, value: &Value) -> Result<(), HostError> {
        writeln!(self.out, "{}", value)
            .and_then(|_| self.out.flush())
            .map_err(|e| HostError::Io(e.to_string()))
    }

    fn known_window(&self, window: WindowId) -> Result<(), HostError> {
        if self.windows.contains(&window) {
            Ok(())
        } else {
            Err(HostError::UnknownWindow(window))
        }
    }

    fn known_view(&self, view: ViewId) -> Result<(), HostError> {
        if self.views.contains_key(&view) {
            Ok(())
        } else {
            Err(HostError::UnknownView(view))
        }
    }
}

impl WindowHost for StdioHost {
    fn create_window(&mut self, options: &WindowOptions) -> Result<WindowId, HostError> {
        let id = WindowId(self.next_window);
        let geometry = options.resolved_geometry();
        self.emit(
            "window.create",
            json!({
                "window_id": id,
                "x": options.x,
                "y": options.y,
                "width": geometry.width,
                "height": geometry.height,
                "min_width": crate::types::window::MIN_WIDTH,
                "min_height": crate::types::window::MIN_HEIGHT,
            }),
        )
        .map_err(|e| HostError::CreateWindow(e.to_string()))?;
        self.next_window += 1;
        self.windows.insert(id);
        Ok(id)
    }

    fn close_window(&mut self, window: WindowId) -> Result<(), HostError> {
        self.known_window(window)?;
        self.emit("window.close", json!({ "window_id": window }))
    }

    fn focus_window(&mut self, window: WindowId) -> Result<(), HostError> {
        self.known_window(window)?;
        self.emit("window.focus", json!({ "window_id": window }))
    }

    fn set_display_state(&mut self, window: WindowId, state: DisplayState) -> Result<(), HostError> {
        self.known_window(window)?;
        self.emit(
            "window.set_display_state",
            json!({ "window_id": window, "display_state": state }),
        )
    }

    fn set_title(&mut self, window: WindowId, title: &str) -> Result<(), HostError> {
        self.known_window(window)?;
        self.emit("window.set_title", json!({ "window_id": window, "title": title }))
    }

    fn register_accelerator(&mut self, window: WindowId, accelerator: &str) -> Result<(), HostError> {
        self.known_window(window)?;
        self.emit(
            "window.register_accelerator",
            json!({ "window_id": window, "accelerator": accelerator }),
        )
    }

    fn send(&mut self, window: WindowId, notification: &Notification) -> Result<(), HostError> {
        if !self.windows.contains(&window) {
            return Err(HostError::Delivery(format!("window {} is gone", window)));
        }
        self.emit(
            "window.send",
            json!({ "window_id": window, "notification": notification }),
        )
    }

    fn create_view(&mut self, window: WindowId, url: &str) -> Result<ViewId, HostError> {
        self.known_window(window)?;
        let id = ViewId(self.next_view);
        self.emit(
            "view.create",
            json!({ "view_id": id, "window_id": window, "url": url }),
        )?;
        self.next_view += 1;
        self.views.insert(id, window);
        Ok(id)
    }

    fn destroy_view(&mut self, view: ViewId) -> Result<(), HostError> {
        self.known_view(view)?;
        self.emit("view.destroy", json!({ "view_id": view }))?;
        self.views.remove(&view);
        for attached in self.attached.values_mut() {
            attached.retain(|v| *v != view);
        }
        Ok(())
    }

    fn attached_views(&self, window: WindowId) -> Vec<ViewId> {
        self.attached.get(&window).cloned().unwrap_or_default()
    }

    fn add_view(&mut self, window: WindowId, view: ViewId) -> Result<(), HostError> {
        self.known_window(window)?;
        self.known_view(view)?;
        self.emit("view.attach", json!({ "window_id": window, "view_id": view }))?;
        let attached = self.attached.entry(window).or_default();
        if !attached.contains(&view) {
            attached.push(view);
        }
        Ok(())
    }

    fn remove_view(&mut self, window: WindowId, view: ViewId) -> Result<(), HostError> {
        self.known_window(window)?;
        self.emit("view.detach", json!({ "window_id": window, "view_id": view }))?;
        if let Some(attached) = self.attached.get_mut(&window) {
            attached.retain(|v| *v != view);
        }
        Ok(())
    }

    fn set_view_bounds(&mut self, view: ViewId, bounds: Rect) -> Result<(), HostError> {
        self.known_view(view)?;
        self.emit("view.set_bounds", json!({ "view_id": view, "bounds": bounds }))
    }

    fn load_url(&mut self, view: ViewId, url: &str) -> Result<(), HostError> {
        self.known_view(view)?;
        self.emit("view.load_url", json!({ "view_id": view, "url": url }))
    }

    fn start_timer(&mut self, period: Duration, repeat: bool) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            if repeat {
                let mut ticker = interval_at(Instant::now() + period, period);
                loop {
                    ticker.tick().await;
                    if events.send(HostEvent::TimerFired { timer_id: id }).is_err() {
                        break;
                    }
                }
            } else {
                sleep(period).await;
                let _ = events.send(HostEvent::TimerFired { timer_id: id });
            }
        });
        self.timers.insert(id, handle);
        id
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        if let Some(handle) = self.timers.remove(&timer) {
            handle.abort();
        }
    }

    fn exit(&mut self, status: ExitStatus) {
        if self.exit.is_some() {
            return;
        }
        self.exit = Some(status);
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        if let Err(e) = self.emit("app.exit", json!({ "status": status, "code": status.code() })) {
            debug!("exit notice not delivered: {}", e);
        }
    }

    fn on_event(&mut self, event: &HostEvent) {
        if let HostEvent::WindowClosed { window_id } = event {
            self.windows.remove(window_id);
            self.attached.remove(window_id);
            self.views.retain(|_, home| home != window_id);
        }
    }
}
