use std::cell::{Cell, RefCell};
use std::rc::Rc;

use borderpaint_engine::Redraw;
use wasm_bindgen::prelude::*;

/// Batches engine redraw requests into `requestAnimationFrame` callbacks.
///
/// The engine's redraw hook fires while the engine is still borrowed, so the hook
/// only records the request via [`RenderScheduler::request`]. Event handlers call
/// [`RenderScheduler::flush`] after releasing their borrow: an immediate request
/// renders synchronously, a next-frame request schedules at most one rAF.
#[derive(Clone)]
pub struct RenderScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    requested: Cell<Option<Redraw>>,
    scheduled: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    render_fn: RefCell<Option<Box<dyn Fn()>>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            requested: Cell::new(None),
            scheduled: Cell::new(false),
            raf_id: Cell::new(None),
            render_fn: RefCell::new(None),
            callback: RefCell::new(None),
        });

        let inner_cb = Rc::downgrade(&inner);
        let cb = Closure::<dyn FnMut()>::new(move || {
            let Some(inner) = inner_cb.upgrade() else {
                return;
            };
            inner.scheduled.set(false);
            inner.raf_id.set(None);
            if inner.requested.take().is_some() {
                inner.run();
            }
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    /// Install the frame body. Must not be called from inside that body.
    pub fn set_render_fn(&self, render_fn: impl Fn() + 'static) {
        *self.inner.render_fn.borrow_mut() = Some(Box::new(render_fn));
    }

    /// Record a redraw request. An immediate request wins over a pending next-frame one.
    pub fn request(&self, redraw: Redraw) {
        let merged = match (self.inner.requested.get(), redraw) {
            (Some(Redraw::Immediate), _) | (_, Redraw::Immediate) => Redraw::Immediate,
            _ => Redraw::NextFrame,
        };
        self.inner.requested.set(Some(merged));
    }

    /// Act on whatever was requested since the last flush.
    pub fn flush(&self) {
        match self.inner.requested.get() {
            Some(Redraw::Immediate) => {
                self.inner.requested.set(None);
                self.cancel_frame();
                self.inner.run();
            }
            Some(Redraw::NextFrame) => self.schedule_frame(),
            None => {}
        }
    }

    /// Shorthand for a next-frame repaint that is not driven by the engine.
    pub fn mark_dirty(&self) {
        self.request(Redraw::NextFrame);
        self.flush();
    }

    fn schedule_frame(&self) {
        if self.inner.scheduled.get() {
            return;
        }
        self.inner.scheduled.set(true);
        let cb_ref = self.inner.callback.borrow();
        if let Some(ref cb) = *cb_ref {
            let Some(window) = self.inner.window.as_ref() else {
                self.inner.scheduled.set(false);
                return;
            };
            match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                Ok(id) => self.inner.raf_id.set(Some(id)),
                Err(_) => self.inner.scheduled.set(false),
            }
        }
    }

    fn cancel_frame(&self) {
        if let Some(raf_id) = self.inner.raf_id.replace(None)
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
        self.inner.scheduled.set(false);
    }
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn run(&self) {
        if let Ok(render_fn) = self.render_fn.try_borrow()
            && let Some(render_fn) = render_fn.as_ref()
        {
            render_fn();
            // Requests raised while drawing (e.g. a resize) are covered by this frame.
            self.requested.set(None);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(raf_id) = self.raf_id.replace(None)
            && let Some(window) = self.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
    }
}
