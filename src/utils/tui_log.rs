//! Logging that stays out of the way of the full-screen browser
//!
//! While the browser owns the terminal, anything written to stderr would tear
//! the display, so the stderr layer goes quiet until the terminal is restored.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

static TUI_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_tui_mode(enabled: bool) {
    TUI_MODE.store(enabled, Ordering::SeqCst);
}

pub fn is_tui_mode() -> bool {
    TUI_MODE.load(Ordering::SeqCst)
}

/// Keeps TUI mode on until dropped, so early returns restore logging too
pub struct TuiModeGuard(());

impl TuiModeGuard {
    pub fn enable() -> Self {
        set_tui_mode(true);
        Self(())
    }
}

impl Drop for TuiModeGuard {
    fn drop(&mut self) {
        set_tui_mode(false);
    }
}

/// Forwards to `inner` only while the browser is not on screen
pub struct ConditionalStderrLayer<L> {
    inner: L,
}

impl<L> ConditionalStderrLayer<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<S, L> Layer<S> for ConditionalStderrLayer<L>
where
    S: tracing::Subscriber,
    L: Layer<S>,
{
    // Span bookkeeping always reaches the inner layer so its per-span state stays complete
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &tracing::span::Id, ctx: Context<'_, S>) {
        self.inner.on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, id: &tracing::span::Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        self.inner.on_record(id, values, ctx);
    }

    fn on_close(&self, id: tracing::span::Id, ctx: Context<'_, S>) {
        self.inner.on_close(id, ctx);
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        if !is_tui_mode() {
            self.inner.on_event(event, ctx);
        }
    }

    fn on_enter(&self, id: &tracing::span::Id, ctx: Context<'_, S>) {
        if !is_tui_mode() {
            self.inner.on_enter(id, ctx);
        }
    }

    fn on_exit(&self, id: &tracing::span::Id, ctx: Context<'_, S>) {
        if !is_tui_mode() {
            self.inner.on_exit(id, ctx);
        }
    }
}
