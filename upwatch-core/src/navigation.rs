use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// Where controllers send the user next. Implemented by whatever owns the screen.
pub trait Navigator: Send + Sync {
    /// Go to `route`, replacing the current view.
    fn replace(&self, route: Route);

    /// Go to `route`, keeping the current view in history.
    fn push(&self, route: Route);

    /// Throw away any cached authenticated state and re-render.
    fn refresh(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    Replace(Route),
    Push(Route),
    Refresh,
}

/// Navigator that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    events: Mutex<Vec<NavEvent>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NavEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The route most recently navigated to, if any.
    pub fn current(&self) -> Option<Route> {
        self.events().iter().rev().find_map(|e| match e {
            NavEvent::Replace(r) | NavEvent::Push(r) => Some(*r),
            NavEvent::Refresh => None,
        })
    }

    pub fn count(&self, event: NavEvent) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }

    fn record(&self, event: NavEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, route: Route) {
        self.record(NavEvent::Replace(route));
    }

    fn push(&self, route: Route) {
        self.record(NavEvent::Push(route));
    }

    fn refresh(&self) {
        self.record(NavEvent::Refresh);
    }
}
