use clap::ValueEnum;
use ratatui::layout::Rect;
use ratatui::style::Color;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::session::SessionId;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Self::Dark => Palette {
                bg: Color::Rgb(2, 8, 23),
                panel: Color::Rgb(9, 9, 11),
                fg: Color::Rgb(248, 250, 252),
                accent: Color::Rgb(52, 211, 153),
                muted: Color::Rgb(140, 156, 178),
                warn: Color::Rgb(251, 191, 36),
                error: Color::Rgb(248, 113, 113),
            },
            Self::Light => Palette {
                bg: Color::Rgb(248, 250, 252),
                panel: Color::Rgb(241, 245, 249),
                fg: Color::Rgb(15, 23, 42),
                accent: Color::Rgb(5, 150, 105),
                muted: Color::Rgb(100, 116, 139),
                warn: Color::Rgb(180, 83, 9),
                error: Color::Rgb(220, 38, 38),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Palette {
    pub bg: Color,
    pub panel: Color,
    pub fg: Color,
    pub accent: Color,
    pub muted: Color,
    pub warn: Color,
    pub error: Color,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ListenerId(u64);

#[derive(Debug)]
struct ResizeListener {
    session: SessionId,
    pending: Option<Rect>,
}

/// Window resize listeners, registered per session so repeated open/close
/// cycles never accumulate handlers. A resize reaches a session only
/// through its own listener.
#[derive(Debug, Default)]
pub struct ResizeRegistry {
    next_id: u64,
    listeners: BTreeMap<ListenerId, ResizeListener>,
}

impl ResizeRegistry {
    pub fn subscribe(&mut self, session: SessionId) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.insert(
            id,
            ResizeListener {
                session,
                pending: None,
            },
        );
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Queues `viewport` for every registered listener, replacing anything
    /// not yet taken. Returns the number of listeners notified.
    pub fn dispatch(&mut self, viewport: Rect) -> usize {
        for (id, listener) in &mut self.listeners {
            listener.pending = Some(viewport);
            debug!(
                listener = id.0,
                session = listener.session,
                width = viewport.width,
                height = viewport.height,
                "resize queued"
            );
        }
        self.listeners.len()
    }

    /// The viewport queued for `id` since the last take. Nothing once the
    /// listener is unsubscribed.
    pub fn take(&mut self, id: ListenerId) -> Option<Rect> {
        self.listeners.get_mut(&id)?.pending.take()
    }
}

/// Application-wide UI state, owned by the app root and passed down
/// explicitly to every view that needs it.
#[derive(Debug, Default)]
pub struct UiContext {
    pub theme: Theme,
    pub show_help: bool,
    pub resize: ResizeRegistry,
    next_session: SessionId,
}

impl UiContext {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn palette(&self) -> Palette {
        self.theme.palette()
    }

    pub fn allocate_session(&mut self) -> SessionId {
        self.next_session += 1;
        self.next_session
    }
}
