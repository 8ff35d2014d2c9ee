//! UI theme preference
//!
//! [`ThemeState`] is the single owner of the current [`Theme`]. Surfaces read
//! it or subscribe to changes; nothing else mutates it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The other theme
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(format!("Unknown theme: {}", s)),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable theme container
#[derive(Debug, Clone)]
pub struct ThemeState {
    sender: Arc<watch::Sender<Theme>>,
}

impl ThemeState {
    pub fn new(initial: Theme) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Theme {
        *self.sender.borrow()
    }

    /// Set the theme, notifying subscribers only when it changes
    pub fn set(&self, theme: Theme) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == theme {
                false
            } else {
                *current = theme;
                true
            }
        });
        if changed {
            debug!("Theme changed to {}", theme);
        }
    }

    /// Flip the theme and return the new value
    pub fn toggle(&self) -> Theme {
        let next = self.current().toggle();
        self.set(next);
        next
    }

    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.sender.subscribe()
    }
}

impl Default for ThemeState {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parse_and_toggle() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" light ".parse::<Theme>().unwrap(), Theme::Light);
        assert!("sepia".parse::<Theme>().is_err());

        assert_eq!(Theme::Light.toggle(), Theme::Dark);
        assert_eq!(Theme::Dark.toggle().toggle(), Theme::Dark);
        assert_eq!(Theme::Dark.to_string(), "dark");
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }

    #[tokio::test]
    async fn test_state_notifies_subscribers() {
        let state = ThemeState::default();
        let mut rx = state.subscribe();
        assert_eq!(state.current(), Theme::Light);

        assert_eq!(state.toggle(), Theme::Dark);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Theme::Dark);

        // Setting the same value is not a change
        state.set(Theme::Dark);
        assert!(!rx.has_changed().unwrap());

        state.set(Theme::Light);
        assert!(rx.has_changed().unwrap());
        assert_eq!(state.current(), Theme::Light);
    }

    #[test]
    fn test_clones_share_value() {
        let state = ThemeState::new(Theme::Dark);
        let other = state.clone();
        other.toggle();
        assert_eq!(state.current(), Theme::Light);
    }
}
