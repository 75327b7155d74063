//! The channel between the desktop host and the call UI.
//!
//! ```text
//! DesktopApi (clone per consumer) ──requests──► DesktopHost ──► InputBindingManager
//!        ▲                                          │
//!        └──────── ptt edges / overlay patches ─────┘
//! ```
//!
//! [`DesktopHost`] owns everything process-wide: the live push-to-talk
//! binding, the overlay window state and the user identifier. It runs one
//! `select!` loop over API requests and device signals, so the binding is
//! only ever touched from that task.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::identity::{self, IdentityError};
use crate::input::source::InputSignal;
use crate::input::{InputBindingManager, InputDevices, InputError, Keybind, KeybindId};
use crate::state::store::{KeybindKey, OverlayOptionsKey};
use crate::state::{OverlayOptions, OverlayPatch, OverlayState, SharedStore};

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

enum Request {
    SetKeybind {
        id: KeybindId,
        keybind: Keybind,
        reply: oneshot::Sender<Result<(), InputError>>,
    },
    OnKeybind {
        id: KeybindId,
        reply: oneshot::Sender<UnboundedReceiver<bool>>,
    },
    OpenDevTools,
    OverlaySetEnabled(bool),
    OverlaySetDisplay(usize),
    OverlayUpdateState(OverlayPatch),
    OnOverlayState {
        reply: oneshot::Sender<UnboundedReceiver<OverlayPatch>>,
    },
    GetUserUuid {
        reply: oneshot::Sender<Result<String, IdentityError>>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Desktop host has shut down")]
    Closed,
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Renderer-side handle. Fire-and-forget calls are silently dropped once
/// the host is gone.
#[derive(Clone)]
pub struct DesktopApi {
    requests: UnboundedSender<Request>,
}

impl DesktopApi {
    fn send(&self, request: Request) {
        if self.requests.send(request).is_err() {
            debug!("Desktop host gone, dropping request");
        }
    }

    async fn ask<T>(&self, request: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T, BridgeError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(request(reply))
            .map_err(|_| BridgeError::Closed)?;
        response.await.map_err(|_| BridgeError::Closed)
    }

    pub async fn set_keybind(&self, id: KeybindId, keybind: Keybind) -> Result<(), BridgeError> {
        self.ask(|reply| Request::SetKeybind { id, keybind, reply })
            .await??;
        Ok(())
    }

    /// Press (`true`) and release (`false`) edges of the binding.
    pub async fn on_keybind(&self, id: KeybindId) -> Result<UnboundedReceiver<bool>, BridgeError> {
        self.ask(|reply| Request::OnKeybind { id, reply }).await
    }

    pub fn open_dev_tools(&self) {
        self.send(Request::OpenDevTools);
    }

    pub fn overlay_set_enabled(&self, enabled: bool) {
        self.send(Request::OverlaySetEnabled(enabled));
    }

    pub fn overlay_set_display(&self, index: usize) {
        self.send(Request::OverlaySetDisplay(index));
    }

    pub fn overlay_update_state(&self, patch: OverlayPatch) {
        self.send(Request::OverlayUpdateState(patch));
    }

    /// Patches as they are forwarded to the overlay window.
    pub async fn on_overlay_state(&self) -> Result<UnboundedReceiver<OverlayPatch>, BridgeError> {
        self.ask(|reply| Request::OnOverlayState { reply }).await
    }

    pub async fn get_user_uuid(&self) -> Result<String, BridgeError> {
        Ok(self.ask(|reply| Request::GetUserUuid { reply }).await??)
    }

    pub async fn get_app_version(&self) -> String {
        APP_VERSION.to_string()
    }
}

pub struct DesktopHost {
    manager: InputBindingManager,
    signals: UnboundedReceiver<InputSignal>,
    requests: UnboundedReceiver<Request>,
    store: SharedStore,
    identity: Result<String, IdentityError>,
    overlay_options: OverlayOptions,
    overlay_state: OverlayState,
    overlay_subscribers: Vec<UnboundedSender<OverlayPatch>>,
    dev_tools_open: bool,
    #[cfg(feature = "global-keys")]
    hotkeys: Option<crate::input::backend::hotkey::GlobalKeyListener>,
}

impl DesktopHost {
    /// Creates the host and restores the persisted binding and overlay
    /// preferences. The user identifier is computed once, here.
    pub fn new(devices: InputDevices, store: SharedStore) -> (Self, DesktopApi) {
        Self::with_identity(devices, store, identity::user_uuid())
    }

    pub fn with_identity(
        devices: InputDevices,
        store: SharedStore,
        identity: Result<String, IdentityError>,
    ) -> (Self, DesktopApi) {
        let (manager, signals) = InputBindingManager::new(devices);
        let (tx, requests) = mpsc::unbounded_channel();
        let (keybind, overlay_options) = {
            let store = store.lock().unwrap();
            (
                store.get::<KeybindKey>(),
                store.get::<OverlayOptionsKey>().unwrap_or_default(),
            )
        };
        if let Err(e) = &identity {
            warn!("No user identifier: {}", e);
        }

        let mut host = Self {
            manager,
            signals,
            requests,
            store,
            identity,
            overlay_state: OverlayState {
                position_id: overlay_options.position_id,
                ..Default::default()
            },
            overlay_options,
            overlay_subscribers: Vec::new(),
            dev_tools_open: false,
            #[cfg(feature = "global-keys")]
            hotkeys: None,
        };

        #[cfg(feature = "global-keys")]
        match crate::input::backend::hotkey::GlobalKeyListener::new() {
            Ok(listener) => host.hotkeys = Some(listener),
            Err(e) => warn!("Global keys unavailable: {}", e),
        }

        let keybind = keybind.unwrap_or_default();
        if let Err(e) = host.install(keybind) {
            warn!("Stored keybind unavailable: {}", e);
        }
        (host, DesktopApi { requests: tx })
    }

    pub fn keybind(&self) -> &Keybind {
        self.manager.keybind()
    }

    pub fn overlay_options(&self) -> &OverlayOptions {
        &self.overlay_options
    }

    pub fn overlay_state(&self) -> &OverlayState {
        &self.overlay_state
    }

    pub fn dev_tools_open(&self) -> bool {
        self.dev_tools_open
    }

    /// Serves requests until every [`DesktopApi`] handle is dropped.
    pub async fn run(mut self) {
        #[cfg(feature = "global-keys")]
        let _forwarder = self
            .hotkeys
            .as_ref()
            .map(|h| h.spawn_forwarder(self.manager.signal_sender()));

        loop {
            tokio::select! {
                Some(signal) = self.signals.recv() => {
                    self.manager.handle_signal(signal);
                }
                request = self.requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => break,
                },
            }
        }
        info!("Desktop host stopped");
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::SetKeybind { id, keybind, reply } => {
                debug!("Setting {:?} keybind", id);
                let result = self.install(keybind.clone());
                if result.is_ok() {
                    self.persist_keybind(&keybind);
                }
                let _ = reply.send(result);
            }
            Request::OnKeybind { id, reply } => {
                debug!("Subscribing to {:?} keybind", id);
                let _ = reply.send(self.manager.subscribe());
            }
            Request::OpenDevTools => {
                self.dev_tools_open = !self.dev_tools_open;
                info!("Diagnostics {}", if self.dev_tools_open { "opened" } else { "closed" });
            }
            Request::OverlaySetEnabled(enabled) => {
                self.overlay_options.enabled = enabled;
                info!("Overlay {}", if enabled { "shown" } else { "hidden" });
                self.persist_overlay();
            }
            Request::OverlaySetDisplay(index) => {
                self.overlay_options.display_id = Some(index);
                self.persist_overlay();
            }
            Request::OverlayUpdateState(patch) => {
                if let Some(position_id) = patch.position_id {
                    self.overlay_options.position_id = position_id;
                    self.persist_overlay();
                }
                self.overlay_state.apply(patch.clone());
                self.overlay_subscribers
                    .retain(|tx| tx.send(patch.clone()).is_ok());
            }
            Request::OnOverlayState { reply } => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.overlay_subscribers.push(tx);
                let _ = reply.send(rx);
            }
            Request::GetUserUuid { reply } => {
                let _ = reply.send(self.identity.clone());
            }
        }
    }

    fn install(&mut self, keybind: Keybind) -> Result<(), InputError> {
        #[cfg(feature = "global-keys")]
        if let Some(hotkeys) = self.hotkeys.as_mut() {
            match &keybind {
                Keybind::Keyboard { key } => hotkeys.listen_for(&key.character)?,
                _ => hotkeys.unregister_all(),
            }
        }
        self.manager.set_keybind(keybind)
    }

    fn persist_keybind(&self, keybind: &Keybind) {
        if let Err(e) = self.store.lock().unwrap().set::<KeybindKey>(keybind) {
            warn!("Failed to persist keybind: {:#}", e);
        }
    }

    fn persist_overlay(&self) {
        let result = self
            .store
            .lock()
            .unwrap()
            .set::<OverlayOptionsKey>(&self.overlay_options);
        if let Err(e) = result {
            warn!("Failed to persist overlay options: {:#}", e);
        }
    }
}
