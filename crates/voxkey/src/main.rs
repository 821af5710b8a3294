//! Voxkey: push-to-talk dictation with a global hotkey.

mod config;
mod error;
mod hotkey_source;
mod inserter;
mod paste_key_guard;

pub(crate) use {
    error::{AppError, Result as AppResult},
    hotkey_source::HotkeySource,
    inserter::ClipboardInserter,
    paste_key_guard::PasteKeyGuard,
};

use crate::config::Config;

use std::time::Duration;

use global_hotkey::GlobalHotKeyManager;
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use voxkey_core::{CpalCapture, SessionController, SessionState, WhisperEngine};

/// Signals delivered to the main-thread event loop.
#[derive(Debug)]
enum AppSignal {
    /// Tear the event loop down and exit.
    Shutdown,
}

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("voxkey=debug")
        .init();

    let event_loop = EventLoopBuilder::<AppSignal>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    // Persists across event loop iterations — dropping it unregisters the hotkey.
    let mut hotkey_manager: Option<GlobalHotKeyManager> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(AppSignal::Shutdown) => {
                *control_flow = ControlFlow::ExitWithCode(0);
                return;
            }
            Event::NewEvents(tao::event::StartCause::Init) => {
                let config = match Config::load() {
                    Ok(c) => c,
                    Err(e) => {
                        error!("Failed to load config: {:?}", e);
                        std::process::exit(1);
                    }
                };

                if let Err(e) = config.validate_model_path() {
                    error!("Model validation failed: {:?}", e);
                    std::process::exit(1);
                }

                let capture = match CpalCapture::new(config.audio.selected_device.as_deref()) {
                    Ok(c) => c,
                    Err(e) => {
                        error!("Failed to open input device: {:?}", e);
                        std::process::exit(1);
                    }
                };

                let engine =
                    match WhisperEngine::new(&config.whisper.model_path, config.whisper.use_gpu) {
                        Ok(e) => e,
                        Err(e) => {
                            error!("Failed to load Whisper model: {:?}", e);
                            std::process::exit(1);
                        }
                    };

                let inserter = match ClipboardInserter::new(config.behaviour.auto_paste) {
                    Ok(i) => i,
                    Err(e) => {
                        error!("Failed to create ClipboardInserter: {:?}", e);
                        std::process::exit(1);
                    }
                };

                let controller = SessionController::new(
                    capture,
                    engine,
                    inserter,
                    config
                        .session
                        .to_session_config(config.whisper.language.clone()),
                );
                let status_rx = controller.status_receiver();

                let (events_tx, events_rx) = mpsc::channel(32);
                let (shutdown_tx, shutdown_rx) = watch::channel(false);

                // Register the hotkey on the main thread — tao's event loop
                // pumps the Windows messages needed for WM_HOTKEY delivery.
                // hotkey_manager is stored in the closure's captured state so
                // it lives for the entire app lifetime.
                let (manager, hotkey_id) = match HotkeySource::register(&config.hotkey) {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Failed to register hotkey: {:?}", e);
                        std::process::exit(1);
                    }
                };
                hotkey_manager = Some(manager);
                HotkeySource::install(hotkey_id, events_tx);

                // Spawn tokio runtime on separate thread.
                // The hotkey manager stays on the main thread.
                let proxy = proxy.clone();
                std::thread::spawn(move || {
                    let rt = match tokio::runtime::Runtime::new() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to create tokio runtime: {:?}", e);
                            std::process::exit(1);
                        }
                    };

                    rt.block_on(async {
                        let controller_task =
                            tokio::spawn(controller.run(events_rx, shutdown_rx));
                        let status_logger = tokio::spawn(log_status(status_rx));

                        match tokio::signal::ctrl_c().await {
                            Ok(()) => info!("Shutdown signal received"),
                            Err(e) => error!(error = ?e, "Failed to listen for shutdown signal"),
                        }

                        let _ = shutdown_tx.send(true);

                        match tokio::time::timeout(Duration::from_secs(2), controller_task).await
                        {
                            Ok(Ok(())) => info!("Session controller stopped cleanly"),
                            Ok(Err(e)) => error!(error = ?e, "Session controller task panicked"),
                            Err(_) => info!(
                                "Session controller did not stop within timeout, \
                                 will be cleaned up on exit"
                            ),
                        }

                        status_logger.abort();
                    });

                    let _ = proxy.send_event(AppSignal::Shutdown);
                });
            }
            _ => {}
        }

        // Keep hotkey_manager alive in the closure for the app's lifetime.
        let _ = &hotkey_manager;
    });
}

/// UI observer seam: presentation layers subscribe to the same feed.
async fn log_status(mut status_rx: watch::Receiver<SessionState>) {
    while status_rx.changed().await.is_ok() {
        let state = status_rx.borrow().clone();
        info!(state = %state, "Session state");
    }
}
