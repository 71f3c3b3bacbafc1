// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mixlink monitor - connects to the audio processor and logs what it reports.

use mixlink::config::{apply_env_overrides, AppConfig, ConfigManager};
use mixlink::state::{request_snapshot, StateMirror};
use mixlink::transport::{TransportHandle, TransportService};
use mixlink::{Event, EventBus, Topic};
use mixlink_ipc::ChannelType;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOGGED_TOPICS: [Topic; 6] = [
    Topic::NotifyGain,
    Topic::NotifyMute,
    Topic::NotifyMixer,
    Topic::NotifyFilter,
    Topic::NotifyWsAddress,
    Topic::NotifyWsState,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, load_error) = match ConfigManager::new() {
        Ok(manager) => manager.load_config_or_default(),
        Err(e) => {
            let mut config = AppConfig::default();
            apply_env_overrides(&mut config);
            (config, Some(e))
        }
    };

    // RUST_LOG wins over the configured filter.
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {}", e);
    }

    info!("Starting Mixlink monitor for {}", config.connection.address);

    let bus = EventBus::new();
    let mirror = StateMirror::attach(&bus);
    for topic in LOGGED_TOPICS {
        bus.subscribe(topic, log_notification);
    }

    let service = TransportService::start(config.connection.address.clone(), bus.clone());

    if config.monitor.request_snapshot {
        request_snapshot(&bus);
    }

    let meter_task = config
        .monitor
        .meter_poll_interval()
        .map(|period| tokio::spawn(poll_meters(service.handle().clone(), bus.clone(), period)));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    if let Some(task) = meter_task {
        task.abort();
    }
    let _ = tokio::time::timeout(Duration::from_secs(2), service.shutdown()).await;

    let state = mirror.snapshot();
    info!(
        "Mixlink monitor stopped ({} gains, {} mutes, {} routes known)",
        state.gains.len(),
        state.mutes.len(),
        state.routes.len()
    );
    Ok(())
}

fn log_notification(event: &Event) {
    match event {
        Event::NotifyGain { channel, gain_db } => info!("{} gain {:.1} dB", channel, gain_db),
        Event::NotifyMute { channel, mute } => info!("{} mute {}", channel, mute),
        Event::NotifyMixer { edge, mix } => info!(
            "input {} -> output {}: {}",
            edge.input_channel,
            edge.output_channel,
            if *mix { "routed" } else { "off" }
        ),
        Event::NotifyFilter { key, filter } => info!(
            "{}: {} {} {:.0} Hz Q {:.3} {:.1} dB",
            key,
            if filter.enabled { "on" } else { "off" },
            filter.filter_type,
            filter.center_frequency,
            filter.q_factor,
            filter.gain_db
        ),
        Event::NotifyWsAddress(address) => info!("Server address {}", address),
        Event::NotifyWsState(state) => info!("Connection {}", state),
        other => debug!("Unhandled notification {:?}", other),
    }
}

/// Requests meter readings for both directions while connected.
async fn poll_meters(transport: TransportHandle, bus: EventBus, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        if !transport.state().is_connected() {
            continue;
        }
        for channel_type in ChannelType::ALL {
            bus.publish(Event::GetMeter(channel_type));
        }
    }
}
