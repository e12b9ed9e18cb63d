// Tempo Link demo - Simulated audio thread driven by a local link session

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use env_logger::Env;
use log::{error, info};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};

use tempo_link::link::host_time_now;
use tempo_link::{Click, ClickType, LinkConfig, LinkManager, LinkResult, ListenerKind};

// Simulated audio device
const BUFFER_FRAMES: usize = 512;
const CLICK_RINGBUFFER_CAPACITY: usize = 64;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Tempo Link demo v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> LinkResult<()> {
    // Optional config path as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => LinkConfig::load(&path)?,
        None => LinkConfig::default(),
    };

    let mut manager = LinkManager::from_config(&config)?;
    manager.add_listener(ListenerKind::tempo(|bpm, quantum| {
        info!("Tempo listener: {:.2} BPM (quantum {})", bpm, quantum);
    }));
    manager.add_listener(ListenerKind::playing(|playing| {
        info!("Playing listener: {}", playing);
    }));

    let buffer_duration =
        Duration::from_secs_f64(BUFFER_FRAMES as f64 / manager.clock().sample_rate());

    // Clicks travel back to this thread; the audio thread never logs
    let (mut click_tx, mut click_rx) = HeapRb::<Click>::new(CLICK_RINGBUFFER_CAPACITY).split();
    let running = Arc::new(AtomicBool::new(true));

    let mut audio = manager.start_engine()?;
    let audio_thread = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                let timing = audio.render(host_time_now(), BUFFER_FRAMES);
                if let Some(click) = timing.click {
                    let _ = click_tx.try_push(click);
                }
                thread::sleep(buffer_duration);
            }
            audio
        })
    };

    drain(&mut manager, &mut click_rx, Duration::from_millis(200));
    manager.request_start();
    drain(&mut manager, &mut click_rx, Duration::from_millis(2_000));
    manager.propose_tempo(140.0)?;
    drain(&mut manager, &mut click_rx, Duration::from_millis(2_000));
    manager.reset_beat_time(0.0, manager.quantum())?;
    drain(&mut manager, &mut click_rx, Duration::from_millis(2_000));
    manager.handle_route_change(0.010)?;
    drain(&mut manager, &mut click_rx, Duration::from_millis(2_000));
    manager.request_stop();
    drain(&mut manager, &mut click_rx, Duration::from_millis(500));

    running.store(false, Ordering::Relaxed);
    match audio_thread.join() {
        Ok(audio) => {
            info!("Audio thread missed {} pulls", audio.missed_pulls());
            manager.stop_engine(audio)?;
        }
        Err(_) => error!("Audio thread panicked"),
    }

    info!(
        "Session ended at {:.2} BPM, beat {:.2}",
        manager.tempo(),
        manager.beat_time()
    );
    Ok(())
}

/// Service the control side for `duration`: events, listeners and clicks
fn drain(
    manager: &mut LinkManager,
    clicks: &mut impl Consumer<Item = Click>,
    duration: Duration,
) {
    let poll_interval = Duration::from_millis(20);
    let mut elapsed = Duration::ZERO;
    while elapsed < duration {
        manager.poll_events();
        while let Some(click) = clicks.try_pop() {
            let marker = match click.click_type {
                ClickType::Accent => "TICK",
                ClickType::Regular => "tock",
            };
            info!("{} beat {} (frame {})", marker, click.beat, click.frame_offset);
        }
        thread::sleep(poll_interval);
        elapsed += poll_interval;
    }
}
