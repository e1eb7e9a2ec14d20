//! Push-to-talk console harness for the companion pipeline.
//!
//! Stands in for the overlay during development: Enter toggles recording,
//! events print to stdout instead of driving a renderer.

use std::io::{BufRead, Write};

use aiko::{AppConfig, Pipeline, PipelineEvent, TurnState};

fn main() {
    env_logger::init();

    let config_dir = AppConfig::default_dir();
    let config = AppConfig::load(&config_dir);
    println!("config: {}", config_dir.join("config.json").display());

    for (index, name) in aiko::audio::list_input_devices() {
        println!("input device {index}: {name}");
    }

    let (mut pipeline, events) = Pipeline::new(&config);

    // Event printer stands in for the render loop.
    let printer = std::thread::spawn(move || {
        for event in events {
            match event {
                PipelineEvent::Status(s) if !s.is_empty() => println!("[status] {s}"),
                PipelineEvent::Status(_) => {}
                PipelineEvent::Expression(tag) => println!("[expression] {tag}"),
                PipelineEvent::Reply { text, emotion, duration_secs } => {
                    println!("[{emotion}] {text} ({duration_secs:.1}s)");
                }
                PipelineEvent::LipSync(v) => {
                    print!("\r[mouth] {v:.2}  ");
                    let _ = std::io::stdout().flush();
                }
                PipelineEvent::TurnFinished => println!("\n[turn finished]"),
            }
        }
    });

    println!("press Enter to start recording, Enter again to send, Ctrl-D to quit");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if line.is_err() {
            break;
        }
        let result = match pipeline.state() {
            TurnState::Idle => pipeline.start_capture(),
            TurnState::Capturing => pipeline.finish_capture(),
            state => {
                println!("busy ({state:?}), wait for the turn to finish");
                continue;
            }
        };
        if let Err(e) = result {
            println!("error: {e}");
        }
    }

    drop(pipeline);
    let _ = printer.join();
}
