// Drives the compiled binary through a PTY to exercise the real event loop
// and crossterm input handling.
//
// Requires a TTY; expectrl allocates a pseudo terminal. Ignored by default.
// Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn practice_session_cancels_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::TempDir::new()?;
    let bin = assert_cmd::cargo::cargo_bin("typealpha");
    let cmd = format!(
        "env HOME={} {} play --practice --seed 7 --config {}",
        home.path().display(),
        bin.display(),
        home.path().join("missing.json").display()
    );

    let mut p = spawn(cmd)?;
    p.expect("starting in")?;

    // countdown is three seconds
    std::thread::sleep(Duration::from_millis(3_200));
    p.send("abc")?;
    std::thread::sleep(Duration::from_millis(200));

    // Esc cancels the run; cancelled runs exit without a results screen
    p.send("\x1b")?;
    p.expect(Eof)?;
    Ok(())
}
