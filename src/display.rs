use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

const RULE_WIDTH: usize = 60;
const RENDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Print the review between rules, through `glow` when it is installed.
pub fn display_review(review: &str, glow_style: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{rule}");
    if review.trim().is_empty() {
        warn!("No review content received from LLM");
        println!("{rule}");
        return;
    }

    match render_with("glow", &["-s", glow_style], review, RENDER_TIMEOUT) {
        Some(rendered) => println!("{rendered}"),
        None => println!("{review}"),
    }
    println!("{rule}");
}

/// Pipe `input` through `program args...` and return its stdout.
///
/// `None` when the program is missing, exits non-zero, prints nothing, or
/// runs past `timeout` (it is killed in that case).
pub fn render_with(program: &str, args: &[&str], input: &str, timeout: Duration) -> Option<String> {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            debug!(program, "renderer unavailable: {e}");
            return None;
        }
    };

    let mut stdin = child.stdin.take()?;
    let input = input.to_string();
    let writer = thread::spawn(move || {
        let _ = stdin.write_all(input.as_bytes());
    });
    let mut stdout = child.stdout.take()?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                warn!(program, "renderer timed out, printing raw text");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => thread::sleep(Duration::from_millis(20)),
            Err(e) => {
                debug!(program, "renderer wait failed: {e}");
                let _ = child.kill();
                return None;
            }
        }
    };

    let _ = writer.join();
    let out = reader.join().ok()?;
    if !status.success() || out.is_empty() {
        debug!(program, ?status, "renderer failed, printing raw text");
        return None;
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}
