mod analytics;
mod assemble;
mod grade;
mod ipc;
mod normalize;
mod rank;
mod rules;

use std::io::{self, BufRead, Write};

fn main() {
    // Malformed rule tables are programmer errors; refuse to serve at all.
    let rules = match rules::RuleBook::load() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("gradingd: invalid grading configuration: {e:#}");
            std::process::exit(2);
        }
    };
    let state = ipc::AppState { rules };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; report what we can.
                let _ = writeln!(
                    stdout,
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
