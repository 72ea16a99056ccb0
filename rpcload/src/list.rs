use rpcload_core::plan;

use crate::output::format::format_duration;

pub fn list() {
    for p in plan::builtin() {
        println!("{}", p.name);
        println!("  {}", p.summary);
        println!("  path: {}", p.path);
        println!("  vus: {}", p.vus);
        match (p.duration, p.iterations) {
            (Some(d), _) => println!("  duration: {}", format_duration(d)),
            (None, Some(n)) => println!("  iterations: {n}"),
            (None, None) => println!("  iterations: 1 (default)"),
        }
        match p.pause {
            Some(pause) => println!("  pause: {}", format_duration(pause)),
            None => println!("  pause: none"),
        }
        println!();
    }
}
