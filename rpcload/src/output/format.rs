use std::time::Duration;

pub(crate) fn format_bytes(b: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * 1024 * 1024;

    if b >= GIB {
        return format!("{:.2}GiB", (b as f64) / (GIB as f64));
    }
    if b >= MIB {
        return format!("{:.2}MiB", (b as f64) / (MIB as f64));
    }
    if b >= KIB {
        return format!("{:.2}KiB", (b as f64) / (KIB as f64));
    }

    format!("{b}B")
}

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}

pub(crate) fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis() as u64;
    if total_ms < 1000 {
        return format!("{total_ms}ms");
    }

    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        if mins > 0 {
            return format!("{hours}h{mins}m");
        }
        return format!("{hours}h");
    }
    if mins > 0 {
        if secs > 0 {
            return format!("{mins}m{secs}s");
        }
        return format!("{mins}m");
    }
    format!("{secs}s")
}

pub(crate) fn format_ms_opt(v: Option<f64>) -> String {
    match v {
        Some(ms) if ms.is_finite() => format!("{ms:.1}ms"),
        _ => "-".to_string(),
    }
}
