//! Search statistics and progress logging.

use std::time::{Duration, Instant};

use tracing::info;

/// Current process memory usage in bytes (resident set size).
#[cfg(target_os = "macos")]
pub fn get_memory_usage() -> Option<u64> {
    use std::mem::MaybeUninit;

    extern "C" {
        fn mach_task_self() -> u32;
        fn task_info(
            target_task: u32,
            flavor: i32,
            task_info_out: *mut libc::c_void,
            task_info_out_cnt: *mut u32,
        ) -> i32;
    }

    #[repr(C)]
    struct TaskBasicInfo {
        suspend_count: i32,
        virtual_size: u64,
        resident_size: u64,
        user_time: (i32, i32),
        system_time: (i32, i32),
        policy: i32,
    }

    const TASK_BASIC_INFO_64: i32 = 5;
    const TASK_BASIC_INFO_64_COUNT: u32 = 10;

    unsafe {
        let mut info = MaybeUninit::<TaskBasicInfo>::uninit();
        let mut count = TASK_BASIC_INFO_64_COUNT;
        let result = task_info(
            mach_task_self(),
            TASK_BASIC_INFO_64,
            info.as_mut_ptr() as *mut libc::c_void,
            &mut count,
        );
        if result == 0 {
            Some(info.assume_init().resident_size)
        } else {
            None
        }
    }
}

#[cfg(target_os = "linux")]
pub fn get_memory_usage() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn get_memory_usage() -> Option<u64> {
    None
}

/// Format bytes as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Counters shared by both engines.
#[derive(Debug)]
pub struct SearchStats {
    /// Positions entered (alpha-beta) or playouts run (UCT)
    pub nodes: u64,

    /// Transposition table hits
    pub cache_hits: u64,

    /// Finished games reached
    pub terminal_positions: u64,

    /// Moves skipped by beta cutoffs
    pub branches_pruned: u64,

    /// Deepest ply reached below the root
    pub max_depth: u64,

    start_time: Instant,
    last_log_time: Instant,
    last_log_nodes: u64,
}

impl SearchStats {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            nodes: 0,
            cache_hits: 0,
            terminal_positions: 0,
            branches_pruned: 0,
            max_depth: 0,
            start_time: now,
            last_log_time: now,
            last_log_nodes: 0,
        }
    }

    #[inline]
    pub fn reach(&mut self, ply: usize) {
        self.max_depth = self.max_depth.max(ply as u64);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn nodes_per_sec(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.nodes as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn should_log(&self, interval_secs: u64) -> bool {
        interval_secs > 0 && self.last_log_time.elapsed().as_secs() >= interval_secs
    }

    /// Log progress and reset the log timer.
    pub fn log_progress(&mut self, engine: &str, table_size: usize) {
        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            (self.nodes - self.last_log_nodes) as f64 / elapsed
        } else {
            0.0
        };
        let pruning_pct = if self.nodes > 0 {
            100.0 * self.branches_pruned as f64 / (self.nodes + self.branches_pruned) as f64
        } else {
            0.0
        };
        let mem = get_memory_usage().map(format_bytes).unwrap_or_default();
        let rate = format!("{:.0}/s", rate);
        let pruned = format!("{:.1}%", pruning_pct);

        info!(
            engine,
            nodes = self.nodes,
            unique = table_size,
            cache_hits = self.cache_hits,
            rate = %rate,
            depth = self.max_depth,
            pruned = %pruned,
            mem = %mem,
            "progress"
        );

        self.last_log_time = Instant::now();
        self.last_log_nodes = self.nodes;
    }

    pub fn log_summary(&self, engine: &str) {
        let rate = format!("{:.0}/s", self.nodes_per_sec());
        info!(
            engine,
            nodes = self.nodes,
            cache_hits = self.cache_hits,
            terminals = self.terminal_positions,
            pruned = self.branches_pruned,
            depth = self.max_depth,
            rate = %rate,
            "search finished"
        );
    }
}

impl Default for SearchStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn test_reach_tracks_max() {
        let mut stats = SearchStats::new();
        stats.reach(4);
        stats.reach(2);
        assert_eq!(stats.max_depth, 4);
        assert!(!stats.should_log(0));
    }
}
