use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Above this share of the machine's CPU the benchmark process itself is likely to skew results.
const HIGH_CPU_PERCENT: f32 = 80.0;

/// Peak resource usage of this process over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsage {
    pub peak_memory_bytes: u64,
    /// Zero on platforms where sysinfo cannot list the threads of a process.
    pub peak_threads: usize,
}

/// Samples the memory and thread count of the process on a background thread until stopped.
///
/// Samples are taken every [sysinfo::MINIMUM_CPU_UPDATE_INTERVAL], plus once more when the monitor
/// is stopped. High CPU usage is logged as a warning but never stops the run.
///
/// Dropping the monitor without calling [ResourceMonitor::stop] still stops the sampling thread.
pub struct ResourceMonitor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<ResourceUsage>>,
}

impl ResourceMonitor {
    pub fn start() -> anyhow::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));

        let handle = std::thread::Builder::new()
            .name("monitor".to_string())
            .spawn({
                let stop = stop.clone();
                move || {
                    let this_process_pid = Pid::from_u32(std::process::id());
                    let mut sys = System::new();

                    sys.refresh_cpu_usage();
                    let cpu_count = sys.cpus().len().max(1);

                    let mut usage = ResourceUsage::default();
                    loop {
                        sample(&mut sys, this_process_pid, cpu_count, &mut usage);

                        if stop.load(Ordering::Relaxed) {
                            break;
                        }

                        std::thread::park_timeout(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
                    }

                    usage
                }
            })
            .context("Failed to start monitor thread")?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) -> ResourceUsage {
        self.join().unwrap_or_else(|| {
            log::warn!("Monitor thread panicked, resource usage is not available");
            ResourceUsage::default()
        })
    }

    fn join(&mut self) -> Option<ResourceUsage> {
        let handle = self.handle.take()?;
        self.stop.store(true, Ordering::Relaxed);
        handle.thread().unpark();

        handle.join().ok()
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.join();
    }
}

fn sample(sys: &mut System, pid: Pid, cpu_count: usize, usage: &mut ResourceUsage) {
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing()
            .with_memory()
            .with_cpu()
            .with_tasks(),
    );

    let Some(process) = sys.process(pid) else {
        log::debug!("Process {pid} not found by the monitor");
        return;
    };

    usage.peak_memory_bytes = usage.peak_memory_bytes.max(process.memory());
    if let Some(tasks) = process.tasks() {
        usage.peak_threads = usage.peak_threads.max(tasks.len());
    }

    let cpu_percent = process.cpu_usage() / cpu_count as f32;
    if cpu_percent > HIGH_CPU_PERCENT {
        log::warn!(
            "High CPU usage detected. The benchmark is using {:.2}% of the CPU, with {} available cores",
            cpu_percent,
            cpu_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_memory_of_this_process() {
        let monitor = ResourceMonitor::start().unwrap();
        let usage = monitor.stop();

        assert!(usage.peak_memory_bytes > 0);
        #[cfg(target_os = "linux")]
        assert!(usage.peak_threads >= 2, "expected the test and monitor threads");
    }

    #[test]
    fn dropping_stops_the_sampling_thread() {
        let monitor = ResourceMonitor::start().unwrap();
        let stop = monitor.stop.clone();

        drop(monitor);

        assert!(stop.load(Ordering::Relaxed));
        // The sampling thread held the only other reference and has exited.
        assert_eq!(1, Arc::strong_count(&stop));
    }
}
