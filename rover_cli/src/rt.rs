//! Real-time scheduling for the control loop (Linux: SCHED_FIFO, affinity, mlockall).

use crate::cli::{RtArgs, RtLock};

#[cfg(target_os = "linux")]
/// Capacity of cpu_set_t in CPU indices (bits).
const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

/// Apply the requested real-time settings once per process.
///
/// Every step is best-effort: a failure is logged and the remaining steps
/// still run.
#[cfg(target_os = "linux")]
pub fn setup_rt_once(args: &RtArgs) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !args.rt {
        return;
    }
    let lock = args.rt_lock.unwrap_or_else(RtLock::os_default);
    RT_ONCE.get_or_init(|| {
        match apply_mem_lock(lock) {
            Ok(()) => tracing::info!(?lock, "rt: memory lock applied"),
            Err(err) => tracing::warn!(error = %err, "rt: mlockall failed"),
        }
        match apply_fifo_priority(args.rt_prio) {
            Ok(prio) => tracing::info!(prio, "rt: SCHED_FIFO enabled"),
            Err(err) => tracing::warn!(error = %err, "rt: sched_setscheduler failed"),
        }
        let cpu = args.rt_cpu.unwrap_or(0);
        match apply_affinity(cpu) {
            Ok(()) => tracing::info!(cpu, "rt: pinned to cpu"),
            Err(err) => tracing::warn!(error = %err, cpu, "rt: affinity not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(args: &RtArgs) {
    if args.rt {
        tracing::warn!("rt: real-time mode is only supported on Linux; ignoring --rt");
    }
}

#[cfg(target_os = "linux")]
fn last_os_error() -> eyre::Report {
    eyre::eyre!(std::io::Error::last_os_error())
}

#[cfg(target_os = "linux")]
fn apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    if unsafe { mlockall(flags) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    // Locking future pages needs more headroom; settle for what is resident.
    if lock == RtLock::All && unsafe { mlockall(MCL_CURRENT) } == 0 {
        tracing::warn!(error = %err, "rt: mlockall(current|future) failed, locked current only");
        return Ok(());
    }
    let mut msg = format!("mlockall: {err}");
    if matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM) {
        if let Some(limit) = memlock_limit_kib() {
            msg.push_str(&format!("; memlock limit: {limit} KiB"));
        }
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn memlock_limit_kib() -> Option<u64> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let cur = unsafe { rlim.assume_init() }.rlim_cur;
    (cur != libc::RLIM_INFINITY).then_some(cur / 1024)
}

/// Switch to SCHED_FIFO; returns the priority actually requested.
#[cfg(target_os = "linux")]
fn apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let sched_priority = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param { sched_priority };
    if unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
        let err = last_os_error();
        if unsafe { libc::geteuid() } != 0 {
            return Err(err.wrap_err("SCHED_FIFO needs CAP_SYS_NICE or root"));
        }
        return Err(err);
    }
    Ok(sched_priority)
}

#[cfg(target_os = "linux")]
fn apply_affinity(cpu: usize) -> eyre::Result<()> {
    use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t};

    if cpu >= MAX_CPUSET_BITS {
        eyre::bail!("requested CPU {cpu} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
    }
    let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if online < 1 {
        eyre::bail!("_SC_NPROCESSORS_ONLN < 1");
    }
    if cpu as libc::c_long >= online {
        eyre::bail!("requested CPU {cpu} >= online {online}");
    }

    let size = std::mem::size_of::<cpu_set_t>();
    let mut allowed: cpu_set_t = unsafe { std::mem::zeroed() };
    if unsafe { libc::sched_getaffinity(0, size, &mut allowed) } != 0 {
        return Err(last_os_error().wrap_err("sched_getaffinity"));
    }
    if !unsafe { CPU_ISSET(cpu, &allowed) } {
        eyre::bail!("CPU {cpu} not permitted by current affinity mask");
    }

    let mut desired: cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe {
        CPU_ZERO(&mut desired);
        CPU_SET(cpu, &mut desired);
    }
    if unsafe { libc::sched_setaffinity(0, size, &desired) } != 0 {
        return Err(last_os_error());
    }
    Ok(())
}
