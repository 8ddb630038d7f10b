use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rover_core::mocks::ScriptedLink;
use rover_core::{LineBuffer, MotorCfg, QuadratureDecoder, TickCounter, TimingCfg, build_controller};
use rover_traits::{DriverError, DutyDriver, EdgeSink, ServoDriver};

struct NopMotor;
impl DutyDriver for NopMotor {
    fn set_forward(&mut self, _: u8) -> Result<(), DriverError> {
        Ok(())
    }
    fn set_backward(&mut self, _: u8) -> Result<(), DriverError> {
        Ok(())
    }
    fn stop(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

struct NopServo;
impl ServoDriver for NopServo {
    fn set_angle(&mut self, _: u8) -> Result<(), DriverError> {
        Ok(())
    }
}

// Host traffic: drive commands with varying steer, no reversals so no settle sleeps.
fn synth_commands(n: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(n * 10);
    for i in 0..n {
        let line = format!("C:{},{}\n", 10 + (i % 80), i % 181);
        out.extend_from_slice(line.as_bytes());
    }
    out
}

fn configure(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p rover_core --bench control_path
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_decoder(c: &mut Criterion) {
    let mut g = c.benchmark_group("quadrature");
    configure(&mut g);
    let forward = [(false, true), (true, true), (true, false), (false, false)];
    g.bench_function("forward_10k_edges", |b| {
        let ticks = TickCounter::new();
        let mut dec = QuadratureDecoder::new(ticks.clone());
        b.iter(|| {
            for (a, bb) in forward.iter().cycle().take(10_000) {
                dec.on_edge(black_box(*a), black_box(*bb));
            }
            black_box(ticks.read());
        });
    });
    g.finish();
}

pub fn bench_line_path(c: &mut Criterion) {
    let mut g = c.benchmark_group("line_path");
    configure(&mut g);
    let bytes = synth_commands(1_000);

    g.bench_function("line_buffer_only", |b| {
        b.iter_batched(
            LineBuffer::default,
            |mut buf| {
                let lines = bytes.iter().filter_map(|&x| buf.feed(x)).count();
                black_box(lines);
            },
            BatchSize::SmallInput,
        )
    });

    g.bench_function("dispatch", |b| {
        b.iter_batched(
            || {
                let mut ctl = build_controller(
                    NopMotor,
                    NopServo,
                    TimingCfg::default(),
                    MotorCfg::default(),
                    TickCounter::new(),
                    None,
                )
                .unwrap();
                ctl.begin().unwrap();
                ctl
            },
            |mut ctl| {
                for &x in &bytes {
                    let _ = black_box(ctl.feed_byte(x));
                }
            },
            BatchSize::SmallInput,
        )
    });

    g.bench_function("poll_scripted_link", |b| {
        b.iter_batched(
            || {
                let mut link = ScriptedLink::new();
                link.push(&bytes[..400]);
                let mut ctl = build_controller(
                    NopMotor,
                    NopServo,
                    TimingCfg::default(),
                    MotorCfg::default(),
                    TickCounter::new(),
                    None,
                )
                .unwrap();
                ctl.begin().unwrap();
                (ctl, link)
            },
            |(mut ctl, mut link)| {
                let _ = black_box(ctl.poll(&mut link));
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(control_path, bench_decoder, bench_line_path);
criterion_main!(control_path);
